/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod blood_banks;
pub mod contact;
pub mod donors;
pub mod events;
pub mod extract;
pub mod health;
pub mod middleware;
pub mod requests;
pub mod response;

use crate::context::AppContext;
use axum::Router;

/// Build the routes served under `/api`
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(donors::routes())
        .merge(blood_banks::routes())
        .merge(events::routes())
        .merge(requests::routes())
        .merge(contact::routes())
        .merge(admin::routes())
}
