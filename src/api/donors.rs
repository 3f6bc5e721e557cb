/// /api/donors: donor directory search
use crate::{
    account::DonorFilter,
    api::{extract::ApiQuery, response::ApiResponse},
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/donors", get(search_donors))
}

async fn search_donors(
    State(ctx): State<AppContext>,
    _auth: AuthContext,
    ApiQuery(filter): ApiQuery<DonorFilter>,
) -> AppResult<Response> {
    let today = Utc::now().date_naive();
    let donors = ctx.account_manager.search_donors(filter, today).await?;

    Ok(ApiResponse::list(donors).into_response())
}
