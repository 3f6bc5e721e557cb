/// /api/events endpoints: listings, registration and the review workflow
use crate::{
    api::{
        extract::{ApiJson, ApiQuery},
        response::ApiResponse,
    },
    auth::{AdminAuthContext, AuthContext, UserAuthContext},
    context::AppContext,
    error::AppResult,
    event::{CreateEventRequest, EventFilter, RejectEventRequest, UpdateEventRequest},
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route("/events/pending", get(pending_events))
        .route("/events/mine", get(my_registrations))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route(
            "/events/:id/register",
            post(register).delete(unregister),
        )
        .route("/events/:id/registrations", get(registrations))
        .route(
            "/events/:id/registrations/:user_id/attended",
            put(mark_attended),
        )
        .route("/events/:id/approve", put(approve))
        .route("/events/:id/reject", put(reject))
}

/// Public listing only offers approved, upcoming events
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicEventQuery {
    city: Option<String>,
    blood_bank_id: Option<String>,
}

async fn list_events(
    State(ctx): State<AppContext>,
    ApiQuery(query): ApiQuery<PublicEventQuery>,
) -> AppResult<Response> {
    let events = ctx
        .event_manager
        .list(EventFilter {
            status: Some("approved".to_string()),
            blood_bank_id: query.blood_bank_id,
            city: query.city,
            upcoming_only: Some(true),
        })
        .await?;
    Ok(ApiResponse::list(events).into_response())
}

async fn pending_events(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> AppResult<Response> {
    let events = ctx.event_manager.pending().await?;
    Ok(ApiResponse::list(events).into_response())
}

async fn my_registrations(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
) -> AppResult<Response> {
    let registrations = ctx.event_manager.user_registrations(&auth.account.id).await?;
    Ok(ApiResponse::list(registrations).into_response())
}

async fn get_event(
    State(ctx): State<AppContext>,
    auth: Option<AuthContext>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let viewer = auth.map(|auth| auth.actor);
    let event = ctx.event_manager.get_visible(viewer.as_ref(), &id).await?;
    Ok(ApiResponse::data(event).into_response())
}

async fn create_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CreateEventRequest>,
) -> AppResult<Response> {
    let event = ctx.event_manager.create(&auth.actor, req).await?;

    Ok(ApiResponse::data(event)
        .with_message("Event submitted for approval")
        .created()
        .into_response())
}

async fn update_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateEventRequest>,
) -> AppResult<Response> {
    let event = ctx.event_manager.update(&auth.actor, &id, req).await?;
    Ok(ApiResponse::data(event)
        .with_message("Event updated")
        .into_response())
}

async fn delete_event(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    ctx.event_manager.delete(&auth.actor, &id).await?;
    Ok(ApiResponse::message("Event deleted").into_response())
}

async fn register(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let registration = ctx.event_manager.register(&id, &auth.account.id).await?;

    Ok(ApiResponse::data(registration)
        .with_message("Registered for event")
        .created()
        .into_response())
}

async fn unregister(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    ctx.event_manager.unregister(&id, &auth.account.id).await?;
    Ok(ApiResponse::message("Registration cancelled").into_response())
}

async fn registrations(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let registrants = ctx.event_manager.registrations(&auth.actor, &id).await?;
    Ok(ApiResponse::list(registrants).into_response())
}

async fn mark_attended(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((id, user_id)): Path<(String, String)>,
) -> AppResult<Response> {
    ctx.event_manager
        .mark_attended(&auth.actor, &id, &user_id)
        .await?;
    Ok(ApiResponse::message("Attendance recorded").into_response())
}

async fn approve(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let event = ctx.event_manager.approve(&id, &auth.account.id).await?;
    Ok(ApiResponse::data(event)
        .with_message("Event approved")
        .into_response())
}

async fn reject(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RejectEventRequest>,
) -> AppResult<Response> {
    req.validate()?;
    let event = ctx
        .event_manager
        .reject(&id, &auth.account.id, &req.reason)
        .await?;
    Ok(ApiResponse::data(event)
        .with_message("Event rejected")
        .into_response())
}
