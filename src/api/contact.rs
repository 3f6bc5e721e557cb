/// /api/contact endpoints: public submission and admin triage
use crate::{
    api::{
        extract::{ApiJson, ApiQuery},
        response::ApiResponse,
    },
    auth::AdminAuthContext,
    contact::{AddNoteRequest, ContactFilter, SubmitContactRequest, UpdateContactStatusRequest},
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/contact", post(submit))
        .route("/contact/messages", get(list_messages))
        .route("/contact/messages/stats", get(stats))
        .route(
            "/contact/messages/:id",
            get(get_message).delete(delete_message),
        )
        .route("/contact/messages/:id/read", put(mark_read))
        .route("/contact/messages/:id/notes", post(add_note))
        .route("/contact/messages/:id/status", put(update_status))
}

async fn submit(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<SubmitContactRequest>,
) -> AppResult<Response> {
    let message = ctx.contact_manager.submit(req).await?;

    Ok(ApiResponse::data(serde_json::json!({ "id": message.id }))
        .with_message("Thank you for contacting us. We will get back to you soon.")
        .created()
        .into_response())
}

async fn list_messages(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    ApiQuery(filter): ApiQuery<ContactFilter>,
) -> AppResult<Response> {
    let messages = ctx.contact_manager.list(filter).await?;
    Ok(ApiResponse::list(messages).into_response())
}

async fn stats(State(ctx): State<AppContext>, _auth: AdminAuthContext) -> AppResult<Response> {
    let stats = ctx.contact_manager.stats().await?;
    Ok(ApiResponse::data(stats).into_response())
}

async fn get_message(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let message = ctx.contact_manager.get(&id).await?;
    Ok(ApiResponse::data(message).into_response())
}

async fn delete_message(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    ctx.contact_manager.delete(&id).await?;
    Ok(ApiResponse::message("Message deleted").into_response())
}

async fn mark_read(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let message = ctx.contact_manager.mark_read(&id).await?;
    Ok(ApiResponse::data(message).into_response())
}

async fn add_note(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AddNoteRequest>,
) -> AppResult<Response> {
    req.validate()?;
    let message = ctx
        .contact_manager
        .add_note(&id, &auth.account.id, &req.note)
        .await?;

    Ok(ApiResponse::data(message)
        .with_message("Note added")
        .into_response())
}

async fn update_status(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateContactStatusRequest>,
) -> AppResult<Response> {
    let message = ctx
        .contact_manager
        .update_status(&id, req.status.as_deref(), req.priority.as_deref())
        .await?;

    Ok(ApiResponse::data(message)
        .with_message("Message updated")
        .into_response())
}
