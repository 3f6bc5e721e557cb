/// /api/requests endpoints
use crate::{
    api::{
        extract::{ApiJson, ApiQuery},
        response::ApiResponse,
    },
    auth::{AuthContext, UserAuthContext},
    context::AppContext,
    error::AppResult,
    request::{CreateBloodRequest, RequestFilter, StatusUpdateRequest, UpdateBloodRequest},
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/requests", get(list_requests).post(create_request))
        .route("/requests/mine", get(my_requests))
        .route(
            "/requests/:id",
            get(get_request).put(update_request).delete(delete_request),
        )
        .route("/requests/:id/cancel", put(cancel_request))
        .route("/requests/:id/status", put(update_status))
}

async fn create_request(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    ApiJson(req): ApiJson<CreateBloodRequest>,
) -> AppResult<Response> {
    let request = ctx.request_manager.create(&auth.actor, req).await?;

    Ok(ApiResponse::data(request)
        .with_message("Blood request submitted")
        .created()
        .into_response())
}

/// Incoming requests for a bank, everything for an admin
async fn list_requests(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiQuery(filter): ApiQuery<RequestFilter>,
) -> AppResult<Response> {
    let requests = ctx.request_manager.list(&auth.actor, filter).await?;
    Ok(ApiResponse::list(requests).into_response())
}

async fn my_requests(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
) -> AppResult<Response> {
    let requests = ctx
        .request_manager
        .list_for_requester(&auth.account.id)
        .await?;
    Ok(ApiResponse::list(requests).into_response())
}

async fn get_request(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let request = ctx.request_manager.get(&auth.actor, &id).await?;
    Ok(ApiResponse::data(request).into_response())
}

async fn update_request(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateBloodRequest>,
) -> AppResult<Response> {
    let request = ctx.request_manager.update(&auth.actor, &id, req).await?;
    Ok(ApiResponse::data(request)
        .with_message("Blood request updated")
        .into_response())
}

async fn cancel_request(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let request = ctx.request_manager.cancel(&auth.actor, &id).await?;
    Ok(ApiResponse::data(request)
        .with_message("Blood request cancelled")
        .into_response())
}

async fn update_status(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusUpdateRequest>,
) -> AppResult<Response> {
    req.validate()?;
    let request = ctx
        .request_manager
        .update_status(&auth.actor, &id, &req.status, req.note)
        .await?;

    Ok(ApiResponse::data(request)
        .with_message("Status updated")
        .into_response())
}

async fn delete_request(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    ctx.request_manager.delete(&auth.actor, &id).await?;
    Ok(ApiResponse::message("Blood request deleted").into_response())
}
