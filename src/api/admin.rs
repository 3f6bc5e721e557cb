/// /api/admin endpoints: dashboard counts and account administration
use crate::{
    account::{AccountFilter, Role},
    api::{
        extract::{ApiJson, ApiQuery},
        response::ApiResponse,
    },
    auth::AdminAuthContext,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, put},
    Router,
};
use serde::Deserialize;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/stats", get(dashboard_stats))
        .route("/admin/users", get(list_users))
        .route("/admin/users/:id/status", put(set_user_status))
        .route("/admin/users/:id/role", put(set_user_role))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatusRequest {
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct UserRoleRequest {
    role: String,
}

async fn dashboard_stats(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
) -> AppResult<Response> {
    let (accounts, blood_banks, events, requests, contact) = tokio::try_join!(
        ctx.account_manager.stats(),
        ctx.blood_bank_manager.stats(),
        ctx.event_manager.stats(),
        ctx.request_manager.stats(),
        ctx.contact_manager.stats(),
    )?;

    Ok(ApiResponse::data(serde_json::json!({
        "users": accounts,
        "bloodBanks": blood_banks,
        "events": events,
        "requests": requests,
        "contactMessages": contact,
    }))
    .into_response())
}

async fn list_users(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    ApiQuery(filter): ApiQuery<AccountFilter>,
) -> AppResult<Response> {
    let accounts = ctx.account_manager.list(filter).await?;
    Ok(ApiResponse::list(accounts).into_response())
}

async fn set_user_status(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UserStatusRequest>,
) -> AppResult<Response> {
    if id == auth.account.id && !req.is_active {
        return Err(AppError::validation("Admins cannot deactivate their own account"));
    }

    let account = ctx.account_manager.set_active(&id, req.is_active).await?;
    tracing::info!(
        account = %account.id,
        active = account.is_active,
        admin = %auth.account.id,
        "account status changed"
    );

    Ok(ApiResponse::data(account)
        .with_message("User status updated")
        .into_response())
}

async fn set_user_role(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UserRoleRequest>,
) -> AppResult<Response> {
    let role = Role::from_str(&req.role)?;
    if id == auth.account.id && role != Role::Admin {
        return Err(AppError::validation("Admins cannot remove their own admin role"));
    }

    let account = ctx.account_manager.set_role(&id, role).await?;
    tracing::info!(
        account = %account.id,
        role = role.as_str(),
        admin = %auth.account.id,
        "account role changed"
    );

    Ok(ApiResponse::data(account)
        .with_message("User role updated")
        .into_response())
}
