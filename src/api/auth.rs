/// /api/auth endpoints: registration, login and the caller's own profile
use crate::{
    account::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest},
    api::{extract::ApiJson, response::ApiResponse},
    auth::{AuthContext, Principal, UserAuthContext},
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/profile", put(update_profile))
        .route("/auth/password", put(change_password))
        .route("/auth/account", delete(deactivate_account))
}

async fn register(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> AppResult<Response> {
    let account = ctx.account_manager.register(req).await?;
    tracing::info!(account = %account.id, "account registered");

    Ok(ApiResponse::data(account)
        .with_message("Registration successful")
        .created()
        .into_response())
}

async fn login(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Response> {
    req.validate()?;
    let session = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(ApiResponse::data(session)
        .with_message("Login successful")
        .into_response())
}

/// Current identity; works for both account and blood-bank tokens
async fn me(auth: AuthContext) -> AppResult<Response> {
    let response = match auth.principal {
        Principal::Account(account) => ApiResponse::data(serde_json::json!({
            "type": "user",
            "user": account,
        })),
        Principal::BloodBank(bank) => ApiResponse::data(serde_json::json!({
            "type": "bloodbank",
            "bloodBank": bank,
        })),
    };
    Ok(response.into_response())
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> AppResult<Response> {
    let account = ctx.account_manager.update_profile(&auth.account.id, req).await?;

    Ok(ApiResponse::data(account)
        .with_message("Profile updated")
        .into_response())
}

async fn change_password(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> AppResult<Response> {
    ctx.account_manager.change_password(&auth.account.id, req).await?;
    Ok(ApiResponse::message("Password changed").into_response())
}

async fn deactivate_account(
    State(ctx): State<AppContext>,
    auth: UserAuthContext,
) -> AppResult<Response> {
    ctx.account_manager.deactivate(&auth.account.id).await?;
    tracing::info!(account = %auth.account.id, "account deactivated by owner");

    Ok(ApiResponse::message("Account deactivated").into_response())
}
