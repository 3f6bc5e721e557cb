/// /api/blood-banks endpoints
use crate::{
    account::LoginRequest,
    api::{
        extract::{ApiJson, ApiQuery},
        response::ApiResponse,
    },
    auth::{AdminAuthContext, AuthContext},
    blood::LOW_STOCK_THRESHOLD,
    blood_bank::{
        BloodBankFilter, CreateBloodBankRequest, StockSummary, StockUpdateRequest,
        UpdateBloodBankRequest,
    },
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/blood-banks", get(list_banks).post(create_bank))
        .route("/blood-banks/login", post(login))
        .route("/blood-banks/nearby", get(nearby))
        .route(
            "/blood-banks/:id",
            get(get_bank).put(update_bank).delete(deactivate_bank),
        )
        .route("/blood-banks/:id/stock", get(get_stock).put(update_stock))
        .route("/blood-banks/:id/verify", put(set_verified))
        .route("/blood-banks/:id/notifications", get(notifications))
        .route(
            "/blood-banks/:id/notifications/:nid/read",
            put(mark_notification_read),
        )
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    radius: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct StockQuery {
    threshold: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationQuery {
    unread_only: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest {
    is_verified: bool,
}

async fn list_banks(
    State(ctx): State<AppContext>,
    ApiQuery(filter): ApiQuery<BloodBankFilter>,
) -> AppResult<Response> {
    let banks = ctx.blood_bank_manager.list(filter).await?;
    Ok(ApiResponse::list(banks).into_response())
}

async fn nearby(
    State(ctx): State<AppContext>,
    ApiQuery(query): ApiQuery<NearbyQuery>,
) -> AppResult<Response> {
    let banks = ctx
        .blood_bank_manager
        .nearby(query.lat, query.lng, query.radius)
        .await?;
    Ok(ApiResponse::list(banks).into_response())
}

/// Public profile with stock summary and whether the bank is open right now
async fn get_bank(State(ctx): State<AppContext>, Path(id): Path<String>) -> AppResult<Response> {
    let bank = ctx.blood_bank_manager.get_active(&id).await?;
    let is_open_now = bank.is_currently_open(Local::now().naive_local());
    let stock_summary = StockSummary::of(&bank, LOW_STOCK_THRESHOLD);

    Ok(ApiResponse::data(serde_json::json!({
        "bloodBank": bank,
        "isOpenNow": is_open_now,
        "stockSummary": stock_summary,
    }))
    .into_response())
}

async fn create_bank(
    State(ctx): State<AppContext>,
    auth: AdminAuthContext,
    ApiJson(req): ApiJson<CreateBloodBankRequest>,
) -> AppResult<Response> {
    let bank = ctx.blood_bank_manager.create(req).await?;
    tracing::info!(bank = %bank.id, admin = %auth.account.id, "blood bank created");

    Ok(ApiResponse::data(bank)
        .with_message("Blood bank created")
        .created()
        .into_response())
}

async fn login(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> AppResult<Response> {
    req.validate()?;
    let session = ctx.blood_bank_manager.login(req).await?;

    Ok(ApiResponse::data(session)
        .with_message("Login successful")
        .into_response())
}

async fn update_bank(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateBloodBankRequest>,
) -> AppResult<Response> {
    let bank = ctx
        .blood_bank_manager
        .update_profile(&auth.actor, &id, req)
        .await?;

    Ok(ApiResponse::data(bank)
        .with_message("Blood bank updated")
        .into_response())
}

async fn deactivate_bank(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
) -> AppResult<Response> {
    ctx.blood_bank_manager.deactivate(&id).await?;
    Ok(ApiResponse::message("Blood bank deactivated").into_response())
}

async fn get_stock(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<StockQuery>,
) -> AppResult<Response> {
    let bank = ctx.blood_bank_manager.get_active(&id).await?;
    let threshold = query.threshold.unwrap_or(LOW_STOCK_THRESHOLD);

    Ok(ApiResponse::data(StockSummary::of(&bank, threshold)).into_response())
}

async fn update_stock(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StockUpdateRequest>,
) -> AppResult<Response> {
    let change = ctx
        .blood_bank_manager
        .update_stock(&auth.actor, &id, &req.blood_type, req.quantity, &req.operation)
        .await?;

    Ok(ApiResponse::data(change)
        .with_message("Stock updated")
        .into_response())
}

async fn set_verified(
    State(ctx): State<AppContext>,
    _auth: AdminAuthContext,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> AppResult<Response> {
    let bank = ctx.blood_bank_manager.set_verified(&id, req.is_verified).await?;
    let message = if bank.is_verified {
        "Blood bank verified"
    } else {
        "Blood bank verification removed"
    };

    Ok(ApiResponse::data(bank).with_message(message).into_response())
}

async fn notifications(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> AppResult<Response> {
    let notifications = ctx
        .blood_bank_manager
        .notifications(&auth.actor, &id, query.unread_only.unwrap_or(false))
        .await?;
    Ok(ApiResponse::list(notifications).into_response())
}

async fn mark_notification_read(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path((id, nid)): Path<(String, String)>,
) -> AppResult<Response> {
    ctx.blood_bank_manager
        .mark_notification_read(&auth.actor, &id, &nid)
        .await?;
    Ok(ApiResponse::message("Notification marked as read").into_response())
}
