/// Health check endpoints for liveness and readiness probes
use crate::context::AppContext;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde::Serialize;
use std::time::Instant;

/// Health status response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: String,
    pub version: String,
    pub database: ComponentHealth,
}

/// Health of a single dependency
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: String,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(liveness_probe))
}

/// Liveness plus a database ping; 503 when the database does not answer
pub async fn health(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthStatus>) {
    let start = Instant::now();
    let ping = ctx.db.ping().await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    let (status_code, status, database) = match ping {
        Ok(()) => (
            StatusCode::OK,
            "healthy",
            ComponentHealth {
                status: "healthy".to_string(),
                response_time_ms,
                error: None,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed: database ping");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "unhealthy",
                ComponentHealth {
                    status: "unhealthy".to_string(),
                    response_time_ms,
                    error: Some(e.to_string()),
                },
            )
        }
    };

    (
        status_code,
        Json(HealthStatus {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
        }),
    )
}

/// Process is up; touches nothing else
pub async fn liveness_probe() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
