//! HTTP-level tests driving the full router against an in-memory database

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use bloodlink::{
    config::{
        AuthConfig, BootstrapAdminConfig, Environment, LoggingConfig, RateLimitConfig,
        ServerConfig, ServiceConfig, StorageConfig,
    },
    context::AppContext,
    db::Database,
    server::build_router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@bloodlink.test";
const ADMIN_PASSWORD: &str = "admin-password";

fn test_config() -> ServerConfig {
    ServerConfig {
        service: ServiceConfig {
            hostname: "localhost".to_string(),
            port: 5000,
            environment: Environment::Production,
        },
        storage: StorageConfig {
            database_path: ":memory:".into(),
            max_connections: 1,
        },
        authentication: AuthConfig {
            jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
            token_ttl_hours: 1,
        },
        bootstrap: None,
        rate_limit: RateLimitConfig {
            enabled: false,
            ..RateLimitConfig::default()
        },
        logging: LoggingConfig {
            level: "info".to_string(),
            json: false,
        },
    }
}

async fn test_app() -> Router {
    let db = Database::in_memory().await.unwrap();
    let ctx = AppContext::with_database(test_config(), db);
    ctx.account_manager
        .ensure_admin(&BootstrapAdminConfig {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
            name: "Admin".to_string(),
        })
        .await
        .unwrap();
    build_router(ctx)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn login(app: &Router, uri: &str, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        uri,
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["data"]["token"].as_str().unwrap().to_string()
}

async fn register_user(app: &Router, email: &str) -> String {
    let (status, _) = send(
        app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({
            "name": "Jane Donor",
            "email": email,
            "password": "secret123",
            "bloodType": "O-",
            "isDonor": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    login(app, "/api/auth/login", email, "secret123").await
}

#[tokio::test]
async fn test_health_pings_database() {
    let app = test_app().await;
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "healthy");
}

#[tokio::test]
async fn test_register_and_login_envelopes() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Jane", "email": "Jane@Example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "jane@example.com");
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("passwordHash").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/register",
        None,
        Some(json!({ "name": "Jane", "email": "jane@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "jane@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert!(body.get("data").is_none());

    let token = login(&app, "/api/auth/login", "jane@example.com", "secret123").await;
    let (status, body) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["type"], "user");
    assert_eq!(body["data"]["user"]["name"], "Jane");
}

#[tokio::test]
async fn test_validation_errors_list_fields() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/contact",
        None,
        Some(json!({
            "name": "Asha",
            "email": "asha@example.com",
            "subject": "Hi!",
            "message": "I would like to organise a drive."
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "subject");
}

#[tokio::test]
async fn test_malformed_body_and_unknown_route() {
    let app = test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, Method::GET, "/api/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_auth_and_admin_guards() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = register_user(&app, "donor@example.com").await;
    let (status, body) = send(&app, Method::GET, "/api/admin/stats", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let admin = login(&app, "/api/auth/login", ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let (status, body) = send(&app, Method::GET, "/api/admin/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users"]["total"], 2);
    assert_eq!(body["data"]["users"]["donors"], 1);
}

#[tokio::test]
async fn test_blood_bank_stock_flow() {
    let app = test_app().await;
    let admin = login(&app, "/api/auth/login", ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/blood-banks",
        Some(&admin),
        Some(json!({
            "name": "City Blood Bank",
            "email": "staff@citybank.org",
            "password": "bankpass",
            "licenseNumber": "LIC-001"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let bank_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["address"]["street"], "To be updated");

    let staff = login(&app, "/api/blood-banks/login", "staff@citybank.org", "bankpass").await;
    let stock_uri = format!("/api/blood-banks/{bank_id}/stock");

    let (status, body) = send(
        &app,
        Method::PUT,
        &stock_uri,
        Some(&staff),
        Some(json!({ "bloodType": "O+", "quantity": 5, "operation": "add" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["units"], 5);

    let (status, body) = send(
        &app,
        Method::PUT,
        &stock_uri,
        Some(&staff),
        Some(json!({ "bloodType": "O+", "quantity": 10, "operation": "subtract" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["units"], 0);

    let (status, _) = send(
        &app,
        Method::PUT,
        &stock_uri,
        Some(&staff),
        Some(json!({ "bloodType": "Z+", "quantity": 1, "operation": "add" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = register_user(&app, "donor@example.com").await;
    let (status, _) = send(
        &app,
        Method::PUT,
        &stock_uri,
        Some(&user),
        Some(json!({ "bloodType": "A+", "quantity": 1, "operation": "add" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::GET, &stock_uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"]["O+"], 0);
    assert_eq!(body["data"]["totalUnits"], 0);
    assert_eq!(body["data"]["lowStockTypes"].as_array().unwrap().len(), 8);
}

#[tokio::test]
async fn test_pending_event_hidden_from_public() {
    let app = test_app().await;
    let admin = login(&app, "/api/auth/login", ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/blood-banks",
        Some(&admin),
        Some(json!({
            "name": "Harbour Blood Bank",
            "email": "staff@harbour.org",
            "password": "bankpass",
            "licenseNumber": "LIC-777"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let staff = login(&app, "/api/blood-banks/login", "staff@harbour.org", "bankpass").await;

    let start = chrono::Utc::now() + chrono::Duration::days(7);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/events",
        Some(&staff),
        Some(json!({
            "title": "Harbour drive",
            "venue": "Community hall",
            "startTime": start,
            "endTime": start + chrono::Duration::hours(4),
            "maxCapacity": 20
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let event_uri = format!("/api/events/{}", body["data"]["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::GET, &event_uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let donor = register_user(&app, "curious@example.com").await;
    let (status, _) = send(&app, Method::GET, &event_uri, Some(&donor), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::GET, &event_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");

    let (status, _) = send(&app, Method::GET, &event_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_urgent_request_reaches_bank_inbox() {
    let app = test_app().await;
    let admin = login(&app, "/api/auth/login", ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/api/blood-banks",
        Some(&admin),
        Some(json!({
            "name": "City Blood Bank",
            "email": "staff@citybank.org",
            "password": "bankpass",
            "licenseNumber": "LIC-001"
        })),
    )
    .await;
    let bank_id = body["data"]["id"].as_str().unwrap().to_string();

    let user = register_user(&app, "family@example.com").await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/requests",
        Some(&user),
        Some(json!({
            "bloodBankId": bank_id,
            "patientName": "R. Patel",
            "bloodType": "AB-",
            "unitsRequired": 2,
            "urgency": "urgent",
            "contactPhone": "+91 98765 43210"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "pending");
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    let staff = login(&app, "/api/blood-banks/login", "staff@citybank.org", "bankpass").await;
    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/blood-banks/{bank_id}/notifications"),
        Some(&staff),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["requestId"], request_id.as_str());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/requests/{request_id}/status"),
        Some(&staff),
        Some(json!({ "status": "approved", "note": "Units reserved" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");
    assert_eq!(body["data"]["history"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/requests/{request_id}"),
        Some(&user),
        Some(json!({ "unitsRequired": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_router_builds_from_config() {
    let mut config = test_config();
    config.authentication.jwt_secret = "short".to_string();
    assert!(AppContext::new(config).await.is_err());

    let ctx = tokio_test::assert_ok!(AppContext::new(test_config()).await);
    let app = build_router(ctx);
    let (status, _) = send(&app, Method::GET, "/health/live", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
