/// Request middleware shared by the API routers
use crate::{
    context::AppContext,
    error::{AppError, AppResult, ErrorBody, InternalErrorDetail},
};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> AppResult<String> {
    if !headers.contains_key(axum::http::header::AUTHORIZATION) {
        return Err(AppError::Authentication(
            "Missing authorization header".to_string(),
        ));
    }

    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().to_string())
        .ok_or_else(|| AppError::Authentication("Expected a bearer token".to_string()))
}

/// Re-expose redacted internal error details outside production
pub async fn expose_error_details(
    State(ctx): State<AppContext>,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if !ctx.config.is_development() || response.status() != StatusCode::INTERNAL_SERVER_ERROR {
        return response;
    }

    match response.extensions().get::<InternalErrorDetail>().cloned() {
        Some(InternalErrorDetail(detail)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                success: false,
                message: detail,
                errors: None,
            }),
        )
            .into_response(),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_or_foreign_scheme_rejected() {
        let headers = HeaderMap::new();
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AppError::Authentication(_))
        ));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert!(matches!(
            extract_bearer_token(&headers),
            Err(AppError::Authentication(_))
        ));
    }
}
