/// Rate limiting
///
/// Three process-wide buckets: credential endpoints (login and registration),
/// requests carrying a bearer token, and anonymous traffic.
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{AppError, AppResult},
};
use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Which bucket a request draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Credentials,
    Authenticated,
    Anonymous,
}

impl Bucket {
    /// Classify a request by method, path and whether it carries credentials
    pub fn classify(method: &Method, path: &str, has_auth_header: bool) -> Self {
        let is_credential_endpoint = *method == Method::POST
            && matches!(
                path,
                "/api/auth/login" | "/api/auth/register" | "/api/blood-banks/login"
            );

        if is_credential_endpoint {
            Bucket::Credentials
        } else if has_auth_header {
            Bucket::Authenticated
        } else {
            Bucket::Anonymous
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Bucket::Credentials => "credentials",
            Bucket::Authenticated => "authenticated",
            Bucket::Anonymous => "anonymous",
        }
    }
}

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    credentials: Arc<DirectLimiter>,
    authenticated: Arc<DirectLimiter>,
    anonymous: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let burst = non_zero(config.burst_size, 50);

        let credentials = Quota::per_second(non_zero(config.auth_rps, 5))
            .allow_burst(non_zero(config.burst_size / 5, 10));
        let authenticated =
            Quota::per_second(non_zero(config.authenticated_rps, 100)).allow_burst(burst);
        let anonymous = Quota::per_second(non_zero(config.anonymous_rps, 20)).allow_burst(burst);

        Self {
            enabled: config.enabled,
            credentials: Arc::new(GovernorLimiter::direct(credentials)),
            authenticated: Arc::new(GovernorLimiter::direct(authenticated)),
            anonymous: Arc::new(GovernorLimiter::direct(anonymous)),
        }
    }

    /// Take one cell from `bucket`
    pub fn check(&self, bucket: Bucket) -> AppResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let limiter = match bucket {
            Bucket::Credentials => &self.credentials,
            Bucket::Authenticated => &self.authenticated,
            Bucket::Anonymous => &self.anonymous,
        };

        limiter.check().map_err(|_| {
            tracing::warn!(bucket = bucket.as_str(), "rate limit exceeded");
            AppError::RateLimitExceeded
        })
    }
}

fn non_zero(value: u32, fallback: u32) -> NonZeroU32 {
    NonZeroU32::new(value)
        .or_else(|| NonZeroU32::new(fallback))
        .unwrap_or(NonZeroU32::MIN)
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bucket = Bucket::classify(
        request.method(),
        request.uri().path(),
        request.headers().contains_key(header::AUTHORIZATION),
    );

    ctx.rate_limiter.check(bucket)?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(burst_size: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            auth_rps: 1,
            authenticated_rps: 10,
            anonymous_rps: 5,
            burst_size,
        }
    }

    #[test]
    fn test_classification() {
        assert_eq!(
            Bucket::classify(&Method::POST, "/api/auth/login", false),
            Bucket::Credentials
        );
        assert_eq!(
            Bucket::classify(&Method::POST, "/api/blood-banks/login", true),
            Bucket::Credentials
        );
        assert_eq!(
            Bucket::classify(&Method::GET, "/api/events", true),
            Bucket::Authenticated
        );
        assert_eq!(
            Bucket::classify(&Method::GET, "/api/auth/login", false),
            Bucket::Anonymous
        );
    }

    #[test]
    fn test_burst_limit() {
        let limiter = RateLimiter::new(&config(5));

        for _ in 0..5 {
            assert!(limiter.check(Bucket::Authenticated).is_ok());
        }
        assert!(matches!(
            limiter.check(Bucket::Authenticated),
            Err(AppError::RateLimitExceeded)
        ));

        // Buckets are independent
        assert!(limiter.check(Bucket::Anonymous).is_ok());
    }

    #[test]
    fn test_disabled_limiter_never_rejects() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            ..config(1)
        });

        for _ in 0..100 {
            assert!(limiter.check(Bucket::Credentials).is_ok());
        }
    }
}
