/// Configuration management for Bloodlink
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub bootstrap: Option<BootstrapAdminConfig>,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(AppError::validation(format!("Invalid environment: {}", s))),
        }
    }
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub environment: Environment,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens
    pub token_ttl_hours: i64,
}

/// First administrator, created on startup when absent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdminConfig {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Login/registration attempts per second
    pub auth_rps: u32,
    pub authenticated_rps: u32,
    pub anonymous_rps: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth_rps: 5,
            authenticated_rps: 100,
            anonymous_rps: 20,
            burst_size: 50,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("BLOODLINK_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("BLOODLINK_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| AppError::validation("Invalid port number"))?;
        let environment = Environment::from_str(
            &env::var("BLOODLINK_ENV").unwrap_or_else(|_| "development".to_string()),
        )?;

        let database_path = env::var("BLOODLINK_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/bloodlink.sqlite"));
        let max_connections = env::var("BLOODLINK_DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let jwt_secret = env::var("BLOODLINK_JWT_SECRET")
            .map_err(|_| AppError::validation("JWT secret required"))?;
        let token_ttl_hours = env::var("BLOODLINK_TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "168".to_string())
            .parse()
            .unwrap_or(168);

        let bootstrap = match (
            env::var("BLOODLINK_ADMIN_EMAIL"),
            env::var("BLOODLINK_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapAdminConfig {
                email,
                password,
                name: env::var("BLOODLINK_ADMIN_NAME")
                    .unwrap_or_else(|_| "Administrator".to_string()),
            }),
            _ => None,
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            enabled: env::var("BLOODLINK_RATE_LIMITS_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            auth_rps: parse_or("BLOODLINK_RATE_LIMIT_AUTH_RPS", defaults.auth_rps),
            authenticated_rps: parse_or(
                "BLOODLINK_RATE_LIMIT_AUTHENTICATED_RPS",
                defaults.authenticated_rps,
            ),
            anonymous_rps: parse_or("BLOODLINK_RATE_LIMIT_ANONYMOUS_RPS", defaults.anonymous_rps),
            burst_size: parse_or("BLOODLINK_RATE_LIMIT_BURST", defaults.burst_size),
        };

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let json = env::var("BLOODLINK_LOG_JSON")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                environment,
            },
            storage: StorageConfig {
                database_path,
                max_connections,
            },
            authentication: AuthConfig {
                jwt_secret,
                token_ttl_hours,
            },
            bootstrap,
            rate_limit,
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::validation("Hostname cannot be empty"));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::validation(
                "JWT secret must be at least 32 characters",
            ));
        }

        if self.authentication.token_ttl_hours <= 0 {
            return Err(AppError::validation("Token lifetime must be positive"));
        }

        if self.storage.max_connections == 0 {
            return Err(AppError::validation("Database pool needs at least one connection"));
        }

        if let Some(admin) = &self.bootstrap {
            if admin.password.len() < 8 {
                return Err(AppError::validation(
                    "Bootstrap admin password must be at least 8 characters",
                ));
            }
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.service.environment == Environment::Development
    }

    /// Configuration for tests: in-memory database, fixed secret
    #[cfg(test)]
    pub fn for_tests() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 5000,
                environment: Environment::Production,
            },
            storage: StorageConfig {
                database_path: PathBuf::from(":memory:"),
                max_connections: 1,
            },
            authentication: AuthConfig {
                jwt_secret: "test-secret-key-for-testing-only-0123456789".to_string(),
                token_ttl_hours: 168,
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
}

fn parse_or(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
