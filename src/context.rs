/// Application context and dependency injection
use crate::{
    account::AccountManager,
    blood_bank::BloodBankManager,
    config::ServerConfig,
    contact::ContactManager,
    crypto::TokenIssuer,
    db::Database,
    error::AppResult,
    event::EventManager,
    rate_limit::RateLimiter,
    request::BloodRequestManager,
};
use chrono::Duration;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: Database,
    pub tokens: Arc<TokenIssuer>,
    pub account_manager: Arc<AccountManager>,
    pub blood_bank_manager: Arc<BloodBankManager>,
    pub event_manager: Arc<EventManager>,
    pub request_manager: Arc<BloodRequestManager>,
    pub contact_manager: Arc<ContactManager>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Open the configured database and build every service on top of it
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;
        let db = Database::open(&config.storage).await?;
        Ok(Self::with_database(config, db))
    }

    /// Build the services around an already opened database
    pub fn with_database(config: ServerConfig, db: Database) -> Self {
        let tokens = Arc::new(TokenIssuer::new(
            &config.authentication.jwt_secret,
            Duration::hours(config.authentication.token_ttl_hours),
        ));

        let account_manager = Arc::new(AccountManager::new(db.clone(), tokens.clone()));
        let blood_bank_manager = Arc::new(BloodBankManager::new(db.clone(), tokens.clone()));
        let event_manager = Arc::new(EventManager::new(db.clone()));
        let request_manager = Arc::new(BloodRequestManager::new(db.clone()));
        let contact_manager = Arc::new(ContactManager::new(db.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        Self {
            config: Arc::new(config),
            db,
            tokens,
            account_manager,
            blood_bank_manager,
            event_manager,
            request_manager,
            contact_manager,
            rate_limiter,
        }
    }
}
