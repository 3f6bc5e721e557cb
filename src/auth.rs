/// Authentication extractors
///
/// Resolve the bearer token on a request into a [`Principal`]. Account tokens
/// go to the account directory, blood-bank tokens to the bank registry.
use crate::{
    account::Account,
    actor::Actor,
    api::middleware::extract_bearer_token,
    blood_bank::BloodBank,
    context::AppContext,
    crypto::TokenKind,
    error::{AppError, AppResult},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Whoever presented the token
#[derive(Debug, Clone)]
pub enum Principal {
    Account(Account),
    BloodBank(BloodBank),
}

impl Principal {
    pub fn actor(&self) -> Actor {
        match self {
            Principal::Account(account) if account.is_admin() => Actor::Admin {
                id: account.id.clone(),
            },
            Principal::Account(account) => Actor::User {
                id: account.id.clone(),
            },
            Principal::BloodBank(bank) => Actor::BloodBank { id: bank.id.clone() },
        }
    }
}

/// Resolve a raw bearer token against the registry named by its `type` claim
pub async fn resolve_principal(ctx: &AppContext, token: &str) -> AppResult<Principal> {
    let claims = ctx.tokens.verify(token)?;

    let principal = match claims.kind {
        TokenKind::User => ctx
            .account_manager
            .verify_token(token)
            .await
            .map(Principal::Account),
        TokenKind::BloodBank => ctx
            .blood_bank_manager
            .verify_token(token)
            .await
            .map(Principal::BloodBank),
    };

    principal.map_err(|e| match e {
        AppError::NotFound(_) => {
            AppError::Authentication("Token subject no longer exists".to_string())
        }
        other => other,
    })
}

/// Any authenticated caller
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub principal: Principal,
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let principal = resolve_principal(state, &token).await?;
        let actor = principal.actor();

        Ok(AuthContext { principal, actor })
    }
}

/// Authenticated user or admin account (not blood-bank staff)
#[derive(Debug, Clone)]
pub struct UserAuthContext {
    pub account: Account,
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppContext> for UserAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthContext { principal, actor } = AuthContext::from_request_parts(parts, state).await?;

        match principal {
            Principal::Account(account) => Ok(UserAuthContext { account, actor }),
            Principal::BloodBank(_) => Err(AppError::Authorization(
                "This endpoint requires a user account".to_string(),
            )),
        }
    }
}

/// Authenticated admin account
#[derive(Debug, Clone)]
pub struct AdminAuthContext {
    pub account: Account,
    pub actor: Actor,
}

#[async_trait]
impl FromRequestParts<AppContext> for AdminAuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let UserAuthContext { account, actor } =
            UserAuthContext::from_request_parts(parts, state).await?;

        if !account.is_admin() {
            tracing::warn!(account = %account.id, "non-admin attempted admin endpoint");
            return Err(AppError::Authorization("Admin access required".to_string()));
        }

        Ok(AdminAuthContext { account, actor })
    }
}
