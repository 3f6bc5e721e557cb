/// Signed bearer tokens
///
/// Tokens are HS256 JWTs. The `type` claim separates account tokens from
/// blood-bank staff tokens so the auth layer knows which registry resolves
/// the subject.
use crate::{
    account::Role,
    error::{AppError, AppResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Which registry a token subject lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "bloodbank")]
    BloodBank,
}

/// JWT claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account or blood bank id
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies bearer tokens with one shared secret
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `sub` expiring after the configured lifetime
    pub fn issue(
        &self,
        sub: &str,
        email: &str,
        role: Option<Role>,
        kind: TokenKind,
    ) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            email: email.to_string(),
            role,
            kind,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify signature and expiry, returning the claims
    pub fn verify(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("token verification failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::InvalidToken("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::InvalidToken("Invalid token signature".to_string())
                    }
                    _ => AppError::InvalidToken("Malformed token".to_string()),
                }
            })
    }

    /// Verify a token and require it to be of `kind`
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> AppResult<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(AppError::InvalidToken("Wrong token type".to_string()));
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

    #[test]
    fn test_issue_and_verify() {
        let issuer = TokenIssuer::new(SECRET, Duration::hours(1));
        let token = issuer
            .issue("user-1", "jane@example.com", Some(Role::Admin), TokenKind::User)
            .unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "jane@example.com");
        assert_eq!(claims.role, Some(Role::Admin));
        assert_eq!(claims.kind, TokenKind::User);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_rejected() {
        let issuer = TokenIssuer::new(SECRET, Duration::hours(-2));
        let token = issuer
            .issue("user-1", "jane@example.com", None, TokenKind::User)
            .unwrap();

        match issuer.verify(&token) {
            Err(AppError::InvalidToken(msg)) => assert!(msg.contains("expired")),
            other => panic!("expected expiry failure, got {other:?}"),
        }
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let ours = TokenIssuer::new(SECRET, Duration::hours(1));
        let theirs = TokenIssuer::new("another-secret-key-that-is-long-enough!!", Duration::hours(1));
        let token = theirs
            .issue("user-1", "jane@example.com", None, TokenKind::User)
            .unwrap();

        assert!(matches!(ours.verify(&token), Err(AppError::InvalidToken(_))));
        assert!(matches!(ours.verify("garbage"), Err(AppError::InvalidToken(_))));
    }

    #[test]
    fn test_kind_discriminator() {
        let issuer = TokenIssuer::new(SECRET, Duration::hours(1));
        let token = issuer
            .issue("bank-1", "bank@example.com", None, TokenKind::BloodBank)
            .unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.kind, TokenKind::BloodBank);
        assert!(issuer.verify_kind(&token, TokenKind::BloodBank).is_ok());
        assert!(matches!(
            issuer.verify_kind(&token, TokenKind::User),
            Err(AppError::InvalidToken(_))
        ));
    }
}
