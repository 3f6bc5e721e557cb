/// Who is performing an operation
///
/// Registries take an `Actor` instead of a raw principal so authorization
/// rules do not depend on the HTTP layer.
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    User { id: String },
    Admin { id: String },
    BloodBank { id: String },
}

impl Actor {
    pub fn id(&self) -> &str {
        match self {
            Actor::User { id } | Actor::Admin { id } | Actor::BloodBank { id } => id,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin { .. })
    }

    /// True for the staff of `bank_id`
    pub fn is_bank(&self, bank_id: &str) -> bool {
        matches!(self, Actor::BloodBank { id } if id == bank_id)
    }

    /// Account id for user and admin actors
    pub fn account_id(&self) -> Option<&str> {
        match self {
            Actor::User { id } | Actor::Admin { id } => Some(id),
            Actor::BloodBank { .. } => None,
        }
    }

    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Admin access required".to_string()))
        }
    }

    /// Bank staff of `bank_id`, or an admin
    pub fn require_bank_or_admin(&self, bank_id: &str) -> AppResult<()> {
        if self.is_admin() || self.is_bank(bank_id) {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Only this blood bank or an admin may do that".to_string(),
            ))
        }
    }

    /// Label used in history and audit fields
    pub fn label(&self) -> String {
        match self {
            Actor::User { id } => format!("user:{}", id),
            Actor::Admin { id } => format!("admin:{}", id),
            Actor::BloodBank { id } => format!("bloodbank:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_or_admin() {
        let admin = Actor::Admin { id: "a1".into() };
        let bank = Actor::BloodBank { id: "b1".into() };
        let other_bank = Actor::BloodBank { id: "b2".into() };
        let user = Actor::User { id: "u1".into() };

        assert!(admin.require_bank_or_admin("b1").is_ok());
        assert!(bank.require_bank_or_admin("b1").is_ok());
        assert!(matches!(
            other_bank.require_bank_or_admin("b1"),
            Err(AppError::Authorization(_))
        ));
        assert!(user.require_bank_or_admin("b1").is_err());
        assert!(user.require_admin().is_err());
    }

    #[test]
    fn test_account_id() {
        assert_eq!(Actor::User { id: "u1".into() }.account_id(), Some("u1"));
        assert_eq!(Actor::BloodBank { id: "b1".into() }.account_id(), None);
        assert_eq!(Actor::BloodBank { id: "b1".into() }.label(), "bloodbank:b1");
    }
}
