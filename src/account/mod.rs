/// Account directory
///
/// Handles registration, login, bearer-token resolution, profiles, the donor
/// directory and admin account management.

mod manager;

pub use manager::AccountManager;

use crate::{
    blood::BloodType,
    error::{AppError, AppResult},
    validation,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Minimum gap between two whole-blood donations
pub const DONATION_INTERVAL_DAYS: i64 = 90;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(AppError::invalid_field("role", format!("Invalid role: {}", s))),
        }
    }
}

/// Postal address; every part optional for accounts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

/// Account record; the password hash never leaves the server
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub blood_type: Option<BloodType>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: AccountAddress,
    pub is_donor: bool,
    pub is_available: bool,
    pub last_donation_date: Option<NaiveDate>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether enough time has passed since the last recorded donation
    pub fn is_eligible_to_donate(&self, today: NaiveDate) -> bool {
        match self.last_donation_date {
            None => true,
            Some(last) => today - last >= Duration::days(DONATION_INTERVAL_DAYS),
        }
    }

    /// First day a new donation is allowed
    pub fn next_eligible_date(&self) -> Option<NaiveDate> {
        self.last_donation_date
            .map(|last| last + Duration::days(DONATION_INTERVAL_DAYS))
    }
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Name is required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be 6 to 128 characters"))]
    pub password: String,
    #[validate(custom(function = "validation::phone"))]
    pub phone: Option<String>,
    pub blood_type: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    #[serde(default)]
    pub address: AccountAddress,
    #[serde(default)]
    pub is_donor: bool,
}

/// Login request (shared by accounts and blood-bank staff)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: Account,
}

/// Profile update; only these fields can be changed by the account holder
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Name must not be empty"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: Option<String>,
    #[validate(custom(function = "validation::phone"))]
    pub phone: Option<String>,
    pub blood_type: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    #[validate(length(max = 20))]
    pub gender: Option<String>,
    pub address: Option<AccountAddress>,
    pub is_donor: Option<bool>,
    pub is_available: Option<bool>,
    pub last_donation_date: Option<NaiveDate>,
}

/// Password change request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, max = 128, message = "Password must be 6 to 128 characters"))]
    pub new_password: String,
}

/// Admin listing filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFilter {
    pub role: Option<String>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Donor directory filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorFilter {
    pub blood_type: Option<String>,
    pub city: Option<String>,
    pub eligible_only: Option<bool>,
    pub limit: Option<i64>,
}

/// Public view of a donor
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonorSummary {
    pub id: String,
    pub name: String,
    pub blood_type: Option<BloodType>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub last_donation_date: Option<NaiveDate>,
    pub eligible: bool,
    pub next_eligible_date: Option<NaiveDate>,
}

impl DonorSummary {
    pub fn from_account(account: &Account, today: NaiveDate) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            blood_type: account.blood_type,
            phone: account.phone.clone(),
            city: account.address.city.clone(),
            state: account.address.state.clone(),
            last_donation_date: account.last_donation_date,
            eligible: account.is_eligible_to_donate(today),
            next_eligible_date: account.next_eligible_date(),
        }
    }
}

/// Counts for the admin dashboard
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub total: i64,
    pub active: i64,
    pub admins: i64,
    pub donors: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with_last_donation(last: Option<NaiveDate>) -> Account {
        let now = Utc::now();
        Account {
            id: "a".into(),
            name: "Jane".into(),
            email: "jane@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::User,
            phone: None,
            blood_type: Some(BloodType::ONegative),
            date_of_birth: None,
            gender: None,
            address: AccountAddress::default(),
            is_donor: true,
            is_available: true,
            last_donation_date: last,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_eligibility_window() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        assert!(account_with_last_donation(None).is_eligible_to_donate(today));

        let recent = account_with_last_donation(NaiveDate::from_ymd_opt(2024, 4, 1));
        assert!(!recent.is_eligible_to_donate(today));
        assert_eq!(recent.next_eligible_date(), NaiveDate::from_ymd_opt(2024, 6, 30));

        let long_ago = account_with_last_donation(NaiveDate::from_ymd_opt(2024, 3, 3));
        assert!(long_ago.is_eligible_to_donate(today));
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(account_with_last_donation(None)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["bloodType"], "O-");
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            name: "  ".into(),
            email: "nope".into(),
            password: "123".into(),
            phone: None,
            blood_type: None,
            date_of_birth: None,
            gender: None,
            address: AccountAddress::default(),
            is_donor: false,
        };

        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
