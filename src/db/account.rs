/// Account storage rows
use crate::{
    account::{Account, AccountAddress, Role},
    blood::BloodType,
    error::AppResult,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Columns selected for an [`AccountRow`]
pub const ACCOUNT_COLUMNS: &str = "id, name, email, password_hash, role, phone, blood_type, \
    date_of_birth, gender, street, city, state, zip_code, is_donor, is_available, \
    last_donation_date, is_active, last_login, created_at, updated_at";

/// Account record in the database
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub blood_type: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub is_donor: bool,
    pub is_available: bool,
    pub last_donation_date: Option<NaiveDate>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountRow {
    pub fn into_account(self) -> AppResult<Account> {
        Ok(Account {
            role: Role::from_str(&self.role)?,
            blood_type: self.blood_type.as_deref().map(BloodType::from_str).transpose()?,
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            phone: self.phone,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            address: AccountAddress {
                street: self.street,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
            },
            is_donor: self.is_donor,
            is_available: self.is_available,
            last_donation_date: self.last_donation_date,
            is_active: self.is_active,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
