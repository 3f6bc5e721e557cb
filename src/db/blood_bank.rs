/// Blood bank storage rows
use crate::{
    blood::{BloodStock, BloodType},
    blood_bank::{BankAddress, BankNotification, BloodBank, GeoPoint, OperatingHours},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Columns selected for a [`BloodBankRow`]
pub const BLOOD_BANK_COLUMNS: &str = "id, name, email, password_hash, license_number, phone, \
    website, street, city, state, zip_code, longitude, latitude, operating_hours, \
    stock_o_pos, stock_o_neg, stock_a_pos, stock_a_neg, stock_b_pos, stock_b_neg, \
    stock_ab_pos, stock_ab_neg, is_verified, is_active, profile_completed, \
    last_stock_update, last_login, created_at, updated_at";

pub const NOTIFICATION_COLUMNS: &str =
    "id, blood_bank_id, request_id, kind, message, is_read, created_at";

/// Blood bank record in the database
#[derive(Debug, Clone, FromRow)]
pub struct BloodBankRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub license_number: String,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub longitude: f64,
    pub latitude: f64,
    /// JSON encoded [`OperatingHours`]
    pub operating_hours: String,
    pub stock_o_pos: i64,
    pub stock_o_neg: i64,
    pub stock_a_pos: i64,
    pub stock_a_neg: i64,
    pub stock_b_pos: i64,
    pub stock_b_neg: i64,
    pub stock_ab_pos: i64,
    pub stock_ab_neg: i64,
    pub is_verified: bool,
    pub is_active: bool,
    pub profile_completed: bool,
    pub last_stock_update: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored units as a stock level; the schema keeps them non-negative
pub fn units_from_column(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

impl BloodBankRow {
    fn stock(&self) -> BloodStock {
        let mut stock = BloodStock::default();
        for (blood_type, units) in [
            (BloodType::OPositive, self.stock_o_pos),
            (BloodType::ONegative, self.stock_o_neg),
            (BloodType::APositive, self.stock_a_pos),
            (BloodType::ANegative, self.stock_a_neg),
            (BloodType::BPositive, self.stock_b_pos),
            (BloodType::BNegative, self.stock_b_neg),
            (BloodType::AbPositive, self.stock_ab_pos),
            (BloodType::AbNegative, self.stock_ab_neg),
        ] {
            stock.set(blood_type, units_from_column(units));
        }
        stock
    }

    pub fn into_blood_bank(self) -> AppResult<BloodBank> {
        let operating_hours: OperatingHours = serde_json::from_str(&self.operating_hours)
            .map_err(|e| {
                AppError::Internal(format!(
                    "Stored operating hours of blood bank {} are corrupt: {}",
                    self.id, e
                ))
            })?;
        let stock = self.stock();

        Ok(BloodBank {
            id: self.id,
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            license_number: self.license_number,
            phone: self.phone,
            website: self.website,
            address: BankAddress {
                street: self.street,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
            },
            location: GeoPoint {
                lng: self.longitude,
                lat: self.latitude,
            },
            operating_hours,
            stock,
            is_verified: self.is_verified,
            is_active: self.is_active,
            profile_completed: self.profile_completed,
            last_stock_update: self.last_stock_update,
            last_login: self.last_login,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Notification record in the database
#[derive(Debug, Clone, FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub blood_bank_id: String,
    pub request_id: Option<String>,
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for BankNotification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            blood_bank_id: row.blood_bank_id,
            request_id: row.request_id,
            kind: row.kind,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        }
    }
}

/// Serialize operating hours for the `operating_hours` column
pub fn encode_hours(hours: &OperatingHours) -> AppResult<String> {
    serde_json::to_string(hours)
        .map_err(|e| AppError::Internal(format!("Failed to encode operating hours: {}", e)))
}

/// Write an inbox entry for a bank on an open connection or transaction
pub async fn insert_notification(
    conn: &mut sqlx::SqliteConnection,
    blood_bank_id: &str,
    request_id: Option<&str>,
    kind: &str,
    message: &str,
) -> AppResult<String> {
    let id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO bank_notification (id, blood_bank_id, request_id, kind, message, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
    )
    .bind(&id)
    .bind(blood_bank_id)
    .bind(request_id)
    .bind(kind)
    .bind(message)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(id)
}
