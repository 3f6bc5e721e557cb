/// Blood request storage rows
use crate::{
    blood::BloodType,
    error::AppResult,
    request::{BloodRequest, HistoryEntry, RequestStatus, Urgency},
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

/// Columns selected for a [`BloodRequestRow`]
pub const REQUEST_COLUMNS: &str = "id, requester_id, blood_bank_id, patient_name, blood_type, \
    units_required, urgency, hospital, contact_phone, reason, required_by, status, \
    created_at, updated_at";

/// Blood request record in the database
#[derive(Debug, Clone, FromRow)]
pub struct BloodRequestRow {
    pub id: String,
    pub requester_id: String,
    pub blood_bank_id: String,
    pub patient_name: String,
    pub blood_type: String,
    pub units_required: i64,
    pub urgency: String,
    pub hospital: Option<String>,
    pub contact_phone: String,
    pub reason: Option<String>,
    pub required_by: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BloodRequestRow {
    /// Convert without history; callers attach it when needed
    pub fn into_request(self) -> AppResult<BloodRequest> {
        Ok(BloodRequest {
            blood_type: BloodType::from_str(&self.blood_type)?,
            urgency: Urgency::from_str(&self.urgency)?,
            status: RequestStatus::from_str(&self.status)?,
            id: self.id,
            requester_id: self.requester_id,
            blood_bank_id: self.blood_bank_id,
            patient_name: self.patient_name,
            units_required: self.units_required,
            hospital: self.hospital,
            contact_phone: self.contact_phone,
            reason: self.reason,
            required_by: self.required_by,
            history: Vec::new(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// History record in the database
#[derive(Debug, Clone, FromRow)]
pub struct HistoryRow {
    pub status: String,
    pub note: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

impl HistoryRow {
    pub fn into_entry(self) -> AppResult<HistoryEntry> {
        Ok(HistoryEntry {
            status: RequestStatus::from_str(&self.status)?,
            note: self.note,
            changed_by: self.changed_by,
            changed_at: self.changed_at,
        })
    }
}

/// Append a history entry on an open transaction
pub async fn append_history(
    conn: &mut sqlx::SqliteConnection,
    request_id: &str,
    status: RequestStatus,
    note: Option<&str>,
    changed_by: &str,
    changed_at: DateTime<Utc>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO blood_request_history (request_id, status, note, changed_by, changed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(request_id)
    .bind(status.as_str())
    .bind(note)
    .bind(changed_by)
    .bind(changed_at)
    .execute(conn)
    .await?;
    Ok(())
}
