/// Event storage rows
use crate::{
    blood::BloodType,
    error::AppResult,
    event::{Event, EventStatus, Registrant, Registration, RegistrationStatus},
};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Columns selected for an [`EventRow`]
pub const EVENT_COLUMNS: &str = "id, title, description, venue, city, start_time, end_time, \
    blood_bank_id, max_capacity, registered_count, status, reviewed_by, reviewed_at, \
    rejection_reason, created_at, updated_at";

/// Event record in the database
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub city: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub blood_bank_id: String,
    pub max_capacity: i64,
    pub registered_count: i64,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRow {
    pub fn into_event(self) -> AppResult<Event> {
        Ok(Event {
            status: EventStatus::from_str(&self.status)?,
            id: self.id,
            title: self.title,
            description: self.description,
            venue: self.venue,
            city: self.city,
            start_time: self.start_time,
            end_time: self.end_time,
            blood_bank_id: self.blood_bank_id,
            max_capacity: self.max_capacity,
            registered_count: self.registered_count,
            reviewed_by: self.reviewed_by,
            reviewed_at: self.reviewed_at,
            rejection_reason: self.rejection_reason,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Registration record in the database
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationRow {
    pub event_id: String,
    pub user_id: String,
    pub status: String,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationRow {
    pub fn into_registration(self) -> AppResult<Registration> {
        Ok(Registration {
            status: RegistrationStatus::from_str(&self.status)?,
            event_id: self.event_id,
            user_id: self.user_id,
            registered_at: self.registered_at,
            updated_at: self.updated_at,
        })
    }
}

/// Registration joined with the registrant's account
#[derive(Debug, Clone, FromRow)]
pub struct RegistrantRow {
    #[sqlx(flatten)]
    pub registration: RegistrationRow,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub blood_type: Option<String>,
}

impl RegistrantRow {
    pub fn into_registrant(self) -> AppResult<Registrant> {
        Ok(Registrant {
            registration: self.registration.into_registration()?,
            name: self.name,
            email: self.email,
            phone: self.phone,
            blood_type: self.blood_type.as_deref().map(BloodType::from_str).transpose()?,
        })
    }
}
