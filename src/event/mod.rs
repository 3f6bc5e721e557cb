/// Event registry
///
/// Blood drives organised by a blood bank. Events go through an admin review
/// (pending, then approved or rejected) and only approved, unfinished events
/// accept registrations, bounded by `max_capacity`.

mod manager;

pub use manager::EventManager;

use crate::{
    blood::BloodType,
    error::{AppError, AppResult},
    validation,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Review state of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Pending => "pending",
            EventStatus::Approved => "approved",
            EventStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(EventStatus::Pending),
            "approved" => Ok(EventStatus::Approved),
            "rejected" => Ok(EventStatus::Rejected),
            _ => Err(AppError::InvalidStatus(s.to_string())),
        }
    }

    /// Review transitions: pending to approved or rejected
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Pending, EventStatus::Approved) | (EventStatus::Pending, EventStatus::Rejected)
        )
    }
}

/// State of one user's registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Confirmed,
    Cancelled,
    Attended,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Confirmed => "confirmed",
            RegistrationStatus::Cancelled => "cancelled",
            RegistrationStatus::Attended => "attended",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s {
            "confirmed" => Ok(RegistrationStatus::Confirmed),
            "cancelled" => Ok(RegistrationStatus::Cancelled),
            "attended" => Ok(RegistrationStatus::Attended),
            _ => Err(AppError::InvalidStatus(s.to_string())),
        }
    }
}

/// Blood drive
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
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
    pub status: EventStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn available_spots(&self) -> i64 {
        (self.max_capacity - self.registered_count).max(0)
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}

/// A user's registration for an event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub event_id: String,
    pub user_id: String,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registrant as seen by the organizer
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registrant {
    #[serde(flatten)]
    pub registration: Registration,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub blood_type: Option<BloodType>,
}

/// A registration together with its event, for "my events"
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRegistration {
    #[serde(flatten)]
    pub registration: Registration,
    pub event: Event,
}

/// Event creation request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Title is required"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: String,
    #[validate(custom(function = "validation::not_blank", message = "Venue is required"))]
    pub venue: String,
    pub city: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 1, max = 100000, message = "Capacity must be between 1 and 100000"))]
    pub max_capacity: i64,
    /// Organizer; only used when an admin creates the event
    pub blood_bank_id: Option<String>,
}

/// Event edit; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Title must not be empty"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,
    #[validate(custom(function = "validation::not_blank", message = "Venue must not be empty"))]
    pub venue: Option<String>,
    pub city: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 100000, message = "Capacity must be between 1 and 100000"))]
    pub max_capacity: Option<i64>,
    /// Admin only
    pub status: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Rejection request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RejectEventRequest {
    #[validate(custom(function = "validation::not_blank", message = "A rejection reason is required"))]
    pub reason: String,
}

/// Listing filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFilter {
    pub status: Option<String>,
    pub blood_bank_id: Option<String>,
    pub city: Option<String>,
    pub upcoming_only: Option<bool>,
}

/// Counts for the admin dashboard
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub upcoming: i64,
    pub active_registrations: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_transitions() {
        use EventStatus::*;

        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(EventStatus::from_str("Approved").unwrap(), EventStatus::Approved);
        assert!(matches!(
            EventStatus::from_str("archived"),
            Err(AppError::InvalidStatus(_))
        ));
    }
}
