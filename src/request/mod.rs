/// Blood request registry
///
/// Requests raised by users against a blood bank. Every status change is
/// appended to the request's history; urgent requests notify the bank.

mod manager;

pub use manager::BloodRequestManager;

use crate::{
    blood::BloodType,
    error::{AppError, AppResult},
    validation,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How soon the blood is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Urgent,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            "urgent" => Ok(Urgency::Urgent),
            _ => Err(AppError::invalid_field(
                "urgency",
                format!("Invalid urgency: {}", s),
            )),
        }
    }
}

/// Lifecycle of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Fulfilled => "fulfilled",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            "fulfilled" => Ok(RequestStatus::Fulfilled),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(AppError::InvalidStatus(s.to_string())),
        }
    }

    /// Rejected, fulfilled and cancelled requests are closed
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Fulfilled | RequestStatus::Cancelled
        )
    }
}

/// One entry of the append-only status log
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub status: RequestStatus,
    pub note: Option<String>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Blood request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodRequest {
    pub id: String,
    pub requester_id: String,
    pub blood_bank_id: String,
    pub patient_name: String,
    pub blood_type: BloodType,
    pub units_required: i64,
    pub urgency: Urgency,
    pub hospital: Option<String>,
    pub contact_phone: String,
    pub reason: Option<String>,
    pub required_by: Option<NaiveDate>,
    pub status: RequestStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New request
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBloodRequest {
    #[validate(custom(function = "validation::not_blank", message = "Blood bank is required"))]
    pub blood_bank_id: String,
    #[validate(
        custom(function = "validation::not_blank", message = "Patient name is required"),
        length(max = 100, message = "Patient name must be at most 100 characters")
    )]
    pub patient_name: String,
    pub blood_type: String,
    #[validate(range(min = 1, max = 100, message = "Units required must be between 1 and 100"))]
    pub units_required: i64,
    pub urgency: Option<String>,
    #[validate(length(max = 200))]
    pub hospital: Option<String>,
    #[validate(custom(function = "validation::phone"))]
    pub contact_phone: String,
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
    pub required_by: Option<NaiveDate>,
}

/// Edit of a pending request; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBloodRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Patient name must not be empty"),
        length(max = 100, message = "Patient name must be at most 100 characters")
    )]
    pub patient_name: Option<String>,
    pub blood_type: Option<String>,
    #[validate(range(min = 1, max = 100, message = "Units required must be between 1 and 100"))]
    pub units_required: Option<i64>,
    pub urgency: Option<String>,
    #[validate(length(max = 200))]
    pub hospital: Option<String>,
    #[validate(custom(function = "validation::phone"))]
    pub contact_phone: Option<String>,
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
    pub required_by: Option<NaiveDate>,
}

/// Status change by the bank or an admin
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StatusUpdateRequest {
    pub status: String,
    #[validate(length(max = 1000, message = "Note must be at most 1000 characters"))]
    pub note: Option<String>,
}

/// Listing filter for banks and admins
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub status: Option<String>,
    pub urgency: Option<String>,
    pub blood_type: Option<String>,
}

/// Counts for the admin dashboard
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub total: i64,
    pub pending: i64,
    pub urgent_open: i64,
    pub fulfilled: i64,
}
