/// Contact message registry
///
/// Public contact-form intake and the admin triage queue.

mod manager;

pub use manager::ContactManager;

use crate::{
    error::{AppError, AppResult},
    validation,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Triage state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactStatus {
    Pending,
    InProgress,
    Resolved,
    Closed,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Pending => "pending",
            ContactStatus::InProgress => "in-progress",
            ContactStatus::Resolved => "resolved",
            ContactStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ContactStatus::Pending),
            "in-progress" => Ok(ContactStatus::InProgress),
            "resolved" => Ok(ContactStatus::Resolved),
            "closed" => Ok(ContactStatus::Closed),
            _ => Err(AppError::InvalidStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn from_str(s: &str) -> AppResult<Self> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(AppError::invalid_field(
                "priority",
                format!("Invalid priority: {}", s),
            )),
        }
    }
}

/// Admin note on a message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactNote {
    pub author_id: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// Contact-form message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,
    pub priority: Priority,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub notes: Vec<ContactNote>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact form submission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitContactRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Name is required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(max = 20, message = "Phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(length(min = 5, max = 200, message = "Subject must be 5 to 200 characters"))]
    pub subject: String,
    #[validate(length(min = 10, max = 2000, message = "Message must be 10 to 2000 characters"))]
    pub message: String,
    pub priority: Option<String>,
}

impl SubmitContactRequest {
    /// Trim text fields so length rules apply to the visible content
    pub fn trimmed(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: validation::clean_optional(self.phone),
            subject: self.subject.trim().to_string(),
            message: self.message.trim().to_string(),
            priority: validation::clean_optional(self.priority),
        }
    }
}

/// Status and/or priority change
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContactStatusRequest {
    pub status: Option<String>,
    pub priority: Option<String>,
}

/// New admin note
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddNoteRequest {
    #[validate(
        custom(function = "validation::not_blank", message = "Note must not be empty"),
        length(max = 2000, message = "Note must be at most 2000 characters")
    )]
    pub note: String,
}

/// Triage listing filter
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub unread_only: Option<bool>,
}

/// Counts per status plus unread
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactStats {
    pub total: i64,
    pub unread: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub resolved: i64,
    pub closed: i64,
}
