/// Contact message storage rows
use crate::{
    contact::{ContactMessage, ContactNote, ContactStatus, Priority},
    error::AppResult,
};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Columns selected for a [`ContactMessageRow`]
pub const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, status, priority, \
    is_read, read_at, created_at, updated_at";

/// Contact message record in the database
#[derive(Debug, Clone, FromRow)]
pub struct ContactMessageRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub priority: String,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactMessageRow {
    pub fn into_message(self, notes: Vec<ContactNote>) -> AppResult<ContactMessage> {
        Ok(ContactMessage {
            status: ContactStatus::from_str(&self.status)?,
            priority: Priority::from_str(&self.priority)?,
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            subject: self.subject,
            message: self.message,
            is_read: self.is_read,
            read_at: self.read_at,
            notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Note record in the database
#[derive(Debug, Clone, FromRow)]
pub struct NoteRow {
    pub message_id: String,
    pub author_id: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl From<NoteRow> for ContactNote {
    fn from(row: NoteRow) -> Self {
        Self {
            author_id: row.author_id,
            note: row.note,
            created_at: row.created_at,
        }
    }
}
