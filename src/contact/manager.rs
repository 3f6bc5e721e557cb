/// Contact message manager implementation
use crate::{
    contact::{
        ContactFilter, ContactMessage, ContactNote, ContactStats, ContactStatus, Priority,
        SubmitContactRequest,
    },
    db::{
        contact::{ContactMessageRow, NoteRow, CONTACT_COLUMNS},
        Database,
    },
    error::{AppError, AppResult},
    validation::normalize_email,
};
use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Triage filter shared by the message query and its notes query
const LIST_FILTER: &str = "(?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR priority = ?2)
               AND (?3 = 0 OR is_read = 0)";

/// Contact message manager service
pub struct ContactManager {
    db: Database,
}

impl ContactManager {
    /// Create a new contact manager
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a contact-form submission
    #[tracing::instrument(skip(self, req))]
    pub async fn submit(&self, req: SubmitContactRequest) -> AppResult<ContactMessage> {
        let req = req.trimmed();
        req.validate()?;

        let priority = req
            .priority
            .as_deref()
            .map(Priority::from_str)
            .transpose()?
            .unwrap_or(Priority::Medium);

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO contact_message (id, name, email, phone, subject, message, status,
                 priority, is_read, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, 0, ?8, ?8)",
        )
        .bind(&id)
        .bind(&req.name)
        .bind(normalize_email(&req.email))
        .bind(&req.phone)
        .bind(&req.subject)
        .bind(&req.message)
        .bind(priority.as_str())
        .bind(now)
        .execute(self.db.pool())
        .await?;

        tracing::info!(message_id = %id, priority = priority.as_str(), "contact message received");

        self.get(&id).await
    }

    /// Message with its notes
    pub async fn get(&self, id: &str) -> AppResult<ContactMessage> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contact_message WHERE id = ?1");
        let row = sqlx::query_as::<_, ContactMessageRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Contact message not found".to_string()))?;

        let notes = sqlx::query_as::<_, NoteRow>(
            "SELECT message_id, author_id, note, created_at FROM contact_note
             WHERE message_id = ?1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        row.into_message(notes.into_iter().map(ContactNote::from).collect())
    }

    /// Triage queue, newest first
    pub async fn list(&self, filter: ContactFilter) -> AppResult<Vec<ContactMessage>> {
        let status = filter.status.as_deref().map(ContactStatus::from_str).transpose()?;
        let priority = filter.priority.as_deref().map(Priority::from_str).transpose()?;

        let sql = format!(
            "SELECT {CONTACT_COLUMNS} FROM contact_message
             WHERE {LIST_FILTER}
             ORDER BY created_at DESC"
        );
        let status = status.map(|s| s.as_str());
        let priority = priority.map(|p| p.as_str());
        let unread_only = filter.unread_only.unwrap_or(false);

        let rows = sqlx::query_as::<_, ContactMessageRow>(&sql)
            .bind(status)
            .bind(priority)
            .bind(unread_only)
            .fetch_all(self.db.pool())
            .await?;

        let mut notes: HashMap<String, Vec<ContactNote>> = HashMap::new();
        if !rows.is_empty() {
            let notes_sql = format!(
                "SELECT message_id, author_id, note, created_at FROM contact_note
                 WHERE message_id IN (SELECT id FROM contact_message WHERE {LIST_FILTER})
                 ORDER BY id"
            );
            let note_rows = sqlx::query_as::<_, NoteRow>(&notes_sql)
                .bind(status)
                .bind(priority)
                .bind(unread_only)
                .fetch_all(self.db.pool())
                .await?;
            for row in note_rows {
                notes
                    .entry(row.message_id.clone())
                    .or_default()
                    .push(ContactNote::from(row));
            }
        }

        rows.into_iter()
            .map(|row| {
                let message_notes = notes.remove(&row.id).unwrap_or_default();
                row.into_message(message_notes)
            })
            .collect()
    }

    /// Mark a message read; the first `read_at` is kept
    pub async fn mark_read(&self, id: &str) -> AppResult<ContactMessage> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE contact_message
             SET is_read = 1,
                 read_at = COALESCE(read_at, ?1),
                 updated_at = CASE WHEN is_read = 1 THEN updated_at ELSE ?1 END
             WHERE id = ?2",
        )
        .bind(now)
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Contact message not found".to_string()));
        }

        self.get(id).await
    }

    /// Attach an admin note
    pub async fn add_note(&self, id: &str, admin_id: &str, note: &str) -> AppResult<ContactMessage> {
        let note = note.trim();
        if note.is_empty() {
            return Err(AppError::invalid_field("note", "Note must not be empty"));
        }

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let touched =
            sqlx::query("UPDATE contact_message SET updated_at = ?1 WHERE id = ?2")
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if touched.rows_affected() == 0 {
            return Err(AppError::NotFound("Contact message not found".to_string()));
        }

        sqlx::query(
            "INSERT INTO contact_note (message_id, author_id, note, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(admin_id)
        .bind(note)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(message_id = %id, admin_id = %admin_id, "contact note added");
        self.get(id).await
    }

    /// Change status and/or priority; other fields are untouched
    pub async fn update_status(
        &self,
        id: &str,
        status: Option<&str>,
        priority: Option<&str>,
    ) -> AppResult<ContactMessage> {
        let status = status.map(ContactStatus::from_str).transpose()?;
        let priority = priority.map(Priority::from_str).transpose()?;
        if status.is_none() && priority.is_none() {
            return Err(AppError::validation("Provide a status or a priority"));
        }

        let result = sqlx::query(
            "UPDATE contact_message
             SET status = COALESCE(?1, status), priority = COALESCE(?2, priority), updated_at = ?3
             WHERE id = ?4",
        )
        .bind(status.map(|s| s.as_str()))
        .bind(priority.map(|p| p.as_str()))
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Contact message not found".to_string()));
        }

        tracing::info!(
            message_id = %id,
            status = status.map(|s| s.as_str()),
            priority = priority.map(|p| p.as_str()),
            "contact message triaged"
        );
        self.get(id).await
    }

    /// Delete a message and its notes
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM contact_message WHERE id = ?1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Contact message not found".to_string()));
        }
        Ok(())
    }

    /// Counts per status plus unread
    pub async fn stats(&self) -> AppResult<ContactStats> {
        let (total, unread, pending, in_progress, resolved, closed): (i64, i64, i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT COUNT(*),
                        COALESCE(SUM(is_read = 0), 0),
                        COALESCE(SUM(status = 'pending'), 0),
                        COALESCE(SUM(status = 'in-progress'), 0),
                        COALESCE(SUM(status = 'resolved'), 0),
                        COALESCE(SUM(status = 'closed'), 0)
                 FROM contact_message",
            )
            .fetch_one(self.db.pool())
            .await?;

        Ok(ContactStats {
            total,
            unread,
            pending,
            in_progress,
            resolved,
            closed,
        })
    }
}
