/// Event manager implementation
use crate::{
    actor::Actor,
    db::{
        event::{EventRow, RegistrantRow, RegistrationRow, EVENT_COLUMNS},
        Database,
    },
    error::{AppError, AppResult},
    event::{
        CreateEventRequest, Event, EventFilter, EventStats, EventStatus, Registrant,
        Registration, RegistrationStatus, UpdateEventRequest, UserRegistration,
    },
    metrics,
    validation::clean_optional,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Event manager service
pub struct EventManager {
    db: Database,
}

impl EventManager {
    /// Create a new event manager
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a pending event
    ///
    /// Bank staff organize their own events; an admin has to name the bank.
    #[tracing::instrument(skip(self, actor, req), fields(actor = %actor.label()))]
    pub async fn create(&self, actor: &Actor, req: CreateEventRequest) -> AppResult<Event> {
        req.validate()?;

        let organizer = match actor {
            Actor::BloodBank { id } => id.clone(),
            Actor::Admin { .. } => clean_optional(req.blood_bank_id.clone()).ok_or_else(|| {
                AppError::invalid_field("bloodBankId", "Admins must name the organizing blood bank")
            })?,
            Actor::User { .. } => {
                return Err(AppError::Authorization(
                    "Only blood banks and admins can create events".to_string(),
                ))
            }
        };

        let now = Utc::now();
        validate_schedule(req.start_time, req.end_time, now)?;
        self.ensure_active_bank(&organizer).await?;

        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO event (id, title, description, venue, city, start_time, end_time,
                 blood_bank_id, max_capacity, registered_count, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 'pending', ?10, ?10)",
        )
        .bind(&id)
        .bind(req.title.trim())
        .bind(req.description.trim())
        .bind(req.venue.trim())
        .bind(clean_optional(req.city))
        .bind(req.start_time)
        .bind(req.end_time)
        .bind(&organizer)
        .bind(req.max_capacity)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        tracing::info!(event_id = %id, blood_bank_id = %organizer, "event created");

        self.get(&id).await
    }

    async fn ensure_active_bank(&self, bank_id: &str) -> AppResult<()> {
        let active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM blood_bank WHERE id = ?1")
                .bind(bank_id)
                .fetch_optional(self.db.pool())
                .await?;

        match active {
            Some(true) => Ok(()),
            _ => Err(AppError::NotFound("Blood bank not found".to_string())),
        }
    }

    /// Get event by id
    pub async fn get(&self, id: &str) -> AppResult<Event> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM event WHERE id = ?1");
        sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?
            .into_event()
    }

    /// Event as seen by `viewer`
    ///
    /// Unapproved events are only visible to their organizer and admins.
    pub async fn get_visible(&self, viewer: Option<&Actor>, id: &str) -> AppResult<Event> {
        let event = self.get(id).await?;
        let privileged =
            viewer.is_some_and(|actor| actor.is_admin() || actor.is_bank(&event.blood_bank_id));

        if event.status != EventStatus::Approved && !privileged {
            return Err(AppError::NotFound("Event not found".to_string()));
        }
        Ok(event)
    }

    /// Register a user for an approved, unfinished event
    ///
    /// The capacity claim and the registration row are written in one
    /// transaction. The claim is a conditional increment, so concurrent
    /// registrations cannot push `registered_count` past `max_capacity`.
    #[tracing::instrument(skip(self))]
    pub async fn register(&self, event_id: &str, user_id: &str) -> AppResult<Registration> {
        let event = self.get(event_id).await?;
        let now = Utc::now();

        if event.status != EventStatus::Approved {
            metrics::record_registration("closed");
            return Err(AppError::RegistrationClosed(
                "Event is not open for registration".to_string(),
            ));
        }
        if event.has_ended(now) {
            metrics::record_registration("closed");
            return Err(AppError::RegistrationClosed("Event has already ended".to_string()));
        }

        if let Some(existing) = self.registration(event_id, user_id).await? {
            if existing.status != RegistrationStatus::Cancelled {
                metrics::record_registration("duplicate");
                return Err(AppError::AlreadyRegistered);
            }
        }

        let mut tx = self.db.pool().begin().await?;

        // Write first so the transaction holds the write lock from the start
        let claimed = sqlx::query(
            "UPDATE event SET registered_count = registered_count + 1, updated_at = ?1
             WHERE id = ?2 AND status = 'approved' AND registered_count < max_capacity",
        )
        .bind(now)
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            metrics::record_registration("full");
            return Err(AppError::EventFull);
        }

        let inserted = sqlx::query(
            "INSERT INTO event_registration (event_id, user_id, status, registered_at, updated_at)
             VALUES (?1, ?2, 'confirmed', ?3, ?3)
             ON CONFLICT(event_id, user_id) DO UPDATE
                 SET status = 'confirmed', registered_at = excluded.registered_at,
                     updated_at = excluded.updated_at
                 WHERE event_registration.status = 'cancelled'",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            // Dropping the transaction rolls the capacity claim back
            metrics::record_registration("duplicate");
            return Err(AppError::AlreadyRegistered);
        }

        tx.commit().await?;

        metrics::record_registration("confirmed");
        tracing::info!(event_id = %event_id, user_id = %user_id, "registration confirmed");

        Ok(Registration {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            status: RegistrationStatus::Confirmed,
            registered_at: now,
            updated_at: now,
        })
    }

    /// Cancel a user's registration and free the spot
    #[tracing::instrument(skip(self))]
    pub async fn unregister(&self, event_id: &str, user_id: &str) -> AppResult<()> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let cancelled = sqlx::query(
            "UPDATE event_registration SET status = 'cancelled', updated_at = ?1
             WHERE event_id = ?2 AND user_id = ?3 AND status = 'confirmed'",
        )
        .bind(now)
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if cancelled.rows_affected() == 0 {
            let status: Option<String> = sqlx::query_scalar(
                "SELECT status FROM event_registration WHERE event_id = ?1 AND user_id = ?2",
            )
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

            return Err(match status.as_deref() {
                Some("attended") => {
                    AppError::Conflict("Attendance has already been recorded".to_string())
                }
                _ => AppError::NotRegistered,
            });
        }

        sqlx::query(
            "UPDATE event SET registered_count = MAX(0, registered_count - 1), updated_at = ?1
             WHERE id = ?2",
        )
        .bind(now)
        .bind(event_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::record_registration("cancelled");
        tracing::info!(event_id = %event_id, user_id = %user_id, "registration cancelled");
        Ok(())
    }

    /// Approve a pending event
    pub async fn approve(&self, event_id: &str, admin_id: &str) -> AppResult<Event> {
        self.review(event_id, admin_id, EventStatus::Approved, None).await
    }

    /// Reject a pending event with a reason
    pub async fn reject(&self, event_id: &str, admin_id: &str, reason: &str) -> AppResult<Event> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::invalid_field("reason", "A rejection reason is required"));
        }
        self.review(event_id, admin_id, EventStatus::Rejected, Some(reason))
            .await
    }

    #[tracing::instrument(skip(self))]
    async fn review(
        &self,
        event_id: &str,
        admin_id: &str,
        next: EventStatus,
        reason: Option<&str>,
    ) -> AppResult<Event> {
        let result = sqlx::query(
            "UPDATE event
             SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, rejection_reason = ?4,
                 updated_at = ?3
             WHERE id = ?5 AND status = 'pending'",
        )
        .bind(next.as_str())
        .bind(admin_id)
        .bind(Utc::now())
        .bind(reason)
        .bind(event_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get(event_id).await?;
            return Err(AppError::InvalidTransition {
                from: current.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        tracing::info!(event_id = %event_id, status = next.as_str(), "event reviewed");
        self.get(event_id).await
    }

    /// Edit an event
    ///
    /// An organizer editing an approved event sends it back to review. Admin
    /// edits leave the status alone unless it is set explicitly.
    #[tracing::instrument(skip(self, actor, req), fields(actor = %actor.label()))]
    pub async fn update(
        &self,
        actor: &Actor,
        event_id: &str,
        req: UpdateEventRequest,
    ) -> AppResult<Event> {
        req.validate()?;

        let current = self.get(event_id).await?;
        actor.require_bank_or_admin(&current.blood_bank_id)?;

        let now = Utc::now();
        let start_time = req.start_time.unwrap_or(current.start_time);
        let end_time = req.end_time.unwrap_or(current.end_time);
        if req.start_time.is_some() || req.end_time.is_some() {
            if end_time < start_time {
                return Err(AppError::InvalidDateRange(
                    "End time must not be before start time".to_string(),
                ));
            }
            if req.start_time.is_some() && start_time <= now {
                return Err(AppError::InvalidDateRange(
                    "Start time must be in the future".to_string(),
                ));
            }
        }

        let max_capacity = req.max_capacity.unwrap_or(current.max_capacity);
        if max_capacity < current.registered_count {
            return Err(AppError::invalid_field(
                "maxCapacity",
                format!(
                    "Capacity cannot drop below the {} existing registrations",
                    current.registered_count
                ),
            ));
        }

        let mut status = current.status;
        let mut reviewed_by = current.reviewed_by.clone();
        let mut reviewed_at = current.reviewed_at;
        let mut rejection_reason = current.rejection_reason.clone();

        if actor.is_admin() {
            if let Some(requested) = req.status.as_deref() {
                let next = EventStatus::from_str(requested)?;
                if next != current.status {
                    if !current.status.can_transition_to(next) {
                        return Err(AppError::InvalidTransition {
                            from: current.status.as_str().to_string(),
                            to: next.as_str().to_string(),
                        });
                    }
                    status = next;
                    reviewed_by = Some(actor.id().to_string());
                    reviewed_at = Some(now);
                    rejection_reason = match next {
                        EventStatus::Rejected => Some(
                            clean_optional(req.rejection_reason.clone()).ok_or_else(|| {
                                AppError::invalid_field(
                                    "rejectionReason",
                                    "A rejection reason is required",
                                )
                            })?,
                        ),
                        _ => None,
                    };
                }
            }
        } else {
            if req.status.is_some() {
                return Err(AppError::Authorization(
                    "Only admins can change the review status".to_string(),
                ));
            }
            if current.status == EventStatus::Approved {
                status = EventStatus::Pending;
                reviewed_by = None;
                reviewed_at = None;
                rejection_reason = None;
            }
        }

        let result = sqlx::query(
            "UPDATE event SET
                 title = ?1, description = ?2, venue = ?3, city = ?4,
                 start_time = ?5, end_time = ?6, max_capacity = ?7,
                 status = ?8, reviewed_by = ?9, reviewed_at = ?10, rejection_reason = ?11,
                 updated_at = ?12
             WHERE id = ?13 AND status = ?14 AND registered_count <= ?7",
        )
        .bind(
            req.title
                .map(|t| t.trim().to_string())
                .unwrap_or(current.title),
        )
        .bind(
            req.description
                .map(|d| d.trim().to_string())
                .unwrap_or(current.description),
        )
        .bind(
            req.venue
                .map(|v| v.trim().to_string())
                .unwrap_or(current.venue),
        )
        .bind(clean_optional(req.city).or(current.city))
        .bind(start_time)
        .bind(end_time)
        .bind(max_capacity)
        .bind(status.as_str())
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(rejection_reason)
        .bind(now)
        .bind(event_id)
        .bind(current.status.as_str())
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Event changed while being edited, retry".to_string(),
            ));
        }

        tracing::info!(
            event_id = %event_id,
            from = current.status.as_str(),
            to = status.as_str(),
            "event updated"
        );

        self.get(event_id).await
    }

    /// List events, soonest first
    pub async fn list(&self, filter: EventFilter) -> AppResult<Vec<Event>> {
        let status = filter.status.as_deref().map(EventStatus::from_str).transpose()?;
        let upcoming_after = filter
            .upcoming_only
            .unwrap_or(false)
            .then(Utc::now);

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM event
             WHERE (?1 IS NULL OR status = ?1)
               AND (?2 IS NULL OR blood_bank_id = ?2)
               AND (?3 IS NULL OR city = ?3 COLLATE NOCASE)
               AND (?4 IS NULL OR end_time > ?4)
             ORDER BY start_time"
        );

        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .bind(clean_optional(filter.blood_bank_id))
            .bind(clean_optional(filter.city))
            .bind(upcoming_after)
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Events awaiting review, oldest submission first
    pub async fn pending(&self) -> AppResult<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM event WHERE status = 'pending' ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Delete an event and its registrations
    pub async fn delete(&self, actor: &Actor, event_id: &str) -> AppResult<()> {
        let event = self.get(event_id).await?;
        actor.require_bank_or_admin(&event.blood_bank_id)?;

        sqlx::query("DELETE FROM event WHERE id = ?1")
            .bind(event_id)
            .execute(self.db.pool())
            .await?;

        tracing::info!(event_id = %event_id, actor = %actor.label(), "event deleted");
        Ok(())
    }

    async fn registration(&self, event_id: &str, user_id: &str) -> AppResult<Option<Registration>> {
        sqlx::query_as::<_, RegistrationRow>(
            "SELECT event_id, user_id, status, registered_at, updated_at
             FROM event_registration WHERE event_id = ?1 AND user_id = ?2",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?
        .map(RegistrationRow::into_registration)
        .transpose()
    }

    /// Active registrants of an event, for its organizer
    pub async fn registrations(&self, actor: &Actor, event_id: &str) -> AppResult<Vec<Registrant>> {
        let event = self.get(event_id).await?;
        actor.require_bank_or_admin(&event.blood_bank_id)?;

        let rows = sqlx::query_as::<_, RegistrantRow>(
            "SELECT r.event_id, r.user_id, r.status, r.registered_at, r.updated_at,
                    a.name, a.email, a.phone, a.blood_type
             FROM event_registration r
             JOIN account a ON a.id = r.user_id
             WHERE r.event_id = ?1 AND r.status <> 'cancelled'
             ORDER BY r.registered_at",
        )
        .bind(event_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(RegistrantRow::into_registrant).collect()
    }

    /// Every registration of a user with its event
    pub async fn user_registrations(&self, user_id: &str) -> AppResult<Vec<UserRegistration>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM event
             WHERE id IN (SELECT event_id FROM event_registration WHERE user_id = ?1)"
        );
        let mut events: HashMap<String, Event> = HashMap::new();
        for row in sqlx::query_as::<_, EventRow>(&sql)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?
        {
            let event = row.into_event()?;
            events.insert(event.id.clone(), event);
        }

        let rows = sqlx::query_as::<_, RegistrationRow>(
            "SELECT event_id, user_id, status, registered_at, updated_at
             FROM event_registration WHERE user_id = ?1
             ORDER BY registered_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut registrations = Vec::with_capacity(rows.len());
        for row in rows {
            let registration = row.into_registration()?;
            if let Some(event) = events.remove(&registration.event_id) {
                registrations.push(UserRegistration {
                    registration,
                    event,
                });
            }
        }
        Ok(registrations)
    }

    /// Record that a registrant donated; also updates their last donation date
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.label()))]
    pub async fn mark_attended(
        &self,
        actor: &Actor,
        event_id: &str,
        user_id: &str,
    ) -> AppResult<()> {
        let event = self.get(event_id).await?;
        actor.require_bank_or_admin(&event.blood_bank_id)?;

        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let marked = sqlx::query(
            "UPDATE event_registration SET status = 'attended', updated_at = ?1
             WHERE event_id = ?2 AND user_id = ?3 AND status = 'confirmed'",
        )
        .bind(now)
        .bind(event_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            return Err(AppError::NotRegistered);
        }

        sqlx::query(
            "UPDATE account SET last_donation_date = ?1, updated_at = ?2
             WHERE id = ?3 AND (last_donation_date IS NULL OR last_donation_date < ?1)",
        )
        .bind(event.start_time.date_naive())
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(event_id = %event_id, user_id = %user_id, "attendance recorded");
        Ok(())
    }

    /// Counts for the admin dashboard
    pub async fn stats(&self) -> AppResult<EventStats> {
        let (total, pending, approved, upcoming): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'pending'), 0),
                    COALESCE(SUM(status = 'approved'), 0),
                    COALESCE(SUM(status = 'approved' AND start_time > ?1), 0)
             FROM event",
        )
        .bind(Utc::now())
        .fetch_one(self.db.pool())
        .await?;

        let active_registrations: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM event_registration WHERE status <> 'cancelled'",
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(EventStats {
            total,
            pending,
            approved,
            upcoming,
            active_registrations,
        })
    }
}

fn validate_schedule(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if end < start {
        return Err(AppError::InvalidDateRange(
            "End time must not be before start time".to_string(),
        ));
    }
    if start <= now {
        return Err(AppError::InvalidDateRange(
            "Start time must be in the future".to_string(),
        ));
    }
    Ok(())
}
