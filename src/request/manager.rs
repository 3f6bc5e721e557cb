/// Blood request manager implementation
use crate::{
    actor::Actor,
    blood::BloodType,
    db::{
        blood_bank::insert_notification,
        request::{append_history, BloodRequestRow, HistoryRow, REQUEST_COLUMNS},
        Database,
    },
    error::{AppError, AppResult},
    metrics,
    request::{
        BloodRequest, CreateBloodRequest, HistoryEntry, RequestFilter, RequestStats,
        RequestStatus, UpdateBloodRequest, Urgency,
    },
    validation::clean_optional,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

/// Blood request manager service
pub struct BloodRequestManager {
    db: Database,
}

impl BloodRequestManager {
    /// Create a new blood request manager
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Raise a request against a blood bank
    ///
    /// The request, its first history entry and, for urgent requests, the
    /// bank notification are written in one transaction.
    #[tracing::instrument(skip(self, actor, req), fields(actor = %actor.label()))]
    pub async fn create(&self, actor: &Actor, req: CreateBloodRequest) -> AppResult<BloodRequest> {
        let requester_id = actor.account_id().ok_or_else(|| {
            AppError::Authorization("Only user accounts can raise blood requests".to_string())
        })?;
        req.validate()?;

        let blood_type = BloodType::from_str(&req.blood_type)?;
        let urgency = req
            .urgency
            .as_deref()
            .map(Urgency::from_str)
            .transpose()?
            .unwrap_or(Urgency::Medium);
        let bank_id = req.blood_bank_id.trim().to_string();

        let active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM blood_bank WHERE id = ?1")
                .bind(&bank_id)
                .fetch_optional(self.db.pool())
                .await?;
        if active != Some(true) {
            return Err(AppError::NotFound("Blood bank not found".to_string()));
        }

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        sqlx::query(
            "INSERT INTO blood_request (id, requester_id, blood_bank_id, patient_name, blood_type,
                 units_required, urgency, hospital, contact_phone, reason, required_by, status,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 'pending', ?12, ?12)",
        )
        .bind(&id)
        .bind(requester_id)
        .bind(&bank_id)
        .bind(req.patient_name.trim())
        .bind(blood_type.as_str())
        .bind(req.units_required)
        .bind(urgency.as_str())
        .bind(clean_optional(req.hospital))
        .bind(req.contact_phone.trim())
        .bind(clean_optional(req.reason))
        .bind(req.required_by)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        append_history(
            &mut *tx,
            &id,
            RequestStatus::Pending,
            Some("Request created"),
            &actor.label(),
            now,
        )
        .await?;

        if urgency == Urgency::Urgent {
            let message = format!(
                "Urgent request: {} unit(s) of {} for {}",
                req.units_required,
                blood_type,
                req.patient_name.trim()
            );
            insert_notification(&mut *tx, &bank_id, Some(&id), "urgent_request", &message).await?;
        }

        tx.commit().await?;

        metrics::BLOOD_REQUESTS_TOTAL
            .with_label_values(&[urgency.as_str()])
            .inc();
        tracing::info!(
            request_id = %id,
            blood_bank_id = %bank_id,
            urgency = urgency.as_str(),
            "blood request created"
        );

        self.load(&id).await
    }

    async fn fetch(&self, id: &str) -> AppResult<BloodRequest> {
        let sql = format!("SELECT {REQUEST_COLUMNS} FROM blood_request WHERE id = ?1");
        sqlx::query_as::<_, BloodRequestRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Blood request not found".to_string()))?
            .into_request()
    }

    async fn load(&self, id: &str) -> AppResult<BloodRequest> {
        let mut request = self.fetch(id).await?;
        request.history = self.history(id).await?;
        Ok(request)
    }

    /// Request with history, for its requester, target bank or an admin
    pub async fn get(&self, actor: &Actor, id: &str) -> AppResult<BloodRequest> {
        let request = self.load(id).await?;

        let allowed = actor.is_admin()
            || actor.is_bank(&request.blood_bank_id)
            || actor.account_id() == Some(request.requester_id.as_str());
        if !allowed {
            return Err(AppError::Authorization(
                "Not allowed to view this request".to_string(),
            ));
        }

        Ok(request)
    }

    /// Status log, oldest first
    pub async fn history(&self, id: &str) -> AppResult<Vec<HistoryEntry>> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            "SELECT status, note, changed_by, changed_at FROM blood_request_history
             WHERE request_id = ?1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(HistoryRow::into_entry).collect()
    }

    /// Change status as the target bank or an admin; appends to the history
    #[tracing::instrument(skip(self, actor, note), fields(actor = %actor.label()))]
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: &str,
        status: &str,
        note: Option<String>,
    ) -> AppResult<BloodRequest> {
        let status = RequestStatus::from_str(status)?;
        let request = self.fetch(id).await?;
        actor.require_bank_or_admin(&request.blood_bank_id)?;

        self.transition(id, status, clean_optional(note).as_deref(), actor)
            .await?;

        tracing::info!(
            request_id = %id,
            from = request.status.as_str(),
            to = status.as_str(),
            "blood request status changed"
        );

        self.load(id).await
    }

    async fn transition(
        &self,
        id: &str,
        status: RequestStatus,
        note: Option<&str>,
        actor: &Actor,
    ) -> AppResult<()> {
        let now = Utc::now();
        let mut tx = self.db.pool().begin().await?;

        let result =
            sqlx::query("UPDATE blood_request SET status = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(status.as_str())
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Blood request not found".to_string()));
        }

        append_history(&mut *tx, id, status, note, &actor.label(), now).await?;
        tx.commit().await?;
        Ok(())
    }

    fn require_requester(actor: &Actor, request: &BloodRequest) -> AppResult<()> {
        if actor.account_id() == Some(request.requester_id.as_str()) {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Only the requester may change this request".to_string(),
            ))
        }
    }

    /// Edit a pending request as its requester
    #[tracing::instrument(skip(self, actor, req), fields(actor = %actor.label()))]
    pub async fn update(
        &self,
        actor: &Actor,
        id: &str,
        req: UpdateBloodRequest,
    ) -> AppResult<BloodRequest> {
        req.validate()?;
        let current = self.fetch(id).await?;
        Self::require_requester(actor, &current)?;

        if current.status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Only pending requests can be edited (status is {})",
                current.status.as_str()
            )));
        }

        let blood_type = req
            .blood_type
            .as_deref()
            .map(BloodType::from_str)
            .transpose()?
            .unwrap_or(current.blood_type);
        let urgency = req
            .urgency
            .as_deref()
            .map(Urgency::from_str)
            .transpose()?
            .unwrap_or(current.urgency);

        let result = sqlx::query(
            "UPDATE blood_request SET
                 patient_name = ?1, blood_type = ?2, units_required = ?3, urgency = ?4,
                 hospital = ?5, contact_phone = ?6, reason = ?7, required_by = ?8,
                 updated_at = ?9
             WHERE id = ?10 AND status = 'pending'",
        )
        .bind(
            req.patient_name
                .map(|p| p.trim().to_string())
                .unwrap_or(current.patient_name),
        )
        .bind(blood_type.as_str())
        .bind(req.units_required.unwrap_or(current.units_required))
        .bind(urgency.as_str())
        .bind(clean_optional(req.hospital).or(current.hospital))
        .bind(
            req.contact_phone
                .map(|p| p.trim().to_string())
                .unwrap_or(current.contact_phone),
        )
        .bind(clean_optional(req.reason).or(current.reason))
        .bind(req.required_by.or(current.required_by))
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "Request is no longer pending".to_string(),
            ));
        }

        self.load(id).await
    }

    /// Withdraw an open request as its requester
    pub async fn cancel(&self, actor: &Actor, id: &str) -> AppResult<BloodRequest> {
        let current = self.fetch(id).await?;
        Self::require_requester(actor, &current)?;

        if current.status.is_closed() {
            return Err(AppError::Conflict(format!(
                "Request is already {}",
                current.status.as_str()
            )));
        }

        self.transition(id, RequestStatus::Cancelled, Some("Cancelled by requester"), actor)
            .await?;
        tracing::info!(request_id = %id, "blood request cancelled");

        self.load(id).await
    }

    /// Delete a request and its history as its requester
    pub async fn delete(&self, actor: &Actor, id: &str) -> AppResult<()> {
        let current = self.fetch(id).await?;
        Self::require_requester(actor, &current)?;

        sqlx::query("DELETE FROM blood_request WHERE id = ?1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        tracing::info!(request_id = %id, "blood request deleted");
        Ok(())
    }

    /// A user's own requests, newest first
    pub async fn list_for_requester(&self, user_id: &str) -> AppResult<Vec<BloodRequest>> {
        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM blood_request
             WHERE requester_id = ?1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, BloodRequestRow>(&sql)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(BloodRequestRow::into_request).collect()
    }

    /// Incoming requests of a bank, or all requests for an admin
    ///
    /// Most urgent first, then oldest first.
    pub async fn list(&self, actor: &Actor, filter: RequestFilter) -> AppResult<Vec<BloodRequest>> {
        let bank_id = match actor {
            Actor::Admin { .. } => None,
            Actor::BloodBank { id } => Some(id.as_str()),
            Actor::User { .. } => {
                return Err(AppError::Authorization(
                    "Only blood banks and admins can list requests".to_string(),
                ))
            }
        };
        let status = filter.status.as_deref().map(RequestStatus::from_str).transpose()?;
        let urgency = filter.urgency.as_deref().map(Urgency::from_str).transpose()?;
        let blood_type = filter.blood_type.as_deref().map(BloodType::from_str).transpose()?;

        let sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM blood_request
             WHERE (?1 IS NULL OR blood_bank_id = ?1)
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR urgency = ?3)
               AND (?4 IS NULL OR blood_type = ?4)
             ORDER BY CASE urgency
                          WHEN 'urgent' THEN 0 WHEN 'high' THEN 1
                          WHEN 'medium' THEN 2 ELSE 3 END,
                      created_at"
        );
        let rows = sqlx::query_as::<_, BloodRequestRow>(&sql)
            .bind(bank_id)
            .bind(status.map(|s| s.as_str()))
            .bind(urgency.map(|u| u.as_str()))
            .bind(blood_type.map(|t| t.as_str()))
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(BloodRequestRow::into_request).collect()
    }

    /// Counts for the admin dashboard
    pub async fn stats(&self) -> AppResult<RequestStats> {
        let (total, pending, urgent_open, fulfilled): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(status = 'pending'), 0),
                    COALESCE(SUM(urgency = 'urgent' AND status IN ('pending', 'approved')), 0),
                    COALESCE(SUM(status = 'fulfilled'), 0)
             FROM blood_request",
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(RequestStats {
            total,
            pending,
            urgent_open,
            fulfilled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (BloodRequestManager, Database) {
        let db = Database::in_memory().await.unwrap();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO blood_bank (id, name, email, password_hash, license_number,
                 street, city, state, zip_code, operating_hours, created_at, updated_at)
             VALUES ('bank-1', 'Bank', 'bank@example.com', 'x', 'LIC-1',
                     's', 'c', 'st', 'z', '{}', ?1, ?1)",
        )
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();
        for user in ["u1", "u2"] {
            sqlx::query(
                "INSERT INTO account (id, name, email, password_hash, created_at, updated_at)
                 VALUES (?1, 'User', ?1 || '@example.com', 'x', ?2, ?2)",
            )
            .bind(user)
            .bind(now)
            .execute(db.pool())
            .await
            .unwrap();
        }
        (BloodRequestManager::new(db.clone()), db)
    }

    fn user(id: &str) -> Actor {
        Actor::User { id: id.to_string() }
    }

    fn bank() -> Actor {
        Actor::BloodBank { id: "bank-1".to_string() }
    }

    fn new_request(urgency: &str) -> CreateBloodRequest {
        CreateBloodRequest {
            blood_bank_id: "bank-1".to_string(),
            patient_name: "R. Sharma".to_string(),
            blood_type: "B+".to_string(),
            units_required: 2,
            urgency: Some(urgency.to_string()),
            hospital: Some("General Hospital".to_string()),
            contact_phone: "9876543210".to_string(),
            reason: None,
            required_by: None,
        }
    }

    async fn notification_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM bank_notification WHERE blood_bank_id = 'bank-1'")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_starts_pending_with_history() {
        let (manager, db) = setup().await;

        let request = manager.create(&user("u1"), new_request("medium")).await.unwrap();

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.history[0].status, RequestStatus::Pending);
        assert_eq!(notification_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_urgent_request_notifies_bank() {
        let (manager, db) = setup().await;

        let request = manager.create(&user("u1"), new_request("urgent")).await.unwrap();

        assert_eq!(request.urgency, Urgency::Urgent);
        assert_eq!(notification_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (manager, _db) = setup().await;

        let mut zero_units = new_request("low");
        zero_units.units_required = 0;
        assert!(matches!(
            manager.create(&user("u1"), zero_units).await,
            Err(AppError::Validation { .. })
        ));

        let mut bad_type = new_request("low");
        bad_type.blood_type = "XY".to_string();
        assert!(matches!(
            manager.create(&user("u1"), bad_type).await,
            Err(AppError::InvalidBloodType(_))
        ));

        let mut unknown_bank = new_request("low");
        unknown_bank.blood_bank_id = "nope".to_string();
        assert!(matches!(
            manager.create(&user("u1"), unknown_bank).await,
            Err(AppError::NotFound(_))
        ));

        assert!(matches!(
            manager.create(&bank(), new_request("low")).await,
            Err(AppError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_status_updates_append_history() {
        let (manager, _db) = setup().await;
        let request = manager.create(&user("u1"), new_request("high")).await.unwrap();

        manager
            .update_status(&bank(), &request.id, "approved", Some("Units reserved".into()))
            .await
            .unwrap();
        let fulfilled = manager
            .update_status(&bank(), &request.id, "fulfilled", None)
            .await
            .unwrap();

        assert_eq!(fulfilled.status, RequestStatus::Fulfilled);
        let statuses: Vec<_> = fulfilled.history.iter().map(|h| h.status).collect();
        assert_eq!(
            statuses,
            vec![
                RequestStatus::Pending,
                RequestStatus::Approved,
                RequestStatus::Fulfilled
            ]
        );
        assert_eq!(fulfilled.history[1].note.as_deref(), Some("Units reserved"));
        assert_eq!(fulfilled.history[1].changed_by, "bloodbank:bank-1");

        assert!(matches!(
            manager.update_status(&bank(), &request.id, "shipped", None).await,
            Err(AppError::InvalidStatus(_))
        ));
        assert!(matches!(
            manager.update_status(&user("u1"), &request.id, "cancelled", None).await,
            Err(AppError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_only_requester_edits_while_pending() {
        let (manager, _db) = setup().await;
        let request = manager.create(&user("u1"), new_request("low")).await.unwrap();

        let change = || UpdateBloodRequest {
            units_required: Some(4),
            ..Default::default()
        };

        assert!(matches!(
            manager.update(&user("u2"), &request.id, change()).await,
            Err(AppError::Authorization(_))
        ));

        let edited = manager.update(&user("u1"), &request.id, change()).await.unwrap();
        assert_eq!(edited.units_required, 4);

        manager
            .update_status(&bank(), &request.id, "approved", None)
            .await
            .unwrap();
        assert!(matches!(
            manager.update(&user("u1"), &request.id, change()).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_and_delete() {
        let (manager, _db) = setup().await;
        let request = manager.create(&user("u1"), new_request("low")).await.unwrap();

        let cancelled = manager.cancel(&user("u1"), &request.id).await.unwrap();
        assert_eq!(cancelled.status, RequestStatus::Cancelled);
        assert_eq!(cancelled.history.len(), 2);
        assert!(matches!(
            manager.cancel(&user("u1"), &request.id).await,
            Err(AppError::Conflict(_))
        ));

        assert!(manager.delete(&user("u2"), &request.id).await.is_err());
        manager.delete(&user("u1"), &request.id).await.unwrap();
        assert!(manager.history(&request.id).await.unwrap().is_empty());
        assert!(matches!(
            manager.get(&user("u1"), &request.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_listing_visibility() {
        let (manager, _db) = setup().await;
        manager.create(&user("u1"), new_request("low")).await.unwrap();
        let urgent = manager.create(&user("u2"), new_request("urgent")).await.unwrap();

        let incoming = manager.list(&bank(), RequestFilter::default()).await.unwrap();
        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0].id, urgent.id);

        let admin = Actor::Admin { id: "a1".into() };
        let urgent_only = manager
            .list(
                &admin,
                RequestFilter {
                    urgency: Some("urgent".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(urgent_only.len(), 1);

        assert!(manager.list(&user("u1"), RequestFilter::default()).await.is_err());
        assert_eq!(manager.list_for_requester("u1").await.unwrap().len(), 1);

        assert!(manager.get(&user("u1"), &urgent.id).await.is_err());
        assert!(manager.get(&user("u2"), &urgent.id).await.is_ok());

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.urgent_open, 1);
    }
}
