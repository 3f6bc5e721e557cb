/// Blood bank manager implementation
use crate::{
    account::LoginRequest,
    actor::Actor,
    blood::{BloodType, StockOperation},
    blood_bank::{
        BankAddress, BankLoginResponse, BankNotification, BloodBank, BloodBankFilter,
        BloodBankStats, CreateBloodBankRequest, GeoPoint, NearbyBloodBank, OperatingHours,
        StockChange, UpdateBloodBankRequest, DEFAULT_RADIUS_KM, MAX_RADIUS_KM,
    },
    crypto::{hash_password, verify_password, TokenIssuer, TokenKind},
    db::{
        blood_bank::{
            encode_hours, units_from_column, BloodBankRow, NotificationRow, BLOOD_BANK_COLUMNS,
            NOTIFICATION_COLUMNS,
        },
        Database,
    },
    error::{AppError, AppResult},
    metrics,
    validation::{clean_optional, normalize_email},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Blood bank manager service
pub struct BloodBankManager {
    db: Database,
    tokens: Arc<TokenIssuer>,
}

impl BloodBankManager {
    /// Create a new blood bank manager
    pub fn new(db: Database, tokens: Arc<TokenIssuer>) -> Self {
        Self { db, tokens }
    }

    /// Register a bank with placeholder address, default hours and empty stock
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn create(&self, req: CreateBloodBankRequest) -> AppResult<BloodBank> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let license_number = req.license_number.trim().to_string();

        let (email_taken, license_taken): (bool, bool) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM blood_bank WHERE email = ?1),
                    EXISTS(SELECT 1 FROM blood_bank WHERE license_number = ?2)",
        )
        .bind(&email)
        .bind(&license_number)
        .fetch_one(self.db.pool())
        .await?;

        if email_taken {
            return Err(AppError::DuplicateEmail);
        }
        if license_taken {
            return Err(AppError::Conflict(
                "License number is already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&req.password).await?;
        let address = BankAddress::placeholder();
        let hours = encode_hours(&OperatingHours::default())?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO blood_bank (id, name, email, password_hash, license_number, phone,
                 street, city, state, zip_code, longitude, latitude, operating_hours,
                 is_verified, is_active, profile_completed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, 0, ?11, 0, 1, 0, ?12, ?12)",
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(&license_number)
        .bind(clean_optional(req.phone))
        .bind(&address.street)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.zip_code)
        .bind(&hours)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(|e| {
            let email_conflict = matches!(
                &e,
                sqlx::Error::Database(db) if db.message().contains("blood_bank.email")
            );
            let conflict = if email_conflict {
                AppError::DuplicateEmail
            } else {
                AppError::Conflict("License number is already registered".to_string())
            };
            AppError::on_unique_violation(e, conflict)
        })?;

        tracing::info!(blood_bank_id = %id, "blood bank created");

        self.get(&id).await
    }

    /// Staff login, issuing a `bloodbank` token
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> AppResult<BankLoginResponse> {
        let email = normalize_email(&req.email);

        let bank = match self.find_by_email(&email).await? {
            Some(bank) if bank.is_active => bank,
            _ => {
                metrics::record_login("bloodbank", false);
                return Err(AppError::InvalidCredentials);
            }
        };

        if !verify_password(&req.password, &bank.password_hash).await? {
            metrics::record_login("bloodbank", false);
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        sqlx::query("UPDATE blood_bank SET last_login = ?1 WHERE id = ?2")
            .bind(now)
            .bind(&bank.id)
            .execute(self.db.pool())
            .await?;

        let token = self
            .tokens
            .issue(&bank.id, &bank.email, None, TokenKind::BloodBank)?;

        metrics::record_login("bloodbank", true);

        Ok(BankLoginResponse {
            token,
            expires_in: self.tokens.ttl().num_seconds(),
            blood_bank: BloodBank {
                last_login: Some(now),
                ..bank
            },
        })
    }

    /// Resolve a staff bearer token
    pub async fn verify_token(&self, token: &str) -> AppResult<BloodBank> {
        let claims = self.tokens.verify_kind(token, TokenKind::BloodBank)?;
        let bank = self.get(&claims.sub).await?;

        if !bank.is_active {
            return Err(AppError::NotFound("Blood bank is no longer active".to_string()));
        }

        Ok(bank)
    }

    /// Get blood bank by id
    pub async fn get(&self, id: &str) -> AppResult<BloodBank> {
        let sql = format!("SELECT {BLOOD_BANK_COLUMNS} FROM blood_bank WHERE id = ?1");
        sqlx::query_as::<_, BloodBankRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Blood bank not found".to_string()))?
            .into_blood_bank()
    }

    /// Get an active blood bank by id
    pub async fn get_active(&self, id: &str) -> AppResult<BloodBank> {
        let bank = self.get(id).await?;
        if !bank.is_active {
            return Err(AppError::NotFound("Blood bank not found".to_string()));
        }
        Ok(bank)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<BloodBank>> {
        let sql = format!("SELECT {BLOOD_BANK_COLUMNS} FROM blood_bank WHERE email = ?1");
        sqlx::query_as::<_, BloodBankRow>(&sql)
            .bind(email)
            .fetch_optional(self.db.pool())
            .await?
            .map(BloodBankRow::into_blood_bank)
            .transpose()
    }

    /// Change one blood type's units atomically
    ///
    /// The new level is computed by a single conditional `UPDATE` and can
    /// never go below zero.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.label()))]
    pub async fn update_stock(
        &self,
        actor: &Actor,
        bank_id: &str,
        blood_type: &str,
        quantity: i64,
        operation: &str,
    ) -> AppResult<StockChange> {
        actor.require_bank_or_admin(bank_id)?;

        let blood_type = BloodType::from_str(blood_type)?;
        let operation = StockOperation::from_str(operation)?;
        if quantity < 0 {
            return Err(AppError::invalid_field(
                "quantity",
                "Quantity must be zero or more",
            ));
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| AppError::invalid_field("quantity", "Quantity is too large"))?;

        let column = blood_type.stock_column();
        let sql = format!(
            "UPDATE blood_bank
             SET {column} = {expr}, last_stock_update = ?, updated_at = ?
             WHERE id = ? AND is_active = 1
             RETURNING {column}",
            expr = operation.sql_expression(column),
        );

        let now = Utc::now();
        let units: i64 = sqlx::query_scalar(&sql)
            .bind(quantity)
            .bind(now)
            .bind(now)
            .bind(bank_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Blood bank not found".to_string()))?;

        metrics::STOCK_UPDATES_TOTAL
            .with_label_values(&[blood_type.as_str(), operation.as_str()])
            .inc();
        tracing::info!(
            blood_bank_id = %bank_id,
            blood_type = blood_type.as_str(),
            operation = operation.as_str(),
            quantity,
            units,
            "stock updated"
        );

        Ok(StockChange {
            blood_type,
            operation,
            quantity,
            units: units_from_column(units),
            updated_at: now,
        })
    }

    /// Public listing of active banks
    pub async fn list(&self, filter: BloodBankFilter) -> AppResult<Vec<BloodBank>> {
        let stock_filter = match filter.blood_type.as_deref() {
            Some(t) => format!(" AND {} > 0", BloodType::from_str(t)?.stock_column()),
            None => String::new(),
        };
        let search = clean_optional(filter.search).map(|s| format!("%{}%", s.to_lowercase()));
        let limit = filter.limit.unwrap_or(20).clamp(1, 100);
        let page = filter.page.unwrap_or(1).max(1);

        let sql = format!(
            "SELECT {BLOOD_BANK_COLUMNS} FROM blood_bank
             WHERE is_active = 1
               AND (?1 IS NULL OR city = ?1 COLLATE NOCASE)
               AND (?2 IS NULL OR state = ?2 COLLATE NOCASE)
               AND (?3 IS NULL OR lower(name) LIKE ?3)
               AND (?4 IS NULL OR is_verified = ?4){stock_filter}
             ORDER BY name
             LIMIT ?5 OFFSET ?6"
        );

        let rows = sqlx::query_as::<_, BloodBankRow>(&sql)
            .bind(clean_optional(filter.city))
            .bind(clean_optional(filter.state))
            .bind(search)
            .bind(filter.verified)
            .bind(limit)
            .bind((page - 1) * limit)
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(BloodBankRow::into_blood_bank).collect()
    }

    /// Active banks within `radius_km` of a point, nearest first
    pub async fn nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_km: Option<f64>,
    ) -> AppResult<Vec<NearbyBloodBank>> {
        let origin = GeoPoint::new(lat, lng);
        if !(-90.0..=90.0).contains(&lat) {
            return Err(AppError::invalid_field("lat", "Latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(AppError::invalid_field(
                "lng",
                "Longitude must be between -180 and 180",
            ));
        }

        let radius = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
        if !(radius > 0.0 && radius <= MAX_RADIUS_KM) {
            return Err(AppError::invalid_field(
                "radius",
                format!("Radius must be greater than 0 and at most {} km", MAX_RADIUS_KM),
            ));
        }

        let window = origin.bounding_box(radius);
        let sql = format!(
            "SELECT {BLOOD_BANK_COLUMNS} FROM blood_bank
             WHERE is_active = 1
               AND NOT (latitude = 0 AND longitude = 0)
               AND latitude BETWEEN ?1 AND ?2
               AND ((?3 <= ?4 AND longitude BETWEEN ?3 AND ?4)
                 OR (?3 > ?4 AND (longitude >= ?3 OR longitude <= ?4)))"
        );

        let rows = sqlx::query_as::<_, BloodBankRow>(&sql)
            .bind(window.min_lat)
            .bind(window.max_lat)
            .bind(window.west)
            .bind(window.east)
            .fetch_all(self.db.pool())
            .await?;

        let mut nearby = Vec::new();
        for row in rows {
            let bank = row.into_blood_bank()?;
            let distance_km = origin.distance_km(&bank.location);
            if distance_km <= radius {
                nearby.push(NearbyBloodBank { bank, distance_km });
            }
        }
        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        Ok(nearby)
    }

    /// Profile completion and edits by the bank's staff or an admin
    #[tracing::instrument(skip(self, actor, req), fields(actor = %actor.label()))]
    pub async fn update_profile(
        &self,
        actor: &Actor,
        id: &str,
        req: UpdateBloodBankRequest,
    ) -> AppResult<BloodBank> {
        actor.require_bank_or_admin(id)?;
        req.validate()?;

        let current = self.get_active(id).await?;

        let address = req.address.unwrap_or(current.address);
        let location = req.location.unwrap_or(current.location);
        let hours = req.operating_hours.unwrap_or(current.operating_hours);
        let profile_completed = !address.is_placeholder() && !location.is_unset();

        sqlx::query(
            "UPDATE blood_bank SET
                 name = ?1, phone = ?2, website = ?3,
                 street = ?4, city = ?5, state = ?6, zip_code = ?7,
                 longitude = ?8, latitude = ?9, operating_hours = ?10,
                 profile_completed = ?11, updated_at = ?12
             WHERE id = ?13",
        )
        .bind(
            req.name
                .map(|n| n.trim().to_string())
                .unwrap_or(current.name),
        )
        .bind(clean_optional(req.phone).or(current.phone))
        .bind(clean_optional(req.website).or(current.website))
        .bind(address.street.trim())
        .bind(address.city.trim())
        .bind(address.state.trim())
        .bind(address.zip_code.trim())
        .bind(location.lng)
        .bind(location.lat)
        .bind(encode_hours(&hours)?)
        .bind(profile_completed)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        tracing::info!(blood_bank_id = %id, profile_completed, "blood bank profile updated");

        self.get(id).await
    }

    /// Set or clear the verification flag
    pub async fn set_verified(&self, id: &str, verified: bool) -> AppResult<BloodBank> {
        let result =
            sqlx::query("UPDATE blood_bank SET is_verified = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(verified)
                .bind(Utc::now())
                .bind(id)
                .execute(self.db.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Blood bank not found".to_string()));
        }

        tracing::info!(blood_bank_id = %id, verified, "blood bank verification changed");
        self.get(id).await
    }

    /// Soft-delete: staff can no longer log in and the bank leaves listings
    pub async fn deactivate(&self, id: &str) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE blood_bank SET is_active = 0, updated_at = ?1 WHERE id = ?2 AND is_active = 1",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Blood bank not found".to_string()));
        }

        tracing::info!(blood_bank_id = %id, "blood bank deactivated");
        Ok(())
    }

    /// A bank's inbox, newest first
    pub async fn notifications(
        &self,
        actor: &Actor,
        bank_id: &str,
        unread_only: bool,
    ) -> AppResult<Vec<BankNotification>> {
        actor.require_bank_or_admin(bank_id)?;

        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM bank_notification
             WHERE blood_bank_id = ?1 AND (?2 = 0 OR is_read = 0)
             ORDER BY created_at DESC"
        );

        let rows = sqlx::query_as::<_, NotificationRow>(&sql)
            .bind(bank_id)
            .bind(unread_only)
            .fetch_all(self.db.pool())
            .await?;

        Ok(rows.into_iter().map(BankNotification::from).collect())
    }

    /// Mark one inbox entry read
    pub async fn mark_notification_read(
        &self,
        actor: &Actor,
        bank_id: &str,
        notification_id: &str,
    ) -> AppResult<()> {
        actor.require_bank_or_admin(bank_id)?;

        let result = sqlx::query(
            "UPDATE bank_notification SET is_read = 1 WHERE id = ?1 AND blood_bank_id = ?2",
        )
        .bind(notification_id)
        .bind(bank_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    /// Counts for the admin dashboard
    pub async fn stats(&self) -> AppResult<BloodBankStats> {
        let (total, active, verified, total_units): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_active), 0),
                    COALESCE(SUM(is_verified AND is_active), 0),
                    COALESCE(SUM(CASE WHEN is_active = 1 THEN
                        stock_o_pos + stock_o_neg + stock_a_pos + stock_a_neg +
                        stock_b_pos + stock_b_neg + stock_ab_pos + stock_ab_neg
                    ELSE 0 END), 0)
             FROM blood_bank",
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(BloodBankStats {
            total,
            active,
            verified,
            total_units,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blood::BloodStock;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

    async fn create_test_manager() -> BloodBankManager {
        let db = Database::in_memory().await.unwrap();
        let tokens = Arc::new(TokenIssuer::new(SECRET, Duration::hours(1)));
        BloodBankManager::new(db, tokens)
    }

    fn new_bank(email: &str, license: &str) -> CreateBloodBankRequest {
        CreateBloodBankRequest {
            name: "City Blood Centre".to_string(),
            email: email.to_string(),
            password: "bank-pass".to_string(),
            license_number: license.to_string(),
            phone: None,
        }
    }

    fn admin() -> Actor {
        Actor::Admin { id: "admin-1".into() }
    }

    #[tokio::test]
    async fn test_create_uses_placeholders() {
        let manager = create_test_manager().await;

        let bank = manager.create(new_bank("bank@example.com", "LIC-1")).await.unwrap();

        assert!(bank.address.is_placeholder());
        assert!(bank.location.is_unset());
        assert_eq!(bank.operating_hours, OperatingHours::default());
        assert_eq!(bank.stock, BloodStock::default());
        assert!(!bank.profile_completed);
        assert!(!bank.is_verified);
    }

    #[tokio::test]
    async fn test_create_conflicts() {
        let manager = create_test_manager().await;
        manager.create(new_bank("bank@example.com", "LIC-1")).await.unwrap();

        assert!(matches!(
            manager.create(new_bank("BANK@example.com", "LIC-2")).await,
            Err(AppError::DuplicateEmail)
        ));
        assert!(matches!(
            manager.create(new_bank("other@example.com", "LIC-1")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_subtract_past_zero_clamps() {
        let manager = create_test_manager().await;
        let bank = manager.create(new_bank("bank@example.com", "LIC-1")).await.unwrap();
        let staff = Actor::BloodBank { id: bank.id.clone() };

        let set = manager.update_stock(&staff, &bank.id, "O+", 5, "set").await.unwrap();
        assert_eq!(set.units, 5);

        let change = manager
            .update_stock(&staff, &bank.id, "O+", 10, "subtract")
            .await
            .unwrap();
        assert_eq!(change.units, 0);

        let stored = manager.get(&bank.id).await.unwrap();
        assert_eq!(stored.stock.get(BloodType::OPositive), 0);
        assert!(stored.last_stock_update.is_some());
    }

    #[tokio::test]
    async fn test_stock_add_and_validation() {
        let manager = create_test_manager().await;
        let bank = manager.create(new_bank("bank@example.com", "LIC-1")).await.unwrap();

        manager.update_stock(&admin(), &bank.id, "ab-", 3, "add").await.unwrap();
        let change = manager.update_stock(&admin(), &bank.id, "AB-", 4, "add").await.unwrap();
        assert_eq!(change.units, 7);

        assert!(matches!(
            manager.update_stock(&admin(), &bank.id, "C+", 1, "add").await,
            Err(AppError::InvalidBloodType(_))
        ));
        assert!(matches!(
            manager.update_stock(&admin(), &bank.id, "A+", -1, "add").await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            manager.update_stock(&admin(), &bank.id, "A+", 1, "multiply").await,
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            manager.update_stock(&admin(), "missing", "A+", 1, "add").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stock_update_requires_own_bank() {
        let manager = create_test_manager().await;
        let bank = manager.create(new_bank("bank@example.com", "LIC-1")).await.unwrap();
        let other = Actor::BloodBank { id: "someone-else".into() };
        let user = Actor::User { id: "u1".into() };

        assert!(matches!(
            manager.update_stock(&other, &bank.id, "O+", 1, "add").await,
            Err(AppError::Authorization(_))
        ));
        assert!(matches!(
            manager.update_stock(&user, &bank.id, "O+", 1, "add").await,
            Err(AppError::Authorization(_))
        ));
    }

    #[tokio::test]
    async fn test_login_and_token() {
        let manager = create_test_manager().await;
        let bank = manager.create(new_bank("bank@example.com", "LIC-1")).await.unwrap();

        let bad = manager
            .login(LoginRequest {
                email: "bank@example.com".into(),
                password: "wrong".into(),
            })
            .await;
        assert!(matches!(bad, Err(AppError::InvalidCredentials)));
        assert!(manager.get(&bank.id).await.unwrap().last_login.is_none());

        let login = manager
            .login(LoginRequest {
                email: "bank@example.com".into(),
                password: "bank-pass".into(),
            })
            .await
            .unwrap();
        let resolved = manager.verify_token(&login.token).await.unwrap();
        assert_eq!(resolved.id, bank.id);

        manager.deactivate(&bank.id).await.unwrap();
        assert!(matches!(
            manager.verify_token(&login.token).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_completion_and_nearby() {
        let manager = create_test_manager().await;
        let pune = manager.create(new_bank("pune@example.com", "LIC-1")).await.unwrap();
        let mumbai = manager.create(new_bank("mumbai@example.com", "LIC-2")).await.unwrap();

        let address = |city: &str| BankAddress {
            street: "1 Main Road".into(),
            city: city.into(),
            state: "Maharashtra".into(),
            zip_code: "411001".into(),
        };

        let updated = manager
            .update_profile(
                &Actor::BloodBank { id: pune.id.clone() },
                &pune.id,
                UpdateBloodBankRequest {
                    address: Some(address("Pune")),
                    location: Some(GeoPoint::new(18.5204, 73.8567)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.profile_completed);

        manager
            .update_profile(
                &admin(),
                &mumbai.id,
                UpdateBloodBankRequest {
                    address: Some(address("Mumbai")),
                    location: Some(GeoPoint::new(19.0760, 72.8777)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let close = manager.nearby(18.52, 73.85, Some(25.0)).await.unwrap();
        assert_eq!(close.len(), 1);
        assert_eq!(close[0].bank.id, pune.id);

        let wide = manager.nearby(18.52, 73.85, Some(200.0)).await.unwrap();
        assert_eq!(wide.len(), 2);
        assert!(wide[0].distance_km < wide[1].distance_km);

        assert!(manager.nearby(95.0, 0.0, None).await.is_err());
        assert!(manager.nearby(18.0, 73.0, Some(501.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_nearby_across_antimeridian() {
        let manager = create_test_manager().await;
        let east = manager.create(new_bank("east@example.com", "LIC-1")).await.unwrap();
        let west = manager.create(new_bank("west@example.com", "LIC-2")).await.unwrap();

        for (bank, lng) in [(&east, 179.9), (&west, -179.95)] {
            manager
                .update_profile(
                    &admin(),
                    &bank.id,
                    UpdateBloodBankRequest {
                        address: Some(BankAddress {
                            street: "1 Harbour Road".into(),
                            city: "Taveuni".into(),
                            state: "Northern".into(),
                            zip_code: "0000".into(),
                        }),
                        location: Some(GeoPoint::new(-16.8, lng)),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let found = manager.nearby(-16.8, 179.95, Some(50.0)).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|n| n.distance_km < 15.0));

        let from_west = manager.nearby(-16.8, -179.99, Some(50.0)).await.unwrap();
        assert_eq!(from_west.len(), 2);
        assert_eq!(from_west[0].bank.id, west.id);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let manager = create_test_manager().await;
        let a = manager.create(new_bank("a@example.com", "LIC-1")).await.unwrap();
        manager.create(new_bank("b@example.com", "LIC-2")).await.unwrap();

        manager.update_stock(&admin(), &a.id, "B-", 2, "set").await.unwrap();
        manager.set_verified(&a.id, true).await.unwrap();

        let with_b_neg = manager
            .list(BloodBankFilter {
                blood_type: Some("B-".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(with_b_neg.len(), 1);
        assert_eq!(with_b_neg[0].id, a.id);

        let verified = manager
            .list(BloodBankFilter {
                verified: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(verified.len(), 1);

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.verified, 1);
        assert_eq!(stats.total_units, 2);
    }

    #[tokio::test]
    async fn test_notifications_inbox() {
        let manager = create_test_manager().await;
        let bank = manager.create(new_bank("bank@example.com", "LIC-1")).await.unwrap();
        let staff = Actor::BloodBank { id: bank.id.clone() };

        let mut conn = manager.db.pool().acquire().await.unwrap();
        let id = crate::db::blood_bank::insert_notification(
            &mut *conn,
            &bank.id,
            None,
            "urgent_request",
            "Urgent request for O-",
        )
        .await
        .unwrap();
        drop(conn);

        assert_eq!(manager.notifications(&staff, &bank.id, true).await.unwrap().len(), 1);
        manager.mark_notification_read(&staff, &bank.id, &id).await.unwrap();
        assert!(manager.notifications(&staff, &bank.id, true).await.unwrap().is_empty());
        assert_eq!(manager.notifications(&staff, &bank.id, false).await.unwrap().len(), 1);

        let outsider = Actor::BloodBank { id: "other".into() };
        assert!(manager.notifications(&outsider, &bank.id, false).await.is_err());
    }
}
