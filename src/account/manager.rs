/// Account manager implementation using runtime queries
use crate::{
    account::{
        Account, AccountFilter, AccountStats, ChangePasswordRequest, DonorFilter, DonorSummary,
        LoginResponse, RegisterRequest, Role, UpdateProfileRequest,
    },
    blood::BloodType,
    config::BootstrapAdminConfig,
    crypto::{hash_password, verify_password, TokenIssuer, TokenKind},
    db::{
        account::{AccountRow, ACCOUNT_COLUMNS},
        Database,
    },
    error::{AppError, AppResult},
    metrics,
    validation::{clean_optional, normalize_email},
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Account manager service
pub struct AccountManager {
    db: Database,
    tokens: Arc<TokenIssuer>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: Database, tokens: Arc<TokenIssuer>) -> Self {
        Self { db, tokens }
    }

    /// Create a new account with role `user`
    #[tracing::instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> AppResult<Account> {
        self.create_account(req, Role::User).await
    }

    async fn create_account(&self, req: RegisterRequest, role: Role) -> AppResult<Account> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let blood_type = req
            .blood_type
            .as_deref()
            .map(BloodType::from_str)
            .transpose()?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let password_hash = hash_password(&req.password).await?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO account (id, name, email, password_hash, role, phone, blood_type,
                 date_of_birth, gender, street, city, state, zip_code, is_donor, is_available,
                 is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 1, 1, ?15, ?15)",
        )
        .bind(&id)
        .bind(req.name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(role.as_str())
        .bind(clean_optional(req.phone))
        .bind(blood_type.map(|t| t.as_str()))
        .bind(req.date_of_birth)
        .bind(clean_optional(req.gender))
        .bind(clean_optional(req.address.street))
        .bind(clean_optional(req.address.city))
        .bind(clean_optional(req.address.state))
        .bind(clean_optional(req.address.zip_code))
        .bind(req.is_donor)
        .bind(now)
        .execute(self.db.pool())
        .await
        .map_err(|e| AppError::on_unique_violation(e, AppError::DuplicateEmail))?;

        tracing::info!(account_id = %id, role = role.as_str(), "account created");

        self.get(&id).await
    }

    /// Authenticate and issue a bearer token
    ///
    /// Unknown email, wrong password and inactive account all yield
    /// `InvalidCredentials`; `last_login` only moves on success.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let email = normalize_email(email);

        let account = match self.find_by_email(&email).await? {
            Some(account) if account.is_active => account,
            _ => {
                metrics::record_login("user", false);
                return Err(AppError::InvalidCredentials);
            }
        };

        if !verify_password(password, &account.password_hash).await? {
            metrics::record_login("user", false);
            tracing::info!(account_id = %account.id, "login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        sqlx::query("UPDATE account SET last_login = ?1 WHERE id = ?2")
            .bind(now)
            .bind(&account.id)
            .execute(self.db.pool())
            .await?;

        let token = self.tokens.issue(
            &account.id,
            &account.email,
            Some(account.role),
            TokenKind::User,
        )?;

        metrics::record_login("user", true);

        Ok(LoginResponse {
            token,
            expires_in: self.tokens.ttl().num_seconds(),
            user: Account {
                last_login: Some(now),
                ..account
            },
        })
    }

    /// Resolve an account bearer token
    ///
    /// Fails with `InvalidToken` for bad, expired or non-account tokens and
    /// with `NotFound` when the account is gone or deactivated.
    pub async fn verify_token(&self, token: &str) -> AppResult<Account> {
        let claims = self.tokens.verify_kind(token, TokenKind::User)?;
        let account = self.get(&claims.sub).await?;

        if !account.is_active {
            return Err(AppError::NotFound("Account is no longer active".to_string()));
        }

        Ok(account)
    }

    /// Get account by id
    pub async fn get(&self, id: &str) -> AppResult<Account> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = ?1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?
            .into_account()
    }

    /// Get account by (normalized) email
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE email = ?1");
        sqlx::query_as::<_, AccountRow>(&sql)
            .bind(normalize_email(email))
            .fetch_optional(self.db.pool())
            .await?
            .map(AccountRow::into_account)
            .transpose()
    }

    /// Update whitelisted profile fields; absent fields stay unchanged
    #[tracing::instrument(skip(self, req))]
    pub async fn update_profile(&self, id: &str, req: UpdateProfileRequest) -> AppResult<Account> {
        req.validate()?;

        let blood_type = req
            .blood_type
            .as_deref()
            .map(BloodType::from_str)
            .transpose()?;
        let address = req.address.unwrap_or_default();

        let result = sqlx::query(
            "UPDATE account SET
                 name = COALESCE(?1, name),
                 phone = COALESCE(?2, phone),
                 blood_type = COALESCE(?3, blood_type),
                 date_of_birth = COALESCE(?4, date_of_birth),
                 gender = COALESCE(?5, gender),
                 street = COALESCE(?6, street),
                 city = COALESCE(?7, city),
                 state = COALESCE(?8, state),
                 zip_code = COALESCE(?9, zip_code),
                 is_donor = COALESCE(?10, is_donor),
                 is_available = COALESCE(?11, is_available),
                 last_donation_date = COALESCE(?12, last_donation_date),
                 updated_at = ?13
             WHERE id = ?14 AND is_active = 1",
        )
        .bind(req.name.map(|n| n.trim().to_string()))
        .bind(clean_optional(req.phone))
        .bind(blood_type.map(|t| t.as_str()))
        .bind(req.date_of_birth)
        .bind(clean_optional(req.gender))
        .bind(clean_optional(address.street))
        .bind(clean_optional(address.city))
        .bind(clean_optional(address.state))
        .bind(clean_optional(address.zip_code))
        .bind(req.is_donor)
        .bind(req.is_available)
        .bind(req.last_donation_date)
        .bind(Utc::now())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        self.get(id).await
    }

    /// Change password after re-checking the current one
    pub async fn change_password(&self, id: &str, req: ChangePasswordRequest) -> AppResult<()> {
        req.validate()?;

        let account = self.get(id).await?;
        if !verify_password(&req.current_password, &account.password_hash).await? {
            return Err(AppError::invalid_field(
                "currentPassword",
                "Current password is incorrect",
            ));
        }

        let password_hash = hash_password(&req.new_password).await?;
        sqlx::query("UPDATE account SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        tracing::info!(account_id = %id, "password changed");
        Ok(())
    }

    /// Soft-delete: the account stays but can no longer log in
    pub async fn deactivate(&self, id: &str) -> AppResult<()> {
        self.set_active(id, false).await.map(|_| ())
    }

    /// Activate or deactivate an account
    pub async fn set_active(&self, id: &str, active: bool) -> AppResult<Account> {
        let result = sqlx::query("UPDATE account SET is_active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        tracing::info!(account_id = %id, active, "account activity changed");
        self.get(id).await
    }

    /// Change an account's role
    pub async fn set_role(&self, id: &str, role: Role) -> AppResult<Account> {
        let result = sqlx::query("UPDATE account SET role = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }

        tracing::info!(account_id = %id, role = role.as_str(), "account role changed");
        self.get(id).await
    }

    /// List accounts for administration
    pub async fn list(&self, filter: AccountFilter) -> AppResult<Vec<Account>> {
        let role = filter.role.as_deref().map(Role::from_str).transpose()?;
        let search = clean_optional(filter.search).map(|s| format!("%{}%", s.to_lowercase()));
        let limit = filter.limit.unwrap_or(50).clamp(1, 200);
        let offset = filter.offset.unwrap_or(0).max(0);

        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE (?1 IS NULL OR role = ?1)
               AND (?2 IS NULL OR is_active = ?2)
               AND (?3 IS NULL OR lower(name) LIKE ?3 OR email LIKE ?3)
             ORDER BY created_at DESC
             LIMIT ?4 OFFSET ?5"
        );

        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(role.map(|r| r.as_str()))
            .bind(filter.active)
            .bind(search)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.db.pool())
            .await?;

        rows.into_iter().map(AccountRow::into_account).collect()
    }

    /// Search active, available donors
    pub async fn search_donors(
        &self,
        filter: DonorFilter,
        today: NaiveDate,
    ) -> AppResult<Vec<DonorSummary>> {
        let blood_type = filter
            .blood_type
            .as_deref()
            .map(BloodType::from_str)
            .transpose()?;
        let city = clean_optional(filter.city);
        let limit = filter.limit.unwrap_or(50).clamp(1, 200);

        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE is_donor = 1 AND is_available = 1 AND is_active = 1
               AND (?1 IS NULL OR blood_type = ?1)
               AND (?2 IS NULL OR city = ?2 COLLATE NOCASE)
             ORDER BY name
             LIMIT ?3"
        );

        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(blood_type.map(|t| t.as_str()))
            .bind(city)
            .bind(limit)
            .fetch_all(self.db.pool())
            .await?;

        let eligible_only = filter.eligible_only.unwrap_or(false);
        let mut donors = Vec::with_capacity(rows.len());
        for row in rows {
            let donor = DonorSummary::from_account(&row.into_account()?, today);
            if !eligible_only || donor.eligible {
                donors.push(donor);
            }
        }

        Ok(donors)
    }

    /// Make sure the configured administrator exists
    pub async fn ensure_admin(&self, admin: &BootstrapAdminConfig) -> AppResult<Account> {
        if let Some(existing) = self.find_by_email(&admin.email).await? {
            if !existing.is_admin() {
                tracing::warn!(
                    account_id = %existing.id,
                    "bootstrap admin email belongs to a non-admin account; promoting"
                );
                return self.set_role(&existing.id, Role::Admin).await;
            }
            return Ok(existing);
        }

        let account = self
            .create_account(
                RegisterRequest {
                    name: admin.name.clone(),
                    email: admin.email.clone(),
                    password: admin.password.clone(),
                    phone: None,
                    blood_type: None,
                    date_of_birth: None,
                    gender: None,
                    address: Default::default(),
                    is_donor: false,
                },
                Role::Admin,
            )
            .await?;

        tracing::info!(account_id = %account.id, "bootstrap administrator created");
        Ok(account)
    }

    /// Counts for the admin dashboard
    pub async fn stats(&self) -> AppResult<AccountStats> {
        let (total, active, admins, donors): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT COUNT(*),
                    COALESCE(SUM(is_active), 0),
                    COALESCE(SUM(role = 'admin'), 0),
                    COALESCE(SUM(is_donor AND is_active), 0)
             FROM account",
        )
        .fetch_one(self.db.pool())
        .await?;

        Ok(AccountStats {
            total,
            active,
            admins,
            donors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountAddress;
    use chrono::Duration;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

    async fn create_test_manager() -> AccountManager {
        let db = Database::in_memory().await.unwrap();
        let tokens = Arc::new(TokenIssuer::new(SECRET, Duration::hours(1)));
        AccountManager::new(db, tokens)
    }

    fn registration(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Jane Donor".to_string(),
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
            phone: Some("+91 98765 43210".to_string()),
            blood_type: Some("o-".to_string()),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 17),
            gender: None,
            address: AccountAddress {
                city: Some("Pune".to_string()),
                ..Default::default()
            },
            is_donor: true,
        }
    }

    #[tokio::test]
    async fn test_register_returns_profile() {
        let manager = create_test_manager().await;

        let account = manager.register(registration("Jane@Example.com")).await.unwrap();

        assert_eq!(account.email, "jane@example.com");
        assert_eq!(account.role, Role::User);
        assert_eq!(account.blood_type, Some(BloodType::ONegative));
        assert!(account.is_active);
        assert!(account.last_login.is_none());
        assert!(account.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let manager = create_test_manager().await;
        manager.register(registration("jane@example.com")).await.unwrap();

        let result = manager.register(registration("JANE@example.com ")).await;

        assert!(matches!(result, Err(AppError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_register_invalid_blood_type() {
        let manager = create_test_manager().await;
        let mut req = registration("jane@example.com");
        req.blood_type = Some("Z+".to_string());

        let result = manager.register(req).await;

        assert!(matches!(result, Err(AppError::InvalidBloodType(_))));
    }

    #[tokio::test]
    async fn test_login_success_sets_last_login() {
        let manager = create_test_manager().await;
        let account = manager.register(registration("jane@example.com")).await.unwrap();

        let login = manager.login("jane@example.com", "s3cret-pass").await.unwrap();

        assert!(!login.token.is_empty());
        assert_eq!(login.user.id, account.id);
        assert!(manager.get(&account.id).await.unwrap().last_login.is_some());

        let resolved = manager.verify_token(&login.token).await.unwrap();
        assert_eq!(resolved.id, account.id);
    }

    #[tokio::test]
    async fn test_login_wrong_password_has_no_side_effect() {
        let manager = create_test_manager().await;
        let account = manager.register(registration("jane@example.com")).await.unwrap();

        let result = manager.login("jane@example.com", "wrong-pass").await;

        assert!(matches!(result, Err(AppError::InvalidCredentials)));
        assert!(manager.get(&account.id).await.unwrap().last_login.is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_or_inactive() {
        let manager = create_test_manager().await;
        let account = manager.register(registration("jane@example.com")).await.unwrap();
        manager.deactivate(&account.id).await.unwrap();

        assert!(matches!(
            manager.login("jane@example.com", "s3cret-pass").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            manager.login("nobody@example.com", "s3cret-pass").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_verify_token_after_deactivation() {
        let manager = create_test_manager().await;
        manager.register(registration("jane@example.com")).await.unwrap();
        let login = manager.login("jane@example.com", "s3cret-pass").await.unwrap();

        manager.deactivate(&login.user.id).await.unwrap();

        assert!(matches!(
            manager.verify_token(&login.token).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_token_rejects_bank_tokens() {
        let manager = create_test_manager().await;
        let account = manager.register(registration("jane@example.com")).await.unwrap();
        let bank_token = manager
            .tokens
            .issue(&account.id, &account.email, None, TokenKind::BloodBank)
            .unwrap();

        assert!(matches!(
            manager.verify_token(&bank_token).await,
            Err(AppError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_whitelist() {
        let manager = create_test_manager().await;
        let account = manager.register(registration("jane@example.com")).await.unwrap();

        let updated = manager
            .update_profile(
                &account.id,
                UpdateProfileRequest {
                    phone: Some("020 1234 5678".to_string()),
                    blood_type: Some("AB+".to_string()),
                    is_available: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone.as_deref(), Some("020 1234 5678"));
        assert_eq!(updated.blood_type, Some(BloodType::AbPositive));
        assert!(!updated.is_available);
        // untouched fields survive
        assert_eq!(updated.name, "Jane Donor");
        assert_eq!(updated.address.city.as_deref(), Some("Pune"));
        assert_eq!(updated.email, account.email);
        assert_eq!(updated.role, Role::User);
    }

    #[tokio::test]
    async fn test_change_password() {
        let manager = create_test_manager().await;
        let account = manager.register(registration("jane@example.com")).await.unwrap();

        let wrong = manager
            .change_password(
                &account.id,
                ChangePasswordRequest {
                    current_password: "nope".to_string(),
                    new_password: "brand-new-pass".to_string(),
                },
            )
            .await;
        assert!(matches!(wrong, Err(AppError::Validation { .. })));

        manager
            .change_password(
                &account.id,
                ChangePasswordRequest {
                    current_password: "s3cret-pass".to_string(),
                    new_password: "brand-new-pass".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(manager.login("jane@example.com", "brand-new-pass").await.is_ok());
        assert!(manager.login("jane@example.com", "s3cret-pass").await.is_err());
    }

    #[tokio::test]
    async fn test_donor_search() {
        let manager = create_test_manager().await;
        manager.register(registration("a@example.com")).await.unwrap();

        let mut other = registration("b@example.com");
        other.blood_type = Some("A+".to_string());
        manager.register(other).await.unwrap();

        let mut not_donor = registration("c@example.com");
        not_donor.is_donor = false;
        manager.register(not_donor).await.unwrap();

        let today = Utc::now().date_naive();
        let o_neg = manager
            .search_donors(
                DonorFilter {
                    blood_type: Some("O-".to_string()),
                    city: Some("pune".to_string()),
                    ..Default::default()
                },
                today,
            )
            .await
            .unwrap();
        assert_eq!(o_neg.len(), 1);
        assert!(o_neg[0].eligible);

        let all = manager.search_donors(DonorFilter::default(), today).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_admin_is_idempotent() {
        let manager = create_test_manager().await;
        let config = BootstrapAdminConfig {
            email: "root@example.com".to_string(),
            password: "super-secret".to_string(),
            name: "Root".to_string(),
        };

        let first = manager.ensure_admin(&config).await.unwrap();
        let second = manager.ensure_admin(&config).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.role, Role::Admin);

        let stats = manager.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.admins, 1);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let manager = create_test_manager().await;
        manager.register(registration("a@example.com")).await.unwrap();
        let b = manager.register(registration("b@example.com")).await.unwrap();
        manager.set_role(&b.id, Role::Admin).await.unwrap();

        let admins = manager
            .list(AccountFilter {
                role: Some("admin".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].id, b.id);

        let searched = manager
            .list(AccountFilter {
                search: Some("A@EXAMPLE".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(searched.len(), 1);
    }
}
