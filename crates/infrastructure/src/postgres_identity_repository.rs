//! PostgreSQL-backed identity repository.

use async_trait::async_trait;
use sqlx::PgPool;

use authforge_application::{IdentityPatch, IdentityRecord, IdentityRepository, NewIdentity};
use authforge_core::{AppError, AppResult};
use authforge_domain::{IdentityKind, IdentityStatus, UserId};

mod account;
mod lookup;
mod mfa;

/// PostgreSQL implementation of the identity repository port.
#[derive(Clone)]
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IdentityRow {
    id: uuid::Uuid,
    email: String,
    display_name: String,
    kind: String,
    status: String,
    password_hash: Option<String>,
    email_verified: bool,
    federated_id: Option<String>,
    federated_provider: Option<String>,
    totp_secret_ct: Option<Vec<u8>>,
    totp_enabled: bool,
    backup_codes_ct: Option<Vec<u8>>,
    email_mfa_enabled: bool,
    failed_login_count: i32,
    locked_until: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<IdentityRow> for IdentityRecord {
    type Error = AppError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            email: row.email,
            display_name: row.display_name,
            kind: parse_kind(&row.kind)?,
            status: IdentityStatus::parse(&row.status)?,
            password_hash: row.password_hash,
            email_verified: row.email_verified,
            federated_id: row.federated_id,
            federated_provider: row.federated_provider,
            totp_secret_ct: row.totp_secret_ct,
            totp_enabled: row.totp_enabled,
            backup_codes_ct: row.backup_codes_ct,
            email_mfa_enabled: row.email_mfa_enabled,
            failed_login_count: row.failed_login_count,
            locked_until: row.locked_until,
        })
    }
}

fn parse_kind(value: &str) -> AppResult<IdentityKind> {
    match value {
        "individual" => Ok(IdentityKind::Individual),
        "business" => Ok(IdentityKind::Business),
        other => Err(AppError::Internal(format!("unknown identity kind '{other}'"))),
    }
}

fn kind_str(kind: IdentityKind) -> &'static str {
    match kind {
        IdentityKind::Individual => "individual",
        IdentityKind::Business => "business",
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<IdentityRecord>> {
        self.find_by_email_impl(email).await
    }

    async fn find_by_id(&self, id: UserId) -> AppResult<Option<IdentityRecord>> {
        self.find_by_id_impl(id).await
    }

    async fn find_by_federated_id(&self, federated_id: &str) -> AppResult<Option<IdentityRecord>> {
        self.find_by_federated_id_impl(federated_id).await
    }

    async fn create(&self, draft: NewIdentity) -> AppResult<UserId> {
        self.create_impl(draft).await
    }

    async fn apply_patch(&self, id: UserId, patch: IdentityPatch) -> AppResult<()> {
        self.apply_patch_impl(id, patch).await
    }

    async fn mark_email_verified(&self, id: UserId) -> AppResult<()> {
        self.mark_email_verified_impl(id).await
    }

    async fn link_federated_id(&self, id: UserId, federated_id: &str) -> AppResult<()> {
        self.link_federated_id_impl(id, federated_id).await
    }

    async fn record_failed_login(
        &self,
        id: UserId,
        threshold: u32,
        lock_for_secs: i64,
    ) -> AppResult<()> {
        self.record_failed_login_impl(id, threshold, lock_for_secs).await
    }

    async fn reset_failed_logins(&self, id: UserId) -> AppResult<()> {
        self.reset_failed_logins_impl(id).await
    }

    async fn record_successful_login(&self, id: UserId) -> AppResult<()> {
        self.record_successful_login_impl(id).await
    }

    async fn store_totp_material(
        &self,
        id: UserId,
        totp_secret_ct: &[u8],
        backup_codes_ct: &[u8],
    ) -> AppResult<()> {
        self.store_totp_material_impl(id, totp_secret_ct, backup_codes_ct).await
    }

    async fn confirm_totp(&self, id: UserId) -> AppResult<()> {
        self.confirm_totp_impl(id).await
    }

    async fn clear_totp(&self, id: UserId) -> AppResult<()> {
        self.clear_totp_impl(id).await
    }

    async fn update_backup_codes(&self, id: UserId, backup_codes_ct: &[u8]) -> AppResult<()> {
        self.update_backup_codes_impl(id, backup_codes_ct).await
    }

    async fn set_email_mfa_enabled(&self, id: UserId, enabled: bool) -> AppResult<()> {
        self.set_email_mfa_enabled_impl(id, enabled).await
    }
}
