//! Identity persistence port and the registration/profile application service.
//!
//! Follows OWASP Authentication Cheat Sheet guidance on generic failure
//! messages and constant-time responses: every path that might reveal
//! whether an email is already registered still performs a password hash.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use authforge_core::{AppError, AppResult};
use authforge_domain::{EmailAddress, IdentityKind, IdentityStatus, UserId, validate_password};

/// Snapshot of an identity row as persisted by the Credential Store.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    /// Unique identifier.
    pub id: UserId,
    /// Canonical, case-folded email address.
    pub email: String,
    /// Display name chosen at registration or supplied by a federated provider.
    pub display_name: String,
    /// Individual or business account.
    pub kind: IdentityKind,
    /// Lifecycle status.
    pub status: IdentityStatus,
    /// Argon2id password hash, or `None` for federated-only accounts.
    pub password_hash: Option<String>,
    /// Whether the email address has been confirmed.
    pub email_verified: bool,
    /// Federated provider id (`google_id` equivalent), if linked.
    pub federated_id: Option<String>,
    /// Federated provider name, if linked (`google`, or `both` once a
    /// password has also been set).
    pub federated_provider: Option<String>,
    /// Encrypted TOTP secret, if TOTP enrollment has been started.
    pub totp_secret_ct: Option<Vec<u8>>,
    /// Whether TOTP has been confirmed and is active.
    pub totp_enabled: bool,
    /// Encrypted backup-code bundle, if TOTP has been enrolled.
    pub backup_codes_ct: Option<Vec<u8>>,
    /// Whether email-based MFA is active.
    pub email_mfa_enabled: bool,
    /// Consecutive failed password attempts since the last success.
    pub failed_login_count: i32,
    /// Locked out until this time, if currently locked.
    pub locked_until: Option<DateTime<Utc>>,
}

impl IdentityRecord {
    /// True if any second factor is currently enabled.
    #[must_use]
    pub fn has_mfa(&self) -> bool {
        self.totp_enabled || self.email_mfa_enabled
    }
}

/// Fields the Credential Store may update on an identity outside of a
/// dedicated operation (e.g. profile changes). Exposed for completeness of
/// the data model; no external operation currently drives it.
#[derive(Debug, Clone, Default)]
pub struct IdentityPatch {
    /// New display name, if changing.
    pub display_name: Option<String>,
    /// New phone number, if changing.
    pub phone: Option<String>,
}

/// Repository port over the Identity entity.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Finds a non-deleted identity by case-folded email.
    async fn find_by_email(&self, email: &str) -> AppResult<Option<IdentityRecord>>;

    /// Finds a non-deleted identity by id.
    async fn find_by_id(&self, id: UserId) -> AppResult<Option<IdentityRecord>>;

    /// Finds a non-deleted identity by its federated provider id.
    async fn find_by_federated_id(&self, federated_id: &str) -> AppResult<Option<IdentityRecord>>;

    /// Inserts a new identity. Fails with `AppError::Conflict` if an active
    /// identity already owns the email.
    async fn create(&self, draft: NewIdentity) -> AppResult<UserId>;

    /// Applies a profile patch to a non-deleted identity.
    async fn apply_patch(&self, id: UserId, patch: IdentityPatch) -> AppResult<()>;

    /// Marks the identity's email address as verified and activates it.
    async fn mark_email_verified(&self, id: UserId) -> AppResult<()>;

    /// Links a federated provider id onto an existing identity, promoting
    /// the provider to `"both"` when a password is already set.
    async fn link_federated_id(&self, id: UserId, federated_id: &str) -> AppResult<()>;

    /// Increments the failed-login counter, locking the account once the
    /// threshold is crossed.
    async fn record_failed_login(&self, id: UserId, threshold: u32, lock_for_secs: i64)
    -> AppResult<()>;

    /// Resets the failed-login counter and clears any lock.
    async fn reset_failed_logins(&self, id: UserId) -> AppResult<()>;

    /// Stamps the last successful login time.
    async fn record_successful_login(&self, id: UserId) -> AppResult<()>;

    /// Persists encrypted TOTP secret and backup-code material without
    /// enabling TOTP (used during enrollment, before confirmation).
    async fn store_totp_material(
        &self,
        id: UserId,
        totp_secret_ct: &[u8],
        backup_codes_ct: &[u8],
    ) -> AppResult<()>;

    /// Flips `totp_enabled = true` for an identity with stored secret material.
    async fn confirm_totp(&self, id: UserId) -> AppResult<()>;

    /// Clears TOTP secret and backup-code material and disables TOTP.
    async fn clear_totp(&self, id: UserId) -> AppResult<()>;

    /// Replaces the stored, encrypted backup-code bundle.
    async fn update_backup_codes(&self, id: UserId, backup_codes_ct: &[u8]) -> AppResult<()>;

    /// Enables or disables email MFA.
    async fn set_email_mfa_enabled(&self, id: UserId, enabled: bool) -> AppResult<()>;
}

/// Fields required to insert a brand-new identity.
pub struct NewIdentity {
    /// Canonical email address.
    pub email: String,
    /// Display name.
    pub display_name: String,
    /// Phone number; federated auto-provision uses a placeholder.
    pub phone: String,
    /// Individual or business.
    pub kind: IdentityKind,
    /// Argon2id password hash, `None` for a federated-only identity.
    pub password_hash: Option<String>,
    /// Initial lifecycle status.
    pub status: IdentityStatus,
    /// Initial verification state.
    pub email_verified: bool,
    /// Federated id to link immediately, if auto-provisioned from an assertion.
    pub federated_id: Option<String>,
    /// Federated provider name, paired with `federated_id`.
    pub federated_provider: Option<String>,
}

/// Port for password hashing. Keeps the application layer free of direct
/// cryptographic library coupling.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hashes a plaintext password using Argon2id.
    fn hash_password(&self, password: &str) -> AppResult<String>;

    /// Verifies a plaintext password against a stored hash. Runs in
    /// constant time regardless of validity.
    fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool>;
}

/// Parameters accepted by `register`.
pub struct RegisterParams {
    /// Email address for the new account.
    pub email: String,
    /// Plaintext password, validated against OWASP/NIST rules.
    pub password: String,
    /// Display name.
    pub display_name: String,
    /// Phone number.
    pub phone: String,
    /// Individual or business account.
    pub kind: IdentityKind,
}

/// Application service for identity registration and profile lifecycle.
#[derive(Clone)]
pub struct IdentityService {
    identity_repository: Arc<dyn IdentityRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
}

impl IdentityService {
    /// Creates a new identity service.
    #[must_use]
    pub fn new(
        identity_repository: Arc<dyn IdentityRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            identity_repository,
            password_hasher,
        }
    }

    /// Registers a new password-based identity in `pending_verification`
    /// status. Returns its id; the caller is responsible for dispatching
    /// the verification email via `AuthTokenService`.
    pub async fn register(&self, params: RegisterParams) -> AppResult<UserId> {
        let email_address = EmailAddress::new(&params.email)?;
        validate_password(&params.password)?;

        let existing = self
            .identity_repository
            .find_by_email(email_address.as_str())
            .await?;

        if existing.is_some() {
            // Hash anyway so the duplicate-email path costs the same time
            // as the happy path; avoids a user-enumeration timing signal.
            let _ = self.password_hasher.hash_password(&params.password);
            return Err(AppError::Conflict(
                "an account with this email already exists".to_owned(),
            ));
        }

        let password_hash = self.password_hasher.hash_password(&params.password)?;

        self.identity_repository
            .create(NewIdentity {
                email: email_address.as_str().to_owned(),
                display_name: params.display_name,
                phone: params.phone,
                kind: params.kind,
                password_hash: Some(password_hash),
                status: IdentityStatus::PendingVerification,
                email_verified: false,
                federated_id: None,
                federated_provider: None,
            })
            .await
    }

    /// Returns an identity by id, if it exists.
    pub async fn find_by_id(&self, id: UserId) -> AppResult<Option<IdentityRecord>> {
        self.identity_repository.find_by_id(id).await
    }

    /// Returns an identity by email, if it exists.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<IdentityRecord>> {
        self.identity_repository.find_by_email(email).await
    }

    /// Returns the underlying repository for collaborating services.
    #[must_use]
    pub fn identity_repository(&self) -> &Arc<dyn IdentityRepository> {
        &self.identity_repository
    }

    /// Returns the underlying password hasher for collaborating services.
    #[must_use]
    pub fn password_hasher(&self) -> &Arc<dyn PasswordHasher> {
        &self.password_hasher
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    struct InMemoryIdentityRepository {
        by_email: Mutex<HashMap<String, IdentityRecord>>,
    }

    impl InMemoryIdentityRepository {
        fn new() -> Self {
            Self {
                by_email: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl IdentityRepository for InMemoryIdentityRepository {
        async fn find_by_email(&self, email: &str) -> AppResult<Option<IdentityRecord>> {
            Ok(self.by_email.lock().unwrap_or_else(|e| e.into_inner()).get(email).cloned())
        }

        async fn find_by_id(&self, id: UserId) -> AppResult<Option<IdentityRecord>> {
            Ok(self
                .by_email
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .values()
                .find(|record| record.id == id)
                .cloned())
        }

        async fn find_by_federated_id(
            &self,
            _federated_id: &str,
        ) -> AppResult<Option<IdentityRecord>> {
            Ok(None)
        }

        async fn create(&self, draft: NewIdentity) -> AppResult<UserId> {
            let id = UserId::new();
            let record = IdentityRecord {
                id,
                email: draft.email.clone(),
                display_name: draft.display_name,
                kind: draft.kind,
                status: draft.status,
                password_hash: draft.password_hash,
                email_verified: draft.email_verified,
                federated_id: draft.federated_id,
                federated_provider: draft.federated_provider,
                totp_secret_ct: None,
                totp_enabled: false,
                backup_codes_ct: None,
                email_mfa_enabled: false,
                failed_login_count: 0,
                locked_until: None,
            };
            self.by_email
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .insert(draft.email, record);
            Ok(id)
        }

        async fn apply_patch(&self, _id: UserId, _patch: IdentityPatch) -> AppResult<()> {
            Ok(())
        }

        async fn mark_email_verified(&self, _id: UserId) -> AppResult<()> {
            Ok(())
        }

        async fn link_federated_id(&self, _id: UserId, _federated_id: &str) -> AppResult<()> {
            Ok(())
        }

        async fn record_failed_login(
            &self,
            _id: UserId,
            _threshold: u32,
            _lock_for_secs: i64,
        ) -> AppResult<()> {
            Ok(())
        }

        async fn reset_failed_logins(&self, _id: UserId) -> AppResult<()> {
            Ok(())
        }

        async fn record_successful_login(&self, _id: UserId) -> AppResult<()> {
            Ok(())
        }

        async fn store_totp_material(
            &self,
            _id: UserId,
            _totp_secret_ct: &[u8],
            _backup_codes_ct: &[u8],
        ) -> AppResult<()> {
            Ok(())
        }

        async fn confirm_totp(&self, _id: UserId) -> AppResult<()> {
            Ok(())
        }

        async fn clear_totp(&self, _id: UserId) -> AppResult<()> {
            Ok(())
        }

        async fn update_backup_codes(&self, _id: UserId, _backup_codes_ct: &[u8]) -> AppResult<()> {
            Ok(())
        }

        async fn set_email_mfa_enabled(&self, _id: UserId, _enabled: bool) -> AppResult<()> {
            Ok(())
        }
    }

    struct StubHasher;

    impl PasswordHasher for StubHasher {
        fn hash_password(&self, password: &str) -> AppResult<String> {
            Ok(format!("hashed:{password}"))
        }

        fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
            Ok(hash == format!("hashed:{password}"))
        }
    }

    fn service() -> IdentityService {
        IdentityService::new(Arc::new(InMemoryIdentityRepository::new()), Arc::new(StubHasher))
    }

    #[tokio::test]
    async fn register_rejects_weak_password() {
        let service = service();
        let result = service
            .register(RegisterParams {
                email: "a@example.com".to_owned(),
                password: "short".to_owned(),
                display_name: "A".to_owned(),
                phone: "+10000000000".to_owned(),
                kind: IdentityKind::Individual,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn register_creates_pending_identity() {
        let service = service();
        let id = service
            .register(RegisterParams {
                email: "a@example.com".to_owned(),
                password: "SecurePass123!".to_owned(),
                display_name: "A".to_owned(),
                phone: "+10000000000".to_owned(),
                kind: IdentityKind::Individual,
            })
            .await
            .unwrap_or_else(|_| panic!("test"));

        let stored = service
            .find_by_id(id)
            .await
            .unwrap_or_else(|_| panic!("test"))
            .unwrap_or_else(|| panic!("test"));
        assert_eq!(stored.status, IdentityStatus::PendingVerification);
        assert!(!stored.email_verified);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let service = service();
        let params = || RegisterParams {
            email: "dup@example.com".to_owned(),
            password: "SecurePass123!".to_owned(),
            display_name: "A".to_owned(),
            phone: "+10000000000".to_owned(),
            kind: IdentityKind::Individual,
        };
        service.register(params()).await.unwrap_or_else(|_| panic!("test"));
        let second = service.register(params()).await;
        assert!(second.is_err());
    }
}
