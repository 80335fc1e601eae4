//! Authenticator: verifies a password against a stored identity and applies
//! the account-lockout policy.
//!
//! Lockout is flat, not exponential: five consecutive failures locks the
//! account for fifteen minutes, and a single success clears the counter.

use std::sync::Arc;

use authforge_core::Clock;
use authforge_domain::{AuthOutcome, IdentityStatus, UserId};

use crate::identity_service::{IdentityRepository, PasswordHasher};

/// Consecutive failures that trigger a lockout.
pub const LOCKOUT_THRESHOLD: u32 = 5;
/// Lockout duration once the threshold is crossed.
pub const LOCKOUT_DURATION_SECS: i64 = 15 * 60;

/// Verifies credentials and enforces lockout, independent of any MFA step.
#[derive(Clone)]
pub struct Authenticator {
    identity_repository: Arc<dyn IdentityRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    lockout_threshold: u32,
    lockout_duration_secs: i64,
}

impl Authenticator {
    /// Creates a new authenticator with the default lockout policy
    /// (`LOCKOUT_THRESHOLD` consecutive failures, `LOCKOUT_DURATION_SECS`).
    #[must_use]
    pub fn new(
        identity_repository: Arc<dyn IdentityRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity_repository,
            password_hasher,
            clock,
            lockout_threshold: LOCKOUT_THRESHOLD,
            lockout_duration_secs: LOCKOUT_DURATION_SECS,
        }
    }

    /// Overrides the lockout policy, e.g. from deployment configuration.
    #[must_use]
    pub fn with_lockout_policy(mut self, threshold: u32, duration_secs: i64) -> Self {
        self.lockout_threshold = threshold;
        self.lockout_duration_secs = duration_secs;
        self
    }

    /// Verifies `email`/`password` and returns a tagged outcome.
    ///
    /// Always performs a password hash comparison, even when no identity is
    /// found, by checking against a fixed dummy hash, so a nonexistent
    /// account and a wrong password take the same time.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<AuthOutcome, authforge_domain::AuthError> {
        let record = self.identity_repository.find_by_email(email).await?;

        let Some(record) = record else {
            let _ = self.password_hasher.verify_password(password, DUMMY_HASH);
            return Ok(AuthOutcome::InvalidCredentials);
        };

        if let Some(locked_until) = record.locked_until {
            if locked_until > self.clock.now() {
                return Ok(AuthOutcome::AccountLocked);
            }
        }

        let Some(password_hash) = record.password_hash.as_deref() else {
            let _ = self.password_hasher.verify_password(password, DUMMY_HASH);
            return Ok(AuthOutcome::InvalidCredentials);
        };

        let matches = self.password_hasher.verify_password(password, password_hash)?;

        if !matches {
            self.identity_repository
                .record_failed_login(record.id, self.lockout_threshold, self.lockout_duration_secs)
                .await?;
            return Ok(AuthOutcome::InvalidCredentials);
        }

        if record.status == IdentityStatus::Suspended || record.status == IdentityStatus::Inactive {
            return Ok(AuthOutcome::AccountInactive);
        }

        if !record.email_verified || record.status == IdentityStatus::PendingVerification {
            return Ok(AuthOutcome::EmailNotVerified);
        }

        self.identity_repository.reset_failed_logins(record.id).await?;
        self.identity_repository.record_successful_login(record.id).await?;

        Ok(AuthOutcome::Authenticated(record.id))
    }
}

/// An Argon2id hash of a fixed, unguessable dummy password. Comparing
/// against this when no identity exists or an identity has no password
/// keeps the failure path's latency indistinguishable from a real check.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHR2YWx1ZQ$dGhpc2lzbm90YXJlYWxoYXNo";

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use authforge_core::{AppResult, FixedClock};
    use authforge_domain::IdentityKind;
    use chrono::{Duration, Utc};

    use crate::identity_service::{IdentityPatch, NewIdentity};

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

        fn seed(&self, email: &str, password_hash: &str, status: IdentityStatus, email_verified: bool) -> UserId {
            let id = UserId::new();
            self.by_email.lock().unwrap_or_else(|e| e.into_inner()).insert(
                email.to_owned(),
                IdentityRecord {
                    id,
                    email: email.to_owned(),
                    display_name: "A".to_owned(),
                    kind: IdentityKind::Individual,
                    status,
                    password_hash: Some(password_hash.to_owned()),
                    email_verified,
                    federated_id: None,
                    federated_provider: None,
                    totp_secret_ct: None,
                    totp_enabled: false,
                    backup_codes_ct: None,
                    email_mfa_enabled: false,
                    failed_login_count: 0,
                    locked_until: None,
                },
            );
            id
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

        async fn find_by_federated_id(&self, _federated_id: &str) -> AppResult<Option<IdentityRecord>> {
            Ok(None)
        }

        async fn create(&self, _draft: NewIdentity) -> AppResult<UserId> {
            Ok(UserId::new())
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

        async fn record_failed_login(&self, id: UserId, threshold: u32, lock_for_secs: i64) -> AppResult<()> {
            let mut guard = self.by_email.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(record) = guard.values_mut().find(|record| record.id == id) {
                record.failed_login_count += 1;
                if record.failed_login_count as u32 >= threshold {
                    record.locked_until = Some(Utc::now() + Duration::seconds(lock_for_secs));
                }
            }
            Ok(())
        }

        async fn reset_failed_logins(&self, id: UserId) -> AppResult<()> {
            let mut guard = self.by_email.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(record) = guard.values_mut().find(|record| record.id == id) {
                record.failed_login_count = 0;
                record.locked_until = None;
            }
            Ok(())
        }

        async fn record_successful_login(&self, _id: UserId) -> AppResult<()> {
            Ok(())
        }

        async fn store_totp_material(&self, _id: UserId, _totp_secret_ct: &[u8], _backup_codes_ct: &[u8]) -> AppResult<()> {
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

    fn authenticator(repository: Arc<InMemoryIdentityRepository>) -> Authenticator {
        Authenticator::new(repository, Arc::new(StubHasher), Arc::new(FixedClock::new(Utc::now())))
    }

    #[tokio::test]
    async fn unknown_email_reports_invalid_credentials() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        let auth = authenticator(repository);
        let outcome = auth
            .authenticate("nobody@example.com", "whatever")
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(outcome, AuthOutcome::InvalidCredentials);
    }

    #[tokio::test]
    async fn unverified_email_blocks_login_after_correct_password() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        repository.seed("a@example.com", "hashed:correct", IdentityStatus::PendingVerification, false);
        let auth = authenticator(repository);
        let outcome = auth
            .authenticate("a@example.com", "correct")
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(outcome, AuthOutcome::EmailNotVerified);
    }

    #[tokio::test]
    async fn fifth_consecutive_failure_locks_the_account() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        repository.seed("a@example.com", "hashed:correct", IdentityStatus::Active, true);
        let auth = authenticator(repository);

        for _ in 0..LOCKOUT_THRESHOLD {
            let outcome = auth
                .authenticate("a@example.com", "wrong")
                .await
                .unwrap_or_else(|_| panic!("test"));
            assert_eq!(outcome, AuthOutcome::InvalidCredentials);
        }

        let locked = auth
            .authenticate("a@example.com", "correct")
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(locked, AuthOutcome::AccountLocked);
    }

    #[tokio::test]
    async fn correct_password_on_active_verified_identity_authenticates() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        let id = repository.seed("a@example.com", "hashed:correct", IdentityStatus::Active, true);
        let auth = authenticator(repository);
        let outcome = auth
            .authenticate("a@example.com", "correct")
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(outcome, AuthOutcome::Authenticated(id));
    }
}
