//! Federated Login Adapter: resolves a verified identity-provider assertion
//! into a local identity, linking or auto-provisioning as needed.
//!
//! Verifying the assertion signature/audience itself is an external
//! collaborator's job (an OIDC/OAuth client library sitting in
//! infrastructure); this service only decides which local identity an
//! already-verified assertion maps to.

use std::sync::Arc;

use authforge_core::AppError;
use authforge_domain::{AuthError, IdentityKind, IdentityStatus, UserId};

use crate::identity_service::{IdentityRecord, IdentityRepository, NewIdentity};

/// A verified claim from an identity provider, handed to this service after
/// signature/audience verification has already happened upstream.
pub struct FederatedAssertion {
    /// Provider-stable subject id (`sub` claim).
    pub provider_id: String,
    /// Provider name, e.g. `"google"`.
    pub provider: String,
    /// Verified email address from the provider.
    pub email: String,
    /// Whether the provider asserts the email is itself verified.
    pub email_verified: bool,
    /// Display name suggested by the provider, used only on auto-provision.
    pub display_name: Option<String>,
}

/// Resolves federated assertions to local identities.
#[derive(Clone)]
pub struct FederatedLoginService {
    identity_repository: Arc<dyn IdentityRepository>,
}

impl FederatedLoginService {
    /// Creates a new federated login adapter.
    #[must_use]
    pub fn new(identity_repository: Arc<dyn IdentityRepository>) -> Self {
        Self { identity_repository }
    }

    /// Resolves an assertion to a usable identity id, in precedence order:
    /// 1. An identity already linked to this provider id.
    /// 2. An identity matching the asserted email, which gets the provider
    ///    linked and promoted to `"both"`.
    /// 3. A brand-new auto-provisioned identity, active and email-verified
    ///    immediately since the provider already vouched for the email.
    pub async fn resolve(&self, assertion: &FederatedAssertion) -> Result<UserId, AuthError> {
        if let Some(existing) = self
            .identity_repository
            .find_by_federated_id(&assertion.provider_id)
            .await?
        {
            return Ok(existing.id);
        }

        if let Some(existing) = self
            .identity_repository
            .find_by_email(&assertion.email)
            .await?
        {
            self.link(&existing, assertion).await?;
            return Ok(existing.id);
        }

        self.auto_provision(assertion).await
    }

    async fn link(
        &self,
        existing: &IdentityRecord,
        assertion: &FederatedAssertion,
    ) -> Result<(), AuthError> {
        self.identity_repository
            .link_federated_id(existing.id, &assertion.provider_id)
            .await
            .map_err(AuthError::from)
    }

    async fn auto_provision(&self, assertion: &FederatedAssertion) -> Result<UserId, AuthError> {
        let display_name = assertion
            .display_name
            .clone()
            .unwrap_or_else(|| assertion.email.clone());

        let id = self
            .identity_repository
            .create(NewIdentity {
                email: assertion.email.clone(),
                display_name,
                phone: String::new(),
                kind: IdentityKind::Individual,
                password_hash: None,
                status: IdentityStatus::Active,
                email_verified: assertion.email_verified,
                federated_id: Some(assertion.provider_id.clone()),
                federated_provider: Some(assertion.provider.clone()),
            })
            .await
            .map_err(|error| match error {
                AppError::Conflict(message) => AuthError::Internal(AppError::Conflict(message)),
                other => AuthError::from(other),
            })?;

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use authforge_core::AppResult;

    use crate::identity_service::IdentityPatch;

    use super::*;

    struct InMemoryIdentityRepository {
        by_email: Mutex<HashMap<String, IdentityRecord>>,
        by_federated_id: Mutex<HashMap<String, String>>,
    }

    impl InMemoryIdentityRepository {
        fn new() -> Self {
            Self {
                by_email: Mutex::new(HashMap::new()),
                by_federated_id: Mutex::new(HashMap::new()),
            }
        }

        fn seed_password_identity(&self, email: &str) -> UserId {
            let id = UserId::new();
            self.by_email.lock().unwrap_or_else(|e| e.into_inner()).insert(
                email.to_owned(),
                IdentityRecord {
                    id,
                    email: email.to_owned(),
                    display_name: "Existing".to_owned(),
                    kind: IdentityKind::Individual,
                    status: IdentityStatus::Active,
                    password_hash: Some("hash".to_owned()),
                    email_verified: true,
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

        async fn find_by_federated_id(&self, federated_id: &str) -> AppResult<Option<IdentityRecord>> {
            let email = self
                .by_federated_id
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(federated_id)
                .cloned();
            match email {
                Some(email) => self.find_by_email(&email).await,
                None => Ok(None),
            }
        }

        async fn create(&self, draft: NewIdentity) -> AppResult<UserId> {
            let id = UserId::new();
            if let Some(federated_id) = &draft.federated_id {
                self.by_federated_id
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(federated_id.clone(), draft.email.clone());
            }
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

        async fn link_federated_id(&self, id: UserId, federated_id: &str) -> AppResult<()> {
            let mut by_email = self.by_email.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(record) = by_email.values_mut().find(|record| record.id == id) {
                record.federated_id = Some(federated_id.to_owned());
                record.federated_provider = Some("both".to_owned());
                self.by_federated_id
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(federated_id.to_owned(), record.email.clone());
            }
            Ok(())
        }

        async fn record_failed_login(&self, _id: UserId, _threshold: u32, _lock_for_secs: i64) -> AppResult<()> {
            Ok(())
        }

        async fn reset_failed_logins(&self, _id: UserId) -> AppResult<()> {
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

    fn assertion(email: &str) -> FederatedAssertion {
        FederatedAssertion {
            provider_id: "google-subject-1".to_owned(),
            provider: "google".to_owned(),
            email: email.to_owned(),
            email_verified: true,
            display_name: Some("New User".to_owned()),
        }
    }

    #[tokio::test]
    async fn unverified_assertion_still_resolves_and_is_recorded_as_unverified() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        let service = FederatedLoginService::new(repository.clone());
        let mut unverified = assertion("new@example.com");
        unverified.email_verified = false;

        let id = service
            .resolve(&unverified)
            .await
            .unwrap_or_else(|_| panic!("test"));

        let stored = repository
            .find_by_id(id)
            .await
            .unwrap_or_else(|_| panic!("test"))
            .unwrap_or_else(|| panic!("test"));
        assert!(!stored.email_verified);
    }

    #[tokio::test]
    async fn unknown_email_auto_provisions() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        let service = FederatedLoginService::new(repository.clone());
        let id = service
            .resolve(&assertion("new@example.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));

        let stored = repository
            .find_by_id(id)
            .await
            .unwrap_or_else(|_| panic!("test"))
            .unwrap_or_else(|| panic!("test"));
        assert_eq!(stored.status, IdentityStatus::Active);
        assert!(stored.email_verified);
    }

    #[tokio::test]
    async fn matching_email_links_and_promotes_provider() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        let id = repository.seed_password_identity("existing@example.com");
        let service = FederatedLoginService::new(repository.clone());

        let resolved = service
            .resolve(&assertion("existing@example.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(resolved, id);

        let stored = repository
            .find_by_id(id)
            .await
            .unwrap_or_else(|_| panic!("test"))
            .unwrap_or_else(|| panic!("test"));
        assert_eq!(stored.federated_provider.as_deref(), Some("both"));
    }

    #[tokio::test]
    async fn same_provider_id_resolves_without_duplicate_create() {
        let repository = Arc::new(InMemoryIdentityRepository::new());
        let service = FederatedLoginService::new(repository.clone());
        let first = service
            .resolve(&assertion("new@example.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));
        let second = service
            .resolve(&assertion("new@example.com"))
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_eq!(first, second);
    }
}
