//! Email-verification token management.
//!
//! Tokens are cryptographically random, stored as SHA-256 hashes, single-use,
//! and time-limited per the OWASP Forgot Password Cheat Sheet (the same
//! pattern applies equally well to email verification links).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use authforge_core::{AppResult, Clock};
use authforge_domain::{AuthTokenType, UserId};

/// Auth token record as persisted by the Credential Store.
#[derive(Debug, Clone)]
pub struct AuthTokenRecord {
    /// Token identifier.
    pub id: uuid::Uuid,
    /// Identity the token belongs to.
    pub identity_id: UserId,
    /// Email address the token was sent to.
    pub email: String,
    /// SHA-256 hash of the token value.
    pub token_hash: String,
    /// Type discriminator.
    pub token_type: AuthTokenType,
    /// Expiration timestamp.
    pub expires_at: DateTime<Utc>,
    /// When the token was consumed, if ever.
    pub used_at: Option<DateTime<Utc>>,
}

/// Repository port for auth token persistence.
#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    /// Stores a new auth token.
    async fn create_token(
        &self,
        identity_id: UserId,
        email: &str,
        token_hash: &str,
        token_type: AuthTokenType,
        expires_at: DateTime<Utc>,
    ) -> AppResult<uuid::Uuid>;

    /// Atomically consumes a valid token by its hash and returns the record.
    ///
    /// Consumption succeeds only when the token is unexpired and unused.
    /// `used_at` is set in the same statement to prevent replay races.
    async fn consume_valid_token(
        &self,
        token_hash: &str,
        token_type: AuthTokenType,
    ) -> AppResult<Option<AuthTokenRecord>>;

    /// Looks up an unused token by hash regardless of expiry, so a failed
    /// `consume_valid_token` can be attributed to "expired" versus "never
    /// existed or already used".
    async fn find_unused_token(
        &self,
        token_hash: &str,
        token_type: AuthTokenType,
    ) -> AppResult<Option<AuthTokenRecord>>;

    /// Invalidates all unused tokens of a given type for an identity.
    async fn invalidate_tokens_for_identity(
        &self,
        identity_id: UserId,
        token_type: AuthTokenType,
    ) -> AppResult<()>;
}

/// Port for sending emails. Infrastructure provides SMTP or console implementations.
#[async_trait]
pub trait EmailService: Send + Sync {
    /// Sends a plain-text or HTML email.
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: Option<&str>,
    ) -> AppResult<()>;
}

/// Application service for managing email-verification tokens.
#[derive(Clone)]
pub struct AuthTokenService {
    token_repository: Arc<dyn AuthTokenRepository>,
    email_service: Arc<dyn EmailService>,
    frontend_url: String,
    clock: Arc<dyn Clock>,
}

impl AuthTokenService {
    /// Creates a new auth token service.
    #[must_use]
    pub fn new(
        token_repository: Arc<dyn AuthTokenRepository>,
        email_service: Arc<dyn EmailService>,
        frontend_url: String,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            token_repository,
            email_service,
            frontend_url,
            clock,
        }
    }

    /// Returns a reference to the token repository.
    #[must_use]
    pub fn token_repository(&self) -> &Arc<dyn AuthTokenRepository> {
        &self.token_repository
    }
}

mod consume;
mod email_verification;
mod token_crypto;

#[cfg(test)]
mod tests;
