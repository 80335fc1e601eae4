//! MFA engine: TOTP enrollment/verification, backup codes, and email OTP.
//!
//! Follows the OWASP Multifactor Authentication Cheat Sheet:
//! - TOTP codes are 6-digit, 30-second window, +/-1 step tolerance.
//! - Email-OTP codes are single-use and stored hashed; backup codes are
//!   single-use and stored as plaintext inside the encrypted-at-rest bundle,
//!   compared in constant time.
//! - Every verification attempt, successful or not, is logged.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use authforge_core::{AppResult, Clock};
use authforge_domain::{AuthError, MfaType, UserId};

use crate::identity_service::{IdentityRepository, PasswordHasher};

/// TOTP enrollment data returned once for QR code / manual entry display.
#[derive(Debug, Clone)]
pub struct TotpEnrollment {
    /// Base32-encoded TOTP secret for manual entry.
    pub secret_base32: String,
    /// `otpauth://` URI for QR code generation.
    pub otpauth_uri: String,
    /// Ten single-use numeric backup codes (plaintext, shown exactly once).
    pub backup_codes: Vec<String>,
}

/// Port for TOTP secret generation and code verification.
pub trait TotpProvider: Send + Sync {
    /// Generates a new TOTP secret and returns `(secret_bytes, base32, otpauth_uri)`.
    fn generate_secret(&self, issuer: &str, email: &str) -> AppResult<(Vec<u8>, String, String)>;

    /// Verifies a TOTP code against a secret at the given instant, with
    /// +/-1 step tolerance.
    fn verify_code(&self, secret_bytes: &[u8], code: &str, at: DateTime<Utc>) -> AppResult<bool>;
}

/// Port for encrypting/decrypting TOTP secrets and backup codes at rest.
pub trait SecretEncryptor: Send + Sync {
    /// Encrypts plaintext secret material for database storage.
    fn encrypt(&self, plaintext: &[u8]) -> AppResult<Vec<u8>>;

    /// Decrypts stored secret material.
    fn decrypt(&self, ciphertext: &[u8]) -> AppResult<Vec<u8>>;
}

/// A single append-only record of an MFA verification attempt.
#[derive(Debug, Clone)]
pub struct MfaAttempt {
    /// Identity the attempt was made against.
    pub identity_id: UserId,
    /// Which factor was used.
    pub method: MfaType,
    /// Whether the attempt succeeded.
    pub success: bool,
    /// Caller IP, if known.
    pub ip_address: Option<String>,
    /// Caller user agent, if known.
    pub user_agent: Option<String>,
}

/// Repository port for the append-only MFA attempt log.
#[async_trait]
pub trait MfaAttemptRepository: Send + Sync {
    /// Appends an attempt record.
    async fn append(&self, attempt: MfaAttempt) -> AppResult<()>;
}

/// Repository port for transient email-OTP codes.
#[async_trait]
pub trait EmailOtpRepository: Send + Sync {
    /// Stores a new OTP code hash for an identity.
    async fn insert(
        &self,
        identity_id: UserId,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Attempts to consume a usable code for the identity by running
    /// `matches` (a slow-hash verification closure) against every unused,
    /// unexpired stored hash, most recent first, and atomically marking the
    /// first match used.
    ///
    /// Because the stored hash is a slow, salted hash rather than a
    /// deterministic digest, this cannot be a single `UPDATE ... WHERE
    /// hash = ?`; the implementation performs the scan and the match under
    /// a transaction so two concurrent verifications cannot both consume
    /// the same row.
    ///
    /// Returns `true` iff a matching usable code was found and consumed.
    async fn try_consume(
        &self,
        identity_id: UserId,
        matches: &(dyn Fn(&str) -> bool + Send + Sync),
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Port for delivering the plaintext email-OTP code to the user.
#[async_trait]
pub trait OtpMailer: Send + Sync {
    /// Sends the one-time code to the identity's email address.
    async fn send_code(&self, email: &str, code: &str) -> AppResult<()>;
}

/// Application service for MFA enrollment, management, and verification.
#[derive(Clone)]
pub struct MfaService {
    identity_repository: Arc<dyn IdentityRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    totp_provider: Arc<dyn TotpProvider>,
    secret_encryptor: Arc<dyn SecretEncryptor>,
    email_otp_repository: Arc<dyn EmailOtpRepository>,
    otp_mailer: Arc<dyn OtpMailer>,
    attempt_repository: Arc<dyn MfaAttemptRepository>,
    clock: Arc<dyn Clock>,
    totp_issuer: String,
}

impl MfaService {
    /// Creates a new MFA service.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identity_repository: Arc<dyn IdentityRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        totp_provider: Arc<dyn TotpProvider>,
        secret_encryptor: Arc<dyn SecretEncryptor>,
        email_otp_repository: Arc<dyn EmailOtpRepository>,
        otp_mailer: Arc<dyn OtpMailer>,
        attempt_repository: Arc<dyn MfaAttemptRepository>,
        clock: Arc<dyn Clock>,
        totp_issuer: String,
    ) -> Self {
        Self {
            identity_repository,
            password_hasher,
            totp_provider,
            secret_encryptor,
            email_otp_repository,
            otp_mailer,
            attempt_repository,
            clock,
            totp_issuer,
        }
    }

    async fn log_attempt(
        &self,
        identity_id: UserId,
        method: MfaType,
        success: bool,
    ) -> AppResult<()> {
        self.attempt_repository
            .append(MfaAttempt {
                identity_id,
                method,
                success,
                ip_address: None,
                user_agent: None,
            })
            .await
    }
}

mod backup_codes;
mod email_otp;
mod enrollment;
mod verification;

pub use backup_codes::generate_backup_codes;
