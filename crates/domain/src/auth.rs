//! Authentication outcome and error taxonomy.
//!
//! These are tagged unions rather than a single generic error string: every
//! public login-protocol operation returns one of these enums so a caller
//! can match exhaustively instead of string-sniffing a message.

use authforge_core::AppError;
use thiserror::Error;

use crate::user::UserId;

/// Result of verifying a password against a stored identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Credentials verified; the identity is usable.
    Authenticated(UserId),
    /// No such identity, or the password did not match.
    InvalidCredentials,
    /// The identity exists but its email has not been verified yet.
    EmailNotVerified,
    /// The identity is locked out from repeated failures.
    AccountLocked,
    /// The identity is not in the `active` status.
    AccountInactive,
}

/// Which second factor a login challenge is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaType {
    /// Time-based one-time password.
    Totp,
    /// Emailed six-digit code.
    Email,
}

impl MfaType {
    /// Returns the wire string for this factor.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Totp => "totp",
            Self::Email => "email",
        }
    }

    /// Parses a wire string into a factor.
    pub fn parse(value: &str) -> Result<Self, AuthError> {
        match value {
            "totp" => Ok(Self::Totp),
            "email" => Ok(Self::Email),
            _ => Err(AuthError::TokenInvalid),
        }
    }
}

/// The outcome of the login protocol's entry points (`login`, `verify_mfa`,
/// `federated_login`, `refresh`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    /// The caller must complete a second factor before tokens are issued.
    Challenged {
        /// Opaque challenge token to present to `verify_mfa`.
        challenge_token: String,
        /// Which factor is being challenged.
        mfa_type: MfaType,
    },
    /// Login succeeded; a bearer token pair was issued.
    Authenticated {
        /// Short-lived resource-access token.
        access_token: String,
        /// Long-lived, single-use token used to mint new access tokens.
        refresh_token: String,
        /// Present only when the caller asked to remember this device.
        device_trust_token: Option<String>,
    },
}

/// The complete error taxonomy surfaced by the login protocol.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Registration input failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Registration used an email already bound to an active identity.
    #[error("an account with this email already exists")]
    DuplicateEmail,
    /// Password or email did not match an active, unlocked identity.
    #[error("invalid email or password")]
    InvalidCredentials,
    /// A refresh token was not found, inactive, or expired.
    #[error("refresh token is invalid or has been used")]
    InvalidRefresh,
    /// A submitted MFA code did not verify.
    #[error("invalid multi-factor authentication code")]
    InvalidMfa,
    /// The challenge token presented to `verify_mfa` has expired.
    #[error("login challenge has expired, please sign in again")]
    ChallengeExpired,
    /// A token (verification, challenge, refresh, device-trust) failed
    /// signature or shape validation.
    #[error("token is invalid")]
    TokenInvalid,
    /// A token was well-formed but has expired.
    #[error("token has expired")]
    TokenExpired,
    /// A federated identity-provider assertion could not be trusted.
    #[error("federated login assertion is invalid")]
    AssertionInvalid,
    /// The account has not confirmed its email address yet.
    #[error("email address has not been verified")]
    EmailNotVerified,
    /// The email was already verified; re-verification is a no-op error.
    #[error("email address is already verified")]
    AlreadyVerified,
    /// Too many failed password attempts; temporarily locked.
    #[error("account is temporarily locked due to repeated failed attempts")]
    AccountLocked,
    /// The identity is not in the `active` status.
    #[error("account is not active")]
    AccountInactive,
    /// An enrollment operation targeted a factor already enabled.
    #[error("this factor is already enabled")]
    AlreadyEnabled,
    /// An operation targeted a factor that is not currently enabled.
    #[error("this factor is not enabled")]
    NotEnabled,
    /// Requested identity does not exist.
    #[error("not found")]
    NotFound,
    /// Storage, crypto, or mail-delivery failure with no recognized domain
    /// meaning. The original message is logged, never surfaced to a caller.
    #[error("internal error")]
    Internal(#[from] AppError),
}
