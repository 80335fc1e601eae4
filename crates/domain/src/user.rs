//! Identity domain types and password/email validation rules.
//!
//! Follows OWASP Authentication and Password Storage cheat sheets for all
//! password strength and email validation rules.

use authforge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated, case-folded email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Creates a validated email address.
    ///
    /// Performs basic structural validation: non-empty, contains exactly one `@`,
    /// local part and domain are non-empty, domain contains at least one `.`.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim().to_lowercase();

        if trimmed.is_empty() {
            return Err(AppError::Validation(
                "email address must not be empty".to_owned(),
            ));
        }

        let parts: Vec<&str> = trimmed.splitn(2, '@').collect();
        if parts.len() != 2 {
            return Err(AppError::Validation(
                "email address must contain exactly one '@'".to_owned(),
            ));
        }

        let local = parts[0];
        let domain = parts[1];

        if local.is_empty() {
            return Err(AppError::Validation(
                "email local part must not be empty".to_owned(),
            ));
        }

        if domain.is_empty() || !domain.contains('.') {
            return Err(AppError::Validation(
                "email domain must contain at least one '.'".to_owned(),
            ));
        }

        if trimmed.len() > 254 {
            return Err(AppError::Validation(
                "email address must not exceed 254 characters".to_owned(),
            ));
        }

        Ok(Self(trimmed))
    }

    /// Returns the validated email string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

/// Minimum password length (NIST SP800-63B).
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Maximum password length to allow passphrases (OWASP recommendation: at least 64).
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Symbol characters accepted as the "≥ 1 symbol" composition class.
const PASSWORD_SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Validates a plaintext password against OWASP and NIST rules.
///
/// - Length must fall in `[PASSWORD_MIN_LENGTH, PASSWORD_MAX_LENGTH]`.
/// - Must contain at least one uppercase letter, one lowercase letter, one
///   digit, and one symbol from [`PASSWORD_SYMBOLS`].
/// - Rejects common breached passwords from an embedded list.
pub fn validate_password(password: &str) -> AppResult<()> {
    let char_count = password.chars().count();

    if char_count < PASSWORD_MIN_LENGTH {
        return Err(AppError::Validation(format!(
            "password must be at least {PASSWORD_MIN_LENGTH} characters"
        )));
    }

    if char_count > PASSWORD_MAX_LENGTH {
        return Err(AppError::Validation(format!(
            "password must not exceed {PASSWORD_MAX_LENGTH} characters"
        )));
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(AppError::Validation(
            "password must contain at least one uppercase letter".to_owned(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(AppError::Validation(
            "password must contain at least one lowercase letter".to_owned(),
        ));
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "password must contain at least one digit".to_owned(),
        ));
    }

    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Err(AppError::Validation(
            "password must contain at least one symbol".to_owned(),
        ));
    }

    if is_common_password(password) {
        return Err(AppError::Validation(
            "this password is too common and has appeared in data breaches".to_owned(),
        ));
    }

    Ok(())
}

/// Checks whether a password appears in the embedded common passwords list.
fn is_common_password(password: &str) -> bool {
    let lowered = password.to_lowercase();
    COMMON_PASSWORDS.iter().any(|entry| *entry == lowered)
}

/// Top breached passwords (subset for fast embedded check).
/// Production deployments should integrate HaveIBeenPwned k-anonymity API.
static COMMON_PASSWORDS: &[&str] = &[
    "password",
    "123456",
    "12345678",
    "1234567890",
    "qwerty",
    "abc123",
    "monkey",
    "master",
    "dragon",
    "111111",
    "baseball",
    "iloveyou",
    "trustno1",
    "sunshine",
    "princess",
    "football",
    "shadow",
    "superman",
    "qwerty123",
    "michael",
    "password1",
    "password123",
    "password123!",
    "welcome",
    "login",
    "admin",
    "letmein",
    "starwars",
    "solo",
    "passw0rd",
    "121212",
    "flower",
    "hottie",
    "loveme",
    "access",
    "hello",
    "charlie",
    "donald",
    "qwertyuiop",
    "whatever",
    "654321",
    "7777777",
    "123123",
    "jordan",
    "hunter",
    "pepper",
    "buster",
    "joshua",
    "freedom",
    "1234567",
    "12345",
];

/// Account status for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    /// Registered but the email address has not been confirmed yet.
    PendingVerification,
    /// Usable normally.
    Active,
    /// Deactivated by an administrator or the user themselves.
    Inactive,
    /// Suspended for policy reasons.
    Suspended,
}

impl IdentityStatus {
    /// Returns the storage string for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingVerification => "pending_verification",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }

    /// Parses a storage string into a status.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "pending_verification" => Ok(Self::PendingVerification),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "suspended" => Ok(Self::Suspended),
            _ => Err(AppError::Validation(format!(
                "unknown identity status '{value}'"
            ))),
        }
    }
}

/// The kind of identity a registrant is creating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    /// A natural person.
    Individual,
    /// A registered business entity.
    Business,
}

/// Federated identity provider that resolved an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederatedProvider {
    /// Google OAuth/OIDC.
    Google,
    /// The identity was originally password-based and has since linked a
    /// federated provider too.
    Both,
}

impl FederatedProvider {
    /// Returns the storage string for this provider.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Both => "both",
        }
    }

    /// Parses a storage string into a provider.
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "google" => Ok(Self::Google),
            "both" => Ok(Self::Both),
            _ => Err(AppError::Validation(format!(
                "unknown federated provider '{value}'"
            ))),
        }
    }
}

/// Token types for the auth_tokens table.
///
/// Only email verification is modeled: password reset and tenant invites are
/// outside this service's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthTokenType {
    /// Email address verification token.
    EmailVerification,
}

impl AuthTokenType {
    /// Returns the storage string for this token type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_is_accepted() {
        let email = EmailAddress::new("USER@Example.COM");
        assert!(email.is_ok());
        assert_eq!(
            email.unwrap_or_else(|_| panic!("test")).as_str(),
            "user@example.com"
        );
    }

    #[test]
    fn email_without_at_is_rejected() {
        assert!(EmailAddress::new("noatsign").is_err());
    }

    #[test]
    fn email_without_domain_dot_is_rejected() {
        assert!(EmailAddress::new("user@nodot").is_err());
    }

    #[test]
    fn empty_email_is_rejected() {
        assert!(EmailAddress::new("").is_err());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(validate_password("Sh0rt!").is_err());
    }

    #[test]
    fn adequate_password_is_accepted() {
        assert!(validate_password("SecurePass123!").is_ok());
    }

    #[test]
    fn passphrase_without_composition_is_rejected() {
        assert!(validate_password("a-reasonable-passphrase").is_err());
    }

    #[test]
    fn password_without_uppercase_is_rejected() {
        assert!(validate_password("securepass123!").is_err());
    }

    #[test]
    fn password_without_lowercase_is_rejected() {
        assert!(validate_password("SECUREPASS123!").is_err());
    }

    #[test]
    fn password_without_digit_is_rejected() {
        assert!(validate_password("SecurePassword!").is_err());
    }

    #[test]
    fn password_without_symbol_is_rejected() {
        assert!(validate_password("SecurePass123").is_err());
    }

    #[test]
    fn common_password_is_rejected() {
        assert!(validate_password("Password123!").is_err());
    }

    #[test]
    fn very_long_password_is_rejected() {
        let long = format!("Aa1!{}", "a".repeat(PASSWORD_MAX_LENGTH));
        assert!(validate_password(&long).is_err());
    }

    #[test]
    fn max_length_password_is_accepted() {
        let max = format!("Aa1!{}", "b".repeat(PASSWORD_MAX_LENGTH - 4));
        assert!(validate_password(&max).is_ok());
    }

    #[test]
    fn identity_status_round_trips() {
        for status in [
            IdentityStatus::PendingVerification,
            IdentityStatus::Active,
            IdentityStatus::Inactive,
            IdentityStatus::Suspended,
        ] {
            let parsed = IdentityStatus::parse(status.as_str()).unwrap_or_else(|_| panic!("test"));
            assert_eq!(parsed, status);
        }
    }
}
