//! TOTP provider implementation using the `totp-rs` crate.

use chrono::{DateTime, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

use authforge_application::TotpProvider;
use authforge_core::{AppError, AppResult};

/// TOTP provider with RFC 6238 compliance: SHA-1, 6 digits, 30-second step,
/// +/-1 step tolerance.
#[derive(Clone)]
pub struct TotpRsProvider;

impl TotpRsProvider {
    /// Creates a new TOTP provider.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TotpRsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TotpProvider for TotpRsProvider {
    fn generate_secret(&self, issuer: &str, email: &str) -> AppResult<(Vec<u8>, String, String)> {
        let secret = Secret::generate_secret();
        let secret_bytes = secret
            .to_bytes()
            .map_err(|error| AppError::Internal(format!("failed to generate TOTP secret: {error}")))?;

        let totp = TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret_bytes.clone(),
            Some(issuer.to_owned()),
            email.to_owned(),
        )
        .map_err(|error| AppError::Internal(format!("failed to create TOTP instance: {error}")))?;

        let base32 = secret.to_encoded().to_string();
        let otpauth_uri = totp.get_url();

        Ok((secret_bytes, base32, otpauth_uri))
    }

    fn verify_code(&self, secret_bytes: &[u8], code: &str, at: DateTime<Utc>) -> AppResult<bool> {
        let totp = TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret_bytes.to_vec(),
            None,
            String::new(),
        )
        .map_err(|error| AppError::Internal(format!("failed to create TOTP instance: {error}")))?;

        let unix_time = u64::try_from(at.timestamp()).unwrap_or(0);
        Ok(totp.check(code, unix_time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_verifies_at_the_same_instant() -> AppResult<()> {
        let provider = TotpRsProvider::new();
        let (secret_bytes, _base32, _uri) = provider.generate_secret("AuthForge", "a@example.com")?;

        let totp = TOTP::new(Algorithm::SHA1, 6, 1, 30, secret_bytes.clone(), None, String::new())
            .map_err(|error| AppError::Internal(error.to_string()))?;
        let now = Utc::now();
        let code = totp.generate(u64::try_from(now.timestamp()).unwrap_or(0));

        assert!(provider.verify_code(&secret_bytes, &code, now)?);
        Ok(())
    }

    #[test]
    fn wrong_code_does_not_verify() -> AppResult<()> {
        let provider = TotpRsProvider::new();
        let (secret_bytes, _base32, _uri) = provider.generate_secret("AuthForge", "a@example.com")?;
        assert!(!provider.verify_code(&secret_bytes, "000000", Utc::now())?);
        Ok(())
    }
}
