use chrono::Duration;

use authforge_domain::{AuthError, UserId};

use super::*;

/// Lifetime of an issued email-OTP code.
const EMAIL_OTP_TTL: Duration = Duration::minutes(5);

impl MfaService {
    /// Generates a six-digit code, stores its slow hash with a 5-minute
    /// expiry, and sends the plaintext to the identity's email address.
    /// Mail-delivery failure is surfaced to the caller, who (per the login
    /// orchestrator) treats it as best-effort and logs rather than aborts.
    pub async fn send_login_challenge_code(
        &self,
        identity_id: UserId,
        email: &str,
    ) -> Result<(), AuthError> {
        let code = generate_numeric_code();
        let code_hash = self.password_hasher.hash_password(&code)?;
        let expires_at = self.clock.now() + EMAIL_OTP_TTL;

        self.email_otp_repository
            .insert(identity_id, &code_hash, expires_at)
            .await?;

        self.otp_mailer.send_code(email, &code).await?;

        Ok(())
    }
}

/// Generates a uniformly random six-digit numeric code (`000000`-`999999`).
fn generate_numeric_code() -> String {
    let mut bytes = [0u8; 4];
    let _ = getrandom::getrandom(&mut bytes);
    let value = u32::from_be_bytes(bytes) % 1_000_000;
    format!("{value:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_code_is_six_digits() {
        let code = generate_numeric_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }
}
