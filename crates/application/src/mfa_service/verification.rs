use authforge_domain::{AuthError, MfaType, UserId};

use super::backup_codes::{codes_match, decode_bundle, encode_bundle};
use super::*;

impl MfaService {
    /// Verifies a login-time MFA code against the identity's TOTP factor,
    /// falling back to a backup code when the TOTP code does not verify.
    /// Every attempt, successful or not, is logged.
    pub async fn verify_login_code(
        &self,
        identity_id: UserId,
        mfa_type: MfaType,
        code: &str,
    ) -> Result<(), AuthError> {
        match mfa_type {
            MfaType::Totp => {
                if self.verify_totp_code(identity_id, code).await? {
                    self.log_attempt(identity_id, MfaType::Totp, true).await?;
                    return Ok(());
                }

                if self.verify_backup_code(identity_id, code).await? {
                    self.log_attempt(identity_id, MfaType::Totp, true).await?;
                    return Ok(());
                }

                self.log_attempt(identity_id, MfaType::Totp, false).await?;
                Err(AuthError::InvalidMfa)
            }
            MfaType::Email => {
                let now = self.clock.now();
                let hasher = &self.password_hasher;
                let matches = move |hash: &str| {
                    hasher.verify_password(code, hash).unwrap_or(false)
                };
                let consumed = self
                    .email_otp_repository
                    .try_consume(identity_id, &matches, now)
                    .await?;

                self.log_attempt(identity_id, MfaType::Email, consumed)
                    .await?;

                if consumed {
                    Ok(())
                } else {
                    Err(AuthError::InvalidMfa)
                }
            }
        }
    }

    async fn verify_totp_code(&self, identity_id: UserId, code: &str) -> Result<bool, AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !identity.totp_enabled {
            return Ok(false);
        }

        let Some(ref encrypted_secret) = identity.totp_secret_ct else {
            return Err(AuthError::Internal(authforge_core::AppError::Internal(
                "TOTP enabled but secret is missing".to_owned(),
            )));
        };

        let secret_bytes = self.secret_encryptor.decrypt(encrypted_secret)?;
        let valid = self
            .totp_provider
            .verify_code(&secret_bytes, code, self.clock.now())?;
        Ok(valid)
    }

    /// Verifies a backup code and, on match, removes it from the stored
    /// bundle so it cannot be reused.
    pub async fn verify_backup_code(
        &self,
        identity_id: UserId,
        code: &str,
    ) -> Result<bool, AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let Some(ref encrypted_bundle) = identity.backup_codes_ct else {
            return Ok(false);
        };

        let bundle = self.secret_encryptor.decrypt(encrypted_bundle)?;
        let mut codes = decode_bundle(&bundle);

        let Some(position) = codes.iter().position(|stored| codes_match(stored, code)) else {
            return Ok(false);
        };

        codes.remove(position);
        let updated = self.secret_encryptor.encrypt(&encode_bundle(&codes))?;
        self.identity_repository
            .update_backup_codes(identity_id, &updated)
            .await?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_ignores_surrounding_whitespace() {
        assert!(codes_match("12345678", " 12345678 "));
        assert!(!codes_match("12345678", "87654321"));
    }
}
