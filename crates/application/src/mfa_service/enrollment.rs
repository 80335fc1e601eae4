use authforge_domain::{AuthError, MfaType, UserId};

use super::backup_codes::{encode_bundle, generate_backup_codes};
use super::*;

impl MfaService {
    /// Starts TOTP enrollment: generates a secret and ten backup codes,
    /// persists both encrypted, but leaves `totp_enabled = false` until
    /// `confirm_totp_enrollment` verifies a live code.
    pub async fn start_totp_enrollment(&self, identity_id: UserId) -> Result<TotpEnrollment, AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if identity.totp_enabled {
            return Err(AuthError::AlreadyEnabled);
        }

        let (secret_bytes, secret_base32, otpauth_uri) = self
            .totp_provider
            .generate_secret(&self.totp_issuer, &identity.email)?;

        let backup_codes = generate_backup_codes();

        let encrypted_secret = self.secret_encryptor.encrypt(&secret_bytes)?;
        let encrypted_codes = self
            .secret_encryptor
            .encrypt(&encode_bundle(&backup_codes))?;

        self.identity_repository
            .store_totp_material(identity_id, &encrypted_secret, &encrypted_codes)
            .await?;

        Ok(TotpEnrollment {
            secret_base32,
            otpauth_uri,
            backup_codes,
        })
    }

    /// Confirms TOTP enrollment by verifying a live code from the
    /// authenticator app. Idempotent only by error: an already-enabled
    /// identity returns `AlreadyEnabled` rather than silently re-enrolling.
    pub async fn confirm_totp_enrollment(
        &self,
        identity_id: UserId,
        code: &str,
    ) -> Result<(), AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if identity.totp_enabled {
            return Err(AuthError::AlreadyEnabled);
        }

        let Some(ref encrypted_secret) = identity.totp_secret_ct else {
            return Err(AuthError::InvalidInput(
                "no TOTP enrollment in progress".to_owned(),
            ));
        };

        let secret_bytes = self.secret_encryptor.decrypt(encrypted_secret)?;
        let valid = self
            .totp_provider
            .verify_code(&secret_bytes, code, self.clock.now())?;

        if !valid {
            self.log_attempt(identity_id, MfaType::Totp, false)
                .await?;
            return Err(AuthError::InvalidMfa);
        }

        self.identity_repository.confirm_totp(identity_id).await?;
        self.log_attempt(identity_id, MfaType::Totp, true)
            .await?;

        Ok(())
    }

    /// Disables TOTP for an identity. Requires a currently valid TOTP code
    /// rather than password re-authentication.
    pub async fn disable_totp(&self, identity_id: UserId, code: &str) -> Result<(), AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !identity.totp_enabled {
            return Err(AuthError::NotEnabled);
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

        if !valid {
            self.log_attempt(identity_id, MfaType::Totp, false)
                .await?;
            return Err(AuthError::InvalidMfa);
        }

        self.identity_repository.clear_totp(identity_id).await?;
        self.log_attempt(identity_id, MfaType::Totp, true)
            .await?;
        Ok(())
    }

    /// Regenerates the backup-code bundle. Unlike TOTP disablement this has
    /// no live-code gate in the source material; callers authorize it at
    /// the transport layer (e.g. requiring a fresh access token).
    pub async fn regenerate_backup_codes(
        &self,
        identity_id: UserId,
    ) -> Result<Vec<String>, AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !identity.totp_enabled {
            return Err(AuthError::NotEnabled);
        }

        let codes = generate_backup_codes();
        let encrypted = self.secret_encryptor.encrypt(&encode_bundle(&codes))?;

        self.identity_repository
            .update_backup_codes(identity_id, &encrypted)
            .await?;

        Ok(codes)
    }

    /// Enables email-based MFA for an identity.
    pub async fn enable_email_mfa(&self, identity_id: UserId) -> Result<(), AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if identity.email_mfa_enabled {
            return Err(AuthError::AlreadyEnabled);
        }

        self.identity_repository
            .set_email_mfa_enabled(identity_id, true)
            .await?;
        Ok(())
    }

    /// Disables email-based MFA for an identity.
    pub async fn disable_email_mfa(&self, identity_id: UserId) -> Result<(), AuthError> {
        let identity = self
            .identity_repository
            .find_by_id(identity_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !identity.email_mfa_enabled {
            return Err(AuthError::NotEnabled);
        }

        self.identity_repository
            .set_email_mfa_enabled(identity_id, false)
            .await?;
        Ok(())
    }
}
