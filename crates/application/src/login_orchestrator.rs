//! Login Orchestrator: the public facade composing the Credential Store,
//! Authenticator, MFA Engine, Token Service, and Federated Login Adapter
//! into the external login protocol.
//!
//! This is the only application-layer type a transport (HTTP, gRPC, ...)
//! should depend on directly; everything else in this crate is an internal
//! collaborator reached through here.

use std::str::FromStr;

use tracing::{info, warn};
use uuid::Uuid;

use authforge_domain::{
    AuthError, AuthOutcome, AuthTokenType, IdentityStatus, LoginResult, MfaType, UserId,
};

use crate::authenticator::Authenticator;
use crate::auth_token_service::AuthTokenService;
use crate::federated_login_service::{FederatedAssertion, FederatedLoginService};
use crate::identity_service::{IdentityService, RegisterParams};
use crate::mfa_service::MfaService;
use crate::token_service::TokenService;

/// Composes every login-protocol collaborator behind one public API.
#[derive(Clone)]
pub struct LoginOrchestrator {
    identity_service: IdentityService,
    authenticator: Authenticator,
    mfa_service: MfaService,
    token_service: TokenService,
    federated_login_service: FederatedLoginService,
    auth_token_service: AuthTokenService,
}

impl LoginOrchestrator {
    /// Creates a new login orchestrator from its collaborators.
    #[must_use]
    pub fn new(
        identity_service: IdentityService,
        authenticator: Authenticator,
        mfa_service: MfaService,
        token_service: TokenService,
        federated_login_service: FederatedLoginService,
        auth_token_service: AuthTokenService,
    ) -> Self {
        Self {
            identity_service,
            authenticator,
            mfa_service,
            token_service,
            federated_login_service,
            auth_token_service,
        }
    }

    /// Registers a new password-based identity and dispatches the
    /// verification email. Mail-delivery failure is logged, not
    /// propagated: the account is created either way and the caller can
    /// trigger `resend_verification` later.
    pub async fn register(&self, params: RegisterParams) -> Result<UserId, AuthError> {
        let email = params.email.clone();
        let identity_id = self
            .identity_service
            .register(params)
            .await
            .map_err(|error| match error {
                authforge_core::AppError::Conflict(_) => AuthError::DuplicateEmail,
                authforge_core::AppError::Validation(message) => AuthError::InvalidInput(message),
                other => AuthError::from(other),
            })?;

        if let Err(error) = self.auth_token_service.send_email_verification(identity_id, &email).await {
            warn!(%identity_id, %error, "failed to send verification email after registration");
        }

        Ok(identity_id)
    }

    /// Redeems an email-verification token and activates the identity.
    pub async fn verify_email(&self, raw_token: &str) -> Result<(), AuthError> {
        let record = self
            .auth_token_service
            .consume_valid_token(raw_token, AuthTokenType::EmailVerification)
            .await?;

        let identity = self
            .identity_service
            .find_by_id(record.identity_id)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::NotFound)?;

        if identity.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        self.identity_service
            .identity_repository()
            .mark_email_verified(record.identity_id)
            .await
            .map_err(AuthError::from)
    }

    /// Re-sends the verification email for an already-registered, not yet
    /// verified identity.
    pub async fn resend_verification(&self, email: &str) -> Result<(), AuthError> {
        let identity = self
            .identity_service
            .find_by_email(email)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::NotFound)?;

        if identity.email_verified {
            return Err(AuthError::AlreadyVerified);
        }

        self.auth_token_service
            .send_email_verification(identity.id, &identity.email)
            .await
            .map_err(AuthError::from)
    }

    /// Verifies a password and either issues tokens directly or returns a
    /// login challenge, depending on whether the identity has MFA enabled.
    /// A valid `device_trust_token` for the same identity skips the
    /// challenge even when MFA is enabled.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_trust_token: Option<&str>,
        remember_device: bool,
    ) -> Result<LoginResult, AuthError> {
        let outcome = self.authenticator.authenticate(email, password).await?;

        let identity_id = match outcome {
            AuthOutcome::Authenticated(identity_id) => identity_id,
            AuthOutcome::InvalidCredentials => return Err(AuthError::InvalidCredentials),
            AuthOutcome::EmailNotVerified => return Err(AuthError::EmailNotVerified),
            AuthOutcome::AccountLocked => return Err(AuthError::AccountLocked),
            AuthOutcome::AccountInactive => return Err(AuthError::AccountInactive),
        };

        let identity = self
            .identity_service
            .find_by_id(identity_id)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::NotFound)?;

        let device_already_trusted = match device_trust_token {
            Some(token) => self
                .token_service
                .verify_device_trust_token(token, identity_id)
                .is_ok(),
            None => false,
        };

        if identity.has_mfa() && !device_already_trusted {
            let mfa_type = if identity.totp_enabled {
                MfaType::Totp
            } else {
                MfaType::Email
            };

            if mfa_type == MfaType::Email {
                if let Err(error) = self
                    .mfa_service
                    .send_login_challenge_code(identity_id, &identity.email)
                    .await
                {
                    warn!(%identity_id, %error, "failed to send email MFA challenge code");
                }
            }

            let challenge_token = self
                .token_service
                .issue_challenge_token(identity_id, &identity.email, mfa_type)?;

            return Ok(LoginResult::Challenged {
                challenge_token,
                mfa_type,
            });
        }

        self.issue_authenticated_result(identity_id, &identity.email, remember_device)
            .await
    }

    /// Completes a login challenge with a TOTP, email, or backup code.
    pub async fn verify_mfa(
        &self,
        challenge_token: &str,
        code: &str,
        remember_device: bool,
    ) -> Result<LoginResult, AuthError> {
        let claims = self.token_service.verify_challenge_token(challenge_token)?;
        let identity_id = parse_identity_id(&claims.sub)?;

        let identity = self
            .identity_service
            .find_by_id(identity_id)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::NotFound)?;

        if identity.status != IdentityStatus::Active {
            return Err(AuthError::AccountInactive);
        }

        self.mfa_service
            .verify_login_code(identity_id, claims.mfa_type, code)
            .await?;

        info!(%identity_id, mfa_type = claims.mfa_type.as_str(), "mfa challenge satisfied");

        self.issue_authenticated_result(identity_id, &claims.email, remember_device)
            .await
    }

    /// Completes a TOTP login challenge with a backup code instead of a
    /// live TOTP code.
    pub async fn verify_mfa_with_backup_code(
        &self,
        challenge_token: &str,
        backup_code: &str,
        remember_device: bool,
    ) -> Result<LoginResult, AuthError> {
        let claims = self.token_service.verify_challenge_token(challenge_token)?;
        if claims.mfa_type != MfaType::Totp {
            return Err(AuthError::InvalidMfa);
        }
        let identity_id = parse_identity_id(&claims.sub)?;

        let identity = self
            .identity_service
            .find_by_id(identity_id)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::NotFound)?;

        if identity.status != IdentityStatus::Active {
            return Err(AuthError::AccountInactive);
        }

        let matched = self
            .mfa_service
            .verify_backup_code(identity_id, backup_code)
            .await?;

        if !matched {
            return Err(AuthError::InvalidMfa);
        }

        self.issue_authenticated_result(identity_id, &claims.email, remember_device)
            .await
    }

    /// Rotates a refresh token for a fresh access/refresh pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginResult, AuthError> {
        let issued = self.token_service.rotate_refresh_token(refresh_token).await?;

        Ok(LoginResult::Authenticated {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            device_trust_token: None,
        })
    }

    /// Invalidates a refresh token's session, ending that device's sign-in.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.token_service.logout(refresh_token).await
    }

    /// Resolves a verified identity-provider assertion, then applies the
    /// same MFA/challenge logic as a password login.
    pub async fn federated_login(
        &self,
        assertion: &FederatedAssertion,
        remember_device: bool,
    ) -> Result<LoginResult, AuthError> {
        let identity_id = self.federated_login_service.resolve(assertion).await?;

        let identity = self
            .identity_service
            .find_by_id(identity_id)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::NotFound)?;

        if identity.has_mfa() {
            let mfa_type = if identity.totp_enabled {
                MfaType::Totp
            } else {
                MfaType::Email
            };

            if mfa_type == MfaType::Email {
                if let Err(error) = self
                    .mfa_service
                    .send_login_challenge_code(identity_id, &identity.email)
                    .await
                {
                    warn!(%identity_id, %error, "failed to send email MFA challenge code");
                }
            }

            let challenge_token = self
                .token_service
                .issue_challenge_token(identity_id, &identity.email, mfa_type)?;

            return Ok(LoginResult::Challenged {
                challenge_token,
                mfa_type,
            });
        }

        self.issue_authenticated_result(identity_id, &identity.email, remember_device)
            .await
    }

    /// Starts TOTP enrollment.
    pub async fn totp_setup(
        &self,
        identity_id: UserId,
    ) -> Result<crate::mfa_service::TotpEnrollment, AuthError> {
        self.mfa_service.start_totp_enrollment(identity_id).await
    }

    /// Confirms TOTP enrollment with a live code.
    pub async fn totp_finalize(&self, identity_id: UserId, code: &str) -> Result<(), AuthError> {
        self.mfa_service.confirm_totp_enrollment(identity_id, code).await
    }

    /// Disables TOTP, gated on a live TOTP code rather than password
    /// re-authentication.
    pub async fn totp_disable(&self, identity_id: UserId, code: &str) -> Result<(), AuthError> {
        self.mfa_service.disable_totp(identity_id, code).await
    }

    /// Regenerates the backup-code bundle for an identity with TOTP enabled.
    pub async fn backup_codes_regenerate(&self, identity_id: UserId) -> Result<Vec<String>, AuthError> {
        self.mfa_service.regenerate_backup_codes(identity_id).await
    }

    /// Enables email-based MFA.
    pub async fn email_mfa_enable(&self, identity_id: UserId) -> Result<(), AuthError> {
        self.mfa_service.enable_email_mfa(identity_id).await
    }

    /// Disables email-based MFA.
    pub async fn email_mfa_disable(&self, identity_id: UserId) -> Result<(), AuthError> {
        self.mfa_service.disable_email_mfa(identity_id).await
    }

    /// Sends an out-of-band email MFA code outside the login flow (e.g. a
    /// "resend code" action on the challenge screen).
    pub async fn email_mfa_send_code(&self, identity_id: UserId) -> Result<(), AuthError> {
        let identity = self
            .identity_service
            .find_by_id(identity_id)
            .await
            .map_err(AuthError::from)?
            .ok_or(AuthError::NotFound)?;

        self.mfa_service
            .send_login_challenge_code(identity_id, &identity.email)
            .await
    }

    async fn issue_authenticated_result(
        &self,
        identity_id: UserId,
        email: &str,
        remember_device: bool,
    ) -> Result<LoginResult, AuthError> {
        let issued = self.token_service.issue_token_pair(identity_id, email)?;
        self.token_service.persist_session(identity_id, &issued).await?;

        let device_trust_token = if remember_device {
            Some(self.token_service.issue_device_trust_token(identity_id, email)?)
        } else {
            None
        };

        Ok(LoginResult::Authenticated {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            device_trust_token,
        })
    }
}

fn parse_identity_id(sub: &str) -> Result<UserId, AuthError> {
    Uuid::from_str(sub)
        .map(UserId::from_uuid)
        .map_err(|_| AuthError::TokenInvalid)
}
