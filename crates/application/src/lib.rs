//! Application services and ports for the identity and session protocol.

#![forbid(unsafe_code)]

mod auth_token_service;
mod authenticator;
mod federated_login_service;
mod identity_service;
mod login_orchestrator;
mod mfa_service;
mod token_service;

pub use auth_token_service::{AuthTokenRecord, AuthTokenRepository, AuthTokenService, EmailService};
pub use authenticator::{Authenticator, LOCKOUT_DURATION_SECS, LOCKOUT_THRESHOLD};
pub use federated_login_service::{FederatedAssertion, FederatedLoginService};
pub use identity_service::{
    IdentityPatch, IdentityRecord, IdentityRepository, IdentityService, NewIdentity,
    PasswordHasher, RegisterParams,
};
pub use login_orchestrator::LoginOrchestrator;
pub use mfa_service::{
    MfaAttempt, MfaAttemptRepository, MfaService, EmailOtpRepository, OtpMailer, SecretEncryptor,
    TotpEnrollment, TotpProvider, generate_backup_codes,
};
pub use token_service::{
    DEFAULT_ACCESS_TTL, DEFAULT_CHALLENGE_TTL, DEFAULT_DEVICE_TRUST_TTL, DEFAULT_REFRESH_TTL,
    IssuedTokenPair, SessionRecord, SessionRepository, TokenService,
};
