//! Domain entities, invariants, and the authentication taxonomy.

#![forbid(unsafe_code)]

mod auth;
mod token;
mod user;

pub use auth::{AuthError, AuthOutcome, LoginResult, MfaType};
pub use token::{AccessClaims, ChallengeClaims, DeviceTrustClaims, RefreshClaims, TokenType};
pub use user::{
    AuthTokenType, EmailAddress, FederatedProvider, IdentityKind, IdentityStatus,
    PASSWORD_MAX_LENGTH, PASSWORD_MIN_LENGTH, UserId, validate_password,
};
