//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod aes_secret_encryptor;
mod argon2_password_hasher;
mod console_email_service;
mod postgres_auth_token_repository;
mod postgres_email_otp_repository;
mod postgres_identity_repository;
mod postgres_mfa_attempt_repository;
mod postgres_session_repository;
mod smtp_email_service;
mod totp_provider;

pub use aes_secret_encryptor::AesSecretEncryptor;
pub use argon2_password_hasher::Argon2PasswordHasher;
pub use console_email_service::ConsoleEmailService;
pub use postgres_auth_token_repository::PostgresAuthTokenRepository;
pub use postgres_email_otp_repository::PostgresEmailOtpRepository;
pub use postgres_identity_repository::PostgresIdentityRepository;
pub use postgres_mfa_attempt_repository::PostgresMfaAttemptRepository;
pub use postgres_session_repository::PostgresSessionRepository;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
pub use totp_provider::TotpRsProvider;
