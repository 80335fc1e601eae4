use std::sync::Arc;

use authforge_application::{
    Authenticator, AuthTokenService, FederatedLoginService, IdentityService, LoginOrchestrator,
    MfaService, TokenService,
};
use authforge_core::{AppError, SystemClock};
use authforge_infrastructure::{
    AesSecretEncryptor, Argon2PasswordHasher, ConsoleEmailService, PostgresAuthTokenRepository,
    PostgresEmailOtpRepository, PostgresIdentityRepository, PostgresMfaAttemptRepository,
    PostgresSessionRepository, SmtpEmailConfig, SmtpEmailService, TotpRsProvider,
};
use chrono::Duration;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::api_config::{ApiConfig, EmailProviderConfig};
use crate::state::AppState;

pub async fn connect(database_url: &str) -> Result<PgPool, AppError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

pub fn build_app_state(pool: PgPool, config: &ApiConfig) -> Result<AppState, AppError> {
    let identity_repository = Arc::new(PostgresIdentityRepository::new(pool.clone()));
    let session_repository = Arc::new(PostgresSessionRepository::new(pool.clone()));
    let auth_token_repository = Arc::new(PostgresAuthTokenRepository::new(pool.clone()));
    let email_otp_repository = Arc::new(PostgresEmailOtpRepository::new(pool.clone()));
    let mfa_attempt_repository = Arc::new(PostgresMfaAttemptRepository::new(pool));

    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let secret_encryptor = Arc::new(AesSecretEncryptor::from_hex(&config.secret_encryption_key)?);
    let totp_provider = Arc::new(TotpRsProvider::new());
    let clock = Arc::new(SystemClock);

    let email_service: Arc<dyn authforge_application::EmailService> = match &config.email_provider
    {
        EmailProviderConfig::Console => Arc::new(ConsoleEmailService::new()),
        EmailProviderConfig::Smtp(smtp) => Arc::new(SmtpEmailService::new(SmtpEmailConfig {
            host: smtp.host.clone(),
            port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from_address: smtp.from_address.clone(),
        })),
    };
    let otp_mailer: Arc<dyn authforge_application::OtpMailer> = match &config.email_provider {
        EmailProviderConfig::Console => Arc::new(ConsoleEmailService::new()),
        EmailProviderConfig::Smtp(smtp) => Arc::new(SmtpEmailService::new(SmtpEmailConfig {
            host: smtp.host.clone(),
            port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from_address: smtp.from_address.clone(),
        })),
    };

    let identity_service = IdentityService::new(identity_repository.clone(), password_hasher.clone());

    let authenticator = Authenticator::new(
        identity_repository.clone(),
        password_hasher.clone(),
        clock.clone(),
    )
    .with_lockout_policy(config.lockout_threshold, config.lockout_duration_secs);

    let mfa_service = MfaService::new(
        identity_repository.clone(),
        password_hasher,
        totp_provider,
        secret_encryptor,
        email_otp_repository,
        otp_mailer,
        mfa_attempt_repository,
        clock.clone(),
        config.totp_issuer.clone(),
    );

    let token_service = TokenService::new(
        session_repository,
        clock.clone(),
        config.auth_signing_key.clone(),
        Duration::seconds(config.access_ttl_secs),
        Duration::days(config.refresh_ttl_days),
        Duration::seconds(config.challenge_ttl_secs),
        Duration::days(config.device_trust_ttl_days),
    );

    let federated_login_service = FederatedLoginService::new(identity_repository);
    let auth_token_service = AuthTokenService::new(
        auth_token_repository,
        email_service,
        config.frontend_url.clone(),
        clock,
    );

    let login_orchestrator = LoginOrchestrator::new(
        identity_service,
        authenticator,
        mfa_service,
        token_service,
        federated_login_service,
        auth_token_service,
    );

    Ok(AppState { login_orchestrator })
}
