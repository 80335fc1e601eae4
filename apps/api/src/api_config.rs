use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use authforge_core::AppError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub auth_signing_key: Vec<u8>,
    pub secret_encryption_key: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_days: i64,
    pub device_trust_ttl_days: i64,
    pub challenge_ttl_secs: i64,
    pub lockout_threshold: u32,
    pub lockout_duration_secs: i64,
    pub totp_issuer: String,
    pub email_provider: EmailProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let auth_signing_key = required_env("AUTH_SIGNING_KEY")?.into_bytes();
        if auth_signing_key.len() < 32 {
            return Err(AppError::Validation(
                "AUTH_SIGNING_KEY must be at least 32 bytes".to_owned(),
            ));
        }

        let secret_encryption_key = required_env("SECRET_ENCRYPTION_KEY")?;
        if secret_encryption_key.len() != 64 {
            return Err(AppError::Validation(
                "SECRET_ENCRYPTION_KEY must be exactly 64 hex characters (32 bytes)".to_owned(),
            ));
        }

        let access_ttl_secs = parse_env_i64("ACCESS_TOKEN_TTL_SECS", 30 * 60)?;
        let refresh_ttl_days = parse_env_i64("REFRESH_TOKEN_TTL_DAYS", 7)?;
        let device_trust_ttl_days = parse_env_i64("DEVICE_TRUST_TTL_DAYS", 7)?;
        let challenge_ttl_secs = parse_env_i64("CHALLENGE_TOKEN_TTL_SECS", 5 * 60)?;
        let lockout_threshold = parse_env_u32("LOCKOUT_THRESHOLD", 5)?;
        let lockout_duration_secs = parse_env_i64("LOCKOUT_DURATION_SECS", 15 * 60)?;
        let totp_issuer = env::var("TOTP_ISSUER").unwrap_or_else(|_| "AuthForge".to_owned());

        let email_provider = match env::var("EMAIL_PROVIDER")
            .unwrap_or_else(|_| "console".to_owned())
            .as_str()
        {
            "console" => EmailProviderConfig::Console,
            "smtp" => {
                let port = required_non_empty_env("SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;
                EmailProviderConfig::Smtp(SmtpRuntimeConfig {
                    host: required_non_empty_env("SMTP_HOST")?,
                    port,
                    username: required_non_empty_env("SMTP_USERNAME")?,
                    password: required_non_empty_env("SMTP_PASSWORD")?,
                    from_address: required_non_empty_env("SMTP_FROM_ADDRESS")?,
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "EMAIL_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        Ok(Self {
            database_url,
            frontend_url,
            api_host,
            api_port,
            auth_signing_key,
            secret_encryption_key,
            access_ttl_secs,
            refresh_ttl_days,
            device_trust_ttl_days,
            challenge_ttl_secs,
            lockout_threshold,
            lockout_duration_secs,
            totp_issuer,
            email_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64, AppError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<i64>()
            .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}"))),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, AppError> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u32>()
            .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}"))),
        Err(_) => Ok(default),
    }
}
