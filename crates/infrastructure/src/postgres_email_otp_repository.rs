//! PostgreSQL-backed transient email-OTP code repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use authforge_application::EmailOtpRepository;
use authforge_core::{AppError, AppResult};
use authforge_domain::UserId;

/// PostgreSQL implementation of the email-OTP repository port.
#[derive(Clone)]
pub struct PostgresEmailOtpRepository {
    pool: PgPool,
}

impl PostgresEmailOtpRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OtpRow {
    id: uuid::Uuid,
    code_hash: String,
}

#[async_trait]
impl EmailOtpRepository for PostgresEmailOtpRepository {
    async fn insert(
        &self,
        identity_id: UserId,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO email_otp_codes (identity_id, code_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(code_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert email otp: {error}")))?;

        Ok(())
    }

    async fn try_consume(
        &self,
        identity_id: UserId,
        matches: &(dyn Fn(&str) -> bool + Send + Sync),
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to start transaction: {error}")))?;

        let candidates = sqlx::query_as::<_, OtpRow>(
            r#"
            SELECT id, code_hash
            FROM email_otp_codes
            WHERE identity_id = $1 AND used_at IS NULL AND expires_at > $2
            ORDER BY created_at DESC
            FOR UPDATE
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(now)
        .fetch_all(&mut *tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to scan email otp codes: {error}")))?;

        let Some(candidate) = candidates.into_iter().find(|row| matches(&row.code_hash)) else {
            tx.rollback()
                .await
                .map_err(|error| AppError::Internal(format!("failed to rollback: {error}")))?;
            return Ok(false);
        };

        sqlx::query("UPDATE email_otp_codes SET used_at = now() WHERE id = $1")
            .bind(candidate.id)
            .execute(&mut *tx)
            .await
            .map_err(|error| AppError::Internal(format!("failed to mark email otp used: {error}")))?;

        tx.commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit: {error}")))?;

        Ok(true)
    }
}
