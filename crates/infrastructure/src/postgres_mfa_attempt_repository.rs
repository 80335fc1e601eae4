//! PostgreSQL-backed append-only MFA attempt log.

use async_trait::async_trait;
use sqlx::PgPool;

use authforge_application::{MfaAttempt, MfaAttemptRepository};
use authforge_core::{AppError, AppResult};
/// PostgreSQL implementation of the MFA attempt repository port.
#[derive(Clone)]
pub struct PostgresMfaAttemptRepository {
    pool: PgPool,
}

impl PostgresMfaAttemptRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MfaAttemptRepository for PostgresMfaAttemptRepository {
    async fn append(&self, attempt: MfaAttempt) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO mfa_attempts (identity_id, method, success, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(attempt.identity_id.as_uuid())
        .bind(attempt.method.as_str())
        .bind(attempt.success)
        .bind(attempt.ip_address)
        .bind(attempt.user_agent)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to append mfa attempt: {error}")))?;

        Ok(())
    }
}
