//! PostgreSQL-backed refresh-token session repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use authforge_application::{SessionRecord, SessionRepository};
use authforge_core::{AppError, AppResult};
use authforge_domain::UserId;

/// PostgreSQL implementation of the session repository port.
#[derive(Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: uuid::Uuid,
    identity_id: uuid::Uuid,
    is_active: bool,
    expires_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.id,
            identity_id: UserId::from_uuid(row.identity_id),
            is_active: row.is_active,
            expires_at: row.expires_at,
        }
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn find_active(
        &self,
        refresh_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, identity_id, is_active, expires_at
            FROM sessions
            WHERE refresh_token_hash = $1 AND is_active = TRUE AND expires_at > $2
            LIMIT 1
            "#,
        )
        .bind(refresh_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find active session: {error}")))?;

        Ok(row.map(SessionRecord::from))
    }

    async fn rotate(
        &self,
        old_hash: &str,
        identity_id: UserId,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|error| AppError::Internal(format!("failed to start transaction: {error}")))?;

        let deactivated = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE
            WHERE refresh_token_hash = $1 AND is_active = TRUE
            "#,
        )
        .bind(old_hash)
        .execute(&mut *tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to deactivate session: {error}")))?;

        if deactivated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|error| AppError::Internal(format!("failed to rollback: {error}")))?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            INSERT INTO sessions (identity_id, refresh_token_hash, is_active, expires_at)
            VALUES ($1, $2, TRUE, $3)
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(new_hash)
        .bind(new_expires_at)
        .execute(&mut *tx)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert rotated session: {error}")))?;

        tx.commit()
            .await
            .map_err(|error| AppError::Internal(format!("failed to commit rotation: {error}")))?;

        Ok(true)
    }

    async fn insert(
        &self,
        identity_id: UserId,
        refresh_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (identity_id, refresh_token_hash, is_active, expires_at)
            VALUES ($1, $2, TRUE, $3)
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(refresh_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to insert session: {error}")))?;

        Ok(())
    }

    async fn deactivate(&self, refresh_hash: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE
            WHERE refresh_token_hash = $1
            "#,
        )
        .bind(refresh_hash)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to deactivate session: {error}")))?;

        Ok(())
    }
}
