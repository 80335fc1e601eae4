//! PostgreSQL-backed auth token (email verification) repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use authforge_application::{AuthTokenRecord, AuthTokenRepository};
use authforge_core::{AppError, AppResult};
use authforge_domain::{AuthTokenType, UserId};

/// PostgreSQL implementation of the auth token repository port.
#[derive(Clone)]
pub struct PostgresAuthTokenRepository {
    pool: PgPool,
}

impl PostgresAuthTokenRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AuthTokenRow {
    id: uuid::Uuid,
    identity_id: uuid::Uuid,
    email: String,
    token_hash: String,
    token_type: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
}

impl TryFrom<AuthTokenRow> for AuthTokenRecord {
    type Error = AppError;

    fn try_from(row: AuthTokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            identity_id: UserId::from_uuid(row.identity_id),
            email: row.email,
            token_hash: row.token_hash,
            token_type: parse_token_type(&row.token_type)?,
            expires_at: row.expires_at,
            used_at: row.used_at,
        })
    }
}

fn parse_token_type(value: &str) -> AppResult<AuthTokenType> {
    match value {
        "email_verification" => Ok(AuthTokenType::EmailVerification),
        other => Err(AppError::Internal(format!("unknown auth token type '{other}'"))),
    }
}

#[async_trait]
impl AuthTokenRepository for PostgresAuthTokenRepository {
    async fn create_token(
        &self,
        identity_id: UserId,
        email: &str,
        token_hash: &str,
        token_type: AuthTokenType,
        expires_at: DateTime<Utc>,
    ) -> AppResult<uuid::Uuid> {
        let id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO auth_tokens (identity_id, email, token_hash, token_type, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(email)
        .bind(token_hash)
        .bind(token_type.as_str())
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to create auth token: {error}")))?;

        Ok(id)
    }

    async fn consume_valid_token(
        &self,
        token_hash: &str,
        token_type: AuthTokenType,
    ) -> AppResult<Option<AuthTokenRecord>> {
        let row = sqlx::query_as::<_, AuthTokenRow>(
            r#"
            UPDATE auth_tokens
            SET used_at = now()
            WHERE token_hash = $1
              AND token_type = $2
              AND used_at IS NULL
              AND expires_at > now()
            RETURNING id, identity_id, email, token_hash, token_type, expires_at, used_at
            "#,
        )
        .bind(token_hash)
        .bind(token_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to consume auth token: {error}")))?;

        row.map(AuthTokenRecord::try_from).transpose()
    }

    async fn find_unused_token(
        &self,
        token_hash: &str,
        token_type: AuthTokenType,
    ) -> AppResult<Option<AuthTokenRecord>> {
        let row = sqlx::query_as::<_, AuthTokenRow>(
            r#"
            SELECT id, identity_id, email, token_hash, token_type, expires_at, used_at
            FROM auth_tokens
            WHERE token_hash = $1
              AND token_type = $2
              AND used_at IS NULL
            "#,
        )
        .bind(token_hash)
        .bind(token_type.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to look up auth token: {error}")))?;

        row.map(AuthTokenRecord::try_from).transpose()
    }

    async fn invalidate_tokens_for_identity(
        &self,
        identity_id: UserId,
        token_type: AuthTokenType,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE auth_tokens
            SET used_at = now()
            WHERE identity_id = $1 AND token_type = $2 AND used_at IS NULL
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(token_type.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to invalidate auth tokens: {error}"))
        })?;

        Ok(())
    }
}
