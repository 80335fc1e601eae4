use super::*;

impl PostgresIdentityRepository {
    pub(super) async fn create_impl(&self, draft: NewIdentity) -> AppResult<UserId> {
        let id = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            INSERT INTO identities (
                email, display_name, phone, kind, password_hash, status,
                email_verified, federated_id, federated_provider
            )
            VALUES (LOWER($1), $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&draft.email)
        .bind(&draft.display_name)
        .bind(&draft.phone)
        .bind(kind_str(draft.kind))
        .bind(&draft.password_hash)
        .bind(draft.status.as_str())
        .bind(draft.email_verified)
        .bind(&draft.federated_id)
        .bind(&draft.federated_provider)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            if let sqlx::Error::Database(ref database_error) = error
                && database_error.code().as_deref() == Some("23505")
            {
                return AppError::Conflict("an account with this email already exists".to_owned());
            }
            AppError::Internal(format!("failed to create identity: {error}"))
        })?;

        Ok(UserId::from_uuid(id))
    }

    pub(super) async fn apply_patch_impl(&self, id: UserId, patch: IdentityPatch) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET display_name = COALESCE($2, display_name),
                phone = COALESCE($3, phone),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.display_name)
        .bind(patch.phone)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to patch identity: {error}")))?;

        Ok(())
    }

    pub(super) async fn mark_email_verified_impl(&self, id: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET email_verified = TRUE, status = 'active', updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to mark email verified: {error}")))?;

        Ok(())
    }

    pub(super) async fn link_federated_id_impl(
        &self,
        id: UserId,
        federated_id: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET federated_id = $2,
                federated_provider = CASE
                    WHEN password_hash IS NOT NULL THEN 'both'
                    ELSE 'google'
                END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(federated_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to link federated id: {error}")))?;

        Ok(())
    }

    pub(super) async fn record_failed_login_impl(
        &self,
        id: UserId,
        threshold: u32,
        lock_for_secs: i64,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET failed_login_count = failed_login_count + 1,
                locked_until = CASE
                    WHEN failed_login_count + 1 >= $2
                        THEN now() + make_interval(secs => $3::double precision)
                    ELSE locked_until
                END,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(i64::from(threshold))
        .bind(lock_for_secs)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record failed login: {error}")))?;

        Ok(())
    }

    pub(super) async fn reset_failed_logins_impl(&self, id: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET failed_login_count = 0, locked_until = NULL, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to reset failed logins: {error}")))?;

        Ok(())
    }

    pub(super) async fn record_successful_login_impl(&self, id: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET last_login_at = now(), updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to record successful login: {error}")))?;

        Ok(())
    }
}
