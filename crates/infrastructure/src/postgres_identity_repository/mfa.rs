use super::*;

impl PostgresIdentityRepository {
    pub(super) async fn store_totp_material_impl(
        &self,
        id: UserId,
        totp_secret_ct: &[u8],
        backup_codes_ct: &[u8],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET totp_secret_ct = $2, backup_codes_ct = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(totp_secret_ct)
        .bind(backup_codes_ct)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to store totp material: {error}")))?;

        Ok(())
    }

    pub(super) async fn confirm_totp_impl(&self, id: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET totp_enabled = TRUE, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to confirm totp: {error}")))?;

        Ok(())
    }

    pub(super) async fn clear_totp_impl(&self, id: UserId) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET totp_enabled = FALSE,
                totp_secret_ct = NULL,
                backup_codes_ct = NULL,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to clear totp: {error}")))?;

        Ok(())
    }

    pub(super) async fn update_backup_codes_impl(
        &self,
        id: UserId,
        backup_codes_ct: &[u8],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET backup_codes_ct = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(backup_codes_ct)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to update backup codes: {error}")))?;

        Ok(())
    }

    pub(super) async fn set_email_mfa_enabled_impl(
        &self,
        id: UserId,
        enabled: bool,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE identities
            SET email_mfa_enabled = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(enabled)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to set email mfa enabled: {error}")))?;

        Ok(())
    }
}
