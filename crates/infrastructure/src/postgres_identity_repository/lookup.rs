use super::*;

const SELECT_COLUMNS: &str = r#"
    id, email, display_name, kind, status, password_hash, email_verified,
    federated_id, federated_provider, totp_secret_ct, totp_enabled,
    backup_codes_ct, email_mfa_enabled, failed_login_count, locked_until
"#;

impl PostgresIdentityRepository {
    pub(super) async fn find_by_email_impl(&self, email: &str) -> AppResult<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM identities WHERE LOWER(email) = LOWER($1) LIMIT 1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find identity by email: {error}")))?;

        row.map(IdentityRecord::try_from).transpose()
    }

    pub(super) async fn find_by_id_impl(&self, id: UserId) -> AppResult<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM identities WHERE id = $1 LIMIT 1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find identity by id: {error}")))?;

        row.map(IdentityRecord::try_from).transpose()
    }

    pub(super) async fn find_by_federated_id_impl(
        &self,
        federated_id: &str,
    ) -> AppResult<Option<IdentityRecord>> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM identities WHERE federated_id = $1 LIMIT 1"
        ))
        .bind(federated_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find identity by federated id: {error}"))
        })?;

        row.map(IdentityRecord::try_from).transpose()
    }
}
