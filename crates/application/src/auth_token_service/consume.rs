use authforge_domain::{AuthError, AuthTokenType};

use super::token_crypto::hash_token;
use super::*;

impl AuthTokenService {
    /// Atomically validates and consumes a token.
    ///
    /// Distinguishes a token that never existed (or was already used) from
    /// one that existed but expired, so callers can report `token_invalid`
    /// versus `token_expired`.
    pub async fn consume_valid_token(
        &self,
        raw_token: &str,
        token_type: AuthTokenType,
    ) -> Result<AuthTokenRecord, AuthError> {
        let token_hash = hash_token(raw_token);

        let consumed = self
            .token_repository
            .consume_valid_token(&token_hash, token_type)
            .await
            .map_err(AuthError::from)?;

        if let Some(record) = consumed {
            return Ok(record);
        }

        let unused = self
            .token_repository
            .find_unused_token(&token_hash, token_type)
            .await
            .map_err(AuthError::from)?;

        match unused {
            Some(_) => Err(AuthError::TokenExpired),
            None => Err(AuthError::TokenInvalid),
        }
    }
}
