//! Token Service: JWT issuance/verification for the four disjoint token
//! families, and refresh-token rotation with single-use semantics.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Validation, decode, encode};
use sha2::{Digest, Sha256};

use authforge_core::{AppResult, Clock};
use authforge_domain::{
    AccessClaims, AuthError, ChallengeClaims, DeviceTrustClaims, MfaType, RefreshClaims,
    TokenType, UserId,
};

/// A persisted Session row, corresponding to one issued refresh token.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Session identifier.
    pub id: uuid::Uuid,
    /// Owning identity.
    pub identity_id: UserId,
    /// Whether this session is still usable for rotation/logout.
    pub is_active: bool,
    /// Expiry matching the refresh token's own `exp`.
    pub expires_at: DateTime<Utc>,
}

/// Repository port for refresh-token sessions.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds an active, unexpired session by the SHA-256 hash of its
    /// refresh token.
    async fn find_active(&self, refresh_hash: &str, now: DateTime<Utc>) -> AppResult<Option<SessionRecord>>;

    /// Atomically deactivates the session for `old_hash` and inserts a new
    /// active session for `new_hash`. Returns `true` if this call won the
    /// rotation race (the old session was still active at the time of the
    /// call), `false` if a concurrent rotation or logout had already
    /// deactivated it.
    async fn rotate(
        &self,
        old_hash: &str,
        identity_id: UserId,
        new_hash: &str,
        new_expires_at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Inserts a brand-new session (used on initial login, not rotation).
    async fn insert(
        &self,
        identity_id: UserId,
        refresh_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Marks the session for a refresh token hash inactive (logout).
    async fn deactivate(&self, refresh_hash: &str) -> AppResult<()>;
}

/// Default access-token lifetime.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::minutes(30);
/// Default refresh-token lifetime.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::days(7);
/// Default login-challenge lifetime.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::minutes(5);
/// Default device-trust lifetime.
pub const DEFAULT_DEVICE_TRUST_TTL: Duration = Duration::days(7);

/// A freshly issued access/refresh pair, plus the new session's hash so the
/// caller (the login orchestrator) can persist it.
pub struct IssuedTokenPair {
    /// Signed access token.
    pub access_token: String,
    /// Signed refresh token.
    pub refresh_token: String,
    /// SHA-256 hash of `refresh_token`, as stored in the Session row.
    pub refresh_hash: String,
    /// Expiry to store alongside the session.
    pub refresh_expires_at: DateTime<Utc>,
}

/// Issues and verifies the four JWT token families and drives refresh
/// rotation against the Session repository.
#[derive(Clone)]
pub struct TokenService {
    session_repository: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
    signing_key: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    challenge_ttl: Duration,
    device_trust_ttl: Duration,
}

impl TokenService {
    /// Creates a new token service.
    #[must_use]
    pub fn new(
        session_repository: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
        signing_key: Vec<u8>,
        access_ttl: Duration,
        refresh_ttl: Duration,
        challenge_ttl: Duration,
        device_trust_ttl: Duration,
    ) -> Self {
        Self {
            session_repository,
            clock,
            signing_key,
            access_ttl,
            refresh_ttl,
            challenge_ttl,
            device_trust_ttl,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(&self.signing_key)
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.signing_key)
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> Result<String, AuthError> {
        encode(&jsonwebtoken::Header::default(), claims, &self.encoding_key())
            .map_err(|error| AuthError::Internal(authforge_core::AppError::Internal(error.to_string())))
    }

    /// Decodes and verifies a token's signature without rejecting it on
    /// expiry: callers compare `exp` against the injected clock themselves,
    /// so tests never depend on wall-clock time and expiry boundaries are
    /// reported with the right variant (`TokenExpired`/`ChallengeExpired`)
    /// instead of a generic `TokenInvalid` from `jsonwebtoken`'s own check.
    fn decode_unvalidated_exp<T: serde::de::DeserializeOwned>(
        &self,
        token: &str,
    ) -> Result<T, AuthError> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        validation.validate_exp = false;
        validation.leeway = 0;
        decode::<T>(token, &self.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::TokenInvalid)
    }

    /// Issues a fresh access/refresh pair for a newly authenticated identity
    /// (no session is persisted here; the caller inserts one).
    pub fn issue_token_pair(&self, identity_id: UserId, email: &str) -> Result<IssuedTokenPair, AuthError> {
        let now = self.clock.now();

        let access = AccessClaims {
            token_type: TokenType::Access,
            sub: identity_id.to_string(),
            email: email.to_owned(),
            exp: (now + self.access_ttl).timestamp(),
        };
        let access_token = self.sign(&access)?;

        let jti = uuid::Uuid::new_v4().to_string();
        let refresh_expires_at = now + self.refresh_ttl;
        let refresh = RefreshClaims {
            token_type: TokenType::Refresh,
            sub: identity_id.to_string(),
            email: email.to_owned(),
            jti,
            exp: refresh_expires_at.timestamp(),
        };
        let refresh_token = self.sign(&refresh)?;
        let refresh_hash = sha256_hex(&refresh_token);

        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            refresh_hash,
            refresh_expires_at,
        })
    }

    /// Issues a login-challenge token scoped to one MFA factor.
    pub fn issue_challenge_token(
        &self,
        identity_id: UserId,
        email: &str,
        mfa_type: MfaType,
    ) -> Result<String, AuthError> {
        let claims = ChallengeClaims {
            token_type: TokenType::Challenge,
            sub: identity_id.to_string(),
            email: email.to_owned(),
            mfa_type,
            mfa_pending: true,
            exp: (self.clock.now() + self.challenge_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    /// Verifies and decodes a login-challenge token.
    pub fn verify_challenge_token(&self, token: &str) -> Result<ChallengeClaims, AuthError> {
        let claims: ChallengeClaims = self.decode_unvalidated_exp(token)?;
        if claims.token_type != TokenType::Challenge {
            return Err(AuthError::TokenInvalid);
        }
        if claims.exp < self.clock.now().timestamp() {
            return Err(AuthError::ChallengeExpired);
        }
        Ok(claims)
    }

    /// Issues a device-trust token that lets a device skip MFA.
    pub fn issue_device_trust_token(
        &self,
        identity_id: UserId,
        email: &str,
    ) -> Result<String, AuthError> {
        let claims = DeviceTrustClaims {
            token_type: TokenType::DeviceTrust,
            sub: identity_id.to_string(),
            email: email.to_owned(),
            mfa_verified: true,
            exp: (self.clock.now() + self.device_trust_ttl).timestamp(),
        };
        self.sign(&claims)
    }

    /// Verifies a device-trust token and returns the identity it trusts,
    /// if the token is valid, unexpired, and belongs to that identity.
    pub fn verify_device_trust_token(
        &self,
        token: &str,
        expected_identity_id: UserId,
    ) -> Result<(), AuthError> {
        let claims: DeviceTrustClaims = self.decode_unvalidated_exp(token)?;
        if claims.token_type != TokenType::DeviceTrust {
            return Err(AuthError::TokenInvalid);
        }
        if claims.exp < self.clock.now().timestamp() {
            return Err(AuthError::TokenExpired);
        }
        if claims.sub != expected_identity_id.to_string() {
            return Err(AuthError::TokenInvalid);
        }
        Ok(())
    }

    /// Rotates a presented refresh token: looks up its session, issues a
    /// fresh pair, and atomically deactivates the old session while
    /// inserting the new one. Presenting a token twice (reuse of a rotated
    /// or logged-out token) fails with `InvalidRefresh`.
    pub async fn rotate_refresh_token(&self, refresh_token: &str) -> Result<IssuedTokenPair, AuthError> {
        let claims: RefreshClaims = self.decode_unvalidated_exp(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidRefresh);
        }

        let now = self.clock.now();
        if claims.exp < now.timestamp() {
            return Err(AuthError::InvalidRefresh);
        }

        let old_hash = sha256_hex(refresh_token);
        let session = self
            .session_repository
            .find_active(&old_hash, now)
            .await?
            .ok_or(AuthError::InvalidRefresh)?;

        let identity_id = session.identity_id;
        let issued = self.issue_token_pair(identity_id, &claims.email)?;

        let won = self
            .session_repository
            .rotate(&old_hash, identity_id, &issued.refresh_hash, issued.refresh_expires_at)
            .await?;

        if !won {
            return Err(AuthError::InvalidRefresh);
        }

        Ok(issued)
    }

    /// Logs out by deactivating the session for a presented refresh token.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let hash = sha256_hex(refresh_token);
        self.session_repository.deactivate(&hash).await?;
        Ok(())
    }

    /// Persists a brand-new session for a just-issued token pair (initial
    /// login, not rotation).
    pub async fn persist_session(
        &self,
        identity_id: UserId,
        issued: &IssuedTokenPair,
    ) -> Result<(), AuthError> {
        self.session_repository
            .insert(identity_id, &issued.refresh_hash, issued.refresh_expires_at)
            .await?;
        Ok(())
    }
}

fn sha256_hex(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    result
        .iter()
        .fold(String::with_capacity(64), |mut acc, byte| {
            let _ = write!(acc, "{byte:02x}");
            acc
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use authforge_core::SystemClock;

    use super::*;

    struct InMemorySessions {
        by_hash: Mutex<HashMap<String, SessionRecord>>,
    }

    impl InMemorySessions {
        fn new() -> Self {
            Self {
                by_hash: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl SessionRepository for InMemorySessions {
        async fn find_active(
            &self,
            refresh_hash: &str,
            now: DateTime<Utc>,
        ) -> AppResult<Option<SessionRecord>> {
            let guard = self.by_hash.lock().unwrap_or_else(|e| e.into_inner());
            Ok(guard
                .get(refresh_hash)
                .filter(|s| s.is_active && s.expires_at > now)
                .cloned())
        }

        async fn rotate(
            &self,
            old_hash: &str,
            identity_id: UserId,
            new_hash: &str,
            new_expires_at: DateTime<Utc>,
        ) -> AppResult<bool> {
            let mut guard = self.by_hash.lock().unwrap_or_else(|e| e.into_inner());
            let won = match guard.get_mut(old_hash) {
                Some(session) if session.is_active => {
                    session.is_active = false;
                    true
                }
                _ => false,
            };
            if won {
                guard.insert(
                    new_hash.to_owned(),
                    SessionRecord {
                        id: uuid::Uuid::new_v4(),
                        identity_id,
                        is_active: true,
                        expires_at: new_expires_at,
                    },
                );
            }
            Ok(won)
        }

        async fn insert(
            &self,
            identity_id: UserId,
            refresh_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> AppResult<()> {
            self.by_hash.lock().unwrap_or_else(|e| e.into_inner()).insert(
                refresh_hash.to_owned(),
                SessionRecord {
                    id: uuid::Uuid::new_v4(),
                    identity_id,
                    is_active: true,
                    expires_at,
                },
            );
            Ok(())
        }

        async fn deactivate(&self, refresh_hash: &str) -> AppResult<()> {
            if let Some(session) = self
                .by_hash
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get_mut(refresh_hash)
            {
                session.is_active = false;
            }
            Ok(())
        }
    }

    fn service() -> TokenService {
        TokenService::new(
            Arc::new(InMemorySessions::new()),
            Arc::new(SystemClock),
            b"test-signing-key-at-least-32-bytes!".to_vec(),
            DEFAULT_ACCESS_TTL,
            DEFAULT_REFRESH_TTL,
            DEFAULT_CHALLENGE_TTL,
            DEFAULT_DEVICE_TRUST_TTL,
        )
    }

    #[tokio::test]
    async fn rotation_invalidates_previous_refresh_token() {
        let service = service();
        let identity_id = UserId::new();
        let issued = service
            .issue_token_pair(identity_id, "a@example.com")
            .unwrap_or_else(|_| panic!("test"));
        service
            .persist_session(identity_id, &issued)
            .await
            .unwrap_or_else(|_| panic!("test"));

        let rotated = service
            .rotate_refresh_token(&issued.refresh_token)
            .await
            .unwrap_or_else(|_| panic!("test"));
        assert_ne!(rotated.refresh_token, issued.refresh_token);

        let second = service.rotate_refresh_token(&issued.refresh_token).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn cross_family_token_is_rejected_as_challenge() {
        let service = service();
        let identity_id = UserId::new();
        let issued = service
            .issue_token_pair(identity_id, "a@example.com")
            .unwrap_or_else(|_| panic!("test"));

        let result = service.verify_challenge_token(&issued.access_token);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn device_trust_token_rejects_mismatched_identity() {
        let service = service();
        let identity_id = UserId::new();
        let other_id = UserId::new();
        let token = service
            .issue_device_trust_token(identity_id, "a@example.com")
            .unwrap_or_else(|_| panic!("test"));

        assert!(service.verify_device_trust_token(&token, identity_id).is_ok());
        assert!(service.verify_device_trust_token(&token, other_id).is_err());
    }
}
