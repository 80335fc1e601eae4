//! JWT claim shapes for the four disjoint token families.
//!
//! Each family is a distinct Rust type rather than one generic claims bag
//! with optional fields; the `typ` field is still present on the wire so
//! verification can reject cross-family tokens cheaply, but callers never
//! need to check which optional fields are populated.

use serde::{Deserialize, Serialize};

use crate::auth::MfaType;

/// Discriminator embedded in every token so a verifier can reject a token
/// from the wrong family before even looking at its other claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Resource-access bearer token.
    Access,
    /// Refresh-token family.
    Refresh,
    /// Short-lived login-challenge token, called "temp" in the legacy wire format.
    #[serde(rename = "temp")]
    Challenge,
    /// Device-trust token, called "mfa_session" in the legacy wire format.
    #[serde(rename = "mfa_session")]
    DeviceTrust,
}

/// Claims for an `access` token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Token family discriminator; always `TokenType::Access`.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Identity id.
    pub sub: String,
    /// Identity email at the time of issuance.
    pub email: String,
    /// Unix expiry timestamp.
    pub exp: i64,
}

/// Claims for a `refresh` token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Token family discriminator; always `TokenType::Refresh`.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Identity id.
    pub sub: String,
    /// Identity email at the time of issuance.
    pub email: String,
    /// Fresh random identifier; the Session row is keyed by its hash.
    pub jti: String,
    /// Unix expiry timestamp.
    pub exp: i64,
}

/// Claims for a login-`challenge` token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeClaims {
    /// Token family discriminator; always `TokenType::Challenge`.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Identity id.
    pub sub: String,
    /// Identity email at the time of issuance.
    pub email: String,
    /// Which factor this challenge is waiting on.
    pub mfa_type: MfaType,
    /// Always `true`; kept so the shape matches the legacy wire format.
    pub mfa_pending: bool,
    /// Unix expiry timestamp.
    pub exp: i64,
}

/// Claims for a `device_trust` token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTrustClaims {
    /// Token family discriminator; always `TokenType::DeviceTrust`.
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Identity id.
    pub sub: String,
    /// Identity email at the time of issuance.
    pub email: String,
    /// Always `true`; kept so the shape matches the legacy wire format.
    pub mfa_verified: bool,
    /// Unix expiry timestamp.
    pub exp: i64,
}

impl Serialize for MfaType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MfaType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        MfaType::parse(&raw).map_err(serde::de::Error::custom)
    }
}
