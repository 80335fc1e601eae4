use authforge_domain::{IdentityKind, LoginResult, MfaType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub phone: String,
    pub kind: IdentityKind,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub identity_id: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_trust_token: Option<String>,
    #[serde(default)]
    pub remember_device: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyMfaRequest {
    pub challenge_token: String,
    pub code: String,
    #[serde(default)]
    pub remember_device: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyBackupCodeRequest {
    pub challenge_token: String,
    pub backup_code: String,
    #[serde(default)]
    pub remember_device: bool,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct FederatedLoginRequest {
    pub provider_id: String,
    pub provider: String,
    pub email: String,
    /// Defaults to `true`: some identity providers omit this claim entirely
    /// rather than asserting it explicitly.
    #[serde(default = "default_email_verified")]
    pub email_verified: bool,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub remember_device: bool,
}

fn default_email_verified() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct TotpFinalizeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct TotpDisableRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoginResponse {
    Challenged {
        challenge_token: String,
        mfa_type: &'static str,
    },
    Authenticated {
        access_token: String,
        refresh_token: String,
        device_trust_token: Option<String>,
    },
}

impl From<LoginResult> for LoginResponse {
    fn from(result: LoginResult) -> Self {
        match result {
            LoginResult::Challenged { challenge_token, mfa_type } => Self::Challenged {
                challenge_token,
                mfa_type: mfa_type_str(mfa_type),
            },
            LoginResult::Authenticated {
                access_token,
                refresh_token,
                device_trust_token,
            } => Self::Authenticated {
                access_token,
                refresh_token,
                device_trust_token,
            },
        }
    }
}

fn mfa_type_str(mfa_type: MfaType) -> &'static str {
    mfa_type.as_str()
}

#[derive(Debug, Serialize)]
pub struct TotpSetupResponse {
    pub secret_base32: String,
    pub otpauth_uri: String,
    pub backup_codes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BackupCodesResponse {
    pub backup_codes: Vec<String>,
}
