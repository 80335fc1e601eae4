use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use authforge_application::RegisterParams;
use authforge_domain::AuthError;
use authforge_core::AppError;
use tower_http::cors::{Any, CorsLayer};

use crate::dto::{
    BackupCodesResponse, FederatedLoginRequest, LoginRequest, LoginResponse, LogoutRequest,
    RefreshRequest, RegisterRequest, RegisterResponse, ResendVerificationRequest,
    TotpDisableRequest, TotpFinalizeRequest, TotpSetupResponse, VerifyBackupCodeRequest,
    VerifyEmailRequest, VerifyMfaRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/login", post(login))
        .route("/auth/verify-mfa", post(verify_mfa))
        .route("/auth/verify-mfa/backup-code", post(verify_mfa_backup_code))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/federated-login", post(federated_login))
        .route("/mfa/totp/setup", post(totp_setup))
        .route("/mfa/totp/finalize", post(totp_finalize))
        .route("/mfa/totp/disable", post(totp_disable))
        .route("/mfa/backup-codes/regenerate", post(backup_codes_regenerate))
        .route("/mfa/email/enable", post(email_mfa_enable))
        .route("/mfa/email/disable", post(email_mfa_disable))
        .layer(cors)
        .with_state(state))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let identity_id = state
        .login_orchestrator
        .register(RegisterParams {
            email: body.email,
            password: body.password,
            display_name: body.display_name,
            phone: body.phone,
            kind: body.kind,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            identity_id: identity_id.as_uuid().to_string(),
        }),
    ))
}

async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> ApiResult<StatusCode> {
    state.login_orchestrator.verify_email(&body.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationRequest>,
) -> ApiResult<StatusCode> {
    state.login_orchestrator.resend_verification(&body.email).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let result = state
        .login_orchestrator
        .login(
            &body.email,
            &body.password,
            body.device_trust_token.as_deref(),
            body.remember_device,
        )
        .await?;

    Ok(Json(result.into()))
}

async fn verify_mfa(
    State(state): State<AppState>,
    Json(body): Json<VerifyMfaRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let result = state
        .login_orchestrator
        .verify_mfa(&body.challenge_token, &body.code, body.remember_device)
        .await?;

    Ok(Json(result.into()))
}

async fn verify_mfa_backup_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyBackupCodeRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let result = state
        .login_orchestrator
        .verify_mfa_with_backup_code(&body.challenge_token, &body.backup_code, body.remember_device)
        .await?;

    Ok(Json(result.into()))
}

async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let result = state.login_orchestrator.refresh(&body.refresh_token).await?;
    Ok(Json(result.into()))
}

async fn logout(
    State(state): State<AppState>,
    Json(body): Json<LogoutRequest>,
) -> ApiResult<StatusCode> {
    state.login_orchestrator.logout(&body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn federated_login(
    State(state): State<AppState>,
    Json(body): Json<FederatedLoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let assertion = authforge_application::FederatedAssertion {
        provider_id: body.provider_id,
        provider: body.provider,
        email: body.email,
        email_verified: body.email_verified,
        display_name: body.display_name,
    };

    let result = state
        .login_orchestrator
        .federated_login(&assertion, body.remember_device)
        .await?;

    Ok(Json(result.into()))
}

/// Placeholder identity id extraction for the demonstration binary: a real
/// deployment would pull this from a verified access token via middleware.
/// Accepted directly as a header here since access-token verification
/// middleware is Transport-layer plumbing outside this service's scope.
fn identity_id_from_header(
    headers: &axum::http::HeaderMap,
) -> Result<authforge_domain::UserId, AuthError> {
    let raw = headers
        .get("x-identity-id")
        .and_then(|value| value.to_str().ok())
        .ok_or(AuthError::TokenInvalid)?;

    uuid::Uuid::parse_str(raw)
        .map(authforge_domain::UserId::from_uuid)
        .map_err(|_| AuthError::TokenInvalid)
}

async fn totp_setup(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> ApiResult<Json<TotpSetupResponse>> {
    let identity_id = identity_id_from_header(&headers)?;
    let enrollment = state.login_orchestrator.totp_setup(identity_id).await?;

    Ok(Json(TotpSetupResponse {
        secret_base32: enrollment.secret_base32,
        otpauth_uri: enrollment.otpauth_uri,
        backup_codes: enrollment.backup_codes,
    }))
}

async fn totp_finalize(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(body): Json<TotpFinalizeRequest>,
) -> ApiResult<StatusCode> {
    let identity_id = identity_id_from_header(&headers)?;
    state.login_orchestrator.totp_finalize(identity_id, &body.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn totp_disable(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
    Json(body): Json<TotpDisableRequest>,
) -> ApiResult<StatusCode> {
    let identity_id = identity_id_from_header(&headers)?;
    state.login_orchestrator.totp_disable(identity_id, &body.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn backup_codes_regenerate(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> ApiResult<Json<BackupCodesResponse>> {
    let identity_id = identity_id_from_header(&headers)?;
    let backup_codes = state.login_orchestrator.backup_codes_regenerate(identity_id).await?;
    Ok(Json(BackupCodesResponse { backup_codes }))
}

async fn email_mfa_enable(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> ApiResult<StatusCode> {
    let identity_id = identity_id_from_header(&headers)?;
    state.login_orchestrator.email_mfa_enable(identity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn email_mfa_disable(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> ApiResult<StatusCode> {
    let identity_id = identity_id_from_header(&headers)?;
    state.login_orchestrator.email_mfa_disable(identity_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
