use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AuthResponse, ForgotPasswordRequest, LoginRequest, MessageResponse, OtpSentResponse,
            PublicUser, RegisterRequest, ResendOtpRequest, ResetPasswordRequest, VerifyOtpRequest,
        },
        jwt::JwtKeys,
        otp::OtpManager,
        password::{hash_password, verify_password},
        repo_types::User,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-otp", post(verify_otp))
        .route("/auth/resend-otp", post(resend_otp))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn internal(e: anyhow::Error) -> ApiError {
    ApiError::Internal(e)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    payload.username = payload.username.trim().to_string();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password != payload.confirm_password {
        return Err(ApiError::validation("Passwords do not match"));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::validation("Password too short"));
    }

    if User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::conflict("Email already in use"));
    }
    if User::find_by_username(&state.db, &payload.username)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(username = %payload.username, "username taken");
        return Err(ApiError::conflict("Username already taken"));
    }

    // The secret is hashed before the pending entry is persisted anywhere.
    let hash = hash_password(&payload.password).map_err(internal)?;

    let manager = OtpManager::from_ref(&state);
    manager
        .issue_registration(&payload.username, &payload.email, &hash)
        .await?;

    info!(email = %payload.email, "registration OTP issued");
    Ok(Json(OtpSentResponse {
        message: "OTP sent successfully".into(),
        email: payload.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<VerifyOtpRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let manager = OtpManager::from_ref(&state);
    let entry = manager
        .verify_registration(&payload.email, &payload.otp)
        .await?;

    // Someone may have claimed the email while the code was in flight.
    if User::find_by_email(&state.db, &entry.email)
        .await
        .map_err(internal)?
        .is_some()
    {
        warn!(email = %entry.email, "email claimed during verification");
        return Err(ApiError::conflict("Email already in use"));
    }

    let user = User::create(
        &state.db,
        &entry.username,
        &entry.email,
        Some(&entry.password_hash),
    )
    .await
    .map_err(|e| {
        error!(error = %e, "promote pending registration failed");
        ApiError::Internal(e)
    })?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.username).map_err(internal)?;

    info!(user_id = %user.id, email = %user.email, "registration verified");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful".into(),
            user: PublicUser::from(&user),
            token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(mut payload): Json<ResendOtpRequest>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let manager = OtpManager::from_ref(&state);
    manager.resend_registration(&payload.email).await?;

    info!(email = %payload.email, "registration OTP resent");
    Ok(Json(OtpSentResponse {
        message: "New OTP sent successfully".into(),
        email: payload.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            ApiError::authentication("Invalid email or password")
        })?;

    // OAuth-only accounts have no hash and cannot log in with a password.
    let Some(hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "password login against oauth-only account");
        return Err(ApiError::authentication("Invalid email or password"));
    };

    let ok = verify_password(&payload.password, hash).map_err(internal)?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::authentication("Invalid email or password"));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.username).map_err(internal)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful".into(),
        user: PublicUser::from(&user),
        token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<OtpSentResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let manager = OtpManager::from_ref(&state);
    let (code, expires_at) = manager.fresh_code();

    // Stored before the send so a delivery failure leaves a usable code
    // behind for a retried request; the current secret stays untouched.
    User::set_reset_code(&state.db, user.id, &code, expires_at)
        .await
        .map_err(internal)?;

    manager.send_reset_code(&user.email, &code).await?;

    info!(user_id = %user.id, "password reset OTP issued");
    Ok(Json(OtpSentResponse {
        message: "OTP sent successfully".into(),
        email: payload.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.new_password.is_empty() {
        return Err(ApiError::validation("New password is required"));
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation("Password too short"));
    }

    let user = User::find_by_email(&state.db, &payload.email)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let manager = OtpManager::from_ref(&state);
    // Any precondition failure leaves the reset fields untouched, so a
    // correct retry before expiry still succeeds.
    manager.check_reset_code(&user, &payload.otp)?;

    let hash = hash_password(&payload.new_password).map_err(internal)?;
    User::apply_password_reset(&state.db, user.id, &hash)
        .await
        .map_err(internal)?;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "Password reset successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("alice@example"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two @example.com"));
    }

    #[test]
    fn public_user_serialization_has_no_secret() {
        let user = PublicUser {
            id: uuid::Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice@example.com"));
        assert!(!json.contains("password"));
        assert!(!json.contains("hash"));
    }
}
