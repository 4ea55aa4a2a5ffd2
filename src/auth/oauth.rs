use axum::{
    extract::{FromRef, Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser},
        jwt::JwtKeys,
        repo_types::User,
    },
    config::GoogleConfig,
    error::ApiError,
    state::AppState,
};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

pub fn oauth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
}

fn authorize_url(config: &GoogleConfig) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_url),
        urlencoding::encode("openid email profile"),
    )
}

/// Local-part of the email, as the default handle for OAuth signups.
fn username_from_email(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleProfile {
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[instrument(skip(state))]
pub async fn google_redirect(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&authorize_url(&state.config.google))
}

#[instrument(skip(state, query))]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<AuthResponse>, ApiError> {
    let config = &state.config.google;
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .map_err(|e| ApiError::Internal(e.into()))?;

    let token: TokenResponse = http
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", query.code.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("redirect_uri", config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            warn!(error = %e, "google token exchange failed");
            ApiError::dependency("Google sign-in failed")
        })?
        .json()
        .await
        .map_err(|e| {
            warn!(error = %e, "google token response did not parse");
            ApiError::dependency("Google sign-in failed")
        })?;

    let profile: GoogleProfile = http
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            warn!(error = %e, "google userinfo fetch failed");
            ApiError::dependency("Google sign-in failed")
        })?
        .json()
        .await
        .map_err(|e| {
            warn!(error = %e, "google userinfo did not parse");
            ApiError::dependency("Google sign-in failed")
        })?;

    let user = find_or_create_oauth_user(&state, &profile).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(user.id, &user.username)
        .map_err(ApiError::Internal)?;

    info!(user_id = %user.id, "google login");
    Ok(Json(AuthResponse {
        message: "Google login successful".into(),
        user: PublicUser::from(&user),
        token,
    }))
}

/// Look the identity up by email, creating a password-less one on first
/// sign-in. Handle collisions get a numeric suffix.
async fn find_or_create_oauth_user(
    state: &AppState,
    profile: &GoogleProfile,
) -> Result<User, ApiError> {
    let email = profile.email.trim().to_lowercase();

    if let Some(user) = User::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::Internal)?
    {
        return Ok(user);
    }

    let base = profile
        .name
        .as_deref()
        .map(|n| n.trim().replace(' ', "").to_lowercase())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| username_from_email(&email));

    let mut username = base.clone();
    let mut attempt = 0u32;
    while User::find_by_username(&state.db, &username)
        .await
        .map_err(ApiError::Internal)?
        .is_some()
    {
        attempt += 1;
        if attempt > 5 {
            return Err(ApiError::conflict("Could not allocate a username"));
        }
        username = format!("{}{}", base, rand::Rng::gen_range(&mut rand::thread_rng(), 100..1000));
    }

    let user = User::create(&state.db, &username, &email, None)
        .await
        .map_err(ApiError::Internal)?;

    if let Some(picture) = profile.picture.as_deref() {
        sqlx::query("UPDATE users SET avatar_url = $2 WHERE id = $1")
            .bind(user.id)
            .bind(picture)
            .execute(&state.db)
            .await
            .map_err(|e| ApiError::Internal(e.into()))?;
    }

    info!(user_id = %user.id, "oauth identity created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_the_client_and_redirect() {
        let config = GoogleConfig {
            client_id: "client-123".into(),
            client_secret: "shh".into(),
            redirect_url: "http://localhost:8080/auth/google/callback".into(),
        };
        let url = authorize_url(&config);
        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(&urlencoding::encode("openid email profile").into_owned()));
        assert!(!url.contains("shh"));
    }

    #[test]
    fn username_falls_back_to_the_local_part() {
        assert_eq!(username_from_email("alice@example.com"), "alice");
        assert_eq!(username_from_email("no-at-sign"), "no-at-sign");
    }
}
