use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{jwt::AuthUser, repo_types::User},
    error::ApiError,
    state::AppState,
    users::dto::{BioUpdatedResponse, ProfileResponse, UpdateBioRequest},
};

pub const BIO_MAX_CHARS: usize = 150;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/profile", get(get_profile))
        .route("/user/update-bio", put(update_bio))
        .route("/user/:username", get(get_public_profile))
}

async fn reviewed_album_ids(state: &AppState, user_id: Uuid) -> Result<Vec<Uuid>, ApiError> {
    let ids: Vec<(Uuid,)> =
        sqlx::query_as("SELECT DISTINCT album_id FROM reviews WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&state.db)
            .await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

fn profile_of(user: &User, reviewed_albums: Vec<Uuid>) -> ProfileResponse {
    ProfileResponse {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        avatar_url: user.avatar_url.clone(),
        bio: user.bio.clone().unwrap_or_default(),
        reviewed_albums,
    }
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_id(&state.db, auth.id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let reviewed = reviewed_album_ids(&state, user.id).await?;
    Ok(Json(profile_of(&user, reviewed)))
}

#[instrument(skip(state))]
pub async fn get_public_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = User::find_by_username(&state.db, &username)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let reviewed = reviewed_album_ids(&state, user.id).await?;
    Ok(Json(profile_of(&user, reviewed)))
}

#[instrument(skip(state, payload))]
pub async fn update_bio(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<UpdateBioRequest>,
) -> Result<Json<BioUpdatedResponse>, ApiError> {
    if payload.bio.chars().count() > BIO_MAX_CHARS {
        return Err(ApiError::validation(format!(
            "Bio must be at most {} characters",
            BIO_MAX_CHARS
        )));
    }

    let user = User::update_bio(&state.db, auth.id, &payload.bio)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!(user_id = %user.id, "bio updated");
    Ok(Json(BioUpdatedResponse {
        message: "Bio updated successfully".into(),
        username: user.username,
        email: user.email,
        bio: user.bio.unwrap_or_default(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn profile_hides_nothing_it_should_show_and_shows_nothing_it_should_hide() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: Some("$argon2id$secret".into()),
            bio: None,
            avatar_url: Some("https://img.example/a.png".into()),
            reset_code: Some("123456".into()),
            reset_code_expires_at: None,
            created_at: datetime!(2025-01-01 00:00 UTC),
        };
        let profile = profile_of(&user, vec![]);
        let json = serde_json::to_string(&profile).unwrap();
        assert!(json.contains("alice@example.com"));
        assert!(json.contains(r#""bio":"""#));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("123456"));
    }
}
