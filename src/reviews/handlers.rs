use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    catalog::repo_types::Album,
    error::ApiError,
    reviews::{
        dto::{
            CreateAlbumReviewRequest, CreateReviewRequest, ReviewDeletedResponse, ReviewResponse,
            UpdateReviewRequest,
        },
        repo,
        repo_types::{Review, ReviewWithAuthor},
    },
    state::AppState,
};

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/reviews/:id", put(update_review).delete(delete_review))
        .route("/reviews/album/:id", get(list_album_reviews))
        .route("/reviews/user", get(list_my_reviews))
        .route("/albums/:id/review", post(create_album_review))
}

pub(crate) fn validate_rating(rating: i16) -> Result<(), ApiError> {
    if !(0..=5).contains(&rating) {
        return Err(ApiError::validation("Rating must be between 0 and 5"));
    }
    Ok(())
}

fn validate_comment(comment: &str) -> Result<(), ApiError> {
    if comment.trim().is_empty() {
        return Err(ApiError::validation("Comment is required"));
    }
    Ok(())
}

async fn insert_review(
    state: &AppState,
    album_id: Uuid,
    auth: &AuthUser,
    rating: i16,
    comment: &str,
) -> Result<Review, ApiError> {
    validate_rating(rating)?;
    validate_comment(comment)?;

    Album::find_by_id(&state.db, album_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("Album not found"))?;

    let review = repo::create(&state.db, album_id, auth.id, rating, comment)
        .await
        .map_err(ApiError::Internal)?;

    info!(review_id = %review.id, album_id = %album_id, author = %auth.username, "review created");
    Ok(review)
}

#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let review = insert_review(
        &state,
        payload.album_id,
        &auth,
        payload.rating,
        &payload.comment,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review added successfully".into(),
            review,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_album_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(album_id): Path<Uuid>,
    Json(payload): Json<CreateAlbumReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let review = insert_review(&state, album_id, &auth, payload.rating, &payload.comment).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            message: "Review added successfully".into(),
            review,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(review_id): Path<Uuid>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    validate_rating(payload.rating)?;
    validate_comment(&payload.comment)?;

    let review = repo::find_by_id(&state.db, review_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    if review.user_id != auth.id {
        return Err(ApiError::authorization("You can only edit your own reviews"));
    }

    let review = repo::update(&state.db, review_id, payload.rating, &payload.comment)
        .await
        .map_err(ApiError::Internal)?;

    info!(review_id = %review.id, "review updated");
    Ok(Json(ReviewResponse {
        message: "Review updated successfully".into(),
        review,
    }))
}

#[instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(review_id): Path<Uuid>,
) -> Result<Json<ReviewDeletedResponse>, ApiError> {
    let review = repo::find_by_id(&state.db, review_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("Review not found"))?;

    if review.user_id != auth.id {
        return Err(ApiError::authorization(
            "You can only delete your own reviews",
        ));
    }

    repo::delete(&state.db, &review)
        .await
        .map_err(ApiError::Internal)?;

    info!(review_id = %review.id, "review deleted");
    Ok(Json(ReviewDeletedResponse {
        message: "Review deleted successfully".into(),
    }))
}

#[instrument(skip(state))]
pub async fn list_album_reviews(
    State(state): State<AppState>,
    Path(album_id): Path<Uuid>,
) -> Result<Json<Vec<ReviewWithAuthor>>, ApiError> {
    let reviews = repo::list_by_album(&state.db, album_id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(reviews))
}

#[instrument(skip(state))]
pub async fn list_my_reviews(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Review>>, ApiError> {
    let reviews = repo::list_by_user(&state.db, auth.id)
        .await
        .map_err(ApiError::Internal)?;
    Ok(Json(reviews))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_rating(0).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(matches!(validate_rating(-1), Err(ApiError::Validation(_))));
        assert!(matches!(validate_rating(6), Err(ApiError::Validation(_))));
    }

    #[test]
    fn blank_comments_are_rejected() {
        assert!(validate_comment("solid record").is_ok());
        assert!(matches!(validate_comment("   "), Err(ApiError::Validation(_))));
    }
}
