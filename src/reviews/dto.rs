use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reviews::repo_types::Review;

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    pub album_id: Uuid,
    pub rating: i16,
    pub comment: String,
}

/// Body for `POST /albums/:id/review`; the album comes from the path.
#[derive(Debug, Deserialize)]
pub struct CreateAlbumReviewRequest {
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i16,
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub message: String,
    pub review: Review,
}

#[derive(Debug, Serialize)]
pub struct ReviewDeletedResponse {
    pub message: String,
}
