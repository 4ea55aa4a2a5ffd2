use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UpdateBioRequest {
    pub bio: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub bio: String,
    pub reviewed_albums: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BioUpdatedResponse {
    pub message: String,
    pub username: String,
    pub email: String,
    pub bio: String,
}
