use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Active identity in the database. Pending registrations live in a separate
/// holding table until their OTP is verified.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Argon2 hash; None for OAuth-only accounts. Never exposed in JSON.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code: Option<String>,
    #[serde(skip_serializing)]
    pub reset_code_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}
