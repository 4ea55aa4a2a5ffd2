use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

pub const STATUS_COMPLETED: &str = "completed";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Donation {
    pub id: Uuid,
    pub donor_name: Option<String>,
    /// Rupees; the gateway is paid in paisa (x100).
    pub amount: i64,
    pub status: String,
    pub pidx: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub donation_id: Uuid,
    pub transaction_id: String,
    pub amount: i64,
    pub status: String,
    pub payment_method: String,
    pub created_at: OffsetDateTime,
}
