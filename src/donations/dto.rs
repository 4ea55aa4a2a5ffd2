use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::donations::repo_types::Payment;

#[derive(Debug, Deserialize)]
pub struct InitiateDonationRequest {
    pub amount: i64,
    pub donor_name: Option<String>,
    pub return_url: String,
}

#[derive(Debug, Serialize)]
pub struct InitiateDonationResponse {
    pub success: bool,
    pub payment_url: String,
    pub donation_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CompleteDonationQuery {
    pub pidx: String,
    pub purchase_order_id: Uuid,
    pub transaction_id: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteDonationResponse {
    pub success: bool,
    pub message: String,
    pub payment: Payment,
}
