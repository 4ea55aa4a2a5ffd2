use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    donations::{
        dto::{
            CompleteDonationQuery, CompleteDonationResponse, InitiateDonationRequest,
            InitiateDonationResponse,
        },
        khalti::lookup_confirms,
        repo,
        repo_types::{Donation, STATUS_COMPLETED},
    },
    error::ApiError,
    state::AppState,
};

pub fn donation_routes() -> Router<AppState> {
    Router::new()
        .route("/khalti/initiate-donation", post(initiate_donation))
        .route("/khalti/complete-donation", get(complete_donation))
}

#[instrument(skip(state, payload))]
pub async fn initiate_donation(
    State(state): State<AppState>,
    Json(payload): Json<InitiateDonationRequest>,
) -> Result<Json<InitiateDonationResponse>, ApiError> {
    if payload.amount <= 0 {
        return Err(ApiError::validation("Amount must be positive"));
    }
    if payload.return_url.trim().is_empty() {
        return Err(ApiError::validation("Return URL is required"));
    }

    let donation = Donation::create(&state.db, payload.donor_name.as_deref(), payload.amount)
        .await
        .map_err(ApiError::Internal)?;

    // The gateway takes paisa; the donation row keeps rupees.
    let initiated = state
        .gateway
        .initiate(
            payload.amount * 100,
            &donation.id.to_string(),
            &payload.return_url,
        )
        .await
        .map_err(|e| {
            warn!(error = %e, donation_id = %donation.id, "gateway initiate failed");
            ApiError::dependency("Could not initiate the payment")
        })?;

    Donation::set_pidx(&state.db, donation.id, &initiated.pidx)
        .await
        .map_err(ApiError::Internal)?;

    info!(donation_id = %donation.id, "donation initiated");
    Ok(Json(InitiateDonationResponse {
        success: true,
        payment_url: initiated.payment_url,
        donation_id: donation.id,
    }))
}

#[instrument(skip(state, query))]
pub async fn complete_donation(
    State(state): State<AppState>,
    Query(query): Query<CompleteDonationQuery>,
) -> Result<Json<CompleteDonationResponse>, ApiError> {
    let lookup = state.gateway.lookup(&query.pidx).await.map_err(|e| {
        warn!(error = %e, pidx = %query.pidx, "gateway lookup failed");
        ApiError::dependency("Could not verify the payment")
    })?;

    if !lookup_confirms(&lookup, &query.transaction_id) {
        warn!(pidx = %query.pidx, status = %lookup.status, "payment not confirmed");
        return Err(ApiError::validation("Payment failed"));
    }

    let donation = Donation::find_by_id(&state.db, query.purchase_order_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::not_found("Donation not found"))?;

    // Gateways retry callbacks; a completed donation must not grow a second
    // payment record.
    if donation.status == STATUS_COMPLETED {
        let payment = repo::find_payment_by_donation(&state.db, donation.id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| ApiError::not_found("Payment not found"))?;
        return Ok(Json(CompleteDonationResponse {
            success: true,
            message: "Payment already completed".into(),
            payment,
        }));
    }

    let payment = repo::complete_donation(
        &state.db,
        donation.id,
        &query.transaction_id,
        lookup.total_amount,
    )
    .await
    .map_err(ApiError::Internal)?;

    info!(donation_id = %donation.id, "donation completed");
    Ok(Json(CompleteDonationResponse {
        success: true,
        message: "Payment successful".into(),
        payment,
    }))
}
