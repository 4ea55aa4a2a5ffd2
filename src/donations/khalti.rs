use anyhow::Context;
use axum::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::KhaltiConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct InitiatedPayment {
    pub pidx: String,
    pub payment_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentLookup {
    pub status: String,
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub total_amount: i64,
}

/// True only when the gateway reports the transaction finished and the
/// callback's transaction id matches what the gateway saw.
pub fn lookup_confirms(lookup: &PaymentLookup, expected_transaction_id: &str) -> bool {
    lookup.status == "Completed"
        && lookup.transaction_id.as_deref() == Some(expected_transaction_id)
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate(
        &self,
        amount_paisa: i64,
        purchase_order_id: &str,
        return_url: &str,
    ) -> anyhow::Result<InitiatedPayment>;

    async fn lookup(&self, pidx: &str) -> anyhow::Result<PaymentLookup>;
}

pub struct KhaltiGateway {
    http: reqwest::Client,
    secret_key: String,
    base_url: String,
    website_url: String,
}

#[derive(Debug, Serialize)]
struct InitiateRequest<'a> {
    amount: i64,
    purchase_order_id: &'a str,
    purchase_order_name: &'a str,
    return_url: &'a str,
    website_url: &'a str,
}

impl KhaltiGateway {
    pub fn new(config: &KhaltiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build khalti http client")?;
        Ok(Self {
            http,
            secret_key: config.secret_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            website_url: config.website_url.clone(),
        })
    }

    fn auth_header(&self) -> String {
        format!("Key {}", self.secret_key)
    }
}

#[async_trait]
impl PaymentGateway for KhaltiGateway {
    async fn initiate(
        &self,
        amount_paisa: i64,
        purchase_order_id: &str,
        return_url: &str,
    ) -> anyhow::Result<InitiatedPayment> {
        let response = self
            .http
            .post(format!("{}/epayment/initiate/", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&InitiateRequest {
                amount: amount_paisa,
                purchase_order_id,
                purchase_order_name: "Donation",
                return_url,
                website_url: &self.website_url,
            })
            .send()
            .await
            .context("khalti initiate request")?
            .error_for_status()
            .context("khalti initiate status")?
            .json::<InitiatedPayment>()
            .await
            .context("khalti initiate body")?;
        Ok(response)
    }

    async fn lookup(&self, pidx: &str) -> anyhow::Result<PaymentLookup> {
        let response = self
            .http
            .post(format!("{}/epayment/lookup/", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&serde_json::json!({ "pidx": pidx }))
            .send()
            .await
            .context("khalti lookup request")?
            .error_for_status()
            .context("khalti lookup status")?
            .json::<PaymentLookup>()
            .await
            .context("khalti lookup body")?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(status: &str, txn: Option<&str>) -> PaymentLookup {
        PaymentLookup {
            status: status.into(),
            transaction_id: txn.map(Into::into),
            total_amount: 50_000,
        }
    }

    #[test]
    fn confirmation_needs_completed_status_and_a_matching_txn() {
        assert!(lookup_confirms(&lookup("Completed", Some("txn-1")), "txn-1"));
        assert!(!lookup_confirms(&lookup("Completed", Some("txn-2")), "txn-1"));
        assert!(!lookup_confirms(&lookup("Pending", Some("txn-1")), "txn-1"));
        assert!(!lookup_confirms(&lookup("Refunded", Some("txn-1")), "txn-1"));
        assert!(!lookup_confirms(&lookup("Completed", None), "txn-1"));
    }

    #[test]
    fn lookup_body_parses_the_gateway_shape() {
        let body = r#"{
          "pidx": "bZQLD9wRVWo4CdESSfuSsB",
          "total_amount": 100000,
          "status": "Completed",
          "transaction_id": "GFq9PFS7b2iYvL8Lir9oXe",
          "fee": 0,
          "refunded": false
        }"#;
        let parsed: PaymentLookup = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.status, "Completed");
        assert_eq!(parsed.total_amount, 100_000);
        assert!(lookup_confirms(&parsed, "GFq9PFS7b2iYvL8Lir9oXe"));
    }
}
