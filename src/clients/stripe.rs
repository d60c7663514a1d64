use std::collections::HashMap;

use anyhow::Result;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;

use crate::constants::STRIPE_API;

type HmacSha256 = Hmac<Sha256>;

/// Minimal Stripe client built on reqwest. Covers the Checkout, customer
/// portal and subscription retrieval calls the billing flow needs, plus
/// webhook signature verification.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    base_url: String,
    /// Max accepted age of the signature timestamp, in seconds.
    signature_tolerance: i64,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub mode: Option<String>,
    pub subscription: Option<String>,
    pub customer: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: Option<String>,
    pub customer: Option<String>,
    pub status: Option<String>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: Option<bool>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Period end, falling back to the first item when the top-level
    /// field is absent (newer API versions moved it onto items).
    #[must_use]
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub customer: Option<String>,
    pub subscription: Option<String>,
}

impl StripeClient {
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        secret_key: String,
        webhook_secret: String,
        signature_tolerance: i64,
    ) -> Self {
        Self {
            http,
            secret_key,
            webhook_secret,
            base_url: STRIPE_API.to_string(),
            signature_tolerance,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .and_then(|value| value.to_str().ok())
            .map(std::string::ToString::to_string);
        let body = resp.text().await.unwrap_or_default();

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Creates a Stripe customer tagged with the GeekLogg user id.
    pub async fn create_customer(&self, email: &str, user_id: i32) -> Result<String> {
        let body = [
            ("email", email.to_string()),
            ("metadata[user_id]", user_id.to_string()),
        ];

        let resp = self
            .http
            .post(format!("{}/customers", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create customer").await?;

        #[derive(Deserialize)]
        struct CustomerResp {
            id: String,
        }

        let parsed: CustomerResp = resp.json().await?;
        Ok(parsed.id)
    }

    /// Creates a subscription-mode Checkout Session and returns its URL.
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        customer_id: &str,
        success_url: &str,
        cancel_url: &str,
        metadata: HashMap<String, String>,
    ) -> Result<String> {
        let mut body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("customer".to_string(), customer_id.to_string()),
            ("success_url".to_string(), success_url.to_string()),
            ("cancel_url".to_string(), cancel_url.to_string()),
        ];

        for (key, value) in metadata {
            body.push((format!("metadata[{key}]"), value));
        }

        let resp = self
            .http
            .post(format!("{}/checkout/sessions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        #[derive(Deserialize)]
        struct CheckoutResp {
            url: Option<String>,
        }

        let parsed: CheckoutResp = resp.json().await?;
        parsed
            .url
            .ok_or_else(|| anyhow::anyhow!("Stripe Checkout session URL is missing"))
    }

    /// Creates a customer-portal session for self-service management.
    pub async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> Result<String> {
        let body = [("customer", customer_id), ("return_url", return_url)];

        let resp = self
            .http
            .post(format!("{}/billing_portal/sessions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create portal session").await?;

        #[derive(Deserialize)]
        struct PortalResp {
            url: String,
        }

        let parsed: PortalResp = resp.json().await?;
        Ok(parsed.url)
    }

    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        let resp = self
            .http
            .get(format!("{}/subscriptions/{}", self.base_url, subscription_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    /// Verifies the `Stripe-Signature` header against the raw payload and
    /// parses the event. The signed payload is `{t}.{body}`; the v1
    /// signature is HMAC-SHA256 under the endpoint secret, compared in
    /// constant time. Stale timestamps outside the tolerance are rejected
    /// to blunt replay.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
        now_unix: i64,
    ) -> Result<StripeEvent> {
        let mut timestamp: Option<&str> = None;
        let mut signature: Option<&str> = None;

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest);
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
        let signature =
            signature.ok_or_else(|| anyhow::anyhow!("missing v1 in stripe-signature"))?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| anyhow::anyhow!("malformed timestamp in stripe-signature"))?;
        if (now_unix - ts).abs() > self.signature_tolerance {
            anyhow::bail!("stripe-signature timestamp outside tolerance");
        }

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);

        let provided = hex::decode(signature)?;
        mac.verify_slice(&provided)
            .map_err(|_| anyhow::anyhow!("invalid webhook signature"))?;

        let event: StripeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }

    #[must_use]
    pub fn extract_checkout_session(event: &StripeEvent) -> Option<StripeCheckoutSession> {
        serde_json::from_value(event.data.object.clone()).ok()
    }

    #[must_use]
    pub fn extract_subscription(event: &StripeEvent) -> Option<StripeSubscription> {
        serde_json::from_value(event.data.object.clone()).ok()
    }

    #[must_use]
    pub fn extract_invoice(event: &StripeEvent) -> Option<StripeInvoice> {
        serde_json::from_value(event.data.object.clone()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn client() -> StripeClient {
        StripeClient::new(
            reqwest::Client::new(),
            "sk_test".to_string(),
            SECRET.to_string(),
            300,
        )
    }

    fn sign(payload: &[u8], ts: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(format!("{ts}.").as_bytes());
        mac.update(payload);
        let sig = hex::encode(mac.finalize().into_bytes());
        format!("t={ts},v1={sig}")
    }

    const EVENT_JSON: &[u8] = br#"{
        "id": "evt_123",
        "type": "checkout.session.completed",
        "created": 1700000000,
        "data": { "object": { "id": "cs_1", "mode": "subscription",
                              "subscription": "sub_1", "customer": "cus_1",
                              "metadata": { "user_id": "7" } } }
    }"#;

    #[test]
    fn test_valid_signature_parses_event() {
        let now = 1_700_000_000;
        let header = sign(EVENT_JSON, now);

        let event = client()
            .verify_webhook_signature(EVENT_JSON, &header, now)
            .unwrap();
        assert_eq!(event.id, "evt_123");
        assert_eq!(event.type_, "checkout.session.completed");

        let session = StripeClient::extract_checkout_session(&event).unwrap();
        assert_eq!(session.customer.as_deref(), Some("cus_1"));
        assert_eq!(
            session.metadata.unwrap().get("user_id").map(String::as_str),
            Some("7")
        );
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = 1_700_000_000;
        let header = sign(EVENT_JSON, now);

        let mut tampered = EVENT_JSON.to_vec();
        tampered.extend_from_slice(b" ");
        assert!(
            client()
                .verify_webhook_signature(&tampered, &header, now)
                .is_err()
        );
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let ts = 1_700_000_000;
        let header = sign(EVENT_JSON, ts);

        assert!(
            client()
                .verify_webhook_signature(EVENT_JSON, &header, ts + 301)
                .is_err()
        );
    }

    #[test]
    fn test_missing_signature_parts_rejected() {
        let now = 1_700_000_000;
        assert!(
            client()
                .verify_webhook_signature(EVENT_JSON, "t=1700000000", now)
                .is_err()
        );
        assert!(
            client()
                .verify_webhook_signature(EVENT_JSON, "v1=deadbeef", now)
                .is_err()
        );
    }

    #[test]
    fn test_period_end_falls_back_to_items() {
        let sub = StripeSubscription {
            id: Some("sub_1".to_string()),
            customer: None,
            status: Some("active".to_string()),
            current_period_end: None,
            cancel_at_period_end: None,
            items: StripeSubscriptionItems {
                data: vec![StripeSubscriptionItem {
                    current_period_end: Some(1_800_000_000),
                }],
            },
        };

        assert_eq!(sub.period_end(), Some(1_800_000_000));
    }
}
