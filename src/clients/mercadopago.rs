use anyhow::Result;
use hmac::{Hmac, Mac};
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::error;

use crate::constants::MERCADOPAGO_API;

type HmacSha256 = Hmac<Sha256>;

/// Mercado Pago client: preference creation for checkout, payment lookup
/// for webhook processing, and x-signature validation.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    access_token: String,
    webhook_secret: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct PreferenceItem {
    title: String,
    quantity: u32,
    unit_price: f64,
}

#[derive(Debug, Serialize)]
struct BackUrls {
    success: String,
    failure: String,
    pending: String,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest {
    items: Vec<PreferenceItem>,
    back_urls: BackUrls,
    external_reference: String,
}

#[derive(Debug, Deserialize)]
pub struct Preference {
    pub id: String,
    /// Checkout URL the client is redirected to.
    pub init_point: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MpPayment {
    pub id: i64,
    pub status: Option<String>,
    pub external_reference: Option<String>,
    #[serde(rename = "transaction_amount")]
    pub amount: Option<f64>,
}

/// Parsed body of a Mercado Pago webhook notification.
#[derive(Debug, Clone, Deserialize)]
pub struct MpNotification {
    pub id: Option<serde_json::Value>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub action: Option<String>,
    pub data: Option<MpNotificationData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MpNotificationData {
    pub id: serde_json::Value,
}

impl MpNotification {
    /// The payment id the notification points at, as a string.
    #[must_use]
    pub fn data_id(&self) -> Option<String> {
        self.data.as_ref().map(|d| match &d.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

impl MercadoPagoClient {
    #[must_use]
    pub fn new(http: reqwest::Client, access_token: String, webhook_secret: String) -> Self {
        Self {
            http,
            access_token,
            webhook_secret,
            base_url: MERCADOPAGO_API.to_string(),
        }
    }

    /// Creates a checkout preference for the premium subscription and
    /// returns it. `external_reference` carries the user id so the
    /// webhook can attribute the payment.
    pub async fn create_preference(
        &self,
        user_id: i32,
        title: &str,
        unit_price: f64,
        back_url: &str,
    ) -> Result<Preference> {
        let request = PreferenceRequest {
            items: vec![PreferenceItem {
                title: title.to_string(),
                quantity: 1,
                unit_price,
            }],
            back_urls: BackUrls {
                success: back_url.to_string(),
                failure: back_url.to_string(),
                pending: back_url.to_string(),
            },
            external_reference: user_id.to_string(),
        };

        let resp = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, response_body = %body, "mercadopago preference creation failed");
            anyhow::bail!("Mercado Pago preference creation failed: {status}");
        }

        Ok(resp.json().await?)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<MpPayment> {
        let resp = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Mercado Pago payment lookup failed: {status} - {body}");
        }

        Ok(resp.json().await?)
    }

    /// Validates the `x-signature` header of a webhook notification.
    ///
    /// Mercado Pago signs the manifest
    /// `id:{data.id};request-id:{x-request-id};ts:{ts};` with
    /// HMAC-SHA256 under the webhook secret; the header carries
    /// `ts=...,v1=...`. Comparison is constant time.
    pub fn verify_webhook_signature(
        &self,
        signature_header: &str,
        request_id: &str,
        data_id: &str,
    ) -> Result<()> {
        let mut ts: Option<&str> = None;
        let mut v1: Option<&str> = None;

        for part in signature_header.split(',') {
            let part = part.trim();
            if let Some(rest) = part.strip_prefix("ts=") {
                ts = Some(rest);
            } else if let Some(rest) = part.strip_prefix("v1=") {
                v1 = Some(rest);
            }
        }

        let ts = ts.ok_or_else(|| anyhow::anyhow!("missing ts in x-signature"))?;
        let v1 = v1.ok_or_else(|| anyhow::anyhow!("missing v1 in x-signature"))?;

        // Mercado Pago lowercases alphanumeric data ids in the manifest.
        let data_id = data_id.to_ascii_lowercase();
        let manifest = format!("id:{data_id};request-id:{request_id};ts:{ts};");

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(manifest.as_bytes());

        let provided = hex::decode(v1)?;
        mac.verify_slice(&provided)
            .map_err(|_| anyhow::anyhow!("invalid x-signature"))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "mp_test_secret";

    fn client() -> MercadoPagoClient {
        MercadoPagoClient::new(
            reqwest::Client::new(),
            "APP_USR-token".to_string(),
            SECRET.to_string(),
        )
    }

    fn sign(data_id: &str, request_id: &str, ts: &str) -> String {
        let manifest = format!(
            "id:{};request-id:{};ts:{};",
            data_id.to_ascii_lowercase(),
            request_id,
            ts
        );
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(manifest.as_bytes());
        format!("ts={ts},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let header = sign("12345", "req-1", "1704908010");
        assert!(
            client()
                .verify_webhook_signature(&header, "req-1", "12345")
                .is_ok()
        );
    }

    #[test]
    fn test_wrong_data_id_rejected() {
        let header = sign("12345", "req-1", "1704908010");
        assert!(
            client()
                .verify_webhook_signature(&header, "req-1", "99999")
                .is_err()
        );
    }

    #[test]
    fn test_missing_parts_rejected() {
        assert!(
            client()
                .verify_webhook_signature("ts=1704908010", "req-1", "12345")
                .is_err()
        );
        assert!(
            client()
                .verify_webhook_signature("v1=deadbeef", "req-1", "12345")
                .is_err()
        );
    }

    #[test]
    fn test_notification_data_id_accepts_both_shapes() {
        let text: MpNotification =
            serde_json::from_str(r#"{"type":"payment","data":{"id":"123"}}"#).unwrap();
        assert_eq!(text.data_id().as_deref(), Some("123"));

        let numeric: MpNotification =
            serde_json::from_str(r#"{"type":"payment","data":{"id":456}}"#).unwrap();
        assert_eq!(numeric.data_id().as_deref(), Some("456"));
    }
}
