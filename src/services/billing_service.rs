//! Billing domain service: checkout/portal session creation and webhook
//! event processing for both payment providers.
//!
//! Provider SDK calls sit behind gateway traits so the webhook pipeline
//! can be tested without network access.

use std::collections::HashMap;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use thiserror::Error;

use crate::clients::mercadopago::{MercadoPagoClient, MpPayment, Preference};
use crate::clients::stripe::{StripeClient, StripeEvent, StripeSubscription};

#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_customer(&self, email: &str, user_id: i32) -> AnyResult<String>;

    async fn create_checkout_session(
        &self,
        price_id: &str,
        customer_id: &str,
        success_url: &str,
        cancel_url: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String>;

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> AnyResult<String>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription>;

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now_unix: i64,
    ) -> AnyResult<StripeEvent>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_customer(&self, email: &str, user_id: i32) -> AnyResult<String> {
        self.create_customer(email, user_id).await
    }

    async fn create_checkout_session(
        &self,
        price_id: &str,
        customer_id: &str,
        success_url: &str,
        cancel_url: &str,
        metadata: HashMap<String, String>,
    ) -> AnyResult<String> {
        self.create_checkout_session(price_id, customer_id, success_url, cancel_url, metadata)
            .await
    }

    async fn create_portal_session(&self, customer_id: &str, return_url: &str) -> AnyResult<String> {
        self.create_portal_session(customer_id, return_url).await
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription> {
        self.retrieve_subscription(subscription_id).await
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature: &str,
        now_unix: i64,
    ) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature, now_unix)
    }
}

#[async_trait]
pub trait MercadoPagoGateway: Send + Sync {
    async fn create_preference(
        &self,
        user_id: i32,
        title: &str,
        unit_price: f64,
        back_url: &str,
    ) -> AnyResult<Preference>;

    async fn get_payment(&self, payment_id: &str) -> AnyResult<MpPayment>;

    fn verify_webhook_signature(
        &self,
        signature_header: &str,
        request_id: &str,
        data_id: &str,
    ) -> AnyResult<()>;
}

#[async_trait]
impl MercadoPagoGateway for MercadoPagoClient {
    async fn create_preference(
        &self,
        user_id: i32,
        title: &str,
        unit_price: f64,
        back_url: &str,
    ) -> AnyResult<Preference> {
        self.create_preference(user_id, title, unit_price, back_url)
            .await
    }

    async fn get_payment(&self, payment_id: &str) -> AnyResult<MpPayment> {
        self.get_payment(payment_id).await
    }

    fn verify_webhook_signature(
        &self,
        signature_header: &str,
        request_id: &str,
        data_id: &str,
    ) -> AnyResult<()> {
        self.verify_webhook_signature(signature_header, request_id, data_id)
    }
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{0} payments are not enabled")]
    ProviderDisabled(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("No provider subscription to manage")]
    NoProviderSubscription,

    #[error("invalid webhook payload: {0}")]
    InvalidWebhook(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// What the webhook endpoint tells the provider. A stored (or duplicate)
/// event is acknowledged even when processing is still pending.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WebhookReceipt {
    pub event_type: String,
    /// True when (provider, event_id) had already been stored.
    pub duplicate: bool,
}

/// Terminal state of one processing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventDisposition {
    /// The event mutated subscription state.
    Processed,
    /// Recognized but irrelevant event type.
    Skipped,
}
