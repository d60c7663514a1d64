//! Webhook ingestion and subscription state sync.
//!
//! Events are verified, then durably stored, then applied. The provider
//! is acknowledged once the row exists; a failed application leaves the
//! row pending for the scheduler's retry sweep. Redeliveries collapse on
//! the (provider, event_id) uniqueness of the event log, which also makes
//! out-of-order deliveries self-healing: an invoice event arriving before
//! its checkout event fails, stays pending, and succeeds on a later sweep.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult, anyhow};
use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info, warn};

use crate::clients::mercadopago::{MpNotification, Preference};
use crate::clients::stripe::{StripeClient, StripeEvent};
use crate::config::Config;
use crate::db::{Store, SubscriptionPatch};
use crate::domain::UserId;
use crate::domain::events::NotificationEvent;
use crate::models::subscription::{
    PaymentProvider, Subscription, SubscriptionStatus, SubscriptionTier,
};
use crate::services::billing_service::{
    BillingError, EventDisposition, MercadoPagoGateway, StripeGateway, WebhookReceipt,
};

const STRIPE: &str = "stripe";
const MERCADOPAGO: &str = "mercadopago";

pub struct BillingService {
    store: Arc<Store>,
    stripe: Option<Arc<dyn StripeGateway>>,
    mercadopago: Option<Arc<dyn MercadoPagoGateway>>,
    config: Arc<RwLock<Config>>,
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl BillingService {
    #[must_use]
    pub const fn new(
        store: Arc<Store>,
        stripe: Option<Arc<dyn StripeGateway>>,
        mercadopago: Option<Arc<dyn MercadoPagoGateway>>,
        config: Arc<RwLock<Config>>,
        event_bus: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self {
            store,
            stripe,
            mercadopago,
            config,
            event_bus,
        }
    }

    fn stripe_gateway(&self) -> Result<&Arc<dyn StripeGateway>, BillingError> {
        self.stripe
            .as_ref()
            .ok_or(BillingError::ProviderDisabled("Stripe"))
    }

    fn mp_gateway(&self) -> Result<&Arc<dyn MercadoPagoGateway>, BillingError> {
        self.mercadopago
            .as_ref()
            .ok_or(BillingError::ProviderDisabled("Mercado Pago"))
    }

    pub async fn current_subscription(&self, user: UserId) -> Result<Subscription, BillingError> {
        self.store
            .get_subscription(user.value())
            .await
            .map_err(BillingError::Internal)
    }

    /// Creates a Stripe Checkout session for the premium price, reusing
    /// or creating the Stripe customer first.
    pub async fn create_stripe_checkout(&self, user: UserId) -> Result<String, BillingError> {
        let gateway = self.stripe_gateway()?;
        let stripe_config = self.config.read().await.stripe.clone();

        let account = self
            .store
            .get_user_by_id(user.value())
            .await
            .map_err(BillingError::Internal)?
            .ok_or(BillingError::UserNotFound)?;

        let subscription = self.current_subscription(user).await?;
        let customer_id = match subscription.customer_id {
            Some(id) => id,
            None => {
                let id = gateway
                    .create_customer(&account.email, user.value())
                    .await
                    .map_err(BillingError::Internal)?;

                self.store
                    .patch_subscription(
                        user.value(),
                        &SubscriptionPatch {
                            provider: Some(PaymentProvider::Stripe),
                            customer_id: Some(id.clone()),
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(BillingError::Internal)?;
                id
            }
        };

        let metadata = HashMap::from([("user_id".to_string(), user.to_string())]);

        let url = gateway
            .create_checkout_session(
                &stripe_config.premium_price_id,
                &customer_id,
                &stripe_config.success_url,
                &stripe_config.cancel_url,
                metadata,
            )
            .await
            .map_err(BillingError::Internal)?;

        info!(%user, "stripe checkout session created");
        Ok(url)
    }

    /// Customer-portal session for self-service subscription management.
    pub async fn create_stripe_portal(&self, user: UserId) -> Result<String, BillingError> {
        let gateway = self.stripe_gateway()?;
        let return_url = self.config.read().await.stripe.portal_return_url.clone();

        let subscription = self.current_subscription(user).await?;
        let customer_id = subscription
            .customer_id
            .ok_or(BillingError::NoProviderSubscription)?;

        gateway
            .create_portal_session(&customer_id, &return_url)
            .await
            .map_err(BillingError::Internal)
    }

    /// Creates a Mercado Pago checkout preference and records it.
    pub async fn create_mp_preference(&self, user: UserId) -> Result<Preference, BillingError> {
        let gateway = self.mp_gateway()?;
        let mp_config = self.config.read().await.mercadopago.clone();

        self.store
            .get_user_by_id(user.value())
            .await
            .map_err(BillingError::Internal)?
            .ok_or(BillingError::UserNotFound)?;

        let preference = gateway
            .create_preference(
                user.value(),
                "GeekLogg Premium",
                mp_config.premium_price,
                &mp_config.back_url,
            )
            .await
            .map_err(BillingError::Internal)?;

        self.store
            .record_payment_preference(user.value(), &preference.id)
            .await
            .map_err(BillingError::Internal)?;

        info!(%user, preference_id = %preference.id, "mercadopago preference created");
        Ok(preference)
    }

    /// Stripe webhook entry point: verify, store, then apply.
    ///
    /// Signature mismatch fails before any state is touched. A stored or
    /// duplicate event yields a receipt (the HTTP layer answers 200); an
    /// application failure is recorded on the row, never surfaced to the
    /// provider.
    pub async fn ingest_stripe(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookReceipt, BillingError> {
        let gateway = self.stripe_gateway()?;

        let event = gateway
            .verify_webhook_signature(payload, signature, Utc::now().timestamp())
            .map_err(|err| {
                warn!(error = %err, "stripe webhook verification failed");
                BillingError::InvalidWebhook("signature verification failed".into())
            })?;

        let payload_str = String::from_utf8_lossy(payload);
        let stored = self
            .store
            .store_webhook_event(STRIPE, &event.id, &event.type_, &payload_str)
            .await
            .map_err(BillingError::Internal)?;

        let Some(row_id) = stored else {
            debug!(event_id = %event.id, "stripe webhook redelivery ignored");
            return Ok(WebhookReceipt {
                event_type: event.type_,
                duplicate: true,
            });
        };

        let _ = self.event_bus.send(NotificationEvent::WebhookStored {
            provider: STRIPE.to_string(),
            event_type: event.type_.clone(),
        });

        // The event is durable; apply it now but keep failures off the
        // provider response.
        if let Err(err) = self.process_stored_event(row_id).await {
            warn!(event_id = %event.id, error = %err, "stripe event application failed, left pending");
        }

        Ok(WebhookReceipt {
            event_type: event.type_,
            duplicate: false,
        })
    }

    /// Mercado Pago webhook entry point.
    ///
    /// Notifications carry a topic and a payment id; the payment itself is
    /// fetched from the API during application.
    pub async fn ingest_mercadopago(
        &self,
        payload: &[u8],
        signature: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<WebhookReceipt, BillingError> {
        let gateway = self.mp_gateway()?;

        let notification: MpNotification = serde_json::from_slice(payload)
            .map_err(|err| BillingError::InvalidWebhook(format!("malformed body: {err}")))?;

        let data_id = notification
            .data_id()
            .ok_or_else(|| BillingError::InvalidWebhook("missing data.id".into()))?;

        let secret_configured = !self.config.read().await.mercadopago.webhook_secret.is_empty();
        if secret_configured {
            let signature = signature
                .ok_or_else(|| BillingError::InvalidWebhook("missing x-signature".into()))?;
            gateway
                .verify_webhook_signature(signature, request_id.unwrap_or_default(), &data_id)
                .map_err(|err| {
                    warn!(error = %err, "mercadopago webhook verification failed");
                    BillingError::InvalidWebhook("signature verification failed".into())
                })?;
        }

        let event_type = notification
            .action
            .clone()
            .or_else(|| notification.type_.clone())
            .unwrap_or_else(|| "unknown".to_string());

        // Notification ids are reused across redeliveries; fall back to a
        // composite key when absent.
        let event_id = notification
            .id
            .as_ref()
            .map_or_else(|| format!("{event_type}:{data_id}"), ToString::to_string);

        let payload_str = String::from_utf8_lossy(payload);
        let stored = self
            .store
            .store_webhook_event(MERCADOPAGO, &event_id, &event_type, &payload_str)
            .await
            .map_err(BillingError::Internal)?;

        let Some(row_id) = stored else {
            debug!(event_id = %event_id, "mercadopago webhook redelivery ignored");
            return Ok(WebhookReceipt {
                event_type,
                duplicate: true,
            });
        };

        let _ = self.event_bus.send(NotificationEvent::WebhookStored {
            provider: MERCADOPAGO.to_string(),
            event_type: event_type.clone(),
        });

        if let Err(err) = self.process_stored_event(row_id).await {
            warn!(event_id = %event_id, error = %err, "mercadopago event application failed, left pending");
        }

        Ok(WebhookReceipt {
            event_type,
            duplicate: false,
        })
    }

    /// Applies a stored event and records the outcome on its row.
    pub async fn process_stored_event(&self, id: i64) -> AnyResult<EventDisposition> {
        let row = self
            .store
            .get_webhook_event(id)
            .await?
            .ok_or_else(|| anyhow!("webhook event {id} not found"))?;

        let max_attempts = self.config.read().await.scheduler.webhook_max_attempts;

        let outcome = match row.provider.as_str() {
            STRIPE => self.apply_stripe_payload(&row.payload).await,
            MERCADOPAGO => self.apply_mp_payload(&row.payload).await,
            other => Err(anyhow!("unknown webhook provider: {other}")),
        };

        match outcome {
            Ok(EventDisposition::Processed) => {
                self.store.mark_webhook_processed(id).await?;
                let _ = self.event_bus.send(NotificationEvent::WebhookProcessed {
                    provider: row.provider,
                    event_type: row.event_type,
                });
                Ok(EventDisposition::Processed)
            }
            Ok(EventDisposition::Skipped) => {
                self.store.mark_webhook_skipped(id).await?;
                Ok(EventDisposition::Skipped)
            }
            Err(err) => {
                self.store
                    .record_webhook_failure(id, &err.to_string(), max_attempts)
                    .await?;
                let _ = self.event_bus.send(NotificationEvent::WebhookFailed {
                    provider: row.provider,
                    event_type: row.event_type,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Retry sweep over pending events, oldest first. Returns
    /// (processed-or-skipped, failed) counts.
    pub async fn retry_pending(&self, limit: u64) -> AnyResult<(u32, u32)> {
        let max_attempts = self.config.read().await.scheduler.webhook_max_attempts;
        let pending = self
            .store
            .pending_webhook_events(max_attempts, limit)
            .await?;

        let mut done = 0u32;
        let mut failed = 0u32;

        for row in pending {
            match self.process_stored_event(row.id).await {
                Ok(_) => done += 1,
                Err(_) => failed += 1,
            }
        }

        if done > 0 || failed > 0 {
            info!(done, failed, "webhook retry sweep finished");
            let _ = self.event_bus.send(NotificationEvent::WebhookSweepFinished {
                processed: done,
                failed,
            });
        }

        Ok((done, failed))
    }

    // ----- Stripe event application -----

    async fn apply_stripe_payload(&self, payload: &str) -> AnyResult<EventDisposition> {
        let event: StripeEvent =
            serde_json::from_str(payload).context("stored stripe payload unparsable")?;

        match event.type_.as_str() {
            "checkout.session.completed" => self.apply_checkout_completed(&event).await,
            "customer.subscription.updated" => self.apply_subscription_updated(&event).await,
            "customer.subscription.deleted" => self.apply_subscription_deleted(&event).await,
            "invoice.payment_succeeded" => {
                self.apply_invoice_status(&event, SubscriptionStatus::Active)
                    .await
            }
            "invoice.payment_failed" => {
                self.apply_invoice_status(&event, SubscriptionStatus::PastDue)
                    .await
            }
            other => {
                debug!("unhandled stripe event type: {other}");
                Ok(EventDisposition::Skipped)
            }
        }
    }

    async fn apply_checkout_completed(&self, event: &StripeEvent) -> AnyResult<EventDisposition> {
        let session = StripeClient::extract_checkout_session(event)
            .ok_or_else(|| anyhow!("missing checkout session object"))?;

        let user_id: i32 = session
            .metadata
            .as_ref()
            .and_then(|m| m.get("user_id"))
            .ok_or_else(|| anyhow!("checkout session missing user_id metadata"))?
            .parse()
            .context("user_id metadata is not an integer")?;

        // Best effort: the period end comes from the subscription object.
        let current_period_end = match (&self.stripe, &session.subscription) {
            (Some(gateway), Some(subscription_id)) => gateway
                .retrieve_subscription(subscription_id)
                .await
                .map_err(|err| warn!(error = %err, "could not fetch subscription period"))
                .ok()
                .and_then(|sub| sub.period_end())
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            _ => None,
        };

        self.patch_and_announce(
            user_id,
            SubscriptionPatch {
                provider: Some(PaymentProvider::Stripe),
                customer_id: session.customer.clone(),
                subscription_id: session.subscription.clone(),
                tier: Some(SubscriptionTier::Premium),
                status: Some(SubscriptionStatus::Active),
                current_period_end,
            },
        )
        .await?;

        Ok(EventDisposition::Processed)
    }

    async fn apply_subscription_updated(&self, event: &StripeEvent) -> AnyResult<EventDisposition> {
        let provider_sub = StripeClient::extract_subscription(event)
            .ok_or_else(|| anyhow!("missing subscription object"))?;

        let record = self.find_stripe_user(&provider_sub.id, &provider_sub.customer).await?;

        let status = provider_sub
            .status
            .as_deref()
            .and_then(SubscriptionStatus::parse)
            .unwrap_or(SubscriptionStatus::Incomplete);

        let tier = if matches!(status, SubscriptionStatus::Canceled) {
            SubscriptionTier::Free
        } else {
            SubscriptionTier::Premium
        };

        self.patch_and_announce(
            record.user_id,
            SubscriptionPatch {
                provider: Some(PaymentProvider::Stripe),
                subscription_id: provider_sub.id.clone(),
                tier: Some(tier),
                status: Some(status),
                current_period_end: provider_sub
                    .period_end()
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
                ..Default::default()
            },
        )
        .await?;

        Ok(EventDisposition::Processed)
    }

    async fn apply_subscription_deleted(&self, event: &StripeEvent) -> AnyResult<EventDisposition> {
        let provider_sub = StripeClient::extract_subscription(event)
            .ok_or_else(|| anyhow!("missing subscription object"))?;

        let record = self.find_stripe_user(&provider_sub.id, &provider_sub.customer).await?;

        self.patch_and_announce(
            record.user_id,
            SubscriptionPatch {
                tier: Some(SubscriptionTier::Free),
                status: Some(SubscriptionStatus::Canceled),
                ..Default::default()
            },
        )
        .await?;

        Ok(EventDisposition::Processed)
    }

    async fn apply_invoice_status(
        &self,
        event: &StripeEvent,
        status: SubscriptionStatus,
    ) -> AnyResult<EventDisposition> {
        let invoice = StripeClient::extract_invoice(event)
            .ok_or_else(|| anyhow!("missing invoice object"))?;

        let record = self
            .find_stripe_user(&invoice.subscription, &invoice.customer)
            .await?;

        self.patch_and_announce(
            record.user_id,
            SubscriptionPatch {
                status: Some(status),
                ..Default::default()
            },
        )
        .await?;

        Ok(EventDisposition::Processed)
    }

    /// Resolves the local subscription a Stripe object belongs to, by
    /// provider subscription id first, then by customer id. Unknown
    /// references are retryable errors: the checkout event that creates
    /// the linkage may simply not have been applied yet.
    async fn find_stripe_user(
        &self,
        subscription_id: &Option<String>,
        customer_id: &Option<String>,
    ) -> AnyResult<Subscription> {
        if let Some(id) = subscription_id
            && let Some(record) = self.store.find_subscription_by_provider_id(id).await?
        {
            return Ok(record);
        }

        if let Some(id) = customer_id
            && let Some(record) = self.store.find_subscription_by_customer(id).await?
        {
            return Ok(record);
        }

        Err(anyhow!(
            "no local subscription for stripe reference (sub={subscription_id:?}, customer={customer_id:?})"
        ))
    }

    // ----- Mercado Pago event application -----

    async fn apply_mp_payload(&self, payload: &str) -> AnyResult<EventDisposition> {
        let notification: MpNotification =
            serde_json::from_str(payload).context("stored mercadopago payload unparsable")?;

        let topic = notification.type_.as_deref().unwrap_or_default();
        if topic != "payment" {
            debug!("unhandled mercadopago topic: {topic}");
            return Ok(EventDisposition::Skipped);
        }

        let data_id = notification
            .data_id()
            .ok_or_else(|| anyhow!("notification missing data.id"))?;

        let gateway = self
            .mercadopago
            .as_ref()
            .ok_or_else(|| anyhow!("mercadopago gateway unavailable"))?;

        let payment = gateway.get_payment(&data_id).await?;

        let user_id: i32 = payment
            .external_reference
            .as_deref()
            .ok_or_else(|| anyhow!("payment {data_id} has no external_reference"))?
            .parse()
            .context("external_reference is not a user id")?;

        let (tier, status) = match payment.status.as_deref().unwrap_or_default() {
            "approved" => (Some(SubscriptionTier::Premium), SubscriptionStatus::Active),
            "pending" | "in_process" | "authorized" => (None, SubscriptionStatus::Incomplete),
            "rejected" => (None, SubscriptionStatus::Incomplete),
            "cancelled" | "refunded" | "charged_back" => {
                (Some(SubscriptionTier::Free), SubscriptionStatus::Canceled)
            }
            other => {
                debug!("unhandled mercadopago payment status: {other}");
                return Ok(EventDisposition::Skipped);
            }
        };

        self.patch_and_announce(
            user_id,
            SubscriptionPatch {
                provider: Some(PaymentProvider::MercadoPago),
                customer_id: None,
                subscription_id: Some(payment.id.to_string()),
                tier,
                status: Some(status),
                current_period_end: None,
            },
        )
        .await?;

        Ok(EventDisposition::Processed)
    }

    /// Last-write-wins patch of the user's subscription row plus a bus
    /// notification.
    async fn patch_and_announce(
        &self,
        user_id: i32,
        patch: SubscriptionPatch,
    ) -> AnyResult<Subscription> {
        let updated = self.store.patch_subscription(user_id, &patch).await?;

        info!(
            user_id,
            tier = %updated.tier,
            status = %updated.status,
            "subscription state updated"
        );

        let _ = self.event_bus.send(NotificationEvent::SubscriptionChanged {
            user_id,
            provider: updated
                .provider
                .map_or_else(|| "none".to_string(), |p| p.to_string()),
            tier: updated.tier.to_string(),
            status: updated.status.to_string(),
        });

        Ok(updated)
    }
}
