use crate::db::Store;
use crate::domain::events::NotificationEvent;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::error;

/// Persists interesting bus events to `system_logs`.
pub struct LogService {
    store: Store,
    event_bus: broadcast::Sender<NotificationEvent>,
}

impl LogService {
    #[must_use]
    pub const fn new(store: Store, event_bus: broadcast::Sender<NotificationEvent>) -> Self {
        Self { store, event_bus }
    }

    pub fn start_listener(self: Arc<Self>) {
        let mut rx = self.event_bus.subscribe();
        let service = self;

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = service.handle_event(event).await {
                            error!(error = %e, "Failed to save log");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        error!(count, "Log listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        error!("Log listener event bus closed");
                        break;
                    }
                }
            }
        });
    }

    async fn handle_event(&self, event: NotificationEvent) -> anyhow::Result<()> {
        let (event_type, level, message, details) = match &event {
            NotificationEvent::MediaAdded { title, kind, .. } => (
                "MediaAdded".to_string(),
                "info",
                format!("Added to library: {title} ({kind})"),
                None,
            ),
            NotificationEvent::MediaRemoved { title, .. } => (
                "MediaRemoved".to_string(),
                "info",
                format!("Removed from library: {title}"),
                None,
            ),
            NotificationEvent::SubscriptionChanged {
                user_id,
                tier,
                status,
                ..
            } => (
                "SubscriptionChanged".to_string(),
                "info",
                format!("Subscription for user {user_id}: {tier}/{status}"),
                Some(serde_json::to_string(&event)?),
            ),
            NotificationEvent::WebhookFailed {
                provider,
                event_type,
                error,
            } => (
                "WebhookFailed".to_string(),
                "error",
                format!("{provider} {event_type} processing failed: {error}"),
                Some(serde_json::to_string(&event)?),
            ),
            NotificationEvent::WebhookSweepFinished { processed, failed } => (
                "WebhookSweepFinished".to_string(),
                if *failed > 0 { "warn" } else { "info" },
                format!("Webhook sweep: {processed} applied, {failed} failed"),
                None,
            ),
            NotificationEvent::Error { message } => {
                ("Error".to_string(), "error", message.clone(), None)
            }
            NotificationEvent::Info { message } => {
                ("Info".to_string(), "info", message.clone(), None)
            }

            // High-frequency or purely transient events stay off the log.
            NotificationEvent::WebhookStored { .. }
            | NotificationEvent::WebhookProcessed { .. }
            | NotificationEvent::TokenRefreshed => return Ok(()),
        };

        self.store
            .add_log(&event_type, level, &message, details)
            .await?;

        Ok(())
    }
}
