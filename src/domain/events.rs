//! Domain events for the application.
//!
//! Events are sent via the event bus; the log service persists the
//! interesting ones to `system_logs`.

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum NotificationEvent {
    MediaAdded {
        user_id: i32,
        title: String,
        kind: String,
    },
    MediaRemoved {
        user_id: i32,
        title: String,
    },

    SubscriptionChanged {
        user_id: i32,
        provider: String,
        tier: String,
        status: String,
    },

    WebhookStored {
        provider: String,
        event_type: String,
    },
    WebhookProcessed {
        provider: String,
        event_type: String,
    },
    WebhookFailed {
        provider: String,
        event_type: String,
        error: String,
    },
    WebhookSweepFinished {
        processed: u32,
        failed: u32,
    },

    TokenRefreshed,

    Error {
        message: String,
    },
    Info {
        message: String,
    },
}
