pub mod prelude;

pub mod media_entries;
pub mod payment_preferences;
pub mod subscriptions;
pub mod system_logs;
pub mod users;
pub mod webhook_events;
