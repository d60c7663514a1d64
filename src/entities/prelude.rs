pub use super::media_entries::Entity as MediaEntries;
pub use super::payment_preferences::Entity as PaymentPreferences;
pub use super::subscriptions::Entity as Subscriptions;
pub use super::system_logs::Entity as SystemLogs;
pub use super::users::Entity as Users;
pub use super::webhook_events::Entity as WebhookEvents;
