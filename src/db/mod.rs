use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::SecurityConfig;
use crate::entities::{payment_preferences, webhook_events};
use crate::models::media::{MediaDraft, MediaEntry};
use crate::models::subscription::Subscription;

pub mod migrator;
pub mod repositories;

pub use crate::entities::system_logs::Model as SystemLog;
pub use repositories::media::{LibraryStats, MediaFilter};
pub use repositories::subscription::SubscriptionPatch;
pub use repositories::user::User;
pub use repositories::webhook::WebhookBacklog;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.starts_with(":memory:") && !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn media_repo(&self) -> repositories::media::MediaRepository {
        repositories::media::MediaRepository::new(self.conn.clone())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn subscription_repo(&self) -> repositories::subscription::SubscriptionRepository {
        repositories::subscription::SubscriptionRepository::new(self.conn.clone())
    }

    fn payment_repo(&self) -> repositories::payment::PaymentPreferenceRepository {
        repositories::payment::PaymentPreferenceRepository::new(self.conn.clone())
    }

    fn webhook_repo(&self) -> repositories::webhook::WebhookEventRepository {
        repositories::webhook::WebhookEventRepository::new(self.conn.clone())
    }

    fn logs_repo(&self) -> repositories::logs::LogRepository {
        repositories::logs::LogRepository::new(self.conn.clone())
    }

    // ----- media library -----

    pub async fn add_media(&self, user_id: i32, draft: &MediaDraft) -> Result<MediaEntry> {
        self.media_repo().insert(user_id, draft).await
    }

    pub async fn get_media(&self, user_id: i32, id: i64) -> Result<Option<MediaEntry>> {
        self.media_repo().get(user_id, id).await
    }

    pub async fn list_media(&self, user_id: i32, filter: &MediaFilter) -> Result<Vec<MediaEntry>> {
        self.media_repo().list(user_id, filter).await
    }

    pub async fn update_media(
        &self,
        user_id: i32,
        id: i64,
        draft: &MediaDraft,
    ) -> Result<Option<MediaEntry>> {
        self.media_repo().update(user_id, id, draft).await
    }

    pub async fn remove_media(&self, user_id: i32, id: i64) -> Result<bool> {
        self.media_repo().delete(user_id, id).await
    }

    pub async fn media_stats(&self, user_id: i32) -> Result<LibraryStats> {
        self.media_repo().stats(user_id).await
    }

    pub async fn count_media(&self) -> Result<u64> {
        self.media_repo().count_all().await
    }

    pub async fn count_media_for_user(&self, user_id: i32) -> Result<u64> {
        self.media_repo().count_for_user(user_id).await
    }

    // ----- users -----

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        security: Option<&SecurityConfig>,
    ) -> Result<User> {
        self.user_repo()
            .create(username, email, password, security)
            .await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list().await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_password(&self, username: &str, new_password: &str) -> Result<()> {
        self.user_repo()
            .update_password(username, new_password)
            .await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn regenerate_user_api_key(&self, username: &str) -> Result<String> {
        self.user_repo().regenerate_api_key(username).await
    }

    // ----- subscriptions -----

    pub async fn get_subscription(&self, user_id: i32) -> Result<Subscription> {
        self.subscription_repo().get_or_create(user_id).await
    }

    pub async fn patch_subscription(
        &self,
        user_id: i32,
        patch: &SubscriptionPatch,
    ) -> Result<Subscription> {
        self.subscription_repo().apply_patch(user_id, patch).await
    }

    pub async fn find_subscription_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Option<Subscription>> {
        self.subscription_repo()
            .find_by_customer_id(customer_id)
            .await
    }

    pub async fn find_subscription_by_provider_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>> {
        self.subscription_repo()
            .find_by_subscription_id(subscription_id)
            .await
    }

    // ----- payment preferences -----

    pub async fn record_payment_preference(&self, user_id: i32, preference_id: &str) -> Result<()> {
        self.payment_repo().record(user_id, preference_id).await
    }

    pub async fn find_payment_preference(
        &self,
        preference_id: &str,
    ) -> Result<Option<payment_preferences::Model>> {
        self.payment_repo()
            .find_by_preference_id(preference_id)
            .await
    }

    pub async fn set_payment_preference_status(
        &self,
        preference_id: &str,
        status: &str,
    ) -> Result<()> {
        self.payment_repo().set_status(preference_id, status).await
    }

    // ----- webhook events -----

    pub async fn store_webhook_event(
        &self,
        provider: &str,
        event_id: &str,
        event_type: &str,
        payload: &str,
    ) -> Result<Option<i64>> {
        self.webhook_repo()
            .insert_if_new(provider, event_id, event_type, payload)
            .await
    }

    pub async fn get_webhook_event(&self, id: i64) -> Result<Option<webhook_events::Model>> {
        self.webhook_repo().get(id).await
    }

    pub async fn pending_webhook_events(
        &self,
        max_attempts: i32,
        limit: u64,
    ) -> Result<Vec<webhook_events::Model>> {
        self.webhook_repo().list_pending(max_attempts, limit).await
    }

    pub async fn recent_webhook_events(&self, limit: u64) -> Result<Vec<webhook_events::Model>> {
        self.webhook_repo().list_recent(limit).await
    }

    pub async fn mark_webhook_processed(&self, id: i64) -> Result<()> {
        self.webhook_repo().mark_processed(id).await
    }

    pub async fn mark_webhook_skipped(&self, id: i64) -> Result<()> {
        self.webhook_repo().mark_skipped(id).await
    }

    pub async fn record_webhook_failure(
        &self,
        id: i64,
        error: &str,
        max_attempts: i32,
    ) -> Result<()> {
        self.webhook_repo()
            .record_failure(id, error, max_attempts)
            .await
    }

    pub async fn requeue_webhook_event(&self, id: i64) -> Result<()> {
        self.webhook_repo().requeue(id).await
    }

    pub async fn webhook_backlog(&self) -> Result<WebhookBacklog> {
        self.webhook_repo().backlog().await
    }

    pub async fn prune_webhook_events(&self, older_than_days: u32) -> Result<u64> {
        self.webhook_repo().prune(older_than_days).await
    }

    // ----- system logs -----

    pub async fn add_log(
        &self,
        event_type: &str,
        level: &str,
        message: &str,
        details: Option<String>,
    ) -> Result<()> {
        self.logs_repo()
            .add(event_type, level, message, details)
            .await
    }

    pub async fn get_logs(
        &self,
        page: u64,
        page_size: u64,
        level_filter: Option<String>,
        event_type_filter: Option<String>,
    ) -> Result<(Vec<SystemLog>, u64)> {
        self.logs_repo()
            .get_logs(page, page_size, level_filter, event_type_filter)
            .await
    }

    pub async fn clear_logs(&self) -> Result<()> {
        self.logs_repo().clear_logs().await
    }

    pub async fn prune_logs(&self, older_than_days: i64) -> Result<u64> {
        self.logs_repo().prune_logs(older_than_days).await
    }
}
