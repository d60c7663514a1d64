use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::{prelude::*, webhook_events};

/// Lifecycle of a stored webhook event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Pending,
    Processed,
    Skipped,
    Failed,
}

impl EventStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Counts surfaced by /api/system/status.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WebhookBacklog {
    pub pending: u64,
    pub failed: u64,
}

pub struct WebhookEventRepository {
    conn: DatabaseConnection,
}

impl WebhookEventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Persist a verified event before it is acknowledged to the provider.
    /// Returns the row id, or None when (provider, event_id) was already
    /// stored — provider redeliveries are deduplicated here.
    pub async fn insert_if_new(
        &self,
        provider: &str,
        event_id: &str,
        event_type: &str,
        payload: &str,
    ) -> Result<Option<i64>> {
        let existing = WebhookEvents::find()
            .filter(webhook_events::Column::Provider.eq(provider))
            .filter(webhook_events::Column::EventId.eq(event_id))
            .one(&self.conn)
            .await?;

        if existing.is_some() {
            return Ok(None);
        }

        let active = webhook_events::ActiveModel {
            provider: Set(provider.to_string()),
            event_id: Set(event_id.to_string()),
            event_type: Set(event_type.to_string()),
            payload: Set(payload.to_string()),
            status: Set(EventStatus::Pending.as_str().to_string()),
            attempts: Set(0),
            last_error: Set(None),
            received_at: Set(Utc::now().to_rfc3339()),
            processed_at: Set(None),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(Some(model.id))
    }

    pub async fn get(&self, id: i64) -> Result<Option<webhook_events::Model>> {
        Ok(WebhookEvents::find_by_id(id).one(&self.conn).await?)
    }

    /// Events awaiting (re)processing, oldest first.
    pub async fn list_pending(
        &self,
        max_attempts: i32,
        limit: u64,
    ) -> Result<Vec<webhook_events::Model>> {
        let rows = WebhookEvents::find()
            .filter(webhook_events::Column::Status.eq(EventStatus::Pending.as_str()))
            .filter(webhook_events::Column::Attempts.lt(max_attempts))
            .order_by_asc(webhook_events::Column::ReceivedAt)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }

    pub async fn list_recent(&self, limit: u64) -> Result<Vec<webhook_events::Model>> {
        let rows = WebhookEvents::find()
            .order_by_desc(webhook_events::Column::ReceivedAt)
            .limit(limit)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }

    pub async fn mark_processed(&self, id: i64) -> Result<()> {
        self.finish(id, EventStatus::Processed, None).await
    }

    /// Event types the service does not act on are acknowledged and kept
    /// for the audit trail.
    pub async fn mark_skipped(&self, id: i64) -> Result<()> {
        self.finish(id, EventStatus::Skipped, None).await
    }

    /// Record a failed processing attempt. The event stays pending until
    /// `max_attempts` is exhausted, after which it is parked as failed.
    pub async fn record_failure(&self, id: i64, error: &str, max_attempts: i32) -> Result<()> {
        let model = WebhookEvents::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Webhook event {id} not found"))?;

        let attempts = model.attempts + 1;
        let status = if attempts >= max_attempts {
            EventStatus::Failed
        } else {
            EventStatus::Pending
        };

        let mut active: webhook_events::ActiveModel = model.into();
        active.attempts = Set(attempts);
        active.status = Set(status.as_str().to_string());
        active.last_error = Set(Some(error.to_string()));
        active.update(&self.conn).await?;
        Ok(())
    }

    /// Re-queue a parked event (manual retry from the CLI).
    pub async fn requeue(&self, id: i64) -> Result<()> {
        let model = WebhookEvents::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Webhook event {id} not found"))?;

        let mut active: webhook_events::ActiveModel = model.into();
        active.status = Set(EventStatus::Pending.as_str().to_string());
        active.attempts = Set(0);
        active.last_error = Set(None);
        active.update(&self.conn).await?;
        Ok(())
    }

    pub async fn backlog(&self) -> Result<WebhookBacklog> {
        let pending = WebhookEvents::find()
            .filter(webhook_events::Column::Status.eq(EventStatus::Pending.as_str()))
            .count(&self.conn)
            .await?;
        let failed = WebhookEvents::find()
            .filter(webhook_events::Column::Status.eq(EventStatus::Failed.as_str()))
            .count(&self.conn)
            .await?;

        Ok(WebhookBacklog { pending, failed })
    }

    /// Delete terminal events older than the retention window.
    pub async fn prune(&self, older_than_days: u32) -> Result<u64> {
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(older_than_days));

        let result = WebhookEvents::delete_many()
            .filter(
                webhook_events::Column::Status
                    .eq(EventStatus::Processed.as_str())
                    .or(webhook_events::Column::Status.eq(EventStatus::Skipped.as_str())),
            )
            .filter(webhook_events::Column::ReceivedAt.lt(cutoff.to_rfc3339()))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    async fn finish(&self, id: i64, status: EventStatus, error: Option<String>) -> Result<()> {
        let model = WebhookEvents::find_by_id(id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Webhook event {id} not found"))?;

        let attempts = model.attempts + 1;
        let mut active: webhook_events::ActiveModel = model.into();
        active.status = Set(status.as_str().to_string());
        active.attempts = Set(attempts);
        active.last_error = Set(error);
        active.processed_at = Set(Some(Utc::now().to_rfc3339()));
        active.update(&self.conn).await?;
        Ok(())
    }
}
