use anyhow::Result;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::entities::{prelude::*, subscriptions};
use crate::models::subscription::{
    PaymentProvider, Subscription, SubscriptionStatus, SubscriptionTier,
};

/// Fields a webhook event applies to a subscription row. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionPatch {
    pub provider: Option<PaymentProvider>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub tier: Option<SubscriptionTier>,
    pub status: Option<SubscriptionStatus>,
    pub current_period_end: Option<DateTime<Utc>>,
}

pub struct SubscriptionRepository {
    conn: DatabaseConnection,
}

impl SubscriptionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(model: subscriptions::Model) -> Subscription {
        Subscription {
            user_id: model.user_id,
            provider: model.provider.as_deref().and_then(PaymentProvider::parse),
            customer_id: model.customer_id,
            subscription_id: model.subscription_id,
            tier: SubscriptionTier::parse(&model.tier).unwrap_or(SubscriptionTier::Free),
            status: SubscriptionStatus::parse(&model.status)
                .unwrap_or(SubscriptionStatus::Incomplete),
            current_period_end: model
                .current_period_end
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
            created_at: parse_timestamp(&model.created_at),
            updated_at: parse_timestamp(&model.updated_at),
        }
    }

    /// Fetch the user's subscription row, creating the free-tier default
    /// on first access.
    pub async fn get_or_create(&self, user_id: i32) -> Result<Subscription> {
        if let Some(model) = Subscriptions::find_by_id(user_id).one(&self.conn).await? {
            return Ok(Self::map_model(model));
        }

        let now = Utc::now();
        let active = subscriptions::ActiveModel {
            user_id: Set(user_id),
            provider: Set(None),
            customer_id: Set(None),
            subscription_id: Set(None),
            tier: Set(SubscriptionTier::Free.as_str().to_string()),
            status: Set(SubscriptionStatus::Active.as_str().to_string()),
            current_period_end: Set(None),
            created_at: Set(now.to_rfc3339()),
            updated_at: Set(now.to_rfc3339()),
        };
        let model = active.insert(&self.conn).await?;
        Ok(Self::map_model(model))
    }

    pub async fn get(&self, user_id: i32) -> Result<Option<Subscription>> {
        let model = Subscriptions::find_by_id(user_id).one(&self.conn).await?;
        Ok(model.map(Self::map_model))
    }

    /// Apply a patch to the user's row. Last write wins across concurrent
    /// webhook deliveries for the same user.
    pub async fn apply_patch(&self, user_id: i32, patch: &SubscriptionPatch) -> Result<Subscription> {
        // Ensure the row exists before patching.
        self.get_or_create(user_id).await?;

        let model = Subscriptions::find_by_id(user_id)
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("subscription row vanished for user {user_id}"))?;

        let mut active: subscriptions::ActiveModel = model.into();

        if let Some(provider) = patch.provider {
            active.provider = Set(Some(provider.as_str().to_string()));
        }
        if let Some(customer_id) = &patch.customer_id {
            active.customer_id = Set(Some(customer_id.clone()));
        }
        if let Some(subscription_id) = &patch.subscription_id {
            active.subscription_id = Set(Some(subscription_id.clone()));
        }
        if let Some(tier) = patch.tier {
            active.tier = Set(tier.as_str().to_string());
        }
        if let Some(status) = patch.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(period_end) = patch.current_period_end {
            active.current_period_end = Set(Some(period_end.to_rfc3339()));
        }
        active.updated_at = Set(Utc::now().to_rfc3339());

        let model = active.update(&self.conn).await?;
        Ok(Self::map_model(model))
    }

    pub async fn find_by_customer_id(&self, customer_id: &str) -> Result<Option<Subscription>> {
        let model = Subscriptions::find()
            .filter(subscriptions::Column::CustomerId.eq(customer_id))
            .one(&self.conn)
            .await?;
        Ok(model.map(Self::map_model))
    }

    pub async fn find_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> Result<Option<Subscription>> {
        let model = Subscriptions::find()
            .filter(subscriptions::Column::SubscriptionId.eq(subscription_id))
            .one(&self.conn)
            .await?;
        Ok(model.map(Self::map_model))
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}
