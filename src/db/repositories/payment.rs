use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::{payment_preferences, prelude::*};

pub struct PaymentPreferenceRepository {
    conn: DatabaseConnection,
}

impl PaymentPreferenceRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(&self, user_id: i32, preference_id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let active = payment_preferences::ActiveModel {
            user_id: Set(user_id),
            preference_id: Set(preference_id.to_string()),
            status: Set("created".to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        PaymentPreferences::insert(active).exec(&self.conn).await?;
        Ok(())
    }

    pub async fn find_by_preference_id(
        &self,
        preference_id: &str,
    ) -> Result<Option<payment_preferences::Model>> {
        let model = PaymentPreferences::find()
            .filter(payment_preferences::Column::PreferenceId.eq(preference_id))
            .one(&self.conn)
            .await?;
        Ok(model)
    }

    pub async fn set_status(&self, preference_id: &str, status: &str) -> Result<()> {
        let model = self.find_by_preference_id(preference_id).await?;
        let Some(model) = model else {
            anyhow::bail!("Unknown payment preference: {preference_id}");
        };

        let mut active: payment_preferences::ActiveModel = model.into();
        active.status = Set(status.to_string());
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&self.conn).await?;
        Ok(())
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<payment_preferences::Model>> {
        let rows = PaymentPreferences::find()
            .filter(payment_preferences::Column::UserId.eq(user_id))
            .order_by_desc(payment_preferences::Column::CreatedAt)
            .all(&self.conn)
            .await?;
        Ok(rows)
    }
}
