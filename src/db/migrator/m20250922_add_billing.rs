use crate::entities::prelude::*;
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        manager
            .create_table(
                schema
                    .create_table_from_entity(Subscriptions)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(PaymentPreferences)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                schema
                    .create_table_from_entity(WebhookEvents)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // Provider redeliveries must collapse onto the stored event.
        manager
            .create_index(
                Index::create()
                    .name("idx_webhook_events_provider_event")
                    .table(WebhookEvents)
                    .col(crate::entities::webhook_events::Column::Provider)
                    .col(crate::entities::webhook_events::Column::EventId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_webhook_events_status")
                    .table(WebhookEvents)
                    .col(crate::entities::webhook_events::Column::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_subscriptions_customer")
                    .table(Subscriptions)
                    .col(crate::entities::subscriptions::Column::CustomerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebhookEvents).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentPreferences).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Subscriptions).to_owned())
            .await?;

        Ok(())
    }
}
