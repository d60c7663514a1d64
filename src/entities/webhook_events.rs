use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Durable log of verified provider events. Rows are inserted before the
/// webhook is acknowledged; (provider, event_id) is unique so provider
/// redeliveries collapse onto the original row.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// stripe | mercadopago
    pub provider: String,
    pub event_id: String,
    pub event_type: String,
    /// Raw event payload as received, JSON.
    pub payload: String,
    /// pending | processed | skipped | failed
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub received_at: String,
    pub processed_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
