use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    /// Random API key (64-char hex string)
    pub api_key: String,

    pub created_at: String,

    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::media_entries::Entity")]
    MediaEntries,
    #[sea_orm(has_one = "super::subscriptions::Entity")]
    Subscriptions,
    #[sea_orm(has_many = "super::payment_preferences::Entity")]
    PaymentPreferences,
}

impl Related<super::media_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaEntries.def()
    }
}

impl Related<super::subscriptions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl Related<super::payment_preferences::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentPreferences.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
