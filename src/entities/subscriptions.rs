use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// One subscription row per user.
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i32,
    /// stripe | mercadopago
    pub provider: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// free | premium
    pub tier: String,
    /// active | past_due | canceled | incomplete
    pub status: String,
    pub current_period_end: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
