use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "media_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i32,
    pub title: String,
    /// games | anime | series | books | movies | dorama
    pub kind: String,
    /// completed | in_progress | dropped | planned
    pub status: String,
    pub rating: Option<f32>,
    pub hours_spent: f32,
    pub current_page: Option<i32>,
    pub total_pages: Option<i32>,
    /// JSON array of tag strings.
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub cover_url: Option<String>,
    /// Identifier in the metadata source the entry was attached from.
    pub external_id: Option<String>,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
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
