use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    /// NULL when unplaced or after the location was deleted.
    pub location_id: Option<i32>,
    #[sea_orm(belongs_to, from = "location_id", to = "id", on_delete = "SetNull")]
    pub location: Option<super::location::Entity>,

    pub group_id: Option<i32>,
    #[sea_orm(belongs_to, from = "group_id", to = "id", on_delete = "SetNull")]
    pub group: Option<super::item_group::Entity>,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id", on_delete = "Cascade")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(has_many, via = "item_tag")]
    pub tags: HasMany<super::tag::Entity>,

    #[sea_orm(has_many)]
    pub images: HasMany<super::item_image::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
