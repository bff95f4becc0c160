use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub item_id: i32,
    #[sea_orm(belongs_to, from = "item_id", to = "id", on_delete = "Cascade")]
    pub item: HasOne<super::item::Entity>,

    /// SHA-256 of the stored file; several rows may share one blob.
    pub content_hash: String,
    /// Original upload filename.
    pub filename: String,
    pub content_type: Option<String>,
    pub size: i64,

    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
