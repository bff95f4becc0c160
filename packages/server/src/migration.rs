//! Schema creation.
//!
//! Tables are generated from the entity definitions and created in dependency
//! order, so parents exist before the foreign keys that point at them. Every
//! statement is `IF NOT EXISTS`, which makes [`run`] safe to call on each
//! startup.

use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::{info, warn};

use crate::entity::{item, item_group, item_image, item_tag, location, tag, user};

pub async fn run<C: ConnectionTrait>(db: &C) -> Result<(), DbErr> {
    create_table(db, user::Entity).await?;
    create_table(db, location::Entity).await?;
    create_table(db, tag::Entity).await?;
    create_table(db, item_group::Entity).await?;
    create_table(db, item::Entity).await?;
    create_table(db, item_tag::Entity).await?;
    create_table(db, item_image::Entity).await?;

    for (name, index) in indexes() {
        ensure_index(db, name, index).await;
    }

    info!("Database schema is up to date");
    Ok(())
}

async fn create_table<C, E>(db: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut stmt = Schema::new(backend).create_table_from_entity(entity);
    stmt.if_not_exists();
    db.execute_raw(backend.build(&stmt)).await?;
    Ok(())
}

/// Secondary indexes for the list filters and cascade lookups.
fn indexes() -> Vec<(&'static str, IndexCreateStatement)> {
    vec![
        (
            "idx_item_owner",
            Index::create()
                .if_not_exists()
                .name("idx_item_owner")
                .table(item::Entity)
                .col(item::Column::OwnerId)
                .to_owned(),
        ),
        (
            "idx_item_location",
            Index::create()
                .if_not_exists()
                .name("idx_item_location")
                .table(item::Entity)
                .col(item::Column::LocationId)
                .to_owned(),
        ),
        (
            "idx_item_group",
            Index::create()
                .if_not_exists()
                .name("idx_item_group")
                .table(item::Entity)
                .col(item::Column::GroupId)
                .to_owned(),
        ),
        (
            "idx_item_tag_tag",
            Index::create()
                .if_not_exists()
                .name("idx_item_tag_tag")
                .table(item_tag::Entity)
                .col(item_tag::Column::TagId)
                .to_owned(),
        ),
        (
            "idx_item_image_item",
            Index::create()
                .if_not_exists()
                .name("idx_item_image_item")
                .table(item_image::Entity)
                .col(item_image::Column::ItemId)
                .to_owned(),
        ),
    ]
}

async fn ensure_index<C: ConnectionTrait>(db: &C, name: &str, index: IndexCreateStatement) {
    let backend = db.get_database_backend();

    match db.execute_raw(backend.build(&index)).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => warn!("Failed to create index {}: {}", name, e),
    }
}
