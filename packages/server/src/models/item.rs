use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::image::ImageResponse;
use super::item_group::GroupResponse;
use super::location::LocationResponse;
use super::shared::{double_option, validate_name};
use super::tag::TagResponse;
use crate::error::AppError;

pub const ITEM_NAME_MAX: usize = 255;

/// Write shape for creating an item. Any `owner` sent by the client is ignored.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateItemRequest {
    #[schema(example = "Cordless drill")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "18V, two batteries")]
    pub description: String,
    #[serde(default)]
    #[schema(example = 1)]
    pub location: Option<i32>,
    #[serde(default)]
    pub group: Option<i32>,
    #[serde(default)]
    #[schema(example = json!([2, 5]))]
    pub tags: Vec<i32>,
}

/// Write shape for PUT and PATCH.
///
/// Absent fields are left unchanged. `location`/`group` may be set to `null`
/// to clear them. `tags`, when present, replaces the whole tag set.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub location: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i32>)]
    pub group: Option<Option<i32>>,
    pub tags: Option<Vec<i32>>,
}

/// Read shape of an item with related records embedded.
#[derive(Serialize, Clone, Debug, utoipa::ToSchema)]
pub struct ItemResponse {
    #[schema(example = 10)]
    pub id: i32,
    #[schema(example = "Cordless drill")]
    pub name: String,
    pub description: String,
    pub location: Option<i32>,
    pub location_detail: Option<LocationResponse>,
    pub group: Option<i32>,
    pub group_detail: Option<GroupResponse>,
    pub tags: Vec<i32>,
    pub tags_detail: Vec<TagResponse>,
    /// ID of the user who created the item.
    pub owner: i32,
    pub images: Vec<ImageResponse>,
    pub created_at: DateTime<Utc>,
}

pub fn validate_create_item(payload: &CreateItemRequest) -> Result<(), AppError> {
    validate_name(&payload.name, ITEM_NAME_MAX)
}

pub fn validate_update_item(payload: &UpdateItemRequest, full: bool) -> Result<(), AppError> {
    match payload.name {
        Some(ref name) => validate_name(name, ITEM_NAME_MAX),
        None if full => Err(AppError::Validation("name is required".into())),
        None => Ok(()),
    }
}

/// Collapse a client-supplied tag list into a set.
pub fn tag_set(ids: &[i32]) -> Vec<i32> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}
