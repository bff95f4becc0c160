use serde::{Deserialize, Serialize};

use super::shared::validate_name;
use crate::entity::tag;
use crate::error::AppError;

pub const TAG_NAME_MAX: usize = 50;

pub const DUPLICATE_TAG_MESSAGE: &str = "tag with this name already exists.";

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateTagRequest {
    #[schema(example = "fragile")]
    pub name: String,
}

/// Body of PUT and PATCH. PUT requires `name`; an empty PATCH is a no-op.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateTagRequest {
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, utoipa::ToSchema)]
pub struct TagResponse {
    #[schema(example = 5)]
    pub id: i32,
    #[schema(example = "fragile")]
    pub name: String,
}

pub fn validate_create_tag(payload: &CreateTagRequest) -> Result<(), AppError> {
    validate_name(&payload.name, TAG_NAME_MAX)
}

pub fn validate_update_tag(payload: &UpdateTagRequest, full: bool) -> Result<(), AppError> {
    match payload.name {
        Some(ref name) => validate_name(name, TAG_NAME_MAX),
        None if full => Err(AppError::Validation("name is required".into())),
        None => Ok(()),
    }
}

impl From<tag::Model> for TagResponse {
    fn from(m: tag::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
        }
    }
}
