use serde::{Deserialize, Serialize};

use super::shared::validate_name;
use crate::entity::item_group;
use crate::error::AppError;

pub const GROUP_NAME_MAX: usize = 100;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateGroupRequest {
    #[schema(example = "Camping gear")]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Body of PUT and PATCH. PUT additionally requires `name`.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateGroupRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, utoipa::ToSchema)]
pub struct GroupResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Camping gear")]
    pub name: String,
    pub description: String,
}

pub fn validate_create_group(payload: &CreateGroupRequest) -> Result<(), AppError> {
    validate_name(&payload.name, GROUP_NAME_MAX)
}

pub fn validate_update_group(payload: &UpdateGroupRequest, full: bool) -> Result<(), AppError> {
    match payload.name {
        Some(ref name) => validate_name(name, GROUP_NAME_MAX),
        None if full => Err(AppError::Validation("name is required".into())),
        None => Ok(()),
    }
}

impl From<item_group::Model> for GroupResponse {
    fn from(m: item_group::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
        }
    }
}
