use serde::{Deserialize, Serialize};

use super::shared::validate_name;
use crate::entity::location;
use crate::error::AppError;

pub const LOCATION_NAME_MAX: usize = 100;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateLocationRequest {
    #[schema(example = "Garage shelf B")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Left of the door")]
    pub description: String,
}

/// Body of PUT and PATCH. PUT additionally requires `name`.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, utoipa::ToSchema)]
pub struct LocationResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Garage shelf B")]
    pub name: String,
    pub description: String,
}

pub fn validate_create_location(payload: &CreateLocationRequest) -> Result<(), AppError> {
    validate_name(&payload.name, LOCATION_NAME_MAX)
}

pub fn validate_update_location(
    payload: &UpdateLocationRequest,
    full: bool,
) -> Result<(), AppError> {
    match payload.name {
        Some(ref name) => validate_name(name, LOCATION_NAME_MAX),
        None if full => Err(AppError::Validation("name is required".into())),
        None => Ok(()),
    }
}

impl From<location::Model> for LocationResponse {
    fn from(m: location::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
        }
    }
}
