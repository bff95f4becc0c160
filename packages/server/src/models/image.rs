use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::item_image;

/// An uploaded image as embedded in item responses and returned by upload.
#[derive(Serialize, Clone, Debug, utoipa::ToSchema)]
pub struct ImageResponse {
    #[schema(example = 12)]
    pub id: i32,
    /// URL the image can be downloaded from.
    #[schema(example = "/media/images/12")]
    pub image: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Public URL of a stored image under the configured media prefix.
pub fn image_url(media_url: &str, image_id: i32) -> String {
    format!("{}/images/{}", media_url.trim_end_matches('/'), image_id)
}

impl ImageResponse {
    pub fn from_model(model: item_image::Model, media_url: &str) -> Self {
        Self {
            image: image_url(media_url, model.id),
            id: model.id,
            uploaded_at: model.uploaded_at,
        }
    }
}
