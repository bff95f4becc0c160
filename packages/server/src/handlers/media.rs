use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::ContentHash;
use sea_orm::EntityTrait;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::entity::item_image;
use crate::error::{AppError, ErrorBody};
use crate::state::AppState;
use crate::utils::upload::content_disposition;

#[utoipa::path(
    get,
    path = "/images/{id}",
    tag = "Media",
    operation_id = "downloadImage",
    summary = "Download a stored item image",
    description = "Public, like a static media mount. Supports ETag-based caching via If-None-Match.",
    params(("id" = i32, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers), fields(id))]
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let image = item_image::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Image not found".into()))?;

    let etag_value = format!("\"{}\"", image.content_hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let hash = ContentHash::from_hex(&image.content_hash)?;
    let reader = state.blob_store.get_stream(&hash).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = image
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, image.size.to_string())
        .header(header::CONTENT_DISPOSITION, content_disposition(&image.filename))
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}
