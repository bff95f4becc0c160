use std::collections::BTreeSet;

use axum::Json;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::storage::{BlobStore, BoxReader, ContentHash};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::item_image;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::handlers::item::find_item;
use crate::models::image::ImageResponse;
use crate::state::AppState;
use crate::utils::upload::{clean_filename, image_content_type};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

pub fn image_upload_body_limit(max_blob_size: u64) -> DefaultBodyLimit {
    let limit = max_blob_size.saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
}

#[utoipa::path(
    post,
    path = "/{id}/upload_image",
    tag = "Items",
    operation_id = "uploadItemImage",
    summary = "Attach an image to an item",
    description = "Owner only. The `image` multipart field is required and must carry a filename \
        with an image extension. Other fields are ignored.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body(content_type = "multipart/form-data", description = "Image file in the `image` field"),
    responses(
        (status = 201, description = "Image stored", body = ImageResponse),
        (status = 400, description = "No `image` field (BAD_REQUEST) or not an image / too large (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(item_id, user_id = auth_user.user_id))]
pub async fn upload_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<i32>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let item = find_item(&state.db, item_id).await?;
    auth_user.require_owner(item.owner_id)?;

    // Body problems are reported only after the item and owner checks.
    let mut multipart =
        multipart.map_err(|e| AppError::BadRequest(format!("Expected a multipart body: {e}")))?;

    let mut stored: Option<(String, String, ContentHash, i64)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let raw_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("The submitted data was not a file.".into()))?;
        let filename = clean_filename(&raw_name)?.to_string();
        let content_type = image_content_type(&filename)?;

        let (hash, size) = stream_field_to_store(
            field,
            &*state.blob_store,
            state.config.storage.max_blob_size,
        )
        .await?;
        if size == 0 {
            return Err(AppError::Validation("The submitted file is empty.".into()));
        }

        stored = Some((filename, content_type, hash, size));
        break;
    }

    let (filename, content_type, hash, size) =
        stored.ok_or_else(|| AppError::BadRequest("No file was submitted.".into()))?;

    let model = item_image::ActiveModel {
        item_id: Set(item_id),
        content_hash: Set(hash.to_hex()),
        filename: Set(filename),
        content_type: Set(Some(content_type)),
        size: Set(size),
        uploaded_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    tracing::info!(image_id = model.id, size, "Stored item image");

    Ok((
        StatusCode::CREATED,
        Json(ImageResponse::from_model(
            model,
            &state.config.storage.media_url,
        )),
    ))
}

/// Delete blobs in `hashes` that no image row references any more.
///
/// Runs after the owning transaction has committed; failures are logged and
/// leave an orphaned file behind rather than failing the request.
pub(crate) async fn release_blobs(state: &AppState, hashes: impl IntoIterator<Item = String>) {
    let hashes: BTreeSet<String> = hashes.into_iter().collect();

    for hex in hashes {
        let still_used = match item_image::Entity::find()
            .filter(item_image::Column::ContentHash.eq(&hex))
            .count(&state.db)
            .await
        {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::warn!(hash = %hex, error = %e, "Could not check blob references");
                continue;
            }
        };
        if still_used {
            continue;
        }

        let removed = match ContentHash::from_hex(&hex) {
            Ok(hash) => state.blob_store.delete(&hash).await,
            Err(e) => Err(e),
        };
        match removed {
            Ok(true) => tracing::debug!(hash = %hex, "Removed unreferenced blob"),
            Ok(false) => {}
            Err(e) => tracing::warn!(hash = %hex, error = %e, "Failed to remove blob"),
        }
    }
}

/// Stream a multipart field to blob storage via a temp file.
async fn stream_field_to_store(
    mut field: Field<'_>,
    blob_store: &dyn BlobStore,
    max_size: u64,
) -> Result<(ContentHash, i64), AppError> {
    let temp_path = std::env::temp_dir().join(format!("inventory-upload-{}", Uuid::new_v4()));

    let result = async {
        let mut temp_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

        let mut total_size: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            total_size += chunk.len() as u64;
            if total_size > max_size {
                return Err(AppError::Validation(format!(
                    "File exceeds maximum size of {max_size} bytes"
                )));
            }
            temp_file
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
        }

        temp_file
            .flush()
            .await
            .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;
        drop(temp_file);

        if total_size == 0 {
            return Ok((ContentHash::compute(b""), 0));
        }

        let file = tokio::fs::File::open(&temp_path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        let reader: BoxReader = Box::new(file);
        let hash = blob_store.put_stream(reader).await?;

        Ok((hash, i64::try_from(total_size).unwrap_or(i64::MAX)))
    }
    .await;

    let _ = tokio::fs::remove_file(&temp_path).await;

    result
}
