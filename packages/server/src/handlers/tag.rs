use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{item_tag, tag};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::tag::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Tags",
    operation_id = "listTags",
    summary = "List all tags",
    responses(
        (status = 200, description = "Tags ordered by ID", body = Vec<TagResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_tags(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TagResponse>>, AppError> {
    let rows = tag::Entity::find()
        .order_by_asc(tag::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Tags",
    operation_id = "createTag",
    summary = "Create a tag",
    description = "Tag names are unique; a duplicate name is a validation error.",
    request_body = CreateTagRequest,
    responses(
        (status = 201, description = "Tag created", body = TagResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(name = %payload.name))]
pub async fn create_tag(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_tag(&payload)?;

    let name = payload.name.trim().to_string();
    ensure_name_free(&state.db, &name, None).await?;

    let model = tag::ActiveModel {
        name: Set(name),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(duplicate_name)?;

    Ok((StatusCode::CREATED, Json(TagResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Tags",
    operation_id = "getTag",
    summary = "Get a tag by ID",
    params(("id" = i32, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag", body = TagResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_tag(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TagResponse>, AppError> {
    Ok(Json(find_tag(&state.db, id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Tags",
    operation_id = "replaceTag",
    summary = "Rename a tag (name required)",
    params(("id" = i32, Path, description = "Tag ID")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(id))]
pub async fn replace_tag(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    validate_update_tag(&payload, true)?;
    apply_update(&state.db, id, payload).await.map(Json)
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Tags",
    operation_id = "updateTag",
    summary = "Partially update a tag",
    params(("id" = i32, Path, description = "Tag ID")),
    request_body = UpdateTagRequest,
    responses(
        (status = 200, description = "Tag updated", body = TagResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(id))]
pub async fn update_tag(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateTagRequest>,
) -> Result<Json<TagResponse>, AppError> {
    validate_update_tag(&payload, false)?;
    apply_update(&state.db, id, payload).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Tags",
    operation_id = "deleteTag",
    summary = "Delete a tag",
    description = "The tag is removed from every item that carried it.",
    params(("id" = i32, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Tag deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Tag not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn delete_tag(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    find_tag(&txn, id).await?;

    item_tag::Entity::delete_many()
        .filter(item_tag::Column::TagId.eq(id))
        .exec(&txn)
        .await?;
    tag::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update(
    db: &DatabaseConnection,
    id: i32,
    payload: UpdateTagRequest,
) -> Result<TagResponse, AppError> {
    let existing = find_tag(db, id).await?;
    let Some(name) = payload.name else {
        return Ok(existing.into());
    };

    let name = name.trim().to_string();
    if name == existing.name {
        return Ok(existing.into());
    }
    ensure_name_free(db, &name, Some(id)).await?;

    let mut active: tag::ActiveModel = existing.into();
    active.name = Set(name);

    let model = active.update(db).await.map_err(duplicate_name)?;
    Ok(model.into())
}

/// Reject `name` if another tag (other than `except`) already uses it.
async fn ensure_name_free<C: ConnectionTrait>(
    db: &C,
    name: &str,
    except: Option<i32>,
) -> Result<(), AppError> {
    let taken = tag::Entity::find()
        .filter(tag::Column::Name.eq(name))
        .apply_if(except, |q, id| q.filter(tag::Column::Id.ne(id)))
        .count(db)
        .await?;
    if taken > 0 {
        return Err(AppError::Validation(DUPLICATE_TAG_MESSAGE.into()));
    }
    Ok(())
}

// Two concurrent creates can both pass `ensure_name_free`.
fn duplicate_name(e: DbErr) -> AppError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Validation(DUPLICATE_TAG_MESSAGE.into())
        }
        _ => AppError::from(e),
    }
}

async fn find_tag<C: ConnectionTrait>(db: &C, id: i32) -> Result<tag::Model, AppError> {
    tag::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".into()))
}
