use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{item, item_group};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::item_group::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Groups",
    operation_id = "listGroups",
    summary = "List all item groups",
    responses(
        (status = 200, description = "Groups ordered by ID", body = Vec<GroupResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_groups(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<GroupResponse>>, AppError> {
    let rows = item_group::Entity::find()
        .order_by_asc(item_group::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Groups",
    operation_id = "createGroup",
    summary = "Create an item group",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Group created", body = GroupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(name = %payload.name))]
pub async fn create_group(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateGroupRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_group(&payload)?;

    let model = item_group::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Groups",
    operation_id = "getGroup",
    summary = "Get an item group by ID",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Group", body = GroupResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Group not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_group(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<GroupResponse>, AppError> {
    Ok(Json(find_group(&state.db, id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Groups",
    operation_id = "replaceGroup",
    summary = "Update an item group (name required)",
    params(("id" = i32, Path, description = "Group ID")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = GroupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Group not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(id))]
pub async fn replace_group(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    validate_update_group(&payload, true)?;
    apply_update(&state.db, id, payload).await.map(Json)
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Groups",
    operation_id = "updateGroup",
    summary = "Partially update an item group",
    params(("id" = i32, Path, description = "Group ID")),
    request_body = UpdateGroupRequest,
    responses(
        (status = 200, description = "Group updated", body = GroupResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Group not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(id))]
pub async fn update_group(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateGroupRequest>,
) -> Result<Json<GroupResponse>, AppError> {
    validate_update_group(&payload, false)?;
    apply_update(&state.db, id, payload).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Groups",
    operation_id = "deleteGroup",
    summary = "Delete an item group",
    description = "Member items are kept; their `group` becomes null.",
    params(("id" = i32, Path, description = "Group ID")),
    responses(
        (status = 204, description = "Group deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Group not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn delete_group(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    find_group(&txn, id).await?;

    item::Entity::update_many()
        .col_expr(item::Column::GroupId, Expr::value(Option::<i32>::None))
        .filter(item::Column::GroupId.eq(id))
        .exec(&txn)
        .await?;
    item_group::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update(
    db: &DatabaseConnection,
    id: i32,
    payload: UpdateGroupRequest,
) -> Result<GroupResponse, AppError> {
    let existing = find_group(db, id).await?;
    if payload == UpdateGroupRequest::default() {
        return Ok(existing.into());
    }

    let mut active: item_group::ActiveModel = existing.into();
    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }

    Ok(active.update(db).await?.into())
}

async fn find_group<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<item_group::Model, AppError> {
    item_group::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".into()))
}
