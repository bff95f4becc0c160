use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{item, location};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::location::*;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Locations",
    operation_id = "listLocations",
    summary = "List all locations",
    responses(
        (status = 200, description = "Locations ordered by ID", body = Vec<LocationResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_locations(
    _auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<LocationResponse>>, AppError> {
    let rows = location::Entity::find()
        .order_by_asc(location::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Locations",
    operation_id = "createLocation",
    summary = "Create a location",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Location created", body = LocationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(name = %payload.name))]
pub async fn create_location(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateLocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_location(&payload)?;

    let model = location::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(LocationResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Locations",
    operation_id = "getLocation",
    summary = "Get a location by ID",
    params(("id" = i32, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location", body = LocationResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Location not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_location(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<LocationResponse>, AppError> {
    let model = find_location(&state.db, id).await?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Locations",
    operation_id = "replaceLocation",
    summary = "Update a location (name required)",
    params(("id" = i32, Path, description = "Location ID")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated", body = LocationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Location not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(id))]
pub async fn replace_location(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateLocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    validate_update_location(&payload, true)?;
    apply_update(&state.db, id, payload).await.map(Json)
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Locations",
    operation_id = "updateLocation",
    summary = "Partially update a location",
    description = "Only provided fields are modified. An empty payload returns the current resource unchanged.",
    params(("id" = i32, Path, description = "Location ID")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated", body = LocationResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Location not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, payload), fields(id))]
pub async fn update_location(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateLocationRequest>,
) -> Result<Json<LocationResponse>, AppError> {
    validate_update_location(&payload, false)?;
    apply_update(&state.db, id, payload).await.map(Json)
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Locations",
    operation_id = "deleteLocation",
    summary = "Delete a location",
    description = "Items stored at this location are kept; their `location` becomes null.",
    params(("id" = i32, Path, description = "Location ID")),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Location not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn delete_location(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    find_location(&txn, id).await?;

    let detached = item::Entity::update_many()
        .col_expr(item::Column::LocationId, Expr::value(Option::<i32>::None))
        .filter(item::Column::LocationId.eq(id))
        .exec(&txn)
        .await?;
    location::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        items_detached = detached.rows_affected,
        "Deleted location"
    );
    Ok(StatusCode::NO_CONTENT)
}

async fn apply_update(
    db: &DatabaseConnection,
    id: i32,
    payload: UpdateLocationRequest,
) -> Result<LocationResponse, AppError> {
    if payload == UpdateLocationRequest::default() {
        return Ok(find_location(db, id).await?.into());
    }

    let existing = find_location(db, id).await?;
    let mut active: location::ActiveModel = existing.into();

    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }

    let model = active.update(db).await?;
    Ok(model.into())
}

async fn find_location<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<location::Model, AppError> {
    location::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Location not found".into()))
}
