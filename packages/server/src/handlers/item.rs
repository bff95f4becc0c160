use std::collections::{BTreeSet, HashMap};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{item, item_group, item_image, item_tag, location, tag};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::filter::{ItemFilter, ItemListQuery, ItemOrdering};
use crate::handlers::image::release_blobs;
use crate::models::image::ImageResponse;
use crate::models::item::*;
use crate::models::tag::TagResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Items",
    operation_id = "listItems",
    summary = "List items with optional filters",
    description = "All filters combine with AND. `name` and `search` match name or description \
        case-insensitively; `mine=true` restricts to the caller's items. Not paginated.",
    params(ItemListQuery),
    responses(
        (status = 200, description = "Matching items", body = Vec<ItemResponse>),
        (status = 400, description = "Malformed filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_items(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ItemListQuery>,
) -> Result<Json<Vec<ItemResponse>>, AppError> {
    let filter = ItemFilter::from_query(query, auth_user.user_id)?;
    let (column, order) = filter.ordering();

    let mut select = item::Entity::find()
        .filter(filter.condition())
        .order_by(column, order);
    if filter.order_by != ItemOrdering::Id {
        select = select.order_by_asc(item::Column::Id);
    }

    let items = select.all(&state.db).await?;
    let data = load_item_responses(&state.db, items, &state.config.storage.media_url).await?;

    Ok(Json(data))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Items",
    operation_id = "createItem",
    summary = "Create an item owned by the caller",
    description = "Any `owner` in the body is ignored. `location`, `group` and every id in `tags` \
        must reference existing records.",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Validation error or unknown related ID (VALIDATION_ERROR, BAD_REQUEST)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_item(&payload)?;
    let tags = tag_set(&payload.tags);

    let txn = state.db.begin().await?;

    check_location(&txn, payload.location).await?;
    check_group(&txn, payload.group).await?;
    check_tags(&txn, &tags).await?;

    let model = item::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        location_id: Set(payload.location),
        group_id: Set(payload.group),
        owner_id: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    replace_tags(&txn, model.id, &tags).await?;

    txn.commit().await?;

    tracing::info!(item_id = model.id, "Created item");
    let response = load_item_response(&state, model).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Items",
    operation_id = "getItem",
    summary = "Get an item by ID",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item", body = ItemResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user), fields(id))]
pub async fn get_item(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ItemResponse>, AppError> {
    let model = find_item(&state.db, id).await?;
    Ok(Json(load_item_response(&state, model).await?))
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Items",
    operation_id = "replaceItem",
    summary = "Update an item (name required)",
    description = "Owner only. `name` is required; other absent fields are left unchanged. \
        `tags`, when present, replaces the whole tag set.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Validation error or unknown related ID (VALIDATION_ERROR, BAD_REQUEST)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn replace_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    validate_update_item(&payload, true)?;
    let model = apply_update(&state.db, &auth_user, id, payload).await?;
    Ok(Json(load_item_response(&state, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Items",
    operation_id = "updateItem",
    summary = "Partially update an item",
    description = "Owner only. Only provided fields are modified; `location: null` and \
        `group: null` clear the reference, `tags: []` clears all tags.",
    params(("id" = i32, Path, description = "Item ID")),
    request_body = UpdateItemRequest,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Validation error or unknown related ID (VALIDATION_ERROR, BAD_REQUEST)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, AppError> {
    validate_update_item(&payload, false)?;
    let model = apply_update(&state.db, &auth_user, id, payload).await?;
    Ok(Json(load_item_response(&state, model).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Items",
    operation_id = "deleteItem",
    summary = "Delete an item",
    description = "Owner only. Removes the item's tag associations and images; stored files no \
        longer referenced by any image are deleted.",
    params(("id" = i32, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Item not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_item(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;

    let existing = find_item(&txn, id).await?;
    auth_user.require_owner(existing.owner_id)?;

    let hashes: BTreeSet<String> = item_image::Entity::find()
        .filter(item_image::Column::ItemId.eq(id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|img| img.content_hash)
        .collect();

    item_tag::Entity::delete_many()
        .filter(item_tag::Column::ItemId.eq(id))
        .exec(&txn)
        .await?;
    item_image::Entity::delete_many()
        .filter(item_image::Column::ItemId.eq(id))
        .exec(&txn)
        .await?;
    item::Entity::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    release_blobs(&state, hashes).await;

    tracing::info!("Deleted item");
    Ok(StatusCode::NO_CONTENT)
}

/// Shared body of PUT and PATCH: 404, then 403, then reference checks, all in one transaction.
async fn apply_update(
    db: &DatabaseConnection,
    auth_user: &AuthUser,
    id: i32,
    payload: UpdateItemRequest,
) -> Result<item::Model, AppError> {
    let txn = db.begin().await?;

    let existing = find_item(&txn, id).await?;
    auth_user.require_owner(existing.owner_id)?;

    let mut active: item::ActiveModel = existing.clone().into();

    if let Some(ref name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(location_id) = payload.location {
        check_location(&txn, location_id).await?;
        active.location_id = Set(location_id);
    }
    if let Some(group_id) = payload.group {
        check_group(&txn, group_id).await?;
        active.group_id = Set(group_id);
    }
    if let Some(ref tags) = payload.tags {
        let tags = tag_set(tags);
        check_tags(&txn, &tags).await?;
        replace_tags(&txn, id, &tags).await?;
    }

    let model = if active.is_changed() {
        active.update(&txn).await?
    } else {
        existing
    };

    txn.commit().await?;
    Ok(model)
}

pub(crate) async fn find_item<C: ConnectionTrait>(db: &C, id: i32) -> Result<item::Model, AppError> {
    item::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Item not found".into()))
}

fn unknown_pk(id: i32) -> AppError {
    AppError::BadRequest(format!("Invalid pk \"{id}\" - object does not exist."))
}

async fn check_location<C: ConnectionTrait>(db: &C, id: Option<i32>) -> Result<(), AppError> {
    let Some(id) = id else { return Ok(()) };
    match location::Entity::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(unknown_pk(id)),
    }
}

async fn check_group<C: ConnectionTrait>(db: &C, id: Option<i32>) -> Result<(), AppError> {
    let Some(id) = id else { return Ok(()) };
    match item_group::Entity::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(unknown_pk(id)),
    }
}

/// Every id in `tags` must exist. `tags` is already deduplicated.
async fn check_tags<C: ConnectionTrait>(db: &C, tags: &[i32]) -> Result<(), AppError> {
    if tags.is_empty() {
        return Ok(());
    }

    let found: BTreeSet<i32> = tag::Entity::find()
        .filter(tag::Column::Id.is_in(tags.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();

    match tags.iter().find(|id| !found.contains(id)) {
        Some(&missing) => Err(unknown_pk(missing)),
        None => Ok(()),
    }
}

async fn replace_tags<C: ConnectionTrait>(db: &C, item_id: i32, tags: &[i32]) -> Result<(), AppError> {
    item_tag::Entity::delete_many()
        .filter(item_tag::Column::ItemId.eq(item_id))
        .exec(db)
        .await?;

    for &tag_id in tags {
        item_tag::ActiveModel {
            item_id: Set(item_id),
            tag_id: Set(tag_id),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn load_item_response(state: &AppState, model: item::Model) -> Result<ItemResponse, AppError> {
    load_item_responses(&state.db, vec![model], &state.config.storage.media_url)
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("item vanished while building response".into()))
}

/// Build read shapes for `items`, batch-loading related rows with one query
/// per relation. Output order follows input order.
pub(crate) async fn load_item_responses<C: ConnectionTrait>(
    db: &C,
    items: Vec<item::Model>,
    media_url: &str,
) -> Result<Vec<ItemResponse>, AppError> {
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let item_ids: Vec<i32> = items.iter().map(|i| i.id).collect();
    let location_ids: BTreeSet<i32> = items.iter().filter_map(|i| i.location_id).collect();
    let group_ids: BTreeSet<i32> = items.iter().filter_map(|i| i.group_id).collect();

    let locations: HashMap<i32, location::Model> = if location_ids.is_empty() {
        HashMap::new()
    } else {
        location::Entity::find()
            .filter(location::Column::Id.is_in(location_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect()
    };

    let groups: HashMap<i32, item_group::Model> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        item_group::Entity::find()
            .filter(item_group::Column::Id.is_in(group_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect()
    };

    let links = item_tag::Entity::find()
        .filter(item_tag::Column::ItemId.is_in(item_ids.clone()))
        .order_by_asc(item_tag::Column::TagId)
        .all(db)
        .await?;

    let tag_ids: BTreeSet<i32> = links.iter().map(|l| l.tag_id).collect();
    let tags: HashMap<i32, tag::Model> = if tag_ids.is_empty() {
        HashMap::new()
    } else {
        tag::Entity::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect()
    };

    let mut tags_by_item: HashMap<i32, Vec<tag::Model>> = HashMap::new();
    for link in links {
        if let Some(t) = tags.get(&link.tag_id) {
            tags_by_item.entry(link.item_id).or_default().push(t.clone());
        }
    }

    let mut images_by_item: HashMap<i32, Vec<ImageResponse>> = HashMap::new();
    for image in item_image::Entity::find()
        .filter(item_image::Column::ItemId.is_in(item_ids))
        .order_by_asc(item_image::Column::Id)
        .all(db)
        .await?
    {
        images_by_item
            .entry(image.item_id)
            .or_default()
            .push(ImageResponse::from_model(image, media_url));
    }

    let responses = items
        .into_iter()
        .map(|m| {
            let item_tags = tags_by_item.remove(&m.id).unwrap_or_default();
            ItemResponse {
                id: m.id,
                name: m.name,
                description: m.description,
                location: m.location_id,
                location_detail: m
                    .location_id
                    .and_then(|id| locations.get(&id))
                    .cloned()
                    .map(Into::into),
                group: m.group_id,
                group_detail: m
                    .group_id
                    .and_then(|id| groups.get(&id))
                    .cloned()
                    .map(Into::into),
                tags: item_tags.iter().map(|t| t.id).collect(),
                tags_detail: item_tags.into_iter().map(TagResponse::from).collect(),
                owner: m.owner_id,
                images: images_by_item.remove(&m.id).unwrap_or_default(),
                created_at: m.created_at,
            }
        })
        .collect();

    Ok(responses)
}
