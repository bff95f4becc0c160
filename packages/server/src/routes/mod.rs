use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

/// JSON API mounted under `/api`.
pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(auth_routes())
        .nest("/items", item_routes(config))
        .nest("/locations", location_routes())
        .nest("/groups", group_routes())
        .nest("/tags", tag_routes())
}

/// Public file downloads mounted under `/media`.
pub fn media_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::media::download_image))
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::obtain_token))
        .nest(
            "/users",
            OpenApiRouter::new().routes(routes!(handlers::auth::me)),
        )
}

fn item_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::image::upload_image))
        .layer(handlers::image::image_upload_body_limit(
            config.storage.max_blob_size,
        ));

    OpenApiRouter::new()
        .routes(routes!(
            handlers::item::list_items,
            handlers::item::create_item
        ))
        .routes(routes!(
            handlers::item::get_item,
            handlers::item::replace_item,
            handlers::item::update_item,
            handlers::item::delete_item
        ))
        .merge(upload)
}

fn location_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::location::list_locations,
            handlers::location::create_location
        ))
        .routes(routes!(
            handlers::location::get_location,
            handlers::location::replace_location,
            handlers::location::update_location,
            handlers::location::delete_location
        ))
}

fn group_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::item_group::list_groups,
            handlers::item_group::create_group
        ))
        .routes(routes!(
            handlers::item_group::get_group,
            handlers::item_group::replace_group,
            handlers::item_group::update_group,
            handlers::item_group::delete_group
        ))
}

fn tag_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::tag::list_tags, handlers::tag::create_tag))
        .routes(routes!(
            handlers::tag::get_tag,
            handlers::tag::replace_tag,
            handlers::tag::update_tag,
            handlers::tag::delete_tag
        ))
}
