use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;
use crate::middleware::log_errors;

pub mod map;
pub mod pin;

/// 组装全部路由，挂载在 api_base_uri 之下
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/pins", get(pin::list_pins).post(pin::place_pin))
        .route("/pins/select", post(pin::select_pin))
        .route("/pins/remove", post(pin::remove_pin))
        .route("/pins/refresh", post(pin::refresh))
        .route("/pins/photos", get(pin::list_photos))
        .route("/pins/photos/image", get(pin::photo_image))
        .route(
            "/map-center",
            get(map::get_map_center).put(map::save_map_center),
        )
        .route("/status", get(pin::status));

    // axum 不允许挂载在根路径上
    let base_uri = state.config.api_base_uri.trim_end_matches('/').to_string();
    let router = if base_uri.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&base_uri, api)
    };

    router
        .layer(axum::middleware::from_fn(log_errors))
        .with_state(state)
}
