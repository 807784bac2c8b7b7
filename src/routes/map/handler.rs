use axum::extract::{Json, State};

use crate::AppState;
use crate::common::MapLocation;
use crate::error::AppError;
use crate::utils::{ApiResponse, is_valid_coordinate, success_to_api_response};

/// 读取上次保存的地图中心，未保存过时 resp_data 为 null
#[axum::debug_handler]
pub async fn get_map_center(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Option<MapLocation>>>, AppError> {
    let center = state.map_center.load().await?;
    Ok(success_to_api_response(center))
}

#[axum::debug_handler]
pub async fn save_map_center(
    State(state): State<AppState>,
    Json(center): Json<MapLocation>,
) -> Result<Json<ApiResponse<MapLocation>>, AppError> {
    if !is_valid_coordinate(center.latitude, center.longitude) {
        return Err(AppError::BadRequest(format!("Invalid map center {}", center)));
    }

    state.map_center.save(center).await?;
    Ok(success_to_api_response(center))
}
