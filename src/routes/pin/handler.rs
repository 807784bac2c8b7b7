use axum::{
    extract::{Json, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::common::MapLocation;
use crate::coordinator::Status;
use crate::error::AppError;
use crate::utils::{ApiResponse, is_valid_coordinate, success_to_api_response};

use super::model::{ImageQuery, PhotoGrid, PhotoSlot, PinInfo, PinRequest};

fn validate(req: PinRequest) -> Result<MapLocation, AppError> {
    if !is_valid_coordinate(req.latitude, req.longitude) {
        return Err(AppError::BadRequest(format!(
            "Invalid coordinate ({}, {})",
            req.latitude, req.longitude
        )));
    }
    Ok(req.into())
}

#[axum::debug_handler]
pub async fn place_pin(
    State(state): State<AppState>,
    Json(req): Json<PinRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PinInfo>>), AppError> {
    let target = validate(req)?;
    let location = state.coordinator.place_pin(target).await?;

    Ok((
        StatusCode::CREATED,
        success_to_api_response(PinInfo::from(location)),
    ))
}

#[axum::debug_handler]
pub async fn list_pins(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<PinInfo>>>, AppError> {
    let pins = state
        .repository
        .list_locations()
        .await?
        .into_iter()
        .map(PinInfo::from)
        .collect::<Vec<_>>();

    Ok(success_to_api_response(pins))
}

#[axum::debug_handler]
pub async fn select_pin(
    State(state): State<AppState>,
    Json(req): Json<PinRequest>,
) -> Result<Json<ApiResponse<PinInfo>>, AppError> {
    let target = validate(req)?;
    let location = state.coordinator.select_pin(target).await?;

    Ok(success_to_api_response(PinInfo::from(location)))
}

#[axum::debug_handler]
pub async fn remove_pin(
    State(state): State<AppState>,
    Json(req): Json<PinRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let target = validate(req)?;
    state.coordinator.remove_pin(target).await?;

    Ok(success_to_api_response(serde_json::json!({
        "success": true
    })))
}

#[axum::debug_handler]
pub async fn refresh(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let cycle = state.coordinator.refresh().await?;

    Ok((
        StatusCode::ACCEPTED,
        success_to_api_response(serde_json::json!({
            "cycle": cycle
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_photos(
    State(state): State<AppState>,
    Query(query): Query<PinRequest>,
) -> Result<Json<ApiResponse<PhotoGrid>>, AppError> {
    let location = state
        .repository
        .find_location(query.latitude, query.longitude)
        .await?
        .ok_or_else(|| AppError::NotFound("Pin not found".to_string()))?;

    let photos = state
        .repository
        .photos(&location)
        .await?
        .into_iter()
        .map(PhotoSlot::from)
        .collect();

    Ok(success_to_api_response(PhotoGrid {
        latitude: location.latitude,
        longitude: location.longitude,
        photos,
    }))
}

#[axum::debug_handler]
pub async fn photo_image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Response, AppError> {
    let location = state
        .repository
        .find_location(query.latitude, query.longitude)
        .await?
        .ok_or_else(|| AppError::NotFound("Pin not found".to_string()))?;

    let photo = state.repository.photo(&location, query.position).await?;
    match photo.and_then(|p| p.image) {
        Some(bytes) => Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes).into_response()),
        None => Err(AppError::NotFound(format!(
            "Photo {} is not available",
            query.position
        ))),
    }
}

#[axum::debug_handler]
pub async fn status(State(state): State<AppState>) -> Json<ApiResponse<Status>> {
    success_to_api_response(state.coordinator.status())
}
