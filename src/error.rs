use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::common::MapLocation;
use crate::utils::{error_codes, error_to_api_response};

/// 存储层错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// 数据库读写失败
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
    /// 目标位置已经写入过图片，或已被新一轮刷新清除
    #[error("stale write into photo slot {position}")]
    StaleWrite { position: usize },
}

/// 图片搜索失败
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search request returned status {0}")]
    Status(u16),
    #[error("failed to decode search response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("photo provider rejected search: {0}")]
    Provider(String),
}

/// 单张图片下载失败
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("image request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("image request for {url} returned status {status}")]
    Status { status: u16, url: String },
}

/// 意图调用方可见的协调器错误
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("coordinator is not running")]
    Closed,
    #[error("no pin is selected")]
    NoSelection,
    #[error("no pin at {0}")]
    UnknownPin(MapLocation),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// HTTP 层错误，统一转换为 ApiResponse
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Coordinator(CoordinatorError),
    Repository(RepositoryError),
}

impl From<CoordinatorError> for AppError {
    fn from(e: CoordinatorError) -> Self {
        match e {
            CoordinatorError::UnknownPin(location) => {
                AppError::NotFound(format!("Pin not found at {}", location))
            }
            CoordinatorError::NoSelection => AppError::BadRequest(e.to_string()),
            CoordinatorError::Repository(e) => AppError::Repository(e),
            other => AppError::Coordinator(other),
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(e: RepositoryError) -> Self {
        AppError::Repository(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                msg,
            ),
            AppError::Coordinator(e) => (
                StatusCode::SERVICE_UNAVAILABLE,
                error_codes::INTERNAL_ERROR,
                e.to_string(),
            ),
            AppError::Repository(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                e.to_string(),
            ),
        };

        (status, error_to_api_response::<()>(code, message)).into_response()
    }
}
