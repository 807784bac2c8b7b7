use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::MapLocation;
use crate::database::{LocationEntity, PhotoEntity, PhotoStatus};

#[derive(Debug, Deserialize)]
pub struct PinRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<PinRequest> for MapLocation {
    fn from(req: PinRequest) -> Self {
        MapLocation::new(req.latitude, req.longitude)
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub position: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PinInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl From<LocationEntity> for PinInfo {
    fn from(location: LocationEntity) -> Self {
        Self {
            latitude: location.latitude,
            longitude: location.longitude,
            created_at: location.created_at,
        }
    }
}

/// 图片网格中的单个槽位，不包含图片数据本身
#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoSlot {
    pub position: i64,
    pub status: PhotoStatus,
    pub source_url: Option<String>,
    /// 图片字节数，占位时为0
    pub size: usize,
}

impl From<PhotoEntity> for PhotoSlot {
    fn from(photo: PhotoEntity) -> Self {
        Self {
            position: photo.position,
            status: photo.status,
            size: photo.image.as_ref().map_or(0, Vec::len),
            source_url: photo.source_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PhotoGrid {
    pub latitude: f64,
    pub longitude: f64,
    pub photos: Vec<PhotoSlot>,
}
