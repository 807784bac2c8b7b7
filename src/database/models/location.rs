// 位置实体
// 用户放置的每个图钉对应一条位置记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::MapLocation;

/// 位置实体，对应数据库中的 locations 表
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LocationEntity {
    pub id: i64,
    /// 纬度
    pub latitude: f64,
    /// 经度
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl LocationEntity {
    pub fn coordinate(&self) -> MapLocation {
        MapLocation::new(self.latitude, self.longitude)
    }
}
