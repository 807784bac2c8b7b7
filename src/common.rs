use serde::{Deserialize, Serialize};

// 公共数据结构
/// 地图坐标，纬度和经度共同构成位置的自然键
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct MapLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl MapLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl std::fmt::Display for MapLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}
