// 地图中心存储
// 以固定键保存最后一次浏览的地图中心点

use chrono::Utc;
use sqlx::SqlitePool;

use crate::common::MapLocation;
use crate::error::RepositoryError;

const LATITUDE_KEY: &str = "latitude";
const LONGITUDE_KEY: &str = "longitude";

#[derive(Clone)]
pub struct MapCenterStore {
    pool: SqlitePool,
}

impl MapCenterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 整体覆盖保存地图中心
    pub async fn save(&self, center: MapLocation) -> Result<(), RepositoryError> {
        let updated_at = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let mut tx = self.pool.begin().await?;

        for (key, value) in [
            (LATITUDE_KEY, center.latitude),
            (LONGITUDE_KEY, center.longitude),
        ] {
            // f64 的 Display 输出可无损解析回原值
            sqlx::query(
                "INSERT OR REPLACE INTO settings_kv (key, value, updated_at) VALUES (?, ?, ?)",
            )
            .bind(key)
            .bind(value.to_string())
            .bind(&updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!("Saved map center {}", center);
        Ok(())
    }

    /// 读取地图中心，缺少任一值时返回 None
    pub async fn load(&self) -> Result<Option<MapLocation>, RepositoryError> {
        let latitude = self.read_value(LATITUDE_KEY).await?;
        let longitude = self.read_value(LONGITUDE_KEY).await?;

        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Ok(Some(MapLocation::new(latitude, longitude))),
            _ => {
                tracing::debug!("No saved map center");
                Ok(None)
            }
        }
    }

    async fn read_value(&self, key: &str) -> Result<Option<f64>, RepositoryError> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM settings_kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(raw.and_then(|value| match value.parse::<f64>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring malformed map center value {}={}: {}", key, value, e);
                None
            }
        }))
    }
}
