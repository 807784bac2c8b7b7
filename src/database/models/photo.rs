// 图片实体
// 每张图片属于唯一的位置，并在该位置的图片集合中有固定序号

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 图片槽位状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PhotoStatus {
    /// 占位，等待下载结果
    Pending,
    /// 已写入图片数据
    Filled,
}

/// 图片实体，对应数据库中的 photos 表
#[derive(Debug, Clone, FromRow)]
pub struct PhotoEntity {
    pub id: i64,
    pub location_id: i64,
    /// 在所属位置图片集合中的序号，从0开始
    pub position: i64,
    pub status: PhotoStatus,
    pub source_url: Option<String>,
    pub image: Option<Vec<u8>>,
}

impl PhotoEntity {
    pub fn is_pending(&self) -> bool {
        self.status == PhotoStatus::Pending
    }
}
