// 图片搜索模块
// 按坐标搜索附近图片并下载图片数据

use async_trait::async_trait;

use crate::common::MapLocation;
use crate::error::{FetchError, SearchError};

mod flickr;

pub use flickr::FlickrClient;

/// 图片来源
///
/// 协调器只依赖这个接口，测试中可替换为本地实现
#[async_trait]
pub trait PhotoSource: Send + Sync {
    /// 搜索坐标附近的图片，返回图片地址列表，结果可能少于请求数量
    async fn search(&self, location: MapLocation) -> Result<Vec<String>, SearchError>;

    /// 下载单张图片的原始数据
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}
