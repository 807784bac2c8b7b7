#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pinshot::common::MapLocation;
use pinshot::config::Config;
use pinshot::coordinator::{self, CoordinatorHandle, CoordinatorOptions};
use pinshot::database::{LocationRepository, MapCenterStore, setup_database};
use pinshot::error::{FetchError, SearchError};
use pinshot::search::PhotoSource;
use pinshot::AppState;

/// 本地图片源：搜索返回固定地址，下载返回地址本身的字节
#[derive(Default)]
pub struct FakeSource {
    pub urls: Vec<String>,
    pub failing: HashSet<String>,
    pub fetch_delay: Option<Duration>,
    pub active: AtomicUsize,
    pub peak: AtomicUsize,
}

impl FakeSource {
    pub fn with_urls(count: usize) -> Self {
        Self {
            urls: (0..count)
                .map(|i| format!("https://live.staticflickr.com/65535/{}_m.jpg", i))
                .collect(),
            ..Default::default()
        }
    }

    pub fn fail(mut self, index: usize) -> Self {
        self.failing.insert(self.urls[index].clone());
        self
    }
}

#[async_trait]
impl PhotoSource for FakeSource {
    async fn search(&self, _location: MapLocation) -> Result<Vec<String>, SearchError> {
        Ok(self.urls.clone())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(url) {
            return Err(FetchError::Status {
                status: 500,
                url: url.to_string(),
            });
        }
        Ok(url.as_bytes().to_vec())
    }
}

pub async fn memory_repository() -> LocationRepository {
    let pool = setup_database("sqlite::memory:").await.unwrap();
    LocationRepository::new(pool)
}

pub fn start(
    repository: &LocationRepository,
    source: Arc<FakeSource>,
    options: CoordinatorOptions,
) -> CoordinatorHandle {
    coordinator::spawn(repository.clone(), source, options)
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        flickr_api_key: "test-key".to_string(),
        search_endpoint: "https://api.flickr.com/services/rest/".to_string(),
        photos_per_search: 21,
        max_concurrent_fetches: None,
        http_timeout_secs: 5,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        api_base_uri: "/api".to_string(),
    }
}

pub async fn app_state(source: FakeSource) -> AppState {
    let pool = setup_database("sqlite::memory:").await.unwrap();
    let repository = LocationRepository::new(pool.clone());
    let coordinator = start(&repository, Arc::new(source), CoordinatorOptions::default());

    AppState {
        repository,
        map_center: MapCenterStore::new(pool),
        coordinator,
        config: test_config(),
    }
}
