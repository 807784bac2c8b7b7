use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::PhotoSource;
use crate::common::MapLocation;
use crate::config::Config;
use crate::error::{FetchError, SearchError};

/// Flickr 图片搜索客户端
pub struct FlickrClient {
    client: Client,
    endpoint: String,
    api_key: String,
    per_page: u32,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    stat: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    photos: Option<PhotoPage>,
}

#[derive(Debug, Deserialize)]
struct PhotoPage {
    #[serde(default)]
    photo: Vec<PhotoRecord>,
}

#[derive(Debug, Deserialize)]
struct PhotoRecord {
    // 请求了 extras=url_m，但并非每条记录都有中等尺寸图片
    #[serde(default)]
    url_m: Option<String>,
}

impl FlickrClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;

        Ok(Self {
            client,
            endpoint: config.search_endpoint.clone(),
            api_key: config.flickr_api_key.clone(),
            per_page: config.photos_per_search,
        })
    }

    fn search_url(&self, location: MapLocation) -> Result<Url, SearchError> {
        let params = [
            ("method", "flickr.photos.search".to_string()),
            ("api_key", self.api_key.clone()),
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("extras", "url_m".to_string()),
            ("per_page", self.per_page.to_string()),
            ("format", "json".to_string()),
            ("nojsoncallback", "1".to_string()),
        ];

        Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| SearchError::InvalidEndpoint(format!("{}: {}", self.endpoint, e)))
    }
}

/// 解析搜索响应，只保留带有 url_m 的记录
fn parse_search_response(body: &str) -> Result<Vec<String>, SearchError> {
    let response: SearchResponse = serde_json::from_str(body)?;

    if response.stat != "ok" {
        return Err(SearchError::Provider(
            response.message.unwrap_or(response.stat),
        ));
    }

    let urls = response
        .photos
        .map(|page| page.photo)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|record| record.url_m)
        .filter(|url| !url.is_empty())
        .collect();

    Ok(urls)
}

#[async_trait]
impl PhotoSource for FlickrClient {
    async fn search(&self, location: MapLocation) -> Result<Vec<String>, SearchError> {
        let url = self.search_url(location)?;
        tracing::debug!("Searching photos near {}", location);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let urls = parse_search_response(&body)?;
        tracing::info!("Search near {} returned {} photos", location, urls.len());
        Ok(urls)
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
