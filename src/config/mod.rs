use std::env;
use std::time::Duration;

const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.flickr.com/services/rest/";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub flickr_api_key: String,
    pub search_endpoint: String,
    pub photos_per_search: u32,
    /// 为空表示不限制并发下载数
    pub max_concurrent_fetches: Option<usize>,
    pub http_timeout_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        // 0 和未设置都视为不限制
        let max_concurrent_fetches = env::var("MAX_CONCURRENT_FETCHES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            flickr_api_key: env::var("FLICKR_API_KEY")?,
            search_endpoint: env::var("SEARCH_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SEARCH_ENDPOINT.to_string()),
            photos_per_search: parse_or("PHOTOS_PER_SEARCH", 21),
            max_concurrent_fetches,
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", 30),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: parse_or("SERVER_PORT", 3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".to_string()),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
