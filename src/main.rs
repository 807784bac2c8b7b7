use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use pinshot::{
    AppState,
    config::Config,
    coordinator::{self, CoordinatorOptions},
    database::{LocationRepository, MapCenterStore, setup_database},
    routes,
    search::FlickrClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");

    // 初始化数据库
    let pool = setup_database(&config.database_url)
        .await
        .expect("Failed to open database");
    let repository = LocationRepository::new(pool.clone());
    let map_center = MapCenterStore::new(pool);

    match map_center.load().await {
        Ok(Some(center)) => tracing::info!("Restoring map center {}", center),
        Ok(None) => tracing::info!("No saved map center"),
        Err(e) => tracing::warn!("Failed to read map center: {}", e),
    }
    match repository.list_locations().await {
        Ok(locations) => tracing::info!("Loaded {} pins", locations.len()),
        Err(e) => tracing::warn!("Failed to list pins: {}", e),
    }

    // 启动刷新协调器
    let source = FlickrClient::new(&config).expect("Failed to create HTTP client");
    let coordinator = coordinator::spawn(
        repository.clone(),
        Arc::new(source),
        CoordinatorOptions {
            max_concurrent_fetches: config.max_concurrent_fetches,
        },
    );

    let state = AppState {
        repository,
        map_center,
        coordinator,
        config: config.clone(),
    };

    let router = routes::router(state);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to localhost");
            IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutting down");
    })
    .await
    .expect("Failed to start server");
}
