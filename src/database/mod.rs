// 数据库模块
// 包含实体定义、表结构初始化和存储库操作

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub mod models; // 数据库实体定义
pub mod repositories; // 存储库实现

// 重新导出常用类型，方便其他模块使用
pub use models::location::LocationEntity;
pub use models::photo::{PhotoEntity, PhotoStatus};
pub use repositories::location::LocationRepository;
pub use repositories::map_center::MapCenterStore;

/// 连接 SQLite 数据库并确保表结构存在
///
/// 内存数据库只使用单个常驻连接，否则每个连接都会看到一个独立的空库
pub async fn setup_database(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options.connect_with(options).await?;
    create_schema(&pool).await?;

    tracing::info!("Database ready: {}", database_url);
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS locations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            latitude REAL NOT NULL,
            longitude REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // 坐标查找走精确匹配
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_locations_coordinate ON locations(latitude, longitude)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS photos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location_id INTEGER NOT NULL REFERENCES locations(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            status TEXT NOT NULL,
            source_url TEXT,
            image BLOB,
            UNIQUE (location_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings_kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
