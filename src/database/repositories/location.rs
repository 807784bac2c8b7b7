// 位置存储库
// 包含位置及其图片集合的全部数据库操作

use chrono::Utc;
use sqlx::SqlitePool;

use crate::database::models::location::LocationEntity;
use crate::database::models::photo::{PhotoEntity, PhotoStatus};
use crate::error::RepositoryError;

/// 位置存储库，独占位置和图片的持久化状态
#[derive(Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 按坐标精确查找位置，不做取整
    ///
    /// 存在重复坐标时返回最早创建的记录
    pub async fn find_location(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<LocationEntity>, RepositoryError> {
        let location = sqlx::query_as::<_, LocationEntity>(
            r#"
            SELECT id, latitude, longitude, created_at
            FROM locations
            WHERE latitude = ? AND longitude = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .fetch_optional(&self.pool)
        .await?;

        Ok(location)
    }

    /// 新建位置，图片集合为空
    ///
    /// 不检查重复坐标，去重由调用方决定
    pub async fn create_location(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<LocationEntity, RepositoryError> {
        let location = sqlx::query_as::<_, LocationEntity>(
            r#"
            INSERT INTO locations (latitude, longitude, created_at)
            VALUES (?, ?, ?)
            RETURNING id, latitude, longitude, created_at
            "#,
        )
        .bind(latitude)
        .bind(longitude)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created location {} at ({}, {})", location.id, latitude, longitude);
        Ok(location)
    }

    /// 按创建顺序列出所有位置
    pub async fn list_locations(&self) -> Result<Vec<LocationEntity>, RepositoryError> {
        let locations = sqlx::query_as::<_, LocationEntity>(
            "SELECT id, latitude, longitude, created_at FROM locations ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// 删除位置及其全部图片
    pub async fn delete_location(&self, location: &LocationEntity) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let photos = sqlx::query("DELETE FROM photos WHERE location_id = ?")
            .bind(location.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM locations WHERE id = ?")
            .bind(location.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!("Deleted location {} with {} photos", location.id, photos);
        Ok(())
    }

    /// 清空位置的图片集合，位置本身保留
    pub async fn clear_photos(&self, location: &LocationEntity) -> Result<u64, RepositoryError> {
        let removed = sqlx::query("DELETE FROM photos WHERE location_id = ?")
            .bind(location.id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed)
    }

    /// 在现有图片之后追加 count 个占位图片
    pub async fn create_placeholders(
        &self,
        location: &LocationEntity,
        count: usize,
    ) -> Result<Vec<PhotoEntity>, RepositoryError> {
        self.insert_placeholders(location, std::iter::repeat_n(None, count))
            .await
    }

    /// 为搜索结果中的每个地址追加一个占位图片，并记录来源地址
    pub async fn create_placeholders_for(
        &self,
        location: &LocationEntity,
        urls: &[String],
    ) -> Result<Vec<PhotoEntity>, RepositoryError> {
        self.insert_placeholders(location, urls.iter().map(|url| Some(url.as_str())))
            .await
    }

    async fn insert_placeholders<'a>(
        &self,
        location: &LocationEntity,
        sources: impl Iterator<Item = Option<&'a str>>,
    ) -> Result<Vec<PhotoEntity>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let next_position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM photos WHERE location_id = ?",
        )
        .bind(location.id)
        .fetch_one(&mut *tx)
        .await?;

        let mut photos = Vec::new();
        for (offset, source_url) in sources.enumerate() {
            let position = next_position + offset as i64;
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO photos (location_id, position, status, source_url, image)
                VALUES (?, ?, ?, ?, NULL)
                RETURNING id
                "#,
            )
            .bind(location.id)
            .bind(position)
            .bind(PhotoStatus::Pending)
            .bind(source_url)
            .fetch_one(&mut *tx)
            .await?;

            photos.push(PhotoEntity {
                id,
                location_id: location.id,
                position,
                status: PhotoStatus::Pending,
                source_url: source_url.map(str::to_string),
                image: None,
            });
        }

        tx.commit().await?;
        Ok(photos)
    }

    /// 向占位图片写入图片数据
    ///
    /// 只有状态为 Pending 的槽位可以写入，已写入或已被清除的槽位返回 StaleWrite
    pub async fn set_photo_image(
        &self,
        location: &LocationEntity,
        position: usize,
        bytes: &[u8],
    ) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            r#"
            UPDATE photos
            SET image = ?, status = ?
            WHERE location_id = ? AND position = ? AND status = ?
            "#,
        )
        .bind(bytes)
        .bind(PhotoStatus::Filled)
        .bind(location.id)
        .bind(position as i64)
        .bind(PhotoStatus::Pending)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::StaleWrite { position });
        }

        Ok(())
    }

    /// 按序号列出位置的图片
    pub async fn photos(
        &self,
        location: &LocationEntity,
    ) -> Result<Vec<PhotoEntity>, RepositoryError> {
        let photos = sqlx::query_as::<_, PhotoEntity>(
            r#"
            SELECT id, location_id, position, status, source_url, image
            FROM photos
            WHERE location_id = ?
            ORDER BY position
            "#,
        )
        .bind(location.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(photos)
    }

    pub async fn photo(
        &self,
        location: &LocationEntity,
        position: usize,
    ) -> Result<Option<PhotoEntity>, RepositoryError> {
        let photo = sqlx::query_as::<_, PhotoEntity>(
            r#"
            SELECT id, location_id, position, status, source_url, image
            FROM photos
            WHERE location_id = ? AND position = ?
            "#,
        )
        .bind(location.id)
        .bind(position as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(photo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::setup_database;

    async fn repository() -> LocationRepository {
        let pool = setup_database("sqlite::memory:").await.unwrap();
        LocationRepository::new(pool)
    }

    #[tokio::test]
    async fn find_after_create_uses_exact_key() {
        let repo = repository().await;
        let created = repo.create_location(47.6062, -122.3321).await.unwrap();

        let found = repo.find_location(47.6062, -122.3321).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.latitude, 47.6062);
        assert_eq!(found.longitude, -122.3321);

        // 近似坐标不应命中
        assert!(repo.find_location(47.60620001, -122.3321).await.unwrap().is_none());
        assert!(repo.find_location(-122.3321, 47.6062).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_does_not_dedupe() {
        let repo = repository().await;
        let first = repo.create_location(10.0, 20.0).await.unwrap();
        let second = repo.create_location(10.0, 20.0).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(repo.list_locations().await.unwrap().len(), 2);

        let found = repo.find_location(10.0, 20.0).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test]
    async fn placeholders_after_clear_start_at_zero() {
        let repo = repository().await;
        let location = repo.create_location(1.5, 2.5).await.unwrap();

        repo.create_placeholders(&location, 2).await.unwrap();
        repo.clear_photos(&location).await.unwrap();
        let created = repo.create_placeholders(&location, 4).await.unwrap();
        assert_eq!(created.len(), 4);

        let photos = repo.photos(&location).await.unwrap();
        assert_eq!(photos.len(), 4);
        for (i, photo) in photos.iter().enumerate() {
            assert_eq!(photo.position, i as i64);
            assert!(photo.is_pending());
            assert!(photo.image.is_none());
        }
    }

    #[tokio::test]
    async fn placeholders_append_after_existing() {
        let repo = repository().await;
        let location = repo.create_location(3.0, 4.0).await.unwrap();

        repo.create_placeholders(&location, 2).await.unwrap();
        let urls = vec!["https://example.com/a.jpg".to_string()];
        let appended = repo.create_placeholders_for(&location, &urls).await.unwrap();

        assert_eq!(appended[0].position, 2);
        let photo = repo.photo(&location, 2).await.unwrap().unwrap();
        assert_eq!(photo.source_url.as_deref(), Some("https://example.com/a.jpg"));
    }

    #[tokio::test]
    async fn second_write_to_slot_is_stale() {
        let repo = repository().await;
        let location = repo.create_location(5.0, 6.0).await.unwrap();
        repo.create_placeholders(&location, 3).await.unwrap();

        repo.set_photo_image(&location, 1, b"jpeg-bytes").await.unwrap();
        let err = repo.set_photo_image(&location, 1, b"other").await.unwrap_err();
        assert!(matches!(err, RepositoryError::StaleWrite { position: 1 }));

        let photo = repo.photo(&location, 1).await.unwrap().unwrap();
        assert_eq!(photo.status, PhotoStatus::Filled);
        assert_eq!(photo.image.as_deref(), Some(&b"jpeg-bytes"[..]));
    }

    #[tokio::test]
    async fn write_into_cleared_slot_is_stale() {
        let repo = repository().await;
        let location = repo.create_location(5.0, 6.0).await.unwrap();
        repo.create_placeholders(&location, 1).await.unwrap();
        repo.clear_photos(&location).await.unwrap();

        let err = repo.set_photo_image(&location, 0, b"late").await.unwrap_err();
        assert!(matches!(err, RepositoryError::StaleWrite { position: 0 }));
        assert!(repo.photos(&location).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_cascades_to_photos() {
        let repo = repository().await;
        let location = repo.create_location(-33.8688, 151.2093).await.unwrap();
        let other = repo.create_location(0.0, 0.0).await.unwrap();
        repo.create_placeholders(&location, 5).await.unwrap();
        repo.create_placeholders(&other, 1).await.unwrap();

        repo.delete_location(&location).await.unwrap();

        assert!(repo.find_location(-33.8688, 151.2093).await.unwrap().is_none());
        assert!(repo.photos(&location).await.unwrap().is_empty());
        assert_eq!(repo.photos(&other).await.unwrap().len(), 1);
    }
}
