use pinshot::common::MapLocation;
use pinshot::database::{MapCenterStore, setup_database};

#[tokio::test]
async fn map_center_survives_reopening_database() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("pinshot.db").display());

    let pool = setup_database(&url).await.unwrap();
    MapCenterStore::new(pool.clone())
        .save(MapLocation::new(47.0, -122.0))
        .await
        .unwrap();
    pool.close().await;

    let reopened = setup_database(&url).await.unwrap();
    let center = MapCenterStore::new(reopened).load().await.unwrap();

    assert_eq!(center, Some(MapLocation::new(47.0, -122.0)));
}

#[tokio::test]
async fn fresh_database_has_no_map_center() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("empty.db").display());

    let pool = setup_database(&url).await.unwrap();

    assert!(MapCenterStore::new(pool).load().await.unwrap().is_none());
}
