mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use pinshot::common::MapLocation;
use pinshot::coordinator::{CoordinatorOptions, Notification};
use pinshot::database::PhotoStatus;
use pinshot::error::CoordinatorError;

use common::{FakeSource, memory_repository, start};

#[tokio::test]
async fn seattle_refresh_with_one_failed_download() {
    let repository = memory_repository().await;
    let source = Arc::new(FakeSource::with_urls(3).fail(0));
    let coordinator = start(&repository, source, CoordinatorOptions::default());
    let mut notifications = coordinator.subscribe();

    let target = MapLocation::new(47.6062, -122.3321);
    let location = coordinator.place_pin(target).await.unwrap();
    let status = coordinator.wait_until_idle().await.unwrap();

    assert!(!status.network_active);
    assert_eq!(status.selected, Some(target));
    assert_eq!(status.outstanding, 0);

    let photos = repository.photos(&location).await.unwrap();
    assert_eq!(photos.len(), 3);
    assert_eq!(photos[0].status, PhotoStatus::Pending);
    assert!(photos[0].image.is_none());
    assert_eq!(photos[1].status, PhotoStatus::Filled);
    assert_eq!(photos[2].status, PhotoStatus::Filled);
    assert_eq!(
        photos[1].image.as_deref(),
        Some("https://live.staticflickr.com/65535/1_m.jpg".as_bytes())
    );

    let mut received = Vec::new();
    while let Ok(notification) = notifications.try_recv() {
        received.push(notification);
    }
    assert_eq!(
        received.first(),
        Some(&Notification::PhotoGridChanged(target))
    );
    assert!(received.contains(&Notification::NetworkActivity(true)));
    assert_eq!(received.last(), Some(&Notification::NetworkActivity(false)));
}

#[tokio::test]
async fn refresh_replaces_previous_photo_set() {
    let repository = memory_repository().await;
    let coordinator = start(
        &repository,
        Arc::new(FakeSource::with_urls(4)),
        CoordinatorOptions::default(),
    );

    let location = coordinator
        .place_pin(MapLocation::new(52.52, 13.405))
        .await
        .unwrap();
    coordinator.wait_until_idle().await.unwrap();

    let cycle = coordinator.refresh().await.unwrap();
    assert_eq!(cycle, 2);
    coordinator.wait_until_idle().await.unwrap();

    let photos = repository.photos(&location).await.unwrap();
    let positions: Vec<i64> = photos.iter().map(|p| p.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
    assert!(photos.iter().all(|p| p.status == PhotoStatus::Filled));
}

#[tokio::test]
async fn concurrent_downloads_respect_limit() {
    let repository = memory_repository().await;
    let source = Arc::new(FakeSource {
        fetch_delay: Some(Duration::from_millis(20)),
        ..FakeSource::with_urls(5)
    });
    let coordinator = start(
        &repository,
        source.clone(),
        CoordinatorOptions {
            max_concurrent_fetches: Some(2),
        },
    );

    let location = coordinator
        .place_pin(MapLocation::new(37.7749, -122.4194))
        .await
        .unwrap();
    coordinator.wait_until_idle().await.unwrap();

    assert!(source.peak.load(Ordering::SeqCst) <= 2);
    let photos = repository.photos(&location).await.unwrap();
    assert_eq!(photos.len(), 5);
    assert!(photos.iter().all(|p| p.status == PhotoStatus::Filled));
}

#[tokio::test]
async fn remove_pin_deletes_location_and_photos() {
    let repository = memory_repository().await;
    let coordinator = start(
        &repository,
        Arc::new(FakeSource::with_urls(5)),
        CoordinatorOptions::default(),
    );
    let target = MapLocation::new(-22.9068, -43.1729);

    let location = coordinator.place_pin(target).await.unwrap();
    coordinator.wait_until_idle().await.unwrap();
    assert_eq!(repository.photos(&location).await.unwrap().len(), 5);

    coordinator.remove_pin(target).await.unwrap();

    assert!(repository
        .find_location(target.latitude, target.longitude)
        .await
        .unwrap()
        .is_none());
    assert!(repository.photos(&location).await.unwrap().is_empty());
    assert_eq!(coordinator.status().selected, None);

    let err = coordinator.remove_pin(target).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::UnknownPin(_)));
}

#[tokio::test]
async fn select_pin_switches_selection_without_fetching() {
    let repository = memory_repository().await;
    let coordinator = start(
        &repository,
        Arc::new(FakeSource::with_urls(2)),
        CoordinatorOptions::default(),
    );
    let first = MapLocation::new(1.0, 1.0);
    let second = MapLocation::new(2.0, 2.0);

    coordinator.place_pin(first).await.unwrap();
    coordinator.wait_until_idle().await.unwrap();
    let second_location = repository.create_location(2.0, 2.0).await.unwrap();

    coordinator.select_pin(second).await.unwrap();
    let status = coordinator.status();

    assert_eq!(status.selected, Some(second));
    assert_eq!(status.cycle, 2);
    assert!(repository.photos(&second_location).await.unwrap().is_empty());
}
