mod helpers;

use helpers::*;
use snapwall_core::{MediaKind, NEW_MEDIA_TOPIC, NEW_THUMBNAIL_TOPIC};
use snapwall_infra::EventBus;
use snapwall_worker::{ThumbnailWorkerPool, WorkerStats};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_pool_processes_and_acks() {
    let fixture = Fixture::new(1, false);
    fixture.add_asset(1, "abc", "file.jpg", MediaKind::Image).await;
    let mut watcher = fixture.bus.subscribe(NEW_THUMBNAIL_TOPIC, "gallery").await.unwrap();
    let processor = fixture.processor(Arc::new(ScriptedGenerator::returning(THUMBDATA)), None, true);
    let pool = ThumbnailWorkerPool::start(processor, fixture.bus.clone(), &pool_config(2, true))
        .await
        .unwrap();

    fixture
        .bus
        .publish(NEW_MEDIA_TOPIC, new_media(1, "abc", MediaKind::Image))
        .await
        .unwrap();

    assert_eq!(next_payload(&mut watcher).await, b"thumb_file.webp");
    assert_eq!(fixture.stored("thumb_file.webp").unwrap(), THUMBDATA);

    let stats = pool.shutdown().await;
    assert_eq!(stats, WorkerStats { acked: 1, nakked: 0 });
}

#[tokio::test]
async fn test_failed_message_is_nakked() {
    let fixture = Fixture::new(1, false);
    fixture.add_asset(1, "abc", "file.jpg", MediaKind::Image).await;
    let mut watcher = fixture.bus.subscribe(NEW_THUMBNAIL_TOPIC, "gallery").await.unwrap();
    let processor = fixture.processor(Arc::new(ScriptedGenerator::failing("imagor down")), None, true);
    let pool = ThumbnailWorkerPool::start(processor, fixture.bus.clone(), &pool_config(1, true))
        .await
        .unwrap();

    fixture
        .bus
        .publish(NEW_MEDIA_TOPIC, new_media(1, "abc", MediaKind::Image))
        .await
        .unwrap();

    wait_until(|| pool.stats().nakked == 1).await;
    assert!(fixture.metadata.thumbnails().is_empty());
    assert!(stays_quiet(&mut watcher).await);

    let stats = pool.shutdown().await;
    assert_eq!(stats.acked, 0);
}

#[tokio::test]
async fn test_more_messages_than_workers_all_acked() {
    const MESSAGES: usize = 12;

    let fixture = Fixture::new(5, false);
    for i in 0..MESSAGES {
        fixture
            .add_asset(5, &format!("asset-{}", i), &format!("img{}.png", i), MediaKind::Image)
            .await;
    }
    let mut watcher = fixture.bus.subscribe(NEW_THUMBNAIL_TOPIC, "gallery").await.unwrap();
    let processor = fixture.processor(Arc::new(ScriptedGenerator::returning(THUMBDATA)), None, true);
    let pool = ThumbnailWorkerPool::start(processor, fixture.bus.clone(), &pool_config(3, true))
        .await
        .unwrap();

    for i in 0..MESSAGES {
        fixture
            .bus
            .publish(NEW_MEDIA_TOPIC, new_media(5, &format!("asset-{}", i), MediaKind::Image))
            .await
            .unwrap();
    }

    let mut announced = HashSet::new();
    for _ in 0..MESSAGES {
        announced.insert(String::from_utf8(next_payload(&mut watcher).await).unwrap());
    }
    let expected: HashSet<String> = (0..MESSAGES).map(|i| format!("thumb_img{}.webp", i)).collect();
    assert_eq!(announced, expected);
    assert_eq!(fixture.metadata.thumbnails().len(), MESSAGES);

    let stats = pool.shutdown().await;
    assert_eq!(stats.acked, MESSAGES as u64);
    assert_eq!(stats.nakked, 0);
}

#[tokio::test]
async fn test_idle_pool_shuts_down() {
    let fixture = Fixture::new(1, false);
    let processor = fixture.processor(Arc::new(ScriptedGenerator::returning(THUMBDATA)), None, true);
    let pool = ThumbnailWorkerPool::start(processor, fixture.bus.clone(), &pool_config(4, true))
        .await
        .unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
        .await
        .unwrap();
    assert_eq!(stats, WorkerStats::default());
}

#[tokio::test]
async fn test_shutdown_finishes_in_flight_message_and_takes_no_more() {
    let fixture = Fixture::new(1, false);
    fixture.add_asset(1, "abc", "file.jpg", MediaKind::Image).await;
    fixture.add_asset(1, "def", "second.jpg", MediaKind::Image).await;
    let generator = Arc::new(GatedGenerator::new());
    let processor = fixture.processor(generator.clone(), None, true);
    let pool = ThumbnailWorkerPool::start(processor, fixture.bus.clone(), &pool_config(1, true))
        .await
        .unwrap();

    fixture
        .bus
        .publish(NEW_MEDIA_TOPIC, new_media(1, "abc", MediaKind::Image))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(5), generator.started.notified())
        .await
        .unwrap();

    let stopping = tokio::spawn(pool.shutdown());
    fixture
        .bus
        .publish(NEW_MEDIA_TOPIC, new_media(1, "def", MediaKind::Image))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!stopping.is_finished());

    generator.release.notify_one();
    let stats = tokio::time::timeout(Duration::from_secs(5), stopping)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(stats, WorkerStats { acked: 1, nakked: 0 });
    assert_eq!(generator.calls(), 1);
    assert_eq!(fixture.metadata.thumbnails().len(), 1);
    assert_eq!(fixture.metadata.thumbnails()[0].source_asset_id, "abc");
    assert!(fixture.stored("thumb_second.webp").is_none());
}
