mod shared;

use std::time::Duration;

use cache::CacheBackend;
use data_access::{CachePolicy, Error};
use shared::setup::{NOTES, harness, harness_with};

#[tokio::test]
async fn miss_populates_and_next_read_hits() {
    let h = harness().await;
    let note = h.create("Rio", "beach").await.unwrap();

    assert_eq!(h.get(note.id).await.unwrap(), note);
    assert_eq!(h.get(note.id).await.unwrap(), note);

    assert_eq!(h.fetches(), 1);
    assert_eq!(h.cache.sets(), 1);
    assert!(h.cache.inner().contains(NOTES.detail(note.id).as_str()));
}

#[tokio::test]
async fn unavailable_cache_falls_through_to_store() {
    let h = harness().await;
    let note = h.create("Rio", "beach").await.unwrap();

    h.cache.fail_all(true);

    assert_eq!(h.get(note.id).await.unwrap(), note);
    assert_eq!(h.get(note.id).await.unwrap(), note);

    assert_eq!(h.fetches(), 2);
    assert_eq!(h.cache.sets(), 0);

    h.cache.fail_all(false);
    assert!(h.cache.inner().is_empty());
}

#[tokio::test]
async fn failed_population_still_returns_value() {
    let h = harness().await;
    let note = h.create("Rio", "beach").await.unwrap();

    h.cache.fail_writes(true);

    assert_eq!(h.get(note.id).await.unwrap(), note);
    assert!(!h.cache.inner().contains(NOTES.detail(note.id).as_str()));
}

#[tokio::test]
async fn missing_rows_are_not_cached() {
    let h = harness().await;

    assert!(matches!(h.get(404).await, Err(Error::NotFound)));
    assert!(matches!(h.get(404).await, Err(Error::NotFound)));

    assert_eq!(h.fetches(), 2);
    assert!(h.cache.inner().is_empty());
}

#[tokio::test]
async fn undecodable_entry_is_treated_as_miss() {
    let h = harness().await;
    let note = h.create("Rio", "beach").await.unwrap();
    let key = NOTES.detail(note.id);

    h.cache
        .set(key.as_str(), b"not json".to_vec(), Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(h.get(note.id).await.unwrap(), note);
    assert_eq!(h.fetches(), 1);

    // repopulated with a decodable snapshot
    assert_eq!(h.get(note.id).await.unwrap(), note);
    assert_eq!(h.fetches(), 1);
}

#[tokio::test]
async fn entry_is_not_served_after_ttl() {
    let h = harness_with(CachePolicy::default().with_detail_ttl(Duration::from_millis(50))).await;
    let note = h.create("Rio", "beach").await.unwrap();

    h.get(note.id).await.unwrap();
    h.rewrite_unobserved(note.id, "mountain").await;

    // still within ttl, the cached snapshot wins
    assert_eq!(h.get(note.id).await.unwrap().body, "beach");

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(h.get(note.id).await.unwrap().body, "mountain");
    assert_eq!(h.fetches(), 2);
}

#[tokio::test]
async fn list_results_are_cached_per_filter() {
    let h = harness().await;
    h.create("Rio", "beach").await.unwrap();
    h.create("Salvador", "pelourinho").await.unwrap();

    assert_eq!(h.by_city("Rio").await.unwrap().len(), 1);
    assert_eq!(h.by_city("Rio").await.unwrap().len(), 1);
    assert_eq!(h.by_city("Salvador").await.unwrap().len(), 1);

    assert_eq!(h.fetches(), 2);
}

#[tokio::test]
async fn stalled_cache_times_out_to_store() {
    let policy = CachePolicy::default()
        .with_backend_timeout(Duration::from_millis(20))
        .with_retry_backoff(Duration::from_millis(10), Duration::from_millis(20));
    let h = harness_with(policy).await;
    let note = h.create("Rio", "beach").await.unwrap();
    h.get(note.id).await.unwrap();
    h.rewrite_unobserved(note.id, "mountain").await;

    h.cache.hang(true);

    let started = tokio::time::Instant::now();
    assert_eq!(h.get(note.id).await.unwrap().body, "mountain");
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(h.fetches(), 2);
    assert_eq!(h.cache.sets(), 1);

    // the write commits even though its invalidation cannot reach the cache
    assert_eq!(h.rewrite(note.id, "island").await.unwrap().body, "island");
    assert_eq!(h.data_access.pending_invalidations(), 1);

    h.cache.hang(false);
    h.settle(Duration::from_secs(5)).await;

    assert!(!h.cache.inner().contains(NOTES.detail(note.id).as_str()));
    assert_eq!(h.get(note.id).await.unwrap().body, "island");
}
