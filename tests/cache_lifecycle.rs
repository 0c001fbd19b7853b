use std::convert::Infallible;

use bytes::Bytes;
use time::{Duration, OffsetDateTime, macros::datetime};
use vitrine::cache::{
    CacheConfig, CacheEntry, CacheError, EntryId, EntryState, FetchOptions, FreshnessTier,
    Regeneration, RevalidateWindow, RevalidationCache, TagIndex, classify, effective_window,
};

const T0: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);

fn window(secs: u64) -> RevalidateWindow {
    RevalidateWindow::from_secs(secs).expect("non-zero window")
}

#[test]
fn entry_walks_through_every_state() {
    let index = TagIndex::new();
    index.register(CacheEntry::new("/apps/uniswap", ["a", "b"], window(60), T0));

    let at = |secs: i64| index.state("/apps/uniswap", T0 + Duration::seconds(secs));
    assert_eq!(at(0), Some(EntryState::Fresh));
    assert_eq!(at(29), Some(EntryState::Fresh));
    assert_eq!(at(30), Some(EntryState::Aging));
    assert_eq!(at(40), Some(EntryState::Aging));
    assert_eq!(at(60), Some(EntryState::Stale));

    assert_eq!(index.invalidate_by_tag("a"), 1);
    assert_eq!(at(1), Some(EntryState::Invalidated));

    // Re-registration clears the mark.
    let later = T0 + Duration::seconds(45);
    index.register(CacheEntry::new("/apps/uniswap", ["a", "b"], window(60), later));
    assert_eq!(index.state("/apps/uniswap", later), Some(EntryState::Fresh));
}

#[test]
fn classification_boundaries() {
    assert_eq!(classify(0.0, 60.0), Ok(FreshnessTier::Fresh));
    assert_eq!(classify(29.999, 60.0), Ok(FreshnessTier::Fresh));
    assert_eq!(classify(30.0, 60.0), Ok(FreshnessTier::Aging));
    assert_eq!(classify(59.999, 60.0), Ok(FreshnessTier::Aging));
    assert_eq!(classify(60.0, 60.0), Ok(FreshnessTier::Stale));
    assert!(matches!(
        classify(10.0, 0.0),
        Err(CacheError::InvalidConfiguration(_))
    ));
}

#[test]
fn unknown_targets() {
    let index = TagIndex::new();
    index.register(CacheEntry::new("/", ["featured"], window(30), T0));

    assert_eq!(index.invalidate_by_tag("nobody-uses-this"), 0);
    assert!(matches!(
        index.invalidate_by_path("/missing"),
        Err(CacheError::NotFound(_))
    ));
    assert_eq!(index.state("/", T0), Some(EntryState::Fresh));
}

#[test]
fn lowest_window_wins() {
    let windows = [window(60), window(30), window(3600)];
    assert_eq!(effective_window(windows), Some(window(30)));
    assert_eq!(effective_window(std::iter::empty()), None);
}

#[tokio::test]
async fn invalidated_entry_regenerates_on_next_access() {
    let cache = RevalidationCache::new(&CacheConfig::default());
    let id = EntryId::from("/apps/uniswap");
    let options = FetchOptions::new(window(60)).with_tags(["a", "b"]);

    let first = cache
        .get_or_regenerate_at(&id, &options, T0, |reason| async move {
            assert_eq!(reason, Regeneration::Missing);
            Ok::<_, Infallible>(Bytes::from_static(b"v1"))
        })
        .await
        .expect("first render");
    assert!(!first.from_cache);

    let later = T0 + Duration::seconds(40);
    let cached = cache
        .get_or_regenerate_at(&id, &options, later, |_| async {
            Ok::<_, Infallible>(Bytes::from_static(b"unused"))
        })
        .await
        .expect("aging hit");
    assert!(cached.from_cache);
    assert_eq!(cached.entry.state_at(later), EntryState::Aging);

    assert_eq!(cache.index().invalidate_by_tag("a"), 1);
    assert_eq!(
        cache.index().state(id.as_str(), later),
        Some(EntryState::Invalidated)
    );

    let regenerated = cache
        .get_or_regenerate_at(&id, &options, later, |reason| async move {
            assert_eq!(reason, Regeneration::Invalidated);
            Ok::<_, Infallible>(Bytes::from_static(b"v2"))
        })
        .await
        .expect("regenerated");
    assert!(!regenerated.from_cache);
    assert_eq!(regenerated.body, Bytes::from_static(b"v2"));
    assert_eq!(regenerated.entry.state_at(later), EntryState::Fresh);
}

#[tokio::test]
async fn invalidation_racing_a_regeneration_is_not_lost() {
    let cache = RevalidationCache::new(&CacheConfig::default());
    let id = EntryId::from("/apps/uniswap");
    let options = FetchOptions::new(window(60)).with_tags(["a", "b"]);
    let index = cache.index();
    let tags: &TagIndex = &index;

    cache
        .get_or_regenerate_at(&id, &options, T0, |_| async {
            Ok::<_, Infallible>(Bytes::from_static(b"v1"))
        })
        .await
        .expect("first render");
    assert_eq!(tags.invalidate_by_tag("b"), 1);

    let later = T0 + Duration::seconds(10);
    let regenerated = cache
        .get_or_regenerate_at(&id, &options, later, move |reason| async move {
            assert_eq!(reason, Regeneration::Invalidated);
            // An editor invalidates again while the old content is being read.
            assert_eq!(tags.invalidate_by_tag("a"), 1);
            Ok::<_, Infallible>(Bytes::from_static(b"v2"))
        })
        .await
        .expect("regenerated");
    assert!(!regenerated.from_cache);
    assert_eq!(
        cache.index().state(id.as_str(), later),
        Some(EntryState::Invalidated)
    );

    let settled = cache
        .get_or_regenerate_at(&id, &options, later, |reason| async move {
            assert_eq!(reason, Regeneration::Invalidated);
            Ok::<_, Infallible>(Bytes::from_static(b"v3"))
        })
        .await
        .expect("regenerated again");
    assert_eq!(settled.body, Bytes::from_static(b"v3"));
    assert_eq!(
        cache.index().state(id.as_str(), later),
        Some(EntryState::Fresh)
    );
}
