/// Integration tests driving a SelfLoadingCache through its public API
use selfload::{
    attrs, AsyncRunner, CacheConfig, CacheContext, CacheKey, CacheProvider, HeapCacheProvider,
    SelfLoadingCache, ShardedCacheProvider,
};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

struct Order;

fn key(id: usize) -> CacheKey {
    CacheKey::of::<Order>(attrs![id])
}

fn config() -> CacheConfig {
    CacheConfig::builder()
        .cache_duration(Duration::from_secs(60))
        .touch_duration(Duration::from_secs(10))
        .build()
        .unwrap()
}

fn with_expired_entry<P: CacheProvider<String>>(backend: &P, id: usize, value: &str) {
    backend
        .put(&key(id), value.to_string(), Duration::from_millis(1))
        .unwrap();
    thread::sleep(Duration::from_millis(10));
}

#[test]
fn test_example_scenario() {
    let config = CacheConfig::builder()
        .cache_duration(Duration::from_millis(100))
        .touch_duration(Duration::from_millis(50))
        .build()
        .unwrap();
    let cache = SelfLoadingCache::with_context(
        "example_scenario",
        HeapCacheProvider::new(16),
        config,
        CacheContext::new(AsyncRunner::new(2).unwrap()),
    );

    let first = cache
        .get(&key(1), |_: &CacheKey| Ok::<_, Infallible>("A".to_string()))
        .unwrap();
    let second = cache
        .get(&key(1), |_: &CacheKey| Ok::<_, Infallible>("B".to_string()))
        .unwrap();

    assert_eq!(first.as_deref(), Some("A"));
    assert_eq!(second.as_deref(), Some("A"));
}

#[test]
fn test_example_scenario_reloads_once_the_duration_passed() {
    let config = CacheConfig::builder()
        .cache_duration(Duration::from_millis(100))
        .touch_duration(Duration::from_millis(50))
        .async_update(false)
        .build()
        .unwrap();
    let cache = SelfLoadingCache::with_context(
        "example_scenario_reload",
        HeapCacheProvider::new(16),
        config,
        CacheContext::new(AsyncRunner::inline()),
    );

    let first = cache
        .get(&key(1), |_: &CacheKey| Ok::<_, Infallible>("A".to_string()))
        .unwrap();
    thread::sleep(Duration::from_millis(150));
    let second = cache
        .get(&key(1), |_: &CacheKey| Ok::<_, Infallible>("B".to_string()))
        .unwrap();

    assert_eq!(first.as_deref(), Some("A"));
    assert_eq!(second.as_deref(), Some("B"));
}

#[test]
fn test_async_refresh_on_the_pool() {
    let backend = Arc::new(HeapCacheProvider::new(16));
    with_expired_entry(&*backend, 1, "old");

    let context = CacheContext::new(AsyncRunner::new(2).unwrap());
    let cache = SelfLoadingCache::with_context(
        "async_refresh_on_the_pool",
        Arc::clone(&backend),
        config(),
        context.clone(),
    );

    let stale = cache
        .get(&key(1), |_: &CacheKey| Ok::<_, Infallible>("new".to_string()))
        .unwrap();
    assert_eq!(stale.as_deref(), Some("old"));

    assert!(context.runner().wait_idle(Duration::from_secs(5)));

    let fresh = cache
        .get(&key(1), |_: &CacheKey| Ok::<_, Infallible>("newer".to_string()))
        .unwrap();
    assert_eq!(fresh.as_deref(), Some("new"));
}

#[test]
fn test_async_insert_on_the_pool() {
    let context = CacheContext::new(AsyncRunner::new(2).unwrap());
    let config = CacheConfig::builder().async_insert(true).build().unwrap();
    let cache = SelfLoadingCache::with_context(
        "async_insert_on_the_pool",
        ShardedCacheProvider::new(),
        config,
        context.clone(),
    );

    let first = cache
        .get(&key(7), |_: &CacheKey| Ok::<_, Infallible>(7))
        .unwrap();
    assert_eq!(first, None);

    assert!(context.runner().wait_idle(Duration::from_secs(5)));
    let second = cache
        .get(&key(7), |_: &CacheKey| Ok::<_, Infallible>(8))
        .unwrap();
    assert_eq!(second, Some(7));
}

#[test]
fn test_sync_refresh_is_single_flight() {
    let backend = Arc::new(HeapCacheProvider::new(16));
    with_expired_entry(&*backend, 1, "old");

    let config = CacheConfig::builder().async_update(false).build().unwrap();
    let cache = Arc::new(SelfLoadingCache::with_context(
        "sync_refresh_single_flight",
        Arc::clone(&backend),
        config,
        CacheContext::new(AsyncRunner::inline()),
    ));
    let loads = Arc::new(AtomicUsize::new(0));

    let threads = 16;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let barrier = Arc::clone(&barrier);
            let loads = Arc::clone(&loads);
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get(&key(1), move |_: &CacheKey| {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok::<_, Infallible>("new".to_string())
                    })
                    .unwrap()
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(
        results.iter().filter(|value| value.as_deref() == Some("new")).count(),
        1
    );
    assert!(results
        .iter()
        .all(|value| matches!(value.as_deref(), Some("new") | Some("old"))));
    assert_eq!(backend.get(&key(1)).unwrap().unwrap().value, "new");
}

#[test]
fn test_capacity_is_respected_through_the_cache() {
    let backend = Arc::new(HeapCacheProvider::new(16));
    let cache = SelfLoadingCache::with_context(
        "capacity_through_the_cache",
        Arc::clone(&backend),
        config(),
        CacheContext::new(AsyncRunner::inline()),
    );

    for id in 0..17 {
        cache
            .get(&key(id), move |_: &CacheKey| Ok::<_, Infallible>(id))
            .unwrap();
    }

    assert_eq!(backend.len(), 16);
    assert!(backend.get(&key(0)).unwrap().is_none());
    assert_eq!(backend.get(&key(16)).unwrap().unwrap().value, 16);
}

#[test]
fn test_nested_caches_keep_the_inner_source_error() {
    let context = CacheContext::new(AsyncRunner::inline());
    let inner = Arc::new(SelfLoadingCache::with_context(
        "nested_inner",
        HeapCacheProvider::new(16),
        config(),
        context.clone(),
    ));
    let outer = SelfLoadingCache::with_context(
        "nested_outer",
        HeapCacheProvider::new(16),
        config(),
        context,
    );

    let err = outer
        .get(&key(1), move |key: &CacheKey| {
            inner
                .get(key, |_: &CacheKey| -> Result<String, &'static str> {
                    Err("warehouse offline")
                })
                .map(|value| value.unwrap_or_default())
        })
        .unwrap_err();

    assert!(err.is_source());
    assert_eq!(
        err.to_string(),
        "data source failed for Order@LATEST[1]: warehouse offline"
    );
}
