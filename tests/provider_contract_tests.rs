/// Integration tests checking that every bundled backend honours the provider contract
use selfload::{
    attrs, CacheError, CacheKey, CacheProvider, HeapCacheProvider, Operation, ProviderGuard,
    ShardedCacheProvider,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

struct Document;

fn key(id: u64) -> CacheKey {
    CacheKey::of::<Document>(attrs![id])
}

fn check_contract<P: CacheProvider<String>>(provider: &P) {
    // put then get
    provider
        .put(&key(1), "one".to_string(), Duration::from_secs(60))
        .unwrap();
    let entry = provider.get(&key(1)).unwrap().unwrap();
    assert_eq!(entry.value, "one");
    assert!(!entry.is_expired());

    // zero durations are no-ops
    provider
        .put(&key(2), "two".to_string(), Duration::ZERO)
        .unwrap();
    assert!(provider.get(&key(2)).unwrap().is_none());
    assert!(!provider.touch(&key(1), Duration::ZERO).unwrap());

    // touch on absent and fresh keys
    assert!(provider
        .touch(&key(3), Duration::from_secs(1))
        .unwrap_err()
        .is_requirement());
    assert!(!provider.touch(&key(1), Duration::from_secs(1)).unwrap());

    // touch on an expired key
    provider
        .put(&key(4), "four".to_string(), Duration::from_millis(1))
        .unwrap();
    thread::sleep(Duration::from_millis(10));
    assert!(provider.get(&key(4)).unwrap().unwrap().is_expired());
    assert!(provider.touch(&key(4), Duration::from_secs(60)).unwrap());
    let entry = provider.get(&key(4)).unwrap().unwrap();
    assert_eq!(entry.value, "four");
    assert!(!entry.is_expired());

    // remove and clear
    provider.remove(&key(1)).unwrap();
    provider.remove(&key(1)).unwrap();
    assert!(provider.get(&key(1)).unwrap().is_none());
    provider.clear().unwrap();
    assert!(provider.get(&key(4)).unwrap().is_none());
}

fn check_single_flight<P: CacheProvider<String> + 'static>(provider: Arc<P>) {
    provider
        .put(&key(9), "stale".to_string(), Duration::from_millis(1))
        .unwrap();
    thread::sleep(Duration::from_millis(10));

    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let provider = Arc::clone(&provider);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                provider.touch(&key(9), Duration::from_secs(60)).unwrap()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert!(!provider.get(&key(9)).unwrap().unwrap().is_expired());
}

#[test]
fn test_heap_provider_contract() {
    check_contract(&HeapCacheProvider::new(16));
    check_single_flight(Arc::new(HeapCacheProvider::new(16)));
}

#[test]
fn test_sharded_provider_contract() {
    check_contract(&ShardedCacheProvider::new());
    check_single_flight(Arc::new(ShardedCacheProvider::new()));
}

#[test]
fn test_guarded_provider_contract() {
    check_contract(&ProviderGuard::new(HeapCacheProvider::new(16)));
    check_single_flight(Arc::new(ProviderGuard::new(ShardedCacheProvider::new())));
}

struct ReadOnlyProvider(HeapCacheProvider<String>);

impl CacheProvider<String> for ReadOnlyProvider {
    fn get(&self, key: &CacheKey) -> Result<Option<selfload::CacheEntry<String>>, CacheError> {
        self.0.get(key)
    }

    fn put_entry(
        &self,
        _: &CacheKey,
        _: selfload::CacheEntry<String>,
        _: Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::backend("read-only replica"))
    }

    fn touch(&self, key: &CacheKey, duration: Duration) -> Result<bool, CacheError> {
        self.0.touch(key, duration)
    }

    fn remove(&self, _: &CacheKey) -> Result<(), CacheError> {
        Err(CacheError::backend("read-only replica"))
    }

    fn clear(&self) -> Result<(), CacheError> {
        Err(CacheError::backend("read-only replica"))
    }
}

#[test]
fn test_guard_translates_backend_errors() {
    let guard = ProviderGuard::new(ReadOnlyProvider(HeapCacheProvider::new(16)));

    let err = guard
        .put(&key(1), "one".to_string(), Duration::from_secs(1))
        .unwrap_err();
    assert!(err.is_provider());
    assert_eq!(err.operation(), Some(Operation::Put));
    assert_eq!(
        err.to_string(),
        "cache provider failed during put: backend failure: read-only replica"
    );

    // Requirement violations keep their kind
    assert!(guard
        .touch(&key(1), Duration::from_secs(1))
        .unwrap_err()
        .is_requirement());

    // Zero durations never reach the failing backend
    assert!(guard.put(&key(1), "one".to_string(), Duration::ZERO).is_ok());
}
