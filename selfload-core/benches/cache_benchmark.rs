use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use selfload_core::{
    attrs, AsyncRunner, CacheConfig, CacheContext, CacheKey, CacheProvider, HeapCacheProvider,
    SelfLoadingCache, ShardedCacheProvider,
};
use std::convert::Infallible;
use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

struct Item;

const TTL: Duration = Duration::from_secs(600);

fn key(id: usize) -> CacheKey {
    CacheKey::of::<Item>(attrs![id])
}

fn inline_cache(name: &str, capacity: usize) -> SelfLoadingCache<usize> {
    SelfLoadingCache::with_context(
        name,
        HeapCacheProvider::new(capacity),
        CacheConfig::default(),
        CacheContext::new(AsyncRunner::inline()),
    )
}

fn bench_provider_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("provider_put");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("heap", size), size, |b, &size| {
            b.iter(|| {
                let provider = HeapCacheProvider::new(size);
                for i in 0..size {
                    provider.put(&key(i), black_box(i), TTL).unwrap();
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("sharded", size), size, |b, &size| {
            b.iter(|| {
                let provider = ShardedCacheProvider::new();
                for i in 0..size {
                    provider.put(&key(i), black_box(i), TTL).unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_cache_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_hits");

    for size in [10, 100, 1000].iter() {
        let cache = inline_cache("bench_cache_hits", *size);
        let keys: Vec<_> = (0..*size).map(key).collect();
        for (i, key) in keys.iter().enumerate() {
            cache.get(key, move |_: &CacheKey| Ok::<_, Infallible>(i)).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &keys, |b, keys| {
            b.iter(|| {
                for key in keys {
                    black_box(cache.get(key, |_: &CacheKey| Ok::<_, Infallible>(0)).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_concurrent_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_reads");

    let heap = Arc::new(HeapCacheProvider::new(128));
    let sharded = Arc::new(ShardedCacheProvider::new());
    for i in 0..100 {
        heap.put(&key(i), i, TTL).unwrap();
        sharded.put(&key(i), i, TTL).unwrap();
    }

    for num_threads in [2, 4, 8].iter() {
        group.bench_with_input(
            BenchmarkId::new("heap", num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| read_concurrently(Arc::clone(&heap), num_threads));
            },
        );

        group.bench_with_input(
            BenchmarkId::new("sharded", num_threads),
            num_threads,
            |b, &num_threads| {
                b.iter(|| read_concurrently(Arc::clone(&sharded), num_threads));
            },
        );
    }

    group.finish();
}

fn read_concurrently<P>(provider: Arc<P>, num_threads: usize)
where
    P: CacheProvider<usize> + 'static,
{
    let handles: Vec<_> = (0..num_threads)
        .map(|_| {
            let provider = Arc::clone(&provider);
            thread::spawn(move || {
                for i in 0..100 {
                    black_box(provider.get(&key(i)).unwrap());
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("eviction");

    group.bench_function("lru_eviction", |b| {
        b.iter(|| {
            let provider = HeapCacheProvider::new(50);
            // Insert 100 items in a provider bounded to 50
            for i in 0..100 {
                provider.put(&key(i), black_box(i), TTL).unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_provider_put,
    bench_cache_hits,
    bench_concurrent_reads,
    bench_eviction
);
criterion_main!(benches);
