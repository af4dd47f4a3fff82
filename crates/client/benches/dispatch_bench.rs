use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::time::Duration;

use client::activity::NoopActivityLogger;
use client::{Cache, Dispatcher, RequestOptions, RetryPolicy, TtlCache};
use common::ServiceResponse;
use store::mock::MockAuth;

fn bench_dispatch(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let cache = Arc::new(TtlCache::new());
    let dispatcher = Dispatcher::new(
        Arc::new(MockAuth::new()),
        cache.clone(),
        Arc::new(NoopActivityLogger),
        RetryPolicy::default(),
    );

    c.bench_function("dispatch_uncached", |b| {
        b.iter(|| {
            let resp: ServiceResponse<u64> = rt.block_on(dispatcher.handle(
                "bench.op",
                RequestOptions::new(),
                || async { Ok(42u64) },
            ));
            assert!(resp.success);
        });
    });

    // warm the entry once, then measure pure hit latency
    let opts = RequestOptions::new().cached("bench:hit", Duration::from_secs(3600));
    let _: ServiceResponse<u64> =
        rt.block_on(dispatcher.handle("bench.op", opts.clone(), || async { Ok(42u64) }));
    c.bench_function("dispatch_cache_hit", |b| {
        b.iter(|| {
            let resp: ServiceResponse<u64> =
                rt.block_on(dispatcher.handle("bench.op", opts.clone(), || async { Ok(42u64) }));
            assert!(resp.success);
        });
    });

    c.bench_function("ttl_cache_put_get", |b| {
        b.iter(|| {
            cache.put("bench:kv", serde_json::json!({"v": 1}), Some(Duration::from_secs(60)));
            let _ = cache.get("bench:kv");
        });
    });
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
