use criterion::{Criterion, black_box, criterion_group, criterion_main};
use esox_resourcepool::{OrderPolicy, Pool, PoolConfiguration, PoolOptions};
use std::thread;

fn buffer_pool(order: OrderPolicy) -> Pool<Vec<u8>> {
    let options = PoolOptions::new()
        .with_max_capacity(64)
        .with_initial_size(16)
        .with_order(order);
    let config = PoolConfiguration::new(|| Ok(vec![0u8; 4096]), options).unwrap();
    Pool::new(config).unwrap()
}

fn bench_single_thread(c: &mut Criterion) {
    let fifo = buffer_pool(OrderPolicy::Fifo);
    c.bench_function("acquire_release_fifo", |b| {
        b.iter(|| {
            let entry = fifo.acquire().unwrap();
            black_box(entry.value().len());
            fifo.release(entry).unwrap();
        })
    });

    let lifo = buffer_pool(OrderPolicy::Lifo);
    c.bench_function("lease_lifo", |b| {
        b.iter(|| {
            let buf = lifo.lease().unwrap();
            black_box(buf.len());
        })
    });
}

fn bench_contended(c: &mut Criterion) {
    let pool = buffer_pool(OrderPolicy::Lifo);
    c.bench_function("acquire_release_4_threads", |b| {
        b.iter(|| {
            thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        for _ in 0..100 {
                            let buf = pool.lease().unwrap();
                            black_box(buf.len());
                        }
                    });
                }
            });
        })
    });
}

criterion_group!(benches, bench_single_thread, bench_contended);
criterion_main!(benches);
