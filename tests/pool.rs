use esox_resourcepool::{
    BoxError, OrderPolicy, Pool, PoolConfiguration, PoolError, PoolOptions, Stat,
};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Debug)]
struct Resource;

fn object_pool(options: PoolOptions) -> Pool<Resource> {
    let config = PoolConfiguration::new(|| Ok(Resource), options).unwrap();
    Pool::new(config).unwrap()
}

fn sequence() -> impl Fn() -> Result<u32, BoxError> + Send + Sync + 'static {
    let next = AtomicU32::new(0);
    move || Ok(next.fetch_add(1, Ordering::SeqCst))
}

fn sleep_and_release<T: Send + 'static>(
    pool: &Pool<T>,
    entry: esox_resourcepool::Entry<T>,
) -> thread::JoinHandle<()> {
    let pool = pool.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        pool.release(entry).unwrap();
    })
}

#[test]
fn test_acquire_release_counts() {
    let pool = object_pool(PoolOptions::new());

    let entry = pool.acquire().unwrap();
    pool.release(entry).unwrap();

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 1);
    assert_eq!(counts.get(Stat::Borrows), 1);
    assert_eq!(counts.get(Stat::Releases), 1);
    assert_eq!(counts.get(Stat::MaxSize), 1);
    pool.close();
}

#[test]
fn test_initial_size() {
    let initial_size = 10;
    let pool = object_pool(PoolOptions::new().with_initial_size(initial_size));

    let entry = pool.acquire().unwrap();
    pool.release(entry).unwrap();

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 10);
    assert_eq!(counts.get(Stat::Borrows), 1);
    assert_eq!(counts.get(Stat::Releases), 1);
    assert_eq!(counts.get(Stat::MaxSize), 10);

    let entries: Vec<_> = (0..initial_size + 1)
        .map(|_| pool.acquire().unwrap())
        .collect();
    for entry in entries {
        pool.release(entry).unwrap();
    }

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 11);
    assert_eq!(counts.get(Stat::Borrows), 12);
    assert_eq!(counts.get(Stat::Releases), 12);
    assert_eq!(counts.get(Stat::MaxSize), 11);
    pool.close();
}

#[test]
fn test_max_capacity_exhausts() {
    let pool = object_pool(
        PoolOptions::new()
            .with_max_capacity(10)
            .with_max_wait(Duration::from_millis(1)),
    );

    let held: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
    assert!(matches!(pool.acquire(), Err(PoolError::Exhausted(_))));
    assert_eq!(held.len(), 10);
    assert_eq!(pool.counts().get(Stat::MaxSize), 10);
}

#[test]
fn test_suspend_until_release() {
    let pool = object_pool(PoolOptions::new().with_max_capacity(1));

    let lease = pool.acquire().unwrap();
    let releaser = sleep_and_release(&pool, lease);

    let entry = pool.acquire().unwrap();
    releaser.join().unwrap();

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 1);
    assert_eq!(counts.get(Stat::Borrows), 2);
    assert_eq!(counts.get(Stat::Releases), 1);
    assert_eq!(counts.get(Stat::MaxSize), 1);
    assert_eq!(counts.get(Stat::Suspends), 1);

    pool.release(entry).unwrap();
}

#[test]
fn test_evict_wakes_waiter() {
    let pool = Pool::new(
        PoolConfiguration::new(sequence(), PoolOptions::new().with_max_capacity(1)).unwrap(),
    )
    .unwrap();
    let held = pool.acquire().unwrap();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire_timeout(Duration::from_secs(5)))
    };
    thread::sleep(Duration::from_millis(50));
    pool.evict(held).unwrap();

    let entry = waiter.join().unwrap().unwrap();
    assert_eq!(*entry.value(), 1);

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 2);
    assert_eq!(counts.get(Stat::Destroys), 1);
    assert_eq!(counts.get(Stat::Releases), 0);
    assert!(counts.get(Stat::Suspends) >= 1);
    pool.release(entry).unwrap();
}

#[test]
fn test_rejected_release_wakes_waiter() {
    let config = PoolConfiguration::new(sequence(), PoolOptions::new().with_max_capacity(1))
        .unwrap()
        .with_on_release(|value| *value != 0);
    let pool = Pool::new(config).unwrap();
    let held = pool.acquire().unwrap();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire_timeout(Duration::from_secs(5)))
    };
    thread::sleep(Duration::from_millis(50));
    pool.release(held).unwrap();

    let entry = waiter.join().unwrap().unwrap();
    assert_eq!(*entry.value(), 1);

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 2);
    assert_eq!(counts.get(Stat::InvalidOnRelease), 1);
    assert_eq!(counts.get(Stat::Destroys), 1);
    assert!(counts.get(Stat::Suspends) >= 1);
    pool.release(entry).unwrap();
}

#[test]
fn test_max_idle() {
    let max_idle = 5;
    let borrows = 7;
    let destroys = Arc::new(AtomicUsize::new(0));
    let destroys_clone = Arc::clone(&destroys);

    let config = PoolConfiguration::new(|| Ok(Resource), PoolOptions::new().with_max_idle(max_idle))
        .unwrap()
        .with_destroy(move |_| {
            destroys_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    let pool = Pool::new(config).unwrap();

    let entries: Vec<_> = (0..borrows).map(|_| pool.acquire().unwrap()).collect();
    for entry in entries {
        pool.release(entry).unwrap();
    }

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 7);
    assert_eq!(counts.get(Stat::Borrows), 7);
    assert_eq!(counts.get(Stat::Releases), 7);
    assert_eq!(counts.get(Stat::MaxSize), 7);
    assert_eq!(counts.get(Stat::Destroys), 2);
    assert_eq!(destroys.load(Ordering::SeqCst), 2);
    assert_eq!(pool.idle_count(), max_idle);
}

#[test]
fn test_on_borrow_rejects_even_values() {
    let config = PoolConfiguration::new(sequence(), PoolOptions::new())
        .unwrap()
        .with_on_borrow(|value| value & 1 != 0);
    let pool = Pool::new(config).unwrap();

    let entries: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
    assert!(entries.iter().all(|entry| entry.value() & 1 != 0));

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 20);
    assert_eq!(counts.get(Stat::Borrows), 10);
    assert_eq!(counts.get(Stat::Destroys), 10);
    assert_eq!(counts.get(Stat::InvalidOnBorrow), 10);
}

#[test]
fn test_on_borrow_rejects_idle_entry() {
    let stale = Arc::new(AtomicU32::new(u32::MAX));
    let destroyed = Arc::new(Mutex::new(Vec::new()));
    let (stale_check, destroyed_log) = (Arc::clone(&stale), Arc::clone(&destroyed));

    let config = PoolConfiguration::new(sequence(), PoolOptions::new())
        .unwrap()
        .with_on_borrow(move |value| *value != stale_check.load(Ordering::SeqCst))
        .with_destroy(move |value| {
            destroyed_log.lock().unwrap().push(value);
            Ok(())
        });
    let pool = Pool::new(config).unwrap();

    let entry = pool.acquire().unwrap();
    assert_eq!(*entry.value(), 0);
    pool.release(entry).unwrap();
    assert_eq!(pool.idle_count(), 1);

    stale.store(0, Ordering::SeqCst);
    let entry = pool.acquire().unwrap();
    assert_eq!(*entry.value(), 1);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(*destroyed.lock().unwrap(), vec![0]);

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 2);
    assert_eq!(counts.get(Stat::Borrows), 2);
    assert_eq!(counts.get(Stat::Releases), 1);
    assert_eq!(counts.get(Stat::Destroys), 1);
    assert_eq!(counts.get(Stat::InvalidOnBorrow), 1);

    pool.release(entry).unwrap();
}

#[test]
fn test_on_release_rejects() {
    let config = PoolConfiguration::new(|| Ok(Resource), PoolOptions::new())
        .unwrap()
        .with_on_release(|_| false);
    let pool = Pool::new(config).unwrap();

    let lease = pool.acquire().unwrap();
    pool.release(lease).unwrap();
    let _lease = pool.acquire().unwrap();

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 2);
    assert_eq!(counts.get(Stat::Borrows), 2);
    assert_eq!(counts.get(Stat::Releases), 1);
    assert_eq!(counts.get(Stat::Destroys), 1);
    assert_eq!(counts.get(Stat::InvalidOnRelease), 1);
}

fn first_reused(order: OrderPolicy) -> u32 {
    let config = PoolConfiguration::new(sequence(), PoolOptions::new().with_order(order)).unwrap();
    let pool = Pool::new(config).unwrap();

    let leases: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
    for lease in leases {
        pool.release(lease).unwrap();
    }

    let entry = pool.acquire().unwrap();
    *entry.value()
}

#[test]
fn test_fifo() {
    assert_eq!(first_reused(OrderPolicy::Fifo), 0);
}

#[test]
fn test_lifo() {
    assert_eq!(first_reused(OrderPolicy::Lifo), 9);
}

#[test]
fn test_max_idle_time() {
    let pool = object_pool(PoolOptions::new().with_max_idle_time(Duration::from_millis(10)));

    let entry = pool.acquire().unwrap();
    pool.release(entry).unwrap();
    thread::sleep(Duration::from_millis(100));
    let entry = pool.acquire().unwrap();
    pool.release(entry).unwrap();

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Allocations), 2);
    assert_eq!(counts.get(Stat::Borrows), 2);
    assert_eq!(counts.get(Stat::Releases), 2);
    assert_eq!(counts.get(Stat::MaxSize), 1);
    assert_eq!(counts.get(Stat::IdleTimeExceeded), 1);
    assert_eq!(counts.get(Stat::Destroys), 1);
}

#[test]
fn test_await_after_close() {
    let pool = object_pool(PoolOptions::new());
    pool.close();
    pool.await_drained();
}

#[test]
fn test_await_with_borrow() {
    let pool = object_pool(PoolOptions::new());

    let borrow = pool.acquire().unwrap();
    pool.close();
    assert!(!pool.await_drained_timeout(Duration::from_millis(1)));

    pool.release(borrow).unwrap();
    assert!(pool.await_drained_timeout(Duration::from_millis(1)));
}

#[test]
fn test_acquire_after_close() {
    let pool = object_pool(PoolOptions::new());

    let leases: Vec<_> = (0..10).map(|_| pool.acquire().unwrap()).collect();
    let releasers: Vec<_> = leases
        .into_iter()
        .map(|lease| sleep_and_release(&pool, lease))
        .collect();

    pool.close();
    assert!(matches!(pool.acquire(), Err(PoolError::Closed)));

    for releaser in releasers {
        releaser.join().unwrap();
    }
    assert!(pool.await_drained_timeout(Duration::from_secs(1)));
    assert_eq!(pool.counts().get(Stat::Destroys), 10);
}

#[test]
fn test_close_wakes_waiters() {
    let pool = object_pool(PoolOptions::new().with_max_capacity(1));
    let held = pool.acquire().unwrap();

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire().map(|entry| entry.id()))
    };

    thread::sleep(Duration::from_millis(50));
    pool.close();

    assert!(matches!(waiter.join().unwrap(), Err(PoolError::Closed)));
    pool.release(held).unwrap();
    assert!(pool.await_drained_timeout(Duration::from_millis(10)));
}

#[test]
fn test_entry_age() {
    let pool = object_pool(PoolOptions::new());

    let entry = pool.acquire().unwrap();
    pool.release(entry).unwrap();
    thread::sleep(Duration::from_millis(20));

    let entry = pool.acquire().unwrap();
    assert!(entry.age() >= Duration::from_millis(20));
    pool.evict(entry).unwrap();

    let counts = pool.counts();
    assert_eq!(counts.get(Stat::Destroys), 1);
    assert_eq!(counts.get(Stat::Releases), 1);
}

#[test]
fn test_invalid_configuration() {
    let options = PoolOptions::new().with_max_capacity(3).with_initial_size(4);
    let result = PoolConfiguration::new(|| Ok(Resource), options);
    assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
}
