//! Basic usage examples for the resource pool

use esox_resourcepool::{
    MetricsExporter, OrderPolicy, Pool, PoolConfiguration, PoolError, PoolOptions, Stat,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Connection {
    id: usize,
    healthy: bool,
}

fn connection_pool(options: PoolOptions) -> Result<Pool<Connection>, PoolError> {
    let next_id = AtomicUsize::new(1);
    let config = PoolConfiguration::new(
        move || {
            Ok(Connection {
                id: next_id.fetch_add(1, Ordering::Relaxed),
                healthy: true,
            })
        },
        options,
    )?
    .with_destroy(|conn| {
        println!("   closing connection {}", conn.id);
        Ok(())
    })
    .with_on_borrow(|conn| conn.healthy);

    Pool::new(config)
}

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== EsoxSolutions.ResourcePool - Basic Examples ===\n");

    // Example 1: Acquire and release
    acquire_release()?;

    // Example 2: RAII leases
    leases()?;

    // Example 3: Waiting on an exhausted pool
    exhaustion()?;

    // Example 4: Shutdown and metrics
    shutdown()?;

    Ok(())
}

fn acquire_release() -> Result<(), PoolError> {
    println!("1. Acquire and release:");
    let pool = connection_pool(PoolOptions::new().with_initial_size(2).with_name("db"))?;

    let entry = pool.acquire()?;
    println!("   Got connection {} (age {:?})", entry.value().id, entry.age());
    pool.release(entry)?;

    println!("   Idle after return: {}\n", pool.idle_count());
    Ok(())
}

fn leases() -> Result<(), PoolError> {
    println!("2. Leases:");
    let pool = connection_pool(PoolOptions::new().with_order(OrderPolicy::Lifo))?;

    {
        let mut conn = pool.lease()?;
        println!("   Leased connection {}", conn.id);

        // The connection broke while in use; evict instead of returning it
        conn.healthy = false;
        conn.evict()?;
    }

    {
        let conn = pool.lease()?;
        println!("   Leased connection {}", conn.id);
    }

    println!("   Destroyed so far: {}\n", pool.counts().get(Stat::Destroys));
    Ok(())
}

fn exhaustion() -> Result<(), PoolError> {
    println!("3. Exhaustion:");
    let pool = connection_pool(
        PoolOptions::new()
            .with_max_capacity(1)
            .with_max_wait(Duration::from_millis(50)),
    )?;

    let held = pool.acquire()?;
    match pool.acquire() {
        Err(PoolError::Exhausted(wait)) => println!("   Gave up after {:?}", wait),
        other => println!("   Unexpected: {:?}", other.map(|entry| entry.id())),
    }

    let releaser = pool.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        releaser.release(held)
    });

    let entry = pool.acquire_timeout(Duration::from_secs(1))?;
    println!("   Got connection {} after waiting", entry.value().id);
    pool.release(entry)?;

    if let Ok(result) = handle.join() {
        result?;
    }
    println!("   Suspends: {}\n", pool.counts().get(Stat::Suspends));
    Ok(())
}

fn shutdown() -> Result<(), PoolError> {
    println!("4. Shutdown and metrics:");
    let pool = connection_pool(PoolOptions::new().with_name("orders"))?;

    let entry = pool.acquire()?;
    pool.close();
    println!("   Drained while borrowed: {}", pool.await_drained_timeout(Duration::from_millis(1)));

    pool.release(entry)?;
    println!("   Drained after release: {}", pool.await_drained_timeout(Duration::from_millis(1)));

    let counts = pool.counts();
    for (stat, value) in counts.iter() {
        println!("     {}: {}", stat, value);
    }
    print!("{}", MetricsExporter::export_prometheus(&counts, counts.name(), None));
    Ok(())
}
