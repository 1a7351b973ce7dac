// EsoxSolutions.ResourcePool
// Bounded, thread-safe resource pool

// This is just a binary wrapper - the actual library is in lib.rs
// Run the demo with: cargo run --example basic

use esox_resourcepool::{Pool, PoolConfiguration, PoolOptions};

fn main() {
    println!("=== EsoxSolutions.ResourcePool ===");
    println!("See demos/ directory for usage examples");
    println!("Run: cargo run --example basic");
    println!();

    println!("Quick Demo:");
    let options = PoolOptions::new().with_max_capacity(3).with_name("demo");
    let pool = match PoolConfiguration::new(|| Ok(String::from("connection")), options)
        .and_then(Pool::new)
    {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("  Could not build pool: {}", err);
            return;
        }
    };

    if let Ok(conn) = pool.lease() {
        println!("  Got resource: {}", *conn);
    }

    println!("  Idle after return: {}", pool.idle_count());
    pool.close();
}
