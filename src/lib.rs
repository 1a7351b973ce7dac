//! # EsoxSolutions.ResourcePool
//!
//! Bounded, thread-safe pool for resources that are expensive to create,
//! such as network or database connections.
//!
//! ## Features
//!
//! - Lazy or eager creation up to a capacity limit
//! - Blocking acquire with an optional deadline, plus async wrappers
//! - Validation when a resource is borrowed and when it is returned
//! - Idle-count and idle-time limits
//! - FIFO or LIFO reuse order
//! - Close and drain for orderly shutdown
//! - Live counters with Prometheus export
//! - Automatic release via RAII (`PooledObject`)
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_resourcepool::{Pool, PoolConfiguration, PoolOptions};
//!
//! let options = PoolOptions::new().with_max_capacity(4);
//! let config = PoolConfiguration::new(|| Ok(String::from("connection")), options).unwrap();
//! let pool = Pool::new(config).unwrap();
//!
//! {
//!     let conn = pool.lease().unwrap();
//!     println!("Got: {}", *conn);
//!     // Returned to the pool when `conn` goes out of scope
//! }
//!
//! let entry = pool.acquire().unwrap();
//! pool.release(entry).unwrap();
//! ```

mod config;
mod entry;
mod errors;
mod eviction;
mod health;
mod metrics;
mod pool;

pub use config::{PoolConfiguration, PoolOptions};
pub use entry::Entry;
pub use errors::{BoxError, PoolError, PoolResult};
pub use eviction::{EvictionReason, OrderPolicy};
pub use health::PoolStatus;
pub use metrics::{Counters, MetricsExporter, Stat};
pub use pool::{Pool, PooledObject};
