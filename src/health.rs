//! Point-in-time status of a pool

/// Gauges describing a pool at one instant
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{Pool, PoolConfiguration, PoolOptions};
///
/// let options = PoolOptions::new().with_max_capacity(4).with_initial_size(2);
/// let pool = Pool::new(PoolConfiguration::new(|| Ok(0u64), options).unwrap()).unwrap();
///
/// let status = pool.status();
/// assert!(status.is_healthy());
/// assert_eq!(status.idle, 2);
/// assert_eq!(status.capacity, Some(4));
/// ```
#[derive(Debug, Clone)]
pub struct PoolStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Idle resources
    pub idle: usize,

    /// Borrowed resources, including ones being created or validated
    pub borrowed: usize,

    /// Idle plus borrowed
    pub live: usize,

    /// Capacity limit, `None` when unbounded
    pub capacity: Option<usize>,

    /// Borrowed share of capacity (0.0 to 1.0), 0.0 when unbounded
    pub utilization: f64,

    pub closed: bool,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl PoolStatus {
    pub(crate) fn new(idle: usize, borrowed: usize, capacity: Option<usize>, closed: bool) -> Self {
        let utilization = match capacity {
            Some(capacity) if capacity > 0 => borrowed as f64 / capacity as f64,
            _ => 0.0,
        };

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if closed {
            warnings.push("Pool is closed".to_string());
            is_healthy = false;
        }

        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if idle == 0 && capacity.is_some_and(|capacity| borrowed >= capacity) {
            warnings.push("Pool is exhausted".to_string());
        }

        Self {
            is_healthy,
            idle,
            borrowed,
            live: idle + borrowed,
            capacity,
            utilization,
            closed,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
