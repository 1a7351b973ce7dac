//! Pool configuration options

use crate::errors::{BoxError, PoolError, PoolResult};
use crate::eviction::OrderPolicy;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub(crate) type CreateFn<T> = Arc<dyn Fn() -> Result<T, BoxError> + Send + Sync>;
pub(crate) type DestroyFn<T> = Arc<dyn Fn(T) -> Result<(), BoxError> + Send + Sync>;
pub(crate) type ValidateFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Policy parameters for a pool
///
/// A zero for any limit means "no limit". Options are plain data; they are
/// checked for consistency by [`PoolConfiguration::new`].
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{OrderPolicy, PoolOptions};
/// use std::time::Duration;
///
/// let options = PoolOptions::new()
///     .with_max_capacity(20)
///     .with_max_idle(5)
///     .with_max_wait(Duration::from_secs(2))
///     .with_order(OrderPolicy::Lifo)
///     .with_name("orders-db");
///
/// assert_eq!(options.max_capacity, 20);
/// assert_eq!(options.initial_size, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolOptions {
    /// Maximum number of live resources (idle + borrowed), 0 = unbounded
    pub max_capacity: usize,

    /// Maximum number of idle resources kept for reuse, 0 = unbounded
    pub max_idle: usize,

    /// Resources created eagerly when the pool is built
    pub initial_size: usize,

    /// How long `acquire` blocks when the pool is exhausted, zero = forever
    pub max_wait: Duration,

    /// Idle resources older than this are destroyed on acquire, zero = never
    pub max_idle_time: Duration,

    /// Order in which idle resources are reused
    pub order: OrderPolicy,

    /// Diagnostic label used in logs and metrics
    pub name: String,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_capacity: 0,
            max_idle: 0,
            initial_size: 0,
            max_wait: Duration::ZERO,
            max_idle_time: Duration::ZERO,
            order: OrderPolicy::default(),
            name: String::new(),
        }
    }
}

impl PoolOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of live resources
    pub fn with_max_capacity(mut self, capacity: usize) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Set the maximum number of idle resources
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Set the number of resources created up front
    pub fn with_initial_size(mut self, size: usize) -> Self {
        self.initial_size = size;
        self
    }

    /// Set how long an exhausted acquire may block
    pub fn with_max_wait(mut self, wait: Duration) -> Self {
        self.max_wait = wait;
        self
    }

    /// Set how long a resource may sit idle before it is discarded
    pub fn with_max_idle_time(mut self, idle_time: Duration) -> Self {
        self.max_idle_time = idle_time;
        self
    }

    pub fn with_order(mut self, order: OrderPolicy) -> Self {
        self.order = order;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Check the options for contradictory limits
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_capacity > 0 && self.initial_size > self.max_capacity {
            return Err(PoolError::invalid(format!(
                "initial_size ({}) must not exceed max_capacity ({})",
                self.initial_size, self.max_capacity
            )));
        }
        if self.max_idle > 0 && self.initial_size > self.max_idle {
            return Err(PoolError::invalid(format!(
                "initial_size ({}) must not exceed max_idle ({})",
                self.initial_size, self.max_idle
            )));
        }
        if self.max_capacity > 0 && self.max_idle > self.max_capacity {
            return Err(PoolError::invalid(format!(
                "max_idle ({}) must not exceed max_capacity ({})",
                self.max_idle, self.max_capacity
            )));
        }
        Ok(())
    }
}

/// Validated options plus the callbacks that manage the pooled resource
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{PoolConfiguration, PoolOptions};
///
/// let config = PoolConfiguration::new(|| Ok(Vec::<u8>::with_capacity(1024)), PoolOptions::new())
///     .unwrap()
///     .with_on_release(|buf: &Vec<u8>| buf.capacity() <= 4096);
///
/// assert_eq!(config.options().max_capacity, 0);
///
/// let invalid = PoolOptions::new().with_max_capacity(2).with_initial_size(3);
/// assert!(PoolConfiguration::new(|| Ok(0u8), invalid).is_err());
/// ```
pub struct PoolConfiguration<T> {
    pub(crate) options: PoolOptions,
    pub(crate) create: CreateFn<T>,
    pub(crate) destroy: Option<DestroyFn<T>>,
    pub(crate) on_borrow: Option<ValidateFn<T>>,
    pub(crate) on_release: Option<ValidateFn<T>>,
}

impl<T> PoolConfiguration<T> {
    /// Validate `options` and pair them with the create callback
    pub fn new<F>(create: F, options: PoolOptions) -> PoolResult<Self>
    where
        F: Fn() -> Result<T, BoxError> + Send + Sync + 'static,
    {
        options.validate()?;
        Ok(Self {
            options,
            create: Arc::new(create),
            destroy: None,
            on_borrow: None,
            on_release: None,
        })
    }

    /// Set the teardown callback
    ///
    /// Errors it returns are logged and otherwise ignored.
    pub fn with_destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(T) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.destroy = Some(Arc::new(destroy));
        self
    }

    /// Validate resources before they are handed out
    pub fn with_on_borrow<F>(mut self, validate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.on_borrow = Some(Arc::new(validate));
        self
    }

    /// Validate resources when they are returned
    pub fn with_on_release<F>(mut self, validate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.on_release = Some(Arc::new(validate));
        self
    }

    pub fn options(&self) -> &PoolOptions {
        &self.options
    }
}

impl<T> fmt::Debug for PoolConfiguration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfiguration")
            .field("options", &self.options)
            .field("destroy", &self.destroy.is_some())
            .field("on_borrow", &self.on_borrow.is_some())
            .field("on_release", &self.on_release.is_some())
            .finish()
    }
}
