//! Idle-set ordering and eviction rules

use crate::entry::Entry;
use crate::metrics::{CounterSet, Stat};
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order in which idle resources are handed out again
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{OrderPolicy, PoolOptions};
///
/// let options = PoolOptions::new().with_order(OrderPolicy::Lifo);
/// assert_eq!(options.order, OrderPolicy::Lifo);
/// assert_eq!(OrderPolicy::default(), OrderPolicy::Fifo);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OrderPolicy {
    /// Oldest-returned resource first
    #[default]
    Fifo,

    /// Most-recently-returned resource first
    Lifo,
}

/// Why a resource was destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionReason {
    /// Sat idle for at least `max_idle_time`
    IdleTimeExceeded,

    /// Rejected by the borrow validator
    InvalidOnBorrow,

    /// Rejected by the release validator
    InvalidOnRelease,

    /// Returned while the idle set was full
    MaxIdleExceeded,

    /// Declared unusable by the caller
    Evicted,

    /// Idle or returned after the pool closed
    Closed,
}

impl EvictionReason {
    /// Record the destruction in `counters`
    pub(crate) fn record(self, counters: &mut CounterSet) {
        counters.incr(Stat::Destroys);
        match self {
            EvictionReason::IdleTimeExceeded => counters.incr(Stat::IdleTimeExceeded),
            EvictionReason::InvalidOnBorrow => counters.incr(Stat::InvalidOnBorrow),
            EvictionReason::InvalidOnRelease => counters.incr(Stat::InvalidOnRelease),
            EvictionReason::MaxIdleExceeded
            | EvictionReason::Evicted
            | EvictionReason::Closed => {}
        }
    }
}

impl fmt::Display for EvictionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            EvictionReason::IdleTimeExceeded => "idle time exceeded",
            EvictionReason::InvalidOnBorrow => "invalid on borrow",
            EvictionReason::InvalidOnRelease => "invalid on release",
            EvictionReason::MaxIdleExceeded => "max idle exceeded",
            EvictionReason::Evicted => "evicted",
            EvictionReason::Closed => "pool closed",
        };
        f.write_str(reason)
    }
}

/// Idle entries, handed out according to an [`OrderPolicy`]
///
/// Entries are always appended at the back, so the front holds the
/// oldest-returned entry and the back the most recent one.
pub(crate) struct IdleQueue<T> {
    entries: VecDeque<Entry<T>>,
    order: OrderPolicy,
    max_idle: usize,
    max_idle_time: Duration,
}

impl<T> IdleQueue<T> {
    pub fn new(order: OrderPolicy, max_idle: usize, max_idle_time: Duration) -> Self {
        Self {
            entries: VecDeque::new(),
            order,
            max_idle,
            max_idle_time,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether another entry may be kept idle
    pub fn has_room(&self) -> bool {
        self.max_idle == 0 || self.entries.len() < self.max_idle
    }

    pub fn push(&mut self, entry: Entry<T>) {
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<Entry<T>> {
        match self.order {
            OrderPolicy::Fifo => self.entries.pop_front(),
            OrderPolicy::Lifo => self.entries.pop_back(),
        }
    }

    /// Whether `entry` has been idle for `max_idle_time` or longer
    pub fn is_expired(&self, entry: &Entry<T>, now: Instant) -> bool {
        !self.max_idle_time.is_zero() && entry.idle_for(now) >= self.max_idle_time
    }

    pub fn drain(&mut self) -> Vec<Entry<T>> {
        self.entries.drain(..).collect()
    }
}
