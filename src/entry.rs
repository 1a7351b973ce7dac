//! Pool entries: one live resource plus its bookkeeping

use crate::pool::PoolShared;
use std::fmt;
use std::ptr;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// A resource owned by a pool
///
/// While idle the entry sits in the pool; while borrowed the caller holds it
/// and must hand it back through [`Pool::release`](crate::Pool::release) or
/// [`Pool::evict`](crate::Pool::evict). Dropping a borrowed entry instead
/// keeps its capacity slot taken; [`Pool::lease`](crate::Pool::lease) hands
/// out a guard that releases automatically.
pub struct Entry<T> {
    value: T,
    id: u64,
    owner: Weak<PoolShared<T>>,
    returned_at: Instant,
}

impl<T> Entry<T> {
    pub(crate) fn new(value: T, id: u64, owner: Weak<PoolShared<T>>) -> Self {
        Self {
            value,
            id,
            owner,
            returned_at: Instant::now(),
        }
    }

    /// The wrapped resource
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Time since the entry was last returned to the pool, or since creation
    /// if it was never returned
    pub fn age(&self) -> Duration {
        self.returned_at.elapsed()
    }

    /// Identifier, unique within the owning pool
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_owned_by(&self, shared: &Arc<PoolShared<T>>) -> bool {
        ptr::eq(self.owner.as_ptr(), Arc::as_ptr(shared))
    }

    /// The pool that created this entry, if it still exists
    pub(crate) fn owner(&self) -> Option<Arc<PoolShared<T>>> {
        self.owner.upgrade()
    }

    pub(crate) fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.returned_at)
    }

    pub(crate) fn stamp(&mut self) {
        self.returned_at = Instant::now();
    }

    pub(crate) fn into_value(self) -> T {
        self.value
    }
}

impl<T: fmt::Debug> fmt::Debug for Entry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("value", &self.value)
            .field("age", &self.age())
            .finish()
    }
}
