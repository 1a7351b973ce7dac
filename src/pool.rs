//! Core resource pool implementation

use crate::config::{CreateFn, DestroyFn, PoolConfiguration, PoolOptions, ValidateFn};
use crate::entry::Entry;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::{EvictionReason, IdleQueue};
use crate::health::PoolStatus;
use crate::metrics::{CounterSet, Counters, Stat};

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// A pooled resource that is released back to the pool when dropped
pub struct PooledObject<T> {
    entry: Option<Entry<T>>,
    pool: Pool<T>,
}

impl<T> PooledObject<T> {
    fn new(entry: Entry<T>, pool: Pool<T>) -> Self {
        Self {
            entry: Some(entry),
            pool,
        }
    }

    /// Time since the resource was last returned to the pool
    pub fn age(&self) -> Duration {
        self.entry().age()
    }

    /// Destroy the resource instead of returning it
    pub fn evict(mut self) -> PoolResult<()> {
        match self.entry.take() {
            Some(entry) => self.pool.evict(entry),
            None => Ok(()),
        }
    }

    /// Detach the entry; the caller becomes responsible for releasing it
    pub fn into_entry(mut self) -> Entry<T> {
        self.entry.take().expect("Entry already taken")
    }

    fn entry(&self) -> &Entry<T> {
        self.entry.as_ref().expect("Entry already taken")
    }
}

impl<T> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.entry().value()
    }
}

impl<T> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.entry.as_mut().expect("Entry already taken").value_mut()
    }
}

impl<T> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            if let Err(err) = self.pool.release(entry) {
                warn!(pool = %self.pool.name(), error = %err, "failed to return pooled object");
            }
        }
    }
}

/// Mutable pool state, guarded by a single mutex
struct PoolState<T> {
    idle: IdleQueue<T>,
    /// Handed out, or reserved by an acquire that is still creating or validating
    borrowed: usize,
    /// idle + borrowed
    live: usize,
    closed: bool,
    counters: CounterSet,
    next_id: u64,
}

impl<T> PoolState<T> {
    fn is_drained(&self) -> bool {
        self.closed && self.borrowed == 0
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

pub(crate) struct PoolShared<T> {
    options: PoolOptions,
    create: CreateFn<T>,
    destroy: Option<DestroyFn<T>>,
    on_borrow: Option<ValidateFn<T>>,
    on_release: Option<ValidateFn<T>>,
    state: Mutex<PoolState<T>>,
    /// Signalled when capacity frees up or the pool closes
    available: Condvar,
    /// Signalled when the pool may have drained
    drained: Condvar,
}

/// What an acquire pulled out of the pool state
enum Candidate<T> {
    Idle(Entry<T>),
    Expired(Entry<T>),
    Create(u64),
}

/// A capacity slot held while the create callback runs; rolled back on drop
struct Reservation<'a, T> {
    pool: &'a Pool<T>,
    armed: bool,
}

impl<T> Reservation<'_, T> {
    fn commit(mut self) {
        self.armed = false;
    }
}

impl<T> Drop for Reservation<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.give_back_slot();
        }
    }
}

/// Thread-safe pool of resources created on demand up to a capacity
///
/// `Pool` is a cheap handle; clones share the same resources.
///
/// # Examples
///
/// ```
/// use esox_resourcepool::{OrderPolicy, Pool, PoolConfiguration, PoolOptions, Stat};
///
/// let options = PoolOptions::new()
///     .with_max_capacity(2)
///     .with_order(OrderPolicy::Lifo)
///     .with_name("example");
/// let config = PoolConfiguration::new(|| Ok(String::from("connection")), options).unwrap();
/// let pool = Pool::new(config).unwrap();
///
/// let entry = pool.acquire().unwrap();
/// assert_eq!(entry.value(), "connection");
/// pool.release(entry).unwrap();
///
/// pool.close();
/// assert!(pool.await_drained_timeout(std::time::Duration::from_millis(10)));
/// assert_eq!(pool.counts().get(Stat::Destroys), 1);
/// ```
pub struct Pool<T> {
    shared: Arc<PoolShared<T>>,
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Pool")
            .field("name", &self.shared.options.name)
            .field("idle", &state.idle.len())
            .field("borrowed", &state.borrowed)
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> Pool<T> {
    /// Build a pool and eagerly create `initial_size` resources
    ///
    /// If any of the initial resources cannot be created, the ones already
    /// created are destroyed and the creation error is returned.
    pub fn new(config: PoolConfiguration<T>) -> PoolResult<Self> {
        let PoolConfiguration {
            options,
            create,
            destroy,
            on_borrow,
            on_release,
        } = config;
        let initial_size = options.initial_size;

        let state = PoolState {
            idle: IdleQueue::new(options.order, options.max_idle, options.max_idle_time),
            borrowed: 0,
            live: 0,
            closed: false,
            counters: CounterSet::default(),
            next_id: 1,
        };

        let pool = Self {
            shared: Arc::new(PoolShared {
                options,
                create,
                destroy,
                on_borrow,
                on_release,
                state: Mutex::new(state),
                available: Condvar::new(),
                drained: Condvar::new(),
            }),
        };

        pool.warmup(initial_size)?;
        Ok(pool)
    }

    /// Acquire a resource, waiting at most the configured `max_wait`
    ///
    /// With a zero `max_wait` this blocks until a resource frees up or the
    /// pool closes.
    pub fn acquire(&self) -> PoolResult<Entry<T>> {
        let wait = self.shared.options.max_wait;
        if wait.is_zero() {
            self.acquire_until(None, wait)
        } else {
            self.acquire_timeout(wait)
        }
    }

    /// Acquire a resource, waiting at most `timeout` when the pool is exhausted
    pub fn acquire_timeout(&self, timeout: Duration) -> PoolResult<Entry<T>> {
        self.acquire_until(Instant::now().checked_add(timeout), timeout)
    }

    /// Acquire a resource without blocking
    pub fn try_acquire(&self) -> PoolResult<Entry<T>> {
        self.acquire_timeout(Duration::ZERO)
    }

    /// Acquire a resource wrapped in a guard that releases it on drop
    pub fn lease(&self) -> PoolResult<PooledObject<T>> {
        self.acquire()
            .map(|entry| PooledObject::new(entry, self.clone()))
    }

    pub fn lease_timeout(&self, timeout: Duration) -> PoolResult<PooledObject<T>> {
        self.acquire_timeout(timeout)
            .map(|entry| PooledObject::new(entry, self.clone()))
    }

    /// Return a borrowed entry to the pool
    ///
    /// The entry is destroyed instead of recycled when the release validator
    /// rejects it, when the pool is closed, or when the idle set is full.
    ///
    /// An entry created by another pool is rejected with
    /// [`PoolError::ForeignEntry`] and released to the pool it came from.
    pub fn release(&self, entry: Entry<T>) -> PoolResult<()> {
        let mut entry = self.claim(entry, Self::release)?;

        let valid = self
            .shared
            .on_release
            .as_ref()
            .is_none_or(|validate| self.passes(validate, &entry, "release"));

        let discarded = {
            let mut state = self.shared.state.lock();
            state.counters.incr(Stat::Releases);
            state.borrowed -= 1;

            let reason = if !valid {
                Some(EvictionReason::InvalidOnRelease)
            } else if state.closed {
                Some(EvictionReason::Closed)
            } else if !state.idle.has_room() {
                Some(EvictionReason::MaxIdleExceeded)
            } else {
                None
            };

            let discarded = match reason {
                Some(reason) => {
                    state.live -= 1;
                    reason.record(&mut state.counters);
                    Some((entry, reason))
                }
                None => {
                    trace!(pool = %self.name(), id = entry.id(), "released resource");
                    entry.stamp();
                    state.idle.push(entry);
                    None
                }
            };
            self.signal_drained(&state);
            discarded
        };

        self.shared.available.notify_one();
        if let Some((entry, reason)) = discarded {
            self.destroy(entry, reason);
        }
        Ok(())
    }

    /// Destroy a borrowed entry the caller found unusable
    ///
    /// Like [`release`](Self::release), an entry from another pool is
    /// rejected and evicted from the pool it came from.
    pub fn evict(&self, entry: Entry<T>) -> PoolResult<()> {
        let entry = self.claim(entry, Self::evict)?;

        {
            let mut state = self.shared.state.lock();
            state.borrowed -= 1;
            state.live -= 1;
            EvictionReason::Evicted.record(&mut state.counters);
            self.signal_drained(&state);
        }

        self.shared.available.notify_one();
        self.destroy(entry, EvictionReason::Evicted);
        Ok(())
    }

    /// Stop handing out resources and destroy the idle ones
    ///
    /// Borrowed resources are destroyed as they come back. Calling `close`
    /// again has no effect.
    pub fn close(&self) {
        let idle = {
            let mut state = self.shared.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;

            let idle = state.idle.drain();
            state.live -= idle.len();
            state.counters.add(Stat::Destroys, idle.len() as u64);
            debug!(
                pool = %self.name(),
                idle = idle.len(),
                borrowed = state.borrowed,
                "closing pool"
            );
            idle
        };

        self.shared.available.notify_all();
        self.shared.drained.notify_all();

        for entry in idle {
            self.destroy(entry, EvictionReason::Closed);
        }
    }

    /// Block until the pool is closed and every borrowed resource is back
    pub fn await_drained(&self) {
        let mut state = self.shared.state.lock();
        while !state.is_drained() {
            self.shared.drained.wait(&mut state);
        }
    }

    /// Like [`await_drained`](Self::await_drained), giving up after `timeout`
    ///
    /// Returns whether the pool drained in time.
    pub fn await_drained_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.await_drained();
            return true;
        };

        let mut state = self.shared.state.lock();
        while !state.is_drained() {
            if self
                .shared
                .drained
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return state.is_drained();
            }
        }
        true
    }

    /// Snapshot of the pool counters
    pub fn counts(&self) -> Counters {
        let state = self.shared.state.lock();
        state.counters.snapshot(&self.shared.options.name)
    }

    /// Current gauges of the pool
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        let capacity = match self.shared.options.max_capacity {
            0 => None,
            capacity => Some(capacity),
        };
        PoolStatus::new(state.idle.len(), state.borrowed, capacity, state.closed)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    pub fn idle_count(&self) -> usize {
        self.shared.state.lock().idle.len()
    }

    pub fn borrowed_count(&self) -> usize {
        self.shared.state.lock().borrowed
    }

    pub fn name(&self) -> &str {
        &self.shared.options.name
    }

    pub fn options(&self) -> &PoolOptions {
        &self.shared.options
    }

    fn acquire_until(&self, deadline: Option<Instant>, wait: Duration) -> PoolResult<Entry<T>> {
        // BORROWS is counted where the candidate is taken, unless a borrow
        // validator has to pass first
        let handed_out = self.shared.on_borrow.is_none();

        loop {
            let entry = match self.next_candidate(deadline, wait, handed_out)? {
                Candidate::Idle(entry) => entry,
                Candidate::Expired(entry) => {
                    self.destroy(entry, EvictionReason::IdleTimeExceeded);
                    continue;
                }
                Candidate::Create(id) => self.create_entry(id, handed_out)?,
            };

            if let Some(validate) = &self.shared.on_borrow {
                let valid = self.passes(validate, &entry, "borrow");
                {
                    let mut state = self.shared.state.lock();
                    if valid {
                        state.counters.incr(Stat::Borrows);
                    } else {
                        state.borrowed -= 1;
                        state.live -= 1;
                        EvictionReason::InvalidOnBorrow.record(&mut state.counters);
                        self.signal_drained(&state);
                    }
                }
                if !valid {
                    self.shared.available.notify_one();
                    self.destroy(entry, EvictionReason::InvalidOnBorrow);
                    continue;
                }
            }

            trace!(pool = %self.name(), id = entry.id(), "borrowed resource");
            return Ok(entry);
        }
    }

    /// Take an idle entry, reserve a slot for a new one, or wait
    fn next_candidate(
        &self,
        deadline: Option<Instant>,
        wait: Duration,
        handed_out: bool,
    ) -> PoolResult<Candidate<T>> {
        let mut state = self.shared.state.lock();
        loop {
            if state.closed {
                return Err(PoolError::Closed);
            }

            if let Some(entry) = state.idle.pop() {
                if state.idle.is_expired(&entry, Instant::now()) {
                    state.live -= 1;
                    EvictionReason::IdleTimeExceeded.record(&mut state.counters);
                    self.shared.available.notify_one();
                    return Ok(Candidate::Expired(entry));
                }
                state.borrowed += 1;
                if handed_out {
                    state.counters.incr(Stat::Borrows);
                }
                return Ok(Candidate::Idle(entry));
            }

            let max_capacity = self.shared.options.max_capacity;
            if max_capacity == 0 || state.live < max_capacity {
                state.live += 1;
                state.borrowed += 1;
                return Ok(Candidate::Create(state.next_id()));
            }

            match deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    return Err(PoolError::Exhausted(wait));
                }
                Some(deadline) => {
                    state.counters.incr(Stat::Suspends);
                    trace!(pool = %self.name(), live = state.live, "pool exhausted, waiting");
                    self.shared.available.wait_until(&mut state, deadline);
                }
                None => {
                    state.counters.incr(Stat::Suspends);
                    trace!(pool = %self.name(), live = state.live, "pool exhausted, waiting");
                    self.shared.available.wait(&mut state);
                }
            }
        }
    }

    /// Run the create callback for a slot reserved by `next_candidate`
    fn create_entry(&self, id: u64, handed_out: bool) -> PoolResult<Entry<T>> {
        let reservation = Reservation {
            pool: self,
            armed: true,
        };

        match (self.shared.create)() {
            Ok(value) => {
                reservation.commit();
                let mut state = self.shared.state.lock();
                state.counters.incr(Stat::Allocations);
                if handed_out {
                    state.counters.incr(Stat::Borrows);
                }
                let live = state.live;
                state.counters.observe_size(live);
                debug!(pool = %self.name(), id, live, "created resource");
                Ok(Entry::new(value, id, Arc::downgrade(&self.shared)))
            }
            Err(cause) => {
                drop(reservation);
                warn!(pool = %self.name(), error = %cause, "failed to create resource");
                Err(PoolError::create_failed(cause))
            }
        }
    }

    /// Undo a reservation whose resource was never created
    fn give_back_slot(&self) {
        {
            let mut state = self.shared.state.lock();
            state.borrowed -= 1;
            state.live -= 1;
            self.signal_drained(&state);
        }
        self.shared.available.notify_one();
    }

    fn warmup(&self, count: usize) -> PoolResult<()> {
        for _ in 0..count {
            let value = match (self.shared.create)() {
                Ok(value) => value,
                Err(cause) => {
                    warn!(pool = %self.name(), error = %cause, "failed to create initial resource");
                    self.close();
                    return Err(PoolError::create_failed(cause));
                }
            };

            let mut state = self.shared.state.lock();
            let id = state.next_id();
            state.live += 1;
            state.counters.incr(Stat::Allocations);
            let live = state.live;
            state.counters.observe_size(live);
            state.idle.push(Entry::new(value, id, Arc::downgrade(&self.shared)));
        }

        if count > 0 {
            debug!(pool = %self.name(), count, "pool warmed up");
        }
        Ok(())
    }

    /// Pass our own entries through; settle foreign ones with their owner
    fn claim(
        &self,
        entry: Entry<T>,
        settle: fn(&Pool<T>, Entry<T>) -> PoolResult<()>,
    ) -> PoolResult<Entry<T>> {
        if entry.is_owned_by(&self.shared) {
            return Ok(entry);
        }

        warn!(pool = %self.name(), id = entry.id(), "rejected entry from another pool");
        if let Some(shared) = entry.owner() {
            let owner = Pool { shared };
            if let Err(err) = settle(&owner, entry) {
                warn!(pool = %owner.name(), error = %err, "failed to return entry to its pool");
            }
        }
        Err(PoolError::ForeignEntry)
    }

    /// Run a validator; a panic counts as a rejection
    fn passes(&self, validate: &ValidateFn<T>, entry: &Entry<T>, stage: &'static str) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| validate(entry.value()))).unwrap_or_else(|_| {
            warn!(pool = %self.name(), id = entry.id(), stage, "validator panicked");
            false
        })
    }

    fn signal_drained(&self, state: &PoolState<T>) {
        if state.is_drained() {
            self.shared.drained.notify_all();
        }
    }

    /// Hand the resource to the destroy callback, swallowing its failures
    fn destroy(&self, entry: Entry<T>, reason: EvictionReason) {
        let id = entry.id();
        debug!(pool = %self.name(), id, %reason, "destroying resource");

        let Some(destroy) = &self.shared.destroy else {
            return;
        };
        let value = entry.into_value();
        match panic::catch_unwind(AssertUnwindSafe(|| destroy(value))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(pool = %self.name(), id, error = %err, "destroy callback failed");
            }
            Err(_) => {
                warn!(pool = %self.name(), id, "destroy callback panicked");
            }
        }
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Acquire a resource from async code
    ///
    /// The blocking acquire runs on tokio's blocking thread pool. If the
    /// returned future is dropped early, a resource acquired in the meantime
    /// goes back to the pool.
    pub async fn acquire_async(&self) -> PoolResult<Entry<T>> {
        self.lease_async().await.map(PooledObject::into_entry)
    }

    /// Acquire a guarded resource from async code
    pub async fn lease_async(&self) -> PoolResult<PooledObject<T>> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.lease())
            .await
            .map_err(|_| PoolError::Cancelled)?
    }

    pub async fn lease_timeout_async(&self, timeout: Duration) -> PoolResult<PooledObject<T>> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.lease_timeout(timeout))
            .await
            .map_err(|_| PoolError::Cancelled)?
    }

    /// Wait for the pool to drain from async code
    pub async fn await_drained_async(&self, timeout: Duration) -> PoolResult<bool> {
        let pool = self.clone();
        tokio::task::spawn_blocking(move || pool.await_drained_timeout(timeout))
            .await
            .map_err(|_| PoolError::Cancelled)
    }
}
