//! Bounded pool: acquisition, release and the wait discipline between them

use crate::cancel::{CancelToken, Registration};
use crate::config::{PoolConfiguration, WaitPolicy};
use crate::errors::{PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::lifecycle::{AcceptAll, Factory, Resetter};
use crate::metrics::{MetricsTracker, PoolMetrics};

use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// A snapshot of how many instances a pool holds.
///
/// Diagnostic only: the numbers may be stale by the time the caller reads them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSize {
    pub idle: usize,
    /// Checked out, being constructed, or on their way back through the resetter
    pub in_use: usize,
    pub total: usize,
}

impl PoolSize {
    pub(crate) fn utilization(&self, capacity: usize) -> f64 {
        if capacity > 0 {
            self.in_use as f64 / capacity as f64
        } else {
            0.0
        }
    }
}

/// Per-call overrides for `acquire`
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    /// Replaces the pool's configured wait policy for this call
    pub wait_policy: Option<WaitPolicy>,

    /// Aborts a blocked wait when cancelled
    pub cancel: Option<CancelToken>,
}

impl AcquireOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait at most `timeout` for this call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait_policy = Some(WaitPolicy::BlockWithTimeout(timeout));
        self
    }

    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = Some(policy);
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// An instance checked out of a [`BoundedPool`]. Returned to the pool when dropped.
pub struct PooledObject<T: Send + 'static> {
    value: Option<T>,
    slot: usize,
    pool: Arc<Shared<T>>,
}

impl<T: Send + 'static> PooledObject<T> {
    fn new(value: T, slot: usize, pool: Arc<Shared<T>>) -> Self {
        Self {
            value: Some(value),
            slot,
            pool,
        }
    }

    /// Identifier of the capacity slot this instance occupies
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Take the instance out of the pool for good, freeing its capacity slot.
    pub fn detach(mut self) -> T {
        let value = self.value.take().expect("Value already taken");
        self.pool.free_slot(self.slot);
        self.pool.metrics.discarded.fetch_add(1, Ordering::Relaxed);
        value
    }
}

impl<T: Send + 'static> Deref for PooledObject<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.value.as_ref().expect("Value already taken")
    }
}

impl<T: Send + 'static> DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.value.as_mut().expect("Value already taken")
    }
}

impl<T: Send + fmt::Debug + 'static> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("slot", &self.slot)
            .field("value", &self.value)
            .finish()
    }
}

impl<T: Send + 'static> Drop for PooledObject<T> {
    fn drop(&mut self) {
        let Some(value) = self.value.take() else {
            return;
        };

        // A resetter panic here would abort the process; discard the instance instead.
        if std::thread::panicking() {
            self.pool.free_slot(self.slot);
            self.pool.metrics.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(slot = self.slot, "discarding pooled object dropped during unwind");
            drop(value);
            return;
        }

        if let Err(e) = self.pool.give_back(self.slot, value) {
            warn!(slot = self.slot, error = %e, "dropped pooled object could not be returned");
        }
    }
}

/// State guarded by the pool lock. `total` counts every issued slot:
/// idle, checked out, under construction, or being reset.
struct PoolState<T> {
    idle: Vec<(usize, T)>,
    in_use: HashSet<usize>,
    total: usize,
    next_slot: usize,
}

impl<T> PoolState<T> {
    fn reserve(&mut self) -> usize {
        let slot = self.next_slot;
        self.next_slot = self.next_slot.wrapping_add(1);
        self.total += 1;
        self.in_use.insert(slot);
        slot
    }

    fn size(&self) -> PoolSize {
        PoolSize {
            idle: self.idle.len(),
            in_use: self.total - self.idle.len(),
            total: self.total,
        }
    }
}

struct Shared<T> {
    state: Mutex<PoolState<T>>,
    available: Condvar,
    factory: Box<dyn Factory<T>>,
    resetter: Box<dyn Resetter<T>>,
    max_size: usize,
    wait_policy: WaitPolicy,
    metrics: MetricsTracker,
}

impl<T: Send + 'static> Shared<T> {
    /// Return a checked-out instance, running the resetter outside the lock.
    fn give_back(&self, slot: usize, mut value: T) -> PoolResult<()> {
        if !self.state.lock().in_use.remove(&slot) {
            return Err(PoolError::InvalidRelease);
        }

        // The slot is now counted only in `total`; discard it if the resetter panics.
        let pending = SlotGuard::new(self, slot);
        let accepted = self.resetter.reset(&mut value);
        pending.disarm();

        let rejected = {
            let mut state = self.state.lock();
            if accepted {
                state.idle.push((slot, value));
                None
            } else {
                state.total -= 1;
                Some(value)
            }
        };
        self.available.notify_one();

        if rejected.is_some() {
            self.metrics.discarded.fetch_add(1, Ordering::Relaxed);
            debug!(slot, "resetter rejected instance, discarding");
        } else {
            self.metrics.released.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Drop a slot from the books and wake one waiter for the freed capacity.
    fn free_slot(&self, slot: usize) {
        {
            let mut state = self.state.lock();
            state.in_use.remove(&slot);
            state.total -= 1;
        }
        self.available.notify_one();
    }

    fn build(&self, slot: usize) -> PoolResult<T> {
        // Rolls the reservation back if the factory fails or panics.
        let reservation = SlotGuard::new(self, slot);
        match self.factory.create() {
            Ok(value) => {
                reservation.disarm();
                self.metrics.created.fetch_add(1, Ordering::Relaxed);
                debug!(slot, "constructed new pooled instance");
                Ok(value)
            }
            Err(e) => {
                drop(reservation);
                self.metrics.construction_failures.fetch_add(1, Ordering::Relaxed);
                warn!(slot, error = %e, "factory failed to construct instance");
                Err(PoolError::construction(e))
            }
        }
    }

    fn wake_one_if_available(&self, state: &PoolState<T>) {
        if !state.idle.is_empty() || state.total < self.max_size {
            self.available.notify_one();
        }
    }
}

/// Releases a reserved slot on drop unless disarmed.
struct SlotGuard<'a, T: Send + 'static> {
    shared: &'a Shared<T>,
    slot: Option<usize>,
}

impl<'a, T: Send + 'static> SlotGuard<'a, T> {
    fn new(shared: &'a Shared<T>, slot: usize) -> Self {
        Self {
            shared,
            slot: Some(slot),
        }
    }

    fn disarm(mut self) {
        self.slot = None;
    }
}

impl<T: Send + 'static> Drop for SlotGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.shared.free_slot(slot);
        }
    }
}

/// Thread-safe pool that lazily constructs instances up to a maximum size.
///
/// Cloning the pool yields another handle to the same instances.
///
/// Waiters are not served in arrival order: when an instance frees up, any blocked caller
/// may receive it.
///
/// # Examples
///
/// ```
/// use bounded_pool::{BoundedPool, PoolConfiguration, PoolError};
///
/// let config = PoolConfiguration::new().with_max_pool_size(2);
/// let pool = BoundedPool::new(|| Ok::<_, std::io::Error>(String::new()), config).unwrap();
///
/// let a = pool.acquire().unwrap();
/// let _b = pool.acquire().unwrap();
/// assert!(matches!(pool.acquire(), Err(PoolError::Exhausted)));
///
/// drop(a);
/// assert!(pool.acquire().is_ok());
/// assert_eq!(pool.current_size().total, 2);
/// ```
pub struct BoundedPool<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Clone for BoundedPool<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> BoundedPool<T> {
    /// Create a pool whose returned instances are reused as they are
    pub fn new<F>(factory: F, config: PoolConfiguration) -> PoolResult<Self>
    where
        F: Factory<T> + 'static,
    {
        Self::with_resetter(factory, AcceptAll, config)
    }

    /// Create a pool that passes every returned instance through `resetter`
    pub fn with_resetter<F, R>(factory: F, resetter: R, config: PoolConfiguration) -> PoolResult<Self>
    where
        F: Factory<T> + 'static,
        R: Resetter<T> + 'static,
    {
        config.validate()?;

        let pool = Self {
            shared: Arc::new(Shared {
                state: Mutex::new(PoolState {
                    idle: Vec::new(),
                    in_use: HashSet::new(),
                    total: 0,
                    next_slot: 0,
                }),
                available: Condvar::new(),
                factory: Box::new(factory),
                resetter: Box::new(resetter),
                max_size: config.max_size.limit(),
                wait_policy: config.wait_policy,
                metrics: MetricsTracker::new(),
            }),
        };

        if let Some(count) = config.warmup_size {
            pool.warmup(count)?;
        }
        Ok(pool)
    }

    /// Get an instance, waiting according to the configured policy
    pub fn acquire(&self) -> PoolResult<PooledObject<T>> {
        self.acquire_with(AcquireOptions::default())
    }

    /// Get an instance without waiting
    ///
    /// `Ok(None)` means the pool is exhausted; factory failures are still reported.
    pub fn try_acquire(&self) -> PoolResult<Option<PooledObject<T>>> {
        match self.acquire_with(AcquireOptions::new().with_wait_policy(WaitPolicy::FailFast)) {
            Ok(object) => Ok(Some(object)),
            Err(PoolError::Exhausted) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get an instance with per-call overrides
    ///
    /// A timeout is a fixed deadline taken at entry: each wait uses only the time remaining.
    /// The cancel token is consulted only once the call has to wait.
    pub fn acquire_with(&self, options: AcquireOptions) -> PoolResult<PooledObject<T>> {
        let shared = &self.shared;
        let policy = options.wait_policy.unwrap_or(shared.wait_policy);
        let deadline = match policy {
            WaitPolicy::BlockWithTimeout(timeout) => {
                Instant::now().checked_add(timeout).map(|at| (at, timeout))
            }
            _ => None,
        };

        let mut registration: Option<Registration> = None;
        let mut state = shared.state.lock();
        loop {
            if let Some((slot, value)) = state.idle.pop() {
                state.in_use.insert(slot);
                drop(state);
                shared.metrics.acquired.fetch_add(1, Ordering::Relaxed);
                return Ok(PooledObject::new(value, slot, Arc::clone(shared)));
            }

            if state.total < shared.max_size {
                let slot = state.reserve();
                drop(state);
                let value = shared.build(slot)?;
                shared.metrics.acquired.fetch_add(1, Ordering::Relaxed);
                return Ok(PooledObject::new(value, slot, Arc::clone(shared)));
            }

            if policy == WaitPolicy::FailFast {
                shared.metrics.exhausted.fetch_add(1, Ordering::Relaxed);
                return Err(PoolError::Exhausted);
            }

            if let Some(token) = &options.cancel {
                if registration.is_none() {
                    registration = token.register(self.cancel_waker());
                }
                if registration.is_none() || token.is_cancelled() {
                    shared.wake_one_if_available(&state);
                    shared.metrics.cancellations.fetch_add(1, Ordering::Relaxed);
                    debug!("acquire cancelled while waiting");
                    return Err(PoolError::Cancelled);
                }
            }

            if let Some((at, timeout)) = deadline
                && Instant::now() >= at
            {
                shared.wake_one_if_available(&state);
                shared.metrics.timeouts.fetch_add(1, Ordering::Relaxed);
                debug!(?timeout, "acquire timed out");
                return Err(PoolError::Timeout(timeout));
            }

            shared.metrics.waits.fetch_add(1, Ordering::Relaxed);
            trace!(total = state.total, "pool exhausted, waiting");
            match deadline {
                Some((at, _)) => {
                    shared.available.wait_until(&mut state, at);
                }
                None => shared.available.wait(&mut state),
            }
        }
    }

    /// Return an instance to the pool
    ///
    /// Equivalent to dropping it, but reports misuse: an instance from another pool is
    /// rejected with [`PoolError::InvalidRelease`] and goes back to its own pool.
    pub fn release(&self, mut object: PooledObject<T>) -> PoolResult<()> {
        if !Arc::ptr_eq(&self.shared, &object.pool) {
            return Err(PoolError::InvalidRelease);
        }
        match object.value.take() {
            Some(value) => self.shared.give_back(object.slot, value),
            None => Err(PoolError::InvalidRelease),
        }
    }

    /// Pre-construct up to `count` idle instances, bounded by free capacity.
    ///
    /// Returns the number of instances created.
    pub fn warmup(&self, count: usize) -> PoolResult<usize> {
        let shared = &self.shared;
        let mut created = 0;
        while created < count {
            let slot = {
                let mut state = shared.state.lock();
                if state.total >= shared.max_size {
                    break;
                }
                state.reserve()
            };

            let value = shared.build(slot)?;
            {
                let mut state = shared.state.lock();
                state.in_use.remove(&slot);
                state.idle.push((slot, value));
            }
            shared.available.notify_one();
            created += 1;
        }
        debug!(created, "pool warmed up");
        Ok(created)
    }

    /// Current idle, in-use and total counts
    pub fn current_size(&self) -> PoolSize {
        self.shared.state.lock().size()
    }

    /// Upper bound on issued instances (`usize::MAX` when unlimited)
    pub fn max_size(&self) -> usize {
        self.shared.max_size
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        self.shared.wait_policy
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::new(self.current_size(), self.shared.max_size)
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        self.shared
            .metrics
            .get_metrics(self.current_size(), self.shared.max_size)
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format
    #[cfg(feature = "metrics")]
    pub fn export_metrics_prometheus(
        &self,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> prometheus::Result<String> {
        crate::metrics::MetricsExporter::export_prometheus(&self.get_metrics(), pool_name, tags)
    }

    /// Get an instance from tokio's blocking pool, waiting per the configured policy
    pub async fn acquire_async(&self) -> PoolResult<PooledObject<T>> {
        self.acquire_async_with(AcquireOptions::default()).await
    }

    /// Async [`acquire_with`](Self::acquire_with). Dropping the future cancels the wait.
    pub async fn acquire_async_with(&self, options: AcquireOptions) -> PoolResult<PooledObject<T>> {
        let token = match &options.cancel {
            Some(parent) => parent.child_token(),
            None => CancelToken::new(),
        };
        let _cancel_on_drop = token.clone().drop_guard();

        let pool = self.clone();
        let options = AcquireOptions {
            cancel: Some(token),
            ..options
        };
        match tokio::task::spawn_blocking(move || pool.acquire_with(options)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(PoolError::Cancelled),
        }
    }

    /// Listener that wakes this pool's waiters so they can observe a cancelled token.
    fn cancel_waker(&self) -> impl Fn() + Send + Sync + 'static {
        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        move || {
            if let Some(shared) = shared.upgrade() {
                // Taking the lock orders this wake-up after the waiter's token check.
                let _state = shared.state.lock();
                shared.available.notify_all();
            }
        }
    }
}

impl<T: Send + 'static> fmt::Debug for BoundedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedPool")
            .field("max_size", &self.shared.max_size)
            .field("wait_policy", &self.shared.wait_policy)
            .field("size", &self.current_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn counting_pool(config: PoolConfiguration) -> (BoundedPool<usize>, Arc<AtomicUsize>) {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let pool = BoundedPool::new(
            move || Ok::<_, std::io::Error>(counter.fetch_add(1, Ordering::SeqCst)),
            config,
        )
        .unwrap();
        (pool, created)
    }

    #[test]
    fn test_fail_fast_scenario() {
        let (pool, _) = counting_pool(PoolConfiguration::new().with_max_pool_size(2));

        let a = pool.acquire().unwrap();
        assert_eq!(pool.current_size().total, 1);
        let b = pool.acquire().unwrap();
        assert_eq!(pool.current_size().total, 2);
        assert_ne!(*a, *b);

        assert!(matches!(pool.acquire(), Err(PoolError::Exhausted)));

        let a_value = *a;
        pool.release(a).unwrap();
        assert_eq!(pool.current_size().idle, 1);

        let again = pool.acquire().unwrap();
        assert_eq!(*again, a_value);
        assert_eq!(pool.current_size().total, 2);
        drop(b);
    }

    #[test]
    fn test_rejected_release_frees_capacity() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&created);
        let pool = BoundedPool::with_resetter(
            move || Ok::<_, std::io::Error>(counter.fetch_add(1, Ordering::SeqCst)),
            |_: &mut usize| false,
            PoolConfiguration::new().with_max_pool_size(1),
        )
        .unwrap();

        let first = pool.acquire().unwrap();
        assert_eq!(*first, 0);
        drop(first);

        assert_eq!(pool.current_size(), PoolSize::default());
        let second = pool.acquire().unwrap();
        assert_eq!(*second, 1);
        assert_eq!(created.load(Ordering::SeqCst), 2);
        assert_eq!(pool.get_metrics().total_discarded, 1);
    }

    #[test]
    fn test_resetter_normalizes_before_reuse() {
        let pool = BoundedPool::with_resetter(
            || Ok::<_, std::io::Error>(Vec::<u8>::new()),
            |buf: &mut Vec<u8>| {
                buf.clear();
                true
            },
            PoolConfiguration::new().with_max_pool_size(1),
        )
        .unwrap();

        let mut buf = pool.acquire().unwrap();
        buf.extend_from_slice(b"request body");
        drop(buf);

        assert!(pool.acquire().unwrap().is_empty());
    }

    #[test]
    fn test_construction_failure_does_not_consume_capacity() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let pool = BoundedPool::new(
            move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(std::io::Error::other("first attempt fails"))
                } else {
                    Ok(42)
                }
            },
            PoolConfiguration::new().with_max_pool_size(1),
        )
        .unwrap();

        assert!(matches!(
            pool.acquire(),
            Err(PoolError::ConstructionFailed(_))
        ));
        assert_eq!(pool.current_size().total, 0);
        assert_eq!(*pool.acquire().unwrap(), 42);
        assert_eq!(pool.get_metrics().construction_failures, 1);
    }

    #[test]
    fn test_factory_panic_rolls_back_reservation() {
        let pool = BoundedPool::<u8>::new(
            || -> Result<u8, std::io::Error> { panic!("factory exploded") },
            PoolConfiguration::new().with_max_pool_size(1),
        )
        .unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.acquire()));
        assert!(result.is_err());
        assert_eq!(pool.current_size().total, 0);
    }

    #[test]
    fn test_try_acquire_reports_construction_failure() {
        let pool = BoundedPool::<u8>::new(
            || Err::<u8, _>(std::io::Error::other("db down")),
            PoolConfiguration::default(),
        )
        .unwrap();

        match pool.try_acquire() {
            Err(PoolError::ConstructionFailed(source)) => assert_eq!(source.to_string(), "db down"),
            other => panic!("expected ConstructionFailed, got {:?}", other.map(|o| o.is_some())),
        }
        assert_eq!(pool.current_size(), PoolSize::default());
    }

    #[test]
    fn test_try_acquire_exhausted_is_none() {
        let (pool, _) = counting_pool(PoolConfiguration::new().with_max_pool_size(1).blocking());
        let _held = pool.try_acquire().unwrap().unwrap();

        let start = Instant::now();
        assert!(pool.try_acquire().unwrap().is_none());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_resetter_panic_discards_slot() {
        let pool = BoundedPool::with_resetter(
            || Ok::<_, std::io::Error>(0u32),
            |_: &mut u32| -> bool { panic!("resetter exploded") },
            PoolConfiguration::new().with_max_pool_size(1),
        )
        .unwrap();

        let object = pool.acquire().unwrap();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| drop(object)));
        assert!(result.is_err());

        assert_eq!(pool.current_size(), PoolSize::default());
        assert!(pool.acquire().is_ok());
    }

    #[test]
    fn test_drop_during_unwind_skips_resetter() {
        let resets = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&resets);
        let pool = BoundedPool::with_resetter(
            || Ok::<_, std::io::Error>(0u32),
            move |_: &mut u32| -> bool {
                counter.fetch_add(1, Ordering::SeqCst);
                panic!("resetter exploded")
            },
            PoolConfiguration::new().with_max_pool_size(1),
        )
        .unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _object = pool.acquire().unwrap();
            panic!("holder failed");
        }));
        assert!(result.is_err());

        assert_eq!(resets.load(Ordering::SeqCst), 0);
        assert_eq!(pool.current_size(), PoolSize::default());
        assert_eq!(pool.get_metrics().total_discarded, 1);
    }

    #[test]
    fn test_warmup_failure_rolls_back() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = BoundedPool::new(
            move || {
                if counter.fetch_add(1, Ordering::SeqCst) == 1 {
                    Err(std::io::Error::other("second build fails"))
                } else {
                    Ok(7u32)
                }
            },
            PoolConfiguration::new().with_max_pool_size(4),
        )
        .unwrap();

        assert!(matches!(
            pool.warmup(3),
            Err(PoolError::ConstructionFailed(_))
        ));
        assert_eq!(
            pool.current_size(),
            PoolSize {
                idle: 1,
                in_use: 0,
                total: 1
            }
        );
    }

    #[test]
    fn test_detach_frees_slot() {
        let (pool, created) = counting_pool(PoolConfiguration::new().with_max_pool_size(1));

        let owned = pool.acquire().unwrap().detach();
        assert_eq!(owned, 0);
        assert_eq!(pool.current_size().total, 0);

        assert_eq!(*pool.acquire().unwrap(), 1);
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_release_into_wrong_pool() {
        let (pool, _) = counting_pool(PoolConfiguration::default());
        let (other, _) = counting_pool(PoolConfiguration::default());

        let object = pool.acquire().unwrap();
        assert!(matches!(
            other.release(object),
            Err(PoolError::InvalidRelease)
        ));

        // The rejected object went home when it was dropped.
        assert_eq!(pool.current_size().idle, 1);
        assert_eq!(other.current_size().total, 0);
    }

    #[test]
    fn test_timeout_waits_full_budget() {
        let (pool, _) = counting_pool(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_timeout(Duration::from_millis(100)),
        );
        let _held = pool.acquire().unwrap();

        let start = Instant::now();
        let result = pool.acquire();
        assert!(matches!(result, Err(PoolError::Timeout(d)) if d == Duration::from_millis(100)));
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_timeout_override_on_fail_fast_pool() {
        let (pool, _) = counting_pool(PoolConfiguration::new().with_max_pool_size(1));
        let _held = pool.acquire().unwrap();

        let start = Instant::now();
        let result = pool.acquire_with(AcquireOptions::new().with_timeout(Duration::from_millis(30)));
        assert!(matches!(result, Err(PoolError::Timeout(_))));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        let (pool, _) = counting_pool(PoolConfiguration::new().with_max_pool_size(1).blocking());
        let held = pool.acquire().unwrap();

        let waiter = {
            let pool = pool.clone();
            thread::spawn(move || *pool.acquire().unwrap())
        };

        thread::sleep(Duration::from_millis(20));
        drop(held);

        assert_eq!(waiter.join().unwrap(), 0);
    }

    #[test]
    fn test_cancel_unblocks_waiter() {
        let (pool, _) = counting_pool(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_timeout(Duration::from_secs(30)),
        );
        let _held = pool.acquire().unwrap();
        let token = CancelToken::new();

        let waiter = {
            let pool = pool.clone();
            let token = token.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let result = pool.acquire_with(AcquireOptions::new().with_cancel(token));
                (result.map(|o| *o), start.elapsed())
            })
        };

        thread::sleep(Duration::from_millis(20));
        token.cancel();

        let (result, elapsed) = waiter.join().unwrap();
        assert!(matches!(result, Err(PoolError::Cancelled)));
        assert!(elapsed < Duration::from_secs(5));
        assert!(token.is_cancelled());
        assert_eq!(pool.get_metrics().cancellations, 1);
    }

    #[test]
    fn test_cancelled_token_ignored_when_instance_available() {
        let (pool, _) = counting_pool(PoolConfiguration::new().blocking());
        let token = CancelToken::new();
        token.cancel();

        assert!(pool.acquire_with(AcquireOptions::new().with_cancel(token)).is_ok());
    }

    #[test]
    fn test_warmup_fills_idle_up_to_capacity() {
        let (pool, created) = counting_pool(PoolConfiguration::new().with_max_pool_size(3));

        assert_eq!(pool.warmup(5).unwrap(), 3);
        assert_eq!(created.load(Ordering::SeqCst), 3);
        assert_eq!(
            pool.current_size(),
            PoolSize {
                idle: 3,
                in_use: 0,
                total: 3
            }
        );
        assert!(pool.try_acquire().unwrap().is_some());
    }

    #[test]
    fn test_config_warmup_and_validation() {
        let (pool, _) = counting_pool(PoolConfiguration::new().with_warmup(2));
        assert_eq!(pool.current_size().idle, 2);

        let result = BoundedPool::new(
            || Ok::<_, std::io::Error>(0),
            PoolConfiguration::new().with_max_pool_size(0),
        );
        assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_async_acquire() {
        let (pool, _) = counting_pool(PoolConfiguration::new().with_max_pool_size(1).blocking());

        let held = pool.acquire_async().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { *pool.acquire_async().await.unwrap() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);
        assert_eq!(waiter.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_dropped_async_acquire_cancels_wait() {
        let (pool, _) = counting_pool(PoolConfiguration::new().with_max_pool_size(1).blocking());
        let _held = pool.acquire().unwrap();

        let result =
            tokio::time::timeout(Duration::from_millis(20), pool.acquire_async()).await;
        assert!(result.is_err());

        // The blocking waiter observes the cancellation and gives up.
        let start = Instant::now();
        while pool.get_metrics().cancellations == 0 {
            assert!(start.elapsed() < Duration::from_secs(5));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
