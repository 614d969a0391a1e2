//! Task scheduling abstraction
//!
//! The engine never assumes a single global execution context: hosts may
//! partition the world spatially and run each region on its own context.
//! World reads and writes are therefore issued through the
//! location-affinitized methods, and everything scheduled here is
//! cancellable with idempotent cancellation.
//!
//! [`TokioScheduler`] is the production implementation for hosts that run a
//! single shared runtime; location affinity is trivially satisfied there.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::world::DeviceLocation;

/// One-shot task body
pub type OneShot = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-rate task body
pub type Repeating = Box<dyn FnMut() + Send + 'static>;

/// Handle to scheduled work
///
/// `cancel` is idempotent: cancelling an already-fired or already-cancelled
/// task is a no-op.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    cancelled: AtomicBool,
    canceller: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl TaskHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HandleInner {
                cancelled: AtomicBool::new(false),
                canceller: Mutex::new(None),
            }),
        }
    }

    /// Attach the backend-specific cancel action (e.g. a task abort)
    pub fn set_canceller(&self, canceller: impl FnOnce() + Send + 'static) {
        *self.inner.canceller.lock() = Some(Box::new(canceller));
    }

    /// Cancel the scheduled work; no-op if already cancelled or fired
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            if let Some(canceller) = self.inner.canceller.lock().take() {
                canceller();
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for TaskHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Schedule one-shot and fixed-rate callbacks, optionally bound to the
/// execution context that owns a location
pub trait Scheduler: Send + Sync {
    /// Run a task after a delay
    fn run_later(&self, delay: Duration, task: OneShot) -> TaskHandle;

    /// Run a task at a fixed rate, first firing after `initial_delay`
    fn run_repeating(&self, initial_delay: Duration, period: Duration, task: Repeating)
        -> TaskHandle;

    /// Run a task on the execution context that owns `location`
    fn run_at_location(&self, location: &DeviceLocation, task: OneShot) -> TaskHandle;

    /// Run a task on the owning context of `location` after a delay
    fn run_at_location_later(
        &self,
        location: &DeviceLocation,
        delay: Duration,
        task: OneShot,
    ) -> TaskHandle;

    /// Run a task at a fixed rate on the owning context of `location`
    fn run_at_location_repeating(
        &self,
        location: &DeviceLocation,
        initial_delay: Duration,
        period: Duration,
        task: Repeating,
    ) -> TaskHandle;
}

/// Run a task body, containing panics at the scheduling boundary
fn run_guarded(f: impl FnOnce()) {
    if std::panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!("Scheduled task panicked; containing at scheduler boundary");
    }
}

/// Scheduler backed by a Tokio runtime
///
/// All tasks share one runtime, so location affinity holds trivially. Hosts
/// with genuinely partitioned execution supply their own [`Scheduler`] that
/// routes location-affinitized tasks to the owning context.
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Scheduler on the current runtime; panics outside a runtime context
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }

    fn spawn_delayed(&self, delay: Duration, task: OneShot) -> TaskHandle {
        let handle = TaskHandle::new();
        let guard = handle.clone();
        let join = self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if !guard.is_cancelled() {
                run_guarded(task);
            }
        });
        handle.set_canceller(move || join.abort());
        handle
    }

    fn spawn_repeating(
        &self,
        initial_delay: Duration,
        period: Duration,
        mut task: Repeating,
    ) -> TaskHandle {
        let handle = TaskHandle::new();
        let guard = handle.clone();
        let join = self.handle.spawn(async move {
            let start = tokio::time::Instant::now() + initial_delay;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if guard.is_cancelled() {
                    break;
                }
                run_guarded(&mut task);
            }
        });
        handle.set_canceller(move || join.abort());
        handle
    }
}

impl Scheduler for TokioScheduler {
    fn run_later(&self, delay: Duration, task: OneShot) -> TaskHandle {
        self.spawn_delayed(delay, task)
    }

    fn run_repeating(
        &self,
        initial_delay: Duration,
        period: Duration,
        task: Repeating,
    ) -> TaskHandle {
        self.spawn_repeating(initial_delay, period, task)
    }

    fn run_at_location(&self, _location: &DeviceLocation, task: OneShot) -> TaskHandle {
        self.spawn_delayed(Duration::ZERO, task)
    }

    fn run_at_location_later(
        &self,
        _location: &DeviceLocation,
        delay: Duration,
        task: OneShot,
    ) -> TaskHandle {
        self.spawn_delayed(delay, task)
    }

    fn run_at_location_repeating(
        &self,
        _location: &DeviceLocation,
        initial_delay: Duration,
        period: Duration,
        task: Repeating,
    ) -> TaskHandle {
        self.spawn_repeating(initial_delay, period, task)
    }
}
