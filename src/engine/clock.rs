//! Time sources for the engine loop.
//!
//! All engine timing goes through a [`Scheduler`]: wall-clock in production,
//! virtual in tests so a full calibration or session runs instantly and
//! deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock plus the ability to wait on it
pub trait Scheduler: Send {
    /// Time since the scheduler was created
    fn now(&self) -> Duration;
    /// Block for `duration`
    fn sleep(&mut self, duration: Duration);
}

/// Scheduler backed by `Instant` and `thread::sleep`
#[derive(Debug)]
pub struct SystemScheduler {
    start: Instant,
}

impl SystemScheduler {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for SystemScheduler {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Scheduler whose clock only moves when it sleeps
///
/// Clones share the same clock, so a test can keep one to observe time
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct VirtualScheduler {
    nanos: Arc<AtomicU64>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward without sleeping
    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_clock_advances_on_sleep() {
        let mut scheduler = VirtualScheduler::new();
        let observer = scheduler.clone();
        assert_eq!(observer.now(), Duration::ZERO);
        scheduler.sleep(Duration::from_millis(50));
        scheduler.sleep(Duration::from_millis(50));
        assert_eq!(observer.now(), Duration::from_millis(100));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let scheduler = SystemScheduler::new();
        let a = scheduler.now();
        let b = scheduler.now();
        assert!(b >= a);
    }
}
