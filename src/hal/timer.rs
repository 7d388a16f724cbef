//! Monotonic microsecond timers for the sample clock and log timestamps.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::clock::MicrosTimer;

/// ESP-IDF high-resolution timer (`esp_timer_get_time`).
#[cfg(target_os = "espidf")]
#[derive(Clone, Copy, Debug, Default)]
pub struct EspTimer;

#[cfg(target_os = "espidf")]
impl MicrosTimer for EspTimer {
    #[inline]
    fn now_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time is always safe to call after boot
        unsafe { esp_idf_svc::sys::esp_timer_get_time() as u64 }
    }
}

/// Host timer backed by `std::time::Instant`.
#[derive(Clone, Copy, Debug)]
pub struct StdTimer {
    origin: std::time::Instant,
}

impl StdTimer {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for StdTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl MicrosTimer for StdTimer {
    #[inline]
    fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

/// Deterministic timer: every read advances a shared counter by `step` µs.
///
/// Clones share the counter, so a session and a test observe the same
/// time line. A spin wait on this timer terminates after
/// `period / step` reads, which makes sample-paced loops run as fast as
/// the host allows while keeping their pacing arithmetic exact.
#[derive(Clone, Debug)]
pub struct StepTimer {
    now: Arc<AtomicU64>,
    step: u64,
}

impl StepTimer {
    pub fn new(step: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(0)),
            step,
        }
    }

    /// Jump forward without a read (simulates a processing stall).
    pub fn advance(&self, us: u64) {
        self.now.fetch_add(us, Ordering::AcqRel);
    }

    /// Current value without advancing.
    pub fn peek(&self) -> u64 {
        self.now.load(Ordering::Acquire)
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl MicrosTimer for StepTimer {
    #[inline]
    fn now_us(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::AcqRel)
    }
}

/// Timer used by sessions unless one is injected.
#[cfg(target_os = "espidf")]
pub type SystemTimer = EspTimer;

/// Timer used by sessions unless one is injected.
#[cfg(not(target_os = "espidf"))]
pub type SystemTimer = StdTimer;

/// Timestamp for log entries.
#[cfg(target_os = "espidf")]
#[inline]
pub fn timestamp_us() -> i64 {
    // SAFETY: esp_timer_get_time is always safe to call after boot
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}

/// Timestamp for log entries (µs since first use).
#[cfg(not(target_os = "espidf"))]
pub fn timestamp_us() -> i64 {
    use std::sync::OnceLock;
    static ORIGIN: OnceLock<StdTimer> = OnceLock::new();
    ORIGIN.get_or_init(StdTimer::new).now_us() as i64
}
