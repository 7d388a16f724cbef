//! Sample clock: fixed-period pacing for the real-time loops.
//!
//! # Discipline
//!
//! ```text
//! anchor ──┬── period ──┬── period ──┬── period ──▶
//!          │  process   │  process   │  process
//!          │  spin...   │  spin...   │  spin...
//! ```
//!
//! - Deadlines sit on a fixed grid anchored at `start`, never relative to
//!   the moment the loop finished its work, so per-sample jitter never
//!   drifts.
//! - No interrupts: the wait is a busy spin on a monotonic µs timer.
//! - A late tick returns at once. If a whole period (or more) was missed the
//!   missed slots are skipped, keeping the original phase grid: there is no
//!   catch-up burst.
//!
//! [`Pacer`] is the seam for a different wait strategy (hardware timer +
//! task notification) without touching the loops.

/// Monotonic microsecond time source.
pub trait MicrosTimer {
    /// Microseconds since an arbitrary fixed origin. Never decreases.
    fn now_us(&self) -> u64;
}

impl<T: MicrosTimer + ?Sized> MicrosTimer for &T {
    #[inline]
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}

/// Outcome of one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Waited for the deadline.
    OnTime,
    /// Deadline already passed by less than a period; returned immediately.
    Late,
    /// Deadline passed by `missed` whole periods or more; those slots were
    /// skipped.
    Overrun { missed: u32 },
}

/// Blocks the caller until the next sample slot.
pub trait Pacer {
    /// Wait for the next slot.
    fn tick(&mut self) -> Tick;

    /// Forget the current phase. The next tick re-anchors.
    fn reset(&mut self);
}

/// Spin-wait sample clock on an exact deadline grid.
///
/// Slot `k` lies at `anchor + floor(k * num / den)` µs. `k` is folded into
/// the anchor every `den` slots (exactly `num` µs), so the arithmetic stays
/// small and the grid never drifts.
pub struct SampleClock<T: MicrosTimer> {
    timer: T,
    /// `den` slots span exactly `num` microseconds.
    num: u64,
    den: u64,
    /// Grid origin, `None` until anchored.
    anchor: Option<u64>,
    /// Index of the current deadline on the grid, `< den` after folding.
    slot: u64,
    /// Time of `slot`.
    deadline: Option<u64>,
    overruns: u32,
}

impl<T: MicrosTimer> SampleClock<T> {
    /// Clock with an integer period.
    ///
    /// # Panics
    ///
    /// Panics if `period_us` is zero.
    pub fn with_period_us(timer: T, period_us: u32) -> Self {
        assert!(period_us > 0, "sample period must be non-zero");
        Self::on_grid(timer, u64::from(period_us), 1)
    }

    /// Clock ticking `rate_hz` times per second.
    ///
    /// The period keeps its sub-microsecond part, so `rate_hz` ticks span
    /// exactly one second.
    ///
    /// # Panics
    ///
    /// Panics if `rate_hz` is zero or above 1 MHz.
    pub fn for_sample_rate(timer: T, rate_hz: u32) -> Self {
        assert!(rate_hz > 0 && rate_hz <= 1_000_000, "sample rate out of range");
        Self::on_grid(timer, 1_000_000, u64::from(rate_hz))
    }

    fn on_grid(timer: T, num: u64, den: u64) -> Self {
        Self {
            timer,
            num,
            den,
            anchor: None,
            slot: 0,
            deadline: None,
            overruns: 0,
        }
    }

    /// Anchor the deadline grid at the current time.
    pub fn start(&mut self) {
        let now = self.timer.now_us();
        self.set_slot(now, 0);
    }

    /// Whole-microsecond part of the period.
    #[inline]
    pub fn period_us(&self) -> u64 {
        self.num / self.den
    }

    /// Number of overrun events since creation.
    #[inline]
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    /// Current deadline, if anchored.
    #[inline]
    pub fn deadline_us(&self) -> Option<u64> {
        self.deadline
    }

    /// Access the underlying timer.
    #[inline]
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Time of grid slot `k`.
    #[inline]
    fn slot_time(&self, anchor: u64, k: u64) -> u64 {
        anchor + k * self.num / self.den
    }

    /// Last grid slot at or before `now`.
    fn last_slot_before(&self, anchor: u64, now: u64) -> u64 {
        // slot_time(k) <= now  <=>  k * num < (now - anchor + 1) * den
        let span = u128::from(now - anchor + 1) * u128::from(self.den);
        let k = (span - 1) / u128::from(self.num);
        u64::try_from(k).unwrap_or(u64::MAX)
    }

    fn set_slot(&mut self, anchor: u64, k: u64) {
        let whole = k / self.den;
        let anchor = anchor + whole * self.num;
        let k = k - whole * self.den;
        self.anchor = Some(anchor);
        self.slot = k;
        self.deadline = Some(self.slot_time(anchor, k));
    }
}

impl<T: MicrosTimer> Pacer for SampleClock<T> {
    fn tick(&mut self) -> Tick {
        let now = self.timer.now_us();
        let (anchor, slot) = match self.anchor {
            Some(anchor) => (anchor, self.slot),
            None => (now, 0),
        };
        let next = slot + 1;
        let target = self.slot_time(anchor, next);

        if now >= target {
            let last = self.last_slot_before(anchor, now);
            let missed = last - next;
            if missed > 0 {
                self.set_slot(anchor, last);
                self.overruns = self.overruns.saturating_add(1);
                return Tick::Overrun {
                    missed: missed.min(u64::from(u32::MAX)) as u32,
                };
            }
            self.set_slot(anchor, next);
            return Tick::Late;
        }

        while self.timer.now_us() < target {
            core::hint::spin_loop();
        }
        self.set_slot(anchor, next);
        Tick::OnTime
    }

    fn reset(&mut self) {
        self.anchor = None;
        self.slot = 0;
        self.deadline = None;
    }
}
