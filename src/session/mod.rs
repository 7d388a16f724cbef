//! Encoder and decoder sessions.
//!
//! A session owns one codec engine and one peripheral and drives them from
//! a real-time task. While the task runs it owns both by value; stopping
//! the task hands them back. Freeing an engine therefore always happens
//! after its task has returned.
//!
//! # State shared with the task
//!
//! ```text
//! application ──set_timecode()──▶ PendingTimecode ──frame boundary──▶ encoder task
//! application ◀──available()──── FrameMailbox ◀──────publish()────── decoder task
//!                                 FaultState / counters ◀──────────── both
//! ```

pub mod decoder;
pub mod encoder;

pub use decoder::DecoderSession;
pub use encoder::EncoderSession;

use core::fmt;
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::clock::Tick;
use crate::codec::CodecError;
use crate::fault::FaultState;
use crate::hal::HalError;
use crate::timecode::Timecode;

/// Why `begin` left a session uninitialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Engine creation failed.
    Codec(CodecError),
    /// Peripheral configuration failed.
    Hal(HalError),
    /// S01: the peripheral was lost with a crashed task
    NoPeripheral,
}

impl SessionError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Codec(e) => e.code(),
            Self::Hal(e) => e.code(),
            Self::NoPeripheral => "S01",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Codec(e) => e.message(),
            Self::Hal(e) => e.message(),
            Self::NoPeripheral => "peripheral unavailable",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl From<CodecError> for SessionError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

impl From<HalError> for SessionError {
    fn from(e: HalError) -> Self {
        Self::Hal(e)
    }
}

/// The sample clock supports rates up to 1 MHz.
pub(crate) fn check_rate(sample_rate: u32) -> Result<(), SessionError> {
    if sample_rate == 0 || sample_rate > 1_000_000 {
        return Err(SessionError::Codec(CodecError::UnsupportedSampleRate));
    }
    Ok(())
}

/// Single-slot timecode handoff into a running encoder task.
///
/// Layout: bit 32 set = value present, bits 0..32 = packed [`Timecode`].
#[derive(Debug, Default)]
pub struct PendingTimecode(AtomicU64);

const PENDING_FLAG: u64 = 1 << 32;

impl PendingTimecode {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Park a value; a previous unconsumed value is replaced.
    #[inline]
    pub fn put(&self, tc: Timecode) {
        self.0.store(PENDING_FLAG | u64::from(tc.pack()), Ordering::Release);
    }

    /// Take the parked value, if any.
    #[inline]
    pub fn take(&self) -> Option<Timecode> {
        let word = self.0.swap(0, Ordering::AcqRel);
        (word & PENDING_FLAG != 0).then(|| Timecode::unpack(word as u32))
    }
}

/// Counters and fault state shared by a session and its task.
#[derive(Default)]
pub struct TaskStats {
    pub fault: FaultState,
    /// Frames emitted (encoder) or decoded (decoder).
    frames: AtomicU32,
    /// Sample clock overrun events.
    overruns: AtomicU32,
}

impl TaskStats {
    pub const fn new() -> Self {
        Self {
            fault: FaultState::new(),
            frames: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn frames(&self) -> u32 {
        self.frames.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn add_frame(&self) {
        self.frames.fetch_add(1, Ordering::Relaxed);
    }

    /// Account one sample clock tick.
    #[inline]
    pub(crate) fn note_tick(&self, tick: Tick) {
        if let Tick::Overrun { .. } = tick {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Fresh counters for a new engine.
    pub(crate) fn reset(&self) {
        self.fault.clear();
        self.frames.store(0, Ordering::Relaxed);
        self.overruns.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_take_once() {
        let p = PendingTimecode::new();
        assert_eq!(p.take(), None);

        p.put(Timecode { hours: 1, minutes: 2, seconds: 3, frames: 4 });
        assert_eq!(p.take(), Some(Timecode { hours: 1, minutes: 2, seconds: 3, frames: 4 }));
        assert_eq!(p.take(), None);
    }

    #[test]
    fn test_pending_zero_timecode_is_a_value() {
        let p = PendingTimecode::new();
        p.put(Timecode::ZERO);
        assert_eq!(p.take(), Some(Timecode::ZERO));
    }

    #[test]
    fn test_stats_count_overrun_events() {
        let stats = TaskStats::new();
        stats.note_tick(Tick::OnTime);
        stats.note_tick(Tick::Late);
        stats.note_tick(Tick::Overrun { missed: 3 });
        assert_eq!(stats.overruns(), 1);
    }
}
