//! Single-slot handoff of the latest decoded timecode.
//!
//! # Architecture
//!
//! ```text
//! Decoder task ──publish()──▶ [ snapshot | flag ] ──take_available()──▶ Application
//!  (sole writer)               one AtomicU32       text() / latest()     (sole reader)
//!                              one AtomicBool
//! ```
//!
//! # Rules
//!
//! - The whole timecode travels in one `AtomicU32`: a reader can never see
//!   half of an old value and half of a new one.
//! - Latest wins: an unread value is overwritten by the next publish.
//! - The availability flag is consumed by a `swap`, so one publish yields at
//!   most one `true` no matter how often the reader polls.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::timecode::{Timecode, TimecodeText};

/// Latest-wins timecode mailbox.
pub struct FrameMailbox {
    /// Packed [`Timecode`], see [`Timecode::pack`].
    snapshot: AtomicU32,
    /// Set by publish, cleared by take.
    available: AtomicBool,
    /// Number of publishes since creation (0 = never published).
    published: AtomicU32,
}

impl FrameMailbox {
    /// Create an empty mailbox.
    pub const fn new() -> Self {
        Self {
            snapshot: AtomicU32::new(0),
            available: AtomicBool::new(false),
            published: AtomicU32::new(0),
        }
    }

    /// Store a new timecode and raise the availability flag.
    ///
    /// Never blocks. Writer side only.
    #[inline]
    pub fn publish(&self, tc: Timecode) {
        self.snapshot.store(tc.pack(), Ordering::Release);
        self.published.fetch_add(1, Ordering::Relaxed);
        self.available.store(true, Ordering::Release);
    }

    /// Consume the availability flag.
    ///
    /// Returns `true` exactly once per publish that happened since the last
    /// `true`.
    #[inline]
    pub fn take_available(&self) -> bool {
        self.available.swap(false, Ordering::AcqRel)
    }

    /// Peek at the flag without consuming it.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Latest published timecode, `None` before the first publish.
    #[inline]
    pub fn latest(&self) -> Option<Timecode> {
        if self.published.load(Ordering::Acquire) == 0 {
            return None;
        }
        Some(Timecode::unpack(self.snapshot.load(Ordering::Acquire)))
    }

    /// Latest value formatted; `00:00:00:00` before the first publish.
    #[inline]
    pub fn text(&self) -> TimecodeText {
        Timecode::unpack(self.snapshot.load(Ordering::Acquire)).to_text()
    }

    /// Total publishes.
    #[inline]
    pub fn published(&self) -> u32 {
        self.published.load(Ordering::Relaxed)
    }

    /// Forget the current value (used when a session is re-begun).
    pub fn clear(&self) {
        self.available.store(false, Ordering::Release);
        self.snapshot.store(0, Ordering::Release);
        self.published.store(0, Ordering::Release);
    }
}

impl Default for FrameMailbox {
    fn default() -> Self {
        Self::new()
    }
}
