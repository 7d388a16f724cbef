//! Fault state of a real-time task.
//!
//! # Philosophy
//!
//! > A real-time loop never retries.
//!
//! Anything that goes wrong inside an encode or decode loop ends that task.
//! The task records why in a [`FaultState`] shared with its session, logs,
//! and returns. Recovery is the caller's job (`begin` + `run` again).

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Fault codes indicating why a task stopped on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,

    /// The encoder's frame buffer could not be allocated.
    /// Data: requested sample count (saturated).
    BufferAlloc = 1,

    /// The PWM driver rejected a duty write.
    OutputWrite = 2,

    /// The ADC driver failed a raw read.
    InputRead = 3,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::BufferAlloc,
            2 => FaultCode::OutputWrite,
            3 => FaultCode::InputRead,
            _ => FaultCode::None,
        }
    }

    /// Short description for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            FaultCode::None => "none",
            FaultCode::BufferAlloc => "frame buffer allocation failed",
            FaultCode::OutputWrite => "PWM duty write failed",
            FaultCode::InputRead => "ADC read failed",
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Thread-safe fault state, shared between a task and its session.
pub struct FaultState {
    /// True if fault is active.
    active: AtomicBool,

    /// Fault code (reason for fault).
    code: AtomicU8,

    /// Additional data (meaning depends on the code).
    data: AtomicU32,

    /// Total fault count since creation (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Record a fault.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    /// Check if a fault is currently active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Fault data.
    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Total fault count.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear the active flag. The counter is kept for diagnostics.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Snapshot of the current state.
    #[inline]
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of fault state at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}
