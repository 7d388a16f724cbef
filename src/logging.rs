//! RT-safe logging for the timecode node.
//!
//! # Architecture
//!
//! ```text
//! Encoder/Decoder task      LogStream           Drain task
//! ────────────────────      ─────────           ──────────
//!
//! ltc_log!() ─────────────▶ [E0][E1][E2] ─────▶ stdout / UART0
//! format on stack            lock-free ring      blocking ok
//! never blocks               fixed entries       low priority
//! ```
//!
//! # Rules
//!
//! - The sample loops never call `println!` or `ESP_LOGx`; they use the
//!   `ltc_*!` macros on [`RT_LOG_STREAM`](crate::RT_LOG_STREAM).
//! - Push never blocks and never allocates. A full ring drops the message
//!   and counts it.
//! - A slot becomes visible to the drain only after its producer finished
//!   writing it (per-slot sequence number).

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

/// Maximum message length.
pub const MAX_MSG_LEN: usize = 96;

/// Log buffer size (number of entries).
pub const LOG_BUFFER_SIZE: usize = 128;

/// Log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    /// Convert to string for output.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }
}

/// Component that emitted a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum LogSource {
    Encoder = 0,
    Decoder = 1,
    Session = 2,
    Node = 3,
    App = 4,
}

impl LogSource {
    pub fn as_str(self) -> &'static str {
        match self {
            LogSource::Encoder => "encoder",
            LogSource::Decoder => "decoder",
            LogSource::Session => "session",
            LogSource::Node => "node",
            LogSource::App => "app",
        }
    }
}

/// A single log entry.
#[derive(Clone, Copy)]
pub struct LogEntry {
    /// Timestamp in microseconds.
    pub timestamp_us: i64,
    pub level: LogLevel,
    pub source: LogSource,
    /// Message length.
    pub len: u8,
    /// Message bytes (not null-terminated).
    pub msg: [u8; MAX_MSG_LEN],
}

impl LogEntry {
    const EMPTY: Self = Self {
        timestamp_us: 0,
        level: LogLevel::Info,
        source: LogSource::App,
        len: 0,
        msg: [0; MAX_MSG_LEN],
    };

    /// Message text. Truncation may have split a UTF-8 sequence; the
    /// valid prefix is returned in that case.
    pub fn message(&self) -> &str {
        let bytes = &self.msg[..self.len as usize];
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl Default for LogEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

struct Slot {
    /// `position + 1` once the entry for `position` is written.
    seq: AtomicU32,
    entry: UnsafeCell<LogEntry>,
}

impl Slot {
    const EMPTY: Self = Self {
        seq: AtomicU32::new(0),
        entry: UnsafeCell::new(LogEntry::EMPTY),
    };
}

/// Lock-free log stream (multiple producers, single drain).
pub struct LogStream<const N: usize = LOG_BUFFER_SIZE> {
    slots: [Slot; N],
    write_idx: AtomicU32,
    read_idx: AtomicU32,
    dropped: AtomicU32,
    max_level: AtomicU8,
}

// SAFETY: producers reserve distinct positions with a CAS on write_idx and
// publish through the slot sequence; the single drain reads a slot only
// after its sequence matches.
unsafe impl<const N: usize> Sync for LogStream<N> {}
unsafe impl<const N: usize> Send for LogStream<N> {}

impl<const N: usize> LogStream<N> {
    const MASK: usize = N - 1;

    /// Create a new empty log stream.
    pub const fn new() -> Self {
        assert!(N.is_power_of_two(), "Log buffer size must be power of 2");

        Self {
            slots: [Slot::EMPTY; N],
            write_idx: AtomicU32::new(0),
            read_idx: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            max_level: AtomicU8::new(LogLevel::Debug as u8),
        }
    }

    /// Most verbose level that is kept. Entries above it are discarded
    /// without counting as dropped.
    pub fn set_max_level(&self, level: LogLevel) {
        self.max_level.store(level as u8, Ordering::Relaxed);
    }

    /// Would an entry at `level` be kept?
    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        (level as u8) <= self.max_level.load(Ordering::Relaxed)
    }

    /// Push a log entry (RT-safe, never blocks).
    ///
    /// Returns `true` if the message was queued, `false` if filtered or
    /// dropped (ring full).
    #[inline]
    pub fn push(&self, timestamp_us: i64, level: LogLevel, source: LogSource, msg: &[u8]) -> bool {
        if !self.enabled(level) {
            return false;
        }

        let mut write = self.write_idx.load(Ordering::Relaxed);
        loop {
            let read = self.read_idx.load(Ordering::Acquire);
            if write.wrapping_sub(read) >= N as u32 {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            match self.write_idx.compare_exchange_weak(
                write,
                write.wrapping_add(1),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => write = current,
            }
        }

        let slot = &self.slots[(write as usize) & Self::MASK];
        let len = msg.len().min(MAX_MSG_LEN);

        // SAFETY: position `write` is reserved for this producer and the
        // drain has released the slot (read_idx > write - N).
        unsafe {
            let entry = &mut *slot.entry.get();
            entry.timestamp_us = timestamp_us;
            entry.level = level;
            entry.source = source;
            entry.len = len as u8;
            entry.msg[..len].copy_from_slice(&msg[..len]);
        }

        slot.seq.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Drain next log entry.
    ///
    /// Returns `None` if nothing is ready. Single consumer only.
    #[inline]
    pub fn drain(&self) -> Option<LogEntry> {
        let read = self.read_idx.load(Ordering::Relaxed);
        let slot = &self.slots[(read as usize) & Self::MASK];

        if slot.seq.load(Ordering::Acquire) != read.wrapping_add(1) {
            return None;
        }

        // SAFETY: the sequence says the producer finished this slot and no
        // producer can reuse it before read_idx moves past it.
        let entry = unsafe { *slot.entry.get() };

        self.read_idx.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Get count of dropped messages.
    #[inline]
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Reset dropped counter (e.g., after reporting).
    #[inline]
    pub fn reset_dropped(&self) {
        self.dropped.store(0, Ordering::Relaxed);
    }

    /// Get number of entries reserved but not yet drained.
    #[inline]
    pub fn pending(&self) -> u32 {
        let read = self.read_idx.load(Ordering::Relaxed);
        let write = self.write_idx.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }
}

impl<const N: usize> Default for LogStream<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a message into a buffer, truncating at the buffer end.
///
/// Returns the number of bytes written.
#[inline]
pub fn format_to_buffer(buf: &mut [u8], args: core::fmt::Arguments<'_>) -> usize {
    let mut writer = BufWriter { buf, pos: 0 };
    let _ = core::fmt::write(&mut writer, args);
    writer.pos
}

/// `fmt::Write` over a fixed byte buffer; excess output is cut off.
pub(crate) struct BufWriter<'a> {
    pub(crate) buf: &'a mut [u8],
    pub(crate) pos: usize,
}

impl core::fmt::Write for BufWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buf.len() - self.pos;
        let to_write = bytes.len().min(remaining);
        self.buf[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
        self.pos += to_write;
        Ok(())
    }
}

/// RT-safe log macro. Formats on the stack and stamps the entry with
/// [`timestamp_us`](crate::hal::timer::timestamp_us).
///
/// # Example
///
/// ```ignore
/// ltc_log!(LogLevel::Info, RT_LOG_STREAM, LogSource::Encoder, "frame {}", n);
/// ```
#[macro_export]
macro_rules! ltc_log {
    ($level:expr, $stream:expr, $source:expr, $($arg:tt)*) => {{
        let stream = &$stream;
        if stream.enabled($level) {
            let mut buf = [0u8; $crate::logging::MAX_MSG_LEN];
            let len = $crate::logging::format_to_buffer(&mut buf, format_args!($($arg)*));
            stream.push($crate::hal::timer::timestamp_us(), $level, $source, &buf[..len]);
        }
    }};
}

/// RT-safe info log.
#[macro_export]
macro_rules! ltc_info {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::ltc_log!($crate::logging::LogLevel::Info, $stream, $source, $($arg)*)
    };
}

/// RT-safe warning log.
#[macro_export]
macro_rules! ltc_warn {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::ltc_log!($crate::logging::LogLevel::Warn, $stream, $source, $($arg)*)
    };
}

/// RT-safe error log.
#[macro_export]
macro_rules! ltc_error {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::ltc_log!($crate::logging::LogLevel::Error, $stream, $source, $($arg)*)
    };
}

/// RT-safe debug log.
#[macro_export]
macro_rules! ltc_debug {
    ($stream:expr, $source:expr, $($arg:tt)*) => {
        $crate::ltc_log!($crate::logging::LogLevel::Debug, $stream, $source, $($arg)*)
    };
}
