//! Module: timecode
//!
//! Purpose: SMPTE timecode value type (hours:minutes:seconds:frames), its
//! fixed-width text form and a lossless `u32` packing for atomic handoff.
//!
//! Safety: Safe. No unsafe blocks. Copy types only.

use core::fmt;
use core::str::FromStr;

/// Length of the formatted text including the terminator: `"hh:mm:ss:ff\0"`.
pub const TIMECODE_TEXT_LEN: usize = 12;

/// Visible characters in the formatted text.
pub const TIMECODE_VISIBLE_LEN: usize = 11;

/// Timecode parse/validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimecodeError {
    /// T01: Not `hh:mm:ss:ff`
    Format,
    /// T02: A field exceeds its range (24h, 60m, 60s, fps)
    OutOfRange,
}

impl TimecodeError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Format => "T01",
            Self::OutOfRange => "T02",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Format => "expected hh:mm:ss:ff",
            Self::OutOfRange => "field out of range",
        }
    }
}

impl fmt::Display for TimecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// One timecode frame address.
///
/// Ordering is chronological within a day (field by field, hours first).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

impl Timecode {
    /// Midnight, frame zero.
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
        frames: 0,
    };

    /// Create a validated timecode for the given frame rate.
    pub fn new(hours: u8, minutes: u8, seconds: u8, frames: u8, fps: u32) -> Result<Self, TimecodeError> {
        let tc = Self {
            hours,
            minutes,
            seconds,
            frames,
        };
        tc.validate(fps)?;
        Ok(tc)
    }

    /// Check every field against its range. `frames` must be below `fps`.
    pub fn validate(&self, fps: u32) -> Result<(), TimecodeError> {
        if self.hours > 23 || self.minutes > 59 || self.seconds > 59 || u32::from(self.frames) >= fps {
            return Err(TimecodeError::OutOfRange);
        }
        Ok(())
    }

    /// Advance by one frame, carrying into seconds, minutes and hours.
    /// Wraps from 23:59:59:(fps-1) to 00:00:00:00.
    pub fn increment(&mut self, fps: u32) {
        self.frames += 1;
        if u32::from(self.frames) < fps {
            return;
        }
        self.frames = 0;
        self.seconds += 1;
        if self.seconds < 60 {
            return;
        }
        self.seconds = 0;
        self.minutes += 1;
        if self.minutes < 60 {
            return;
        }
        self.minutes = 0;
        self.hours = (self.hours + 1) % 24;
    }

    /// Return the following frame without modifying `self`.
    #[inline]
    pub fn next(mut self, fps: u32) -> Self {
        self.increment(fps);
        self
    }

    /// Pack into a `u32`: `[hours:8][minutes:8][seconds:8][frames:8]`.
    #[inline]
    pub const fn pack(&self) -> u32 {
        (self.hours as u32) << 24 | (self.minutes as u32) << 16 | (self.seconds as u32) << 8 | self.frames as u32
    }

    /// Inverse of [`Timecode::pack`].
    #[inline]
    pub const fn unpack(word: u32) -> Self {
        Self {
            hours: (word >> 24) as u8,
            minutes: (word >> 16) as u8,
            seconds: (word >> 8) as u8,
            frames: word as u8,
        }
    }

    /// Format into the fixed 12-byte text buffer.
    pub fn to_text(&self) -> TimecodeText {
        let mut buf = [0u8; TIMECODE_TEXT_LEN];
        let fields = [self.hours, self.minutes, self.seconds, self.frames];
        for (i, value) in fields.iter().enumerate() {
            let at = i * 3;
            // Values above 99 cannot come out of the codec; clamp so the
            // buffer stays two digits per field.
            let v = (*value).min(99);
            buf[at] = b'0' + v / 10;
            buf[at + 1] = b'0' + v % 10;
            if i < 3 {
                buf[at + 2] = b':';
            }
        }
        TimecodeText(buf)
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text().as_str())
    }
}

fn two_digits(field: &[u8]) -> Result<u8, TimecodeError> {
    match field {
        [a @ b'0'..=b'9', b @ b'0'..=b'9'] => Ok((a - b'0') * 10 + (b - b'0')),
        _ => Err(TimecodeError::Format),
    }
}

impl FromStr for Timecode {
    type Err = TimecodeError;

    /// Parse `hh:mm:ss:ff` (or `hh:mm:ss;ff`).
    ///
    /// Frames are only checked against the largest supported rate here;
    /// use [`Timecode::validate`] for the session's actual fps.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != TIMECODE_VISIBLE_LEN {
            return Err(TimecodeError::Format);
        }
        if bytes[2] != b':' || bytes[5] != b':' || !matches!(bytes[8], b':' | b';') {
            return Err(TimecodeError::Format);
        }

        let tc = Self {
            hours: two_digits(&bytes[0..2])?,
            minutes: two_digits(&bytes[3..5])?,
            seconds: two_digits(&bytes[6..8])?,
            frames: two_digits(&bytes[9..11])?,
        };
        tc.validate(crate::config::MAX_FPS + 1)?;
        Ok(tc)
    }
}

/// Formatted timecode: `"hh:mm:ss:ff"` plus a NUL terminator.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TimecodeText([u8; TIMECODE_TEXT_LEN]);

impl TimecodeText {
    /// The 11 visible characters.
    pub fn as_str(&self) -> &str {
        // Only ASCII digits and ':' are ever written.
        core::str::from_utf8(&self.0[..TIMECODE_VISIBLE_LEN]).unwrap_or("??:??:??:??")
    }

    /// Raw buffer including the terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8; TIMECODE_TEXT_LEN] {
        &self.0
    }
}

impl Default for TimecodeText {
    fn default() -> Self {
        Timecode::ZERO.to_text()
    }
}

impl fmt::Display for TimecodeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for TimecodeText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimecodeText({:?})", self.as_str())
    }
}

impl PartialEq<&str> for TimecodeText {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}
