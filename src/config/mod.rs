//! Module: config
//!
//! Purpose: Session configuration and the compile-time tunables of the
//! timecode node (sample rate, PWM carrier, task placement).
//!
//! A [`SessionConfig`] is immutable once its session is running; changing
//! it means stop + `begin` again.

use crate::sample::SampleWidth;

/// Fixed audio sample rate of both paths.
pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// Highest supported frame rate.
pub const MAX_FPS: u32 = 30;

/// PWM carrier frequency. Well above the audio band so an RC filter
/// recovers the waveform.
pub const PWM_CARRIER_HZ: u32 = 187_500;

/// Stack size of each real-time task.
pub const TASK_STACK_SIZE: usize = 4096;

/// FreeRTOS priority of the real-time tasks.
pub const TASK_PRIORITY: u8 = 2;

/// Core the encoder task is pinned to.
pub const ENCODER_CORE: u8 = 1;

/// Core the decoder task is pinned to. Each sample loop spins without
/// yielding, so the two must never share a core.
pub const DECODER_CORE: u8 = 0;

/// Encoder task name (NUL terminated for FreeRTOS).
pub const ENCODER_TASK_NAME: &[u8] = b"ltcEncoderTask\0";

/// Decoder task name (NUL terminated for FreeRTOS).
pub const DECODER_TASK_NAME: &[u8] = b"ltcDecoderTask\0";

/// Log drain task name.
pub const LOG_DRAIN_TASK_NAME: &[u8] = b"ltcLogDrain\0";

/// Log drain priority. It shares the decoder's core and mostly sleeps; at a
/// lower priority it would never run while the decoder spins.
pub const LOG_DRAIN_PRIORITY: u8 = TASK_PRIORITY;

/// Core the log drain is pinned to: the decoder's, never the encoder's.
pub const LOG_DRAIN_CORE: u8 = DECODER_CORE;

/// Priority the application task raises itself to on ESP-IDF, for the same
/// reason as [`LOG_DRAIN_PRIORITY`]. The IDF main task runs on core 0.
pub const APP_TASK_PRIORITY: u8 = TASK_PRIORITY;

/// Log drain sleep when both streams are empty.
pub const LOG_DRAIN_IDLE_MS: u64 = 10;

/// Interval between dropped-message reports.
pub const DROP_REPORT_INTERVAL_US: i64 = 10_000_000;

/// Default output pin of the demo binary (DAC-capable GPIO25).
pub const DEFAULT_OUTPUT_PIN: u8 = 25;

/// Default input pin of the demo binary (GPIO36, ADC1 channel 0).
pub const DEFAULT_INPUT_PIN: u8 = 36;

/// Configuration of one encoder or decoder session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Frames per second (24, 25 or 30 in practice).
    pub fps: u32,
    /// Samples per second.
    pub sample_rate: u32,
    /// GPIO of the PWM output or ADC input.
    pub pin: u8,
    /// Wire variant between codec and peripheral.
    pub width: SampleWidth,
}

impl SessionConfig {
    /// Config at the fixed sample rate with 8-bit samples.
    pub const fn new(fps: u32, pin: u8) -> Self {
        Self {
            fps,
            sample_rate: SAMPLE_RATE_HZ,
            pin,
            width: SampleWidth::S8,
        }
    }

    /// Select the sample width.
    pub const fn with_width(mut self, width: SampleWidth) -> Self {
        self.width = width;
        self
    }

    /// Sample period in whole microseconds (the fraction is carried by the
    /// sample clock). `None` for a zero sample rate.
    pub const fn sample_period_us(&self) -> Option<u32> {
        1_000_000u32.checked_div(self.sample_rate)
    }
}

/// Placement of a real-time task.
#[derive(Clone, Copy, Debug)]
pub struct TaskSpec {
    /// NUL-terminated task name.
    pub name: &'static [u8],
    pub stack_size: usize,
    pub priority: u8,
    /// Core affinity; `None` lets the scheduler choose.
    pub core: Option<u8>,
}

impl TaskSpec {
    /// Encoder task placement.
    pub const ENCODER: Self = Self {
        name: ENCODER_TASK_NAME,
        stack_size: TASK_STACK_SIZE,
        priority: TASK_PRIORITY,
        core: Some(ENCODER_CORE),
    };

    /// Decoder task placement.
    pub const DECODER: Self = Self {
        name: DECODER_TASK_NAME,
        stack_size: TASK_STACK_SIZE,
        priority: TASK_PRIORITY,
        core: Some(DECODER_CORE),
    };

    /// Log drain placement.
    pub const LOG_DRAIN: Self = Self {
        name: LOG_DRAIN_TASK_NAME,
        stack_size: TASK_STACK_SIZE,
        priority: LOG_DRAIN_PRIORITY,
        core: Some(LOG_DRAIN_CORE),
    };

    /// Name without the terminator.
    pub fn name_str(&self) -> &'static str {
        let bytes = match self.name.split_last() {
            Some((&0, rest)) => rest,
            _ => self.name,
        };
        core::str::from_utf8(bytes).unwrap_or("ltc")
    }
}
