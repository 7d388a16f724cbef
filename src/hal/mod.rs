//! Hardware abstraction layer for the timecode node.
//!
//! Thin wrappers around ESP-IDF peripherals behind two small traits.
//! Sessions only know [`DutyOutput`] and [`SampleInput`]; pacing and
//! encoding stay in the core modules, the HAL is just I/O.

pub mod adc;
pub mod loopback;
#[cfg(target_os = "espidf")]
pub mod pwm;
pub mod task;
pub mod timer;

use core::fmt;

pub use adc::adc1_channel_for_pin;
#[cfg(target_os = "espidf")]
pub use adc::Adc1Input;
pub use loopback::{LoopbackAdc, LoopbackPwm, LoopbackWire};
#[cfg(target_os = "espidf")]
pub use pwm::LedcOutput;
pub use task::{CancelToken, RtTask, TaskError};
pub use timer::{StdTimer, StepTimer, SystemTimer};

/// Peripheral error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// H01: pin cannot be used for this peripheral
    InvalidPin,
    /// H02: driver configuration rejected
    Config,
    /// H03: output write failed
    Write,
    /// H04: input read failed
    Read,
}

impl HalError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPin => "H01",
            Self::Config => "H02",
            Self::Write => "H03",
            Self::Read => "H04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidPin => "invalid pin",
            Self::Config => "peripheral configuration failed",
            Self::Write => "output write failed",
            Self::Read => "input read failed",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// PWM channel driven with an 8-bit duty.
pub trait DutyOutput: Send + 'static {
    /// Route the channel to `pin` with the given carrier and set the idle
    /// duty.
    fn configure(&mut self, pin: u8, carrier_hz: u32) -> Result<(), HalError>;

    /// Set and commit a new duty. Must return immediately.
    fn set_duty(&mut self, duty: u8) -> Result<(), HalError>;
}

/// ADC channel delivering raw 12-bit codes.
pub trait SampleInput: Send + 'static {
    /// Select the channel behind `pin` (fixed width and attenuation).
    fn configure(&mut self, pin: u8) -> Result<(), HalError>;

    /// One conversion. Must return immediately.
    fn read_raw(&mut self) -> Result<u16, HalError>;
}

impl<T: DutyOutput + ?Sized> DutyOutput for Box<T> {
    fn configure(&mut self, pin: u8, carrier_hz: u32) -> Result<(), HalError> {
        (**self).configure(pin, carrier_hz)
    }

    #[inline]
    fn set_duty(&mut self, duty: u8) -> Result<(), HalError> {
        (**self).set_duty(duty)
    }
}

impl<T: SampleInput + ?Sized> SampleInput for Box<T> {
    fn configure(&mut self, pin: u8) -> Result<(), HalError> {
        (**self).configure(pin)
    }

    #[inline]
    fn read_raw(&mut self) -> Result<u16, HalError> {
        (**self).read_raw()
    }
}
