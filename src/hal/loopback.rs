//! In-memory wire between a PWM output and an ADC input.
//!
//! The output end stores the duty, the input end reads it back as the ADC
//! code an RC-filtered PWM signal would produce (`duty * 16`). Used by the
//! host build of the binary and by the loopback tests.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use super::{DutyOutput, HalError, SampleInput};
use crate::sample::{duty_to_adc, IDLE_DUTY};

#[derive(Debug)]
struct WireState {
    duty: AtomicU8,
    writes: AtomicU32,
    reads: AtomicU32,
}

/// Both ends of a loopback connection.
#[derive(Clone, Debug)]
pub struct LoopbackWire {
    state: Arc<WireState>,
}

impl LoopbackWire {
    pub fn new() -> Self {
        Self {
            state: Arc::new(WireState {
                duty: AtomicU8::new(IDLE_DUTY),
                writes: AtomicU32::new(0),
                reads: AtomicU32::new(0),
            }),
        }
    }

    /// PWM end.
    pub fn output(&self) -> LoopbackPwm {
        LoopbackPwm {
            state: Arc::clone(&self.state),
            pin: None,
        }
    }

    /// ADC end.
    pub fn input(&self) -> LoopbackAdc {
        LoopbackAdc {
            state: Arc::clone(&self.state),
            pin: None,
        }
    }

    /// Current duty on the wire.
    pub fn duty(&self) -> u8 {
        self.state.duty.load(Ordering::Acquire)
    }

    /// Duty writes so far.
    pub fn writes(&self) -> u32 {
        self.state.writes.load(Ordering::Relaxed)
    }

    /// ADC reads so far.
    pub fn reads(&self) -> u32 {
        self.state.reads.load(Ordering::Relaxed)
    }
}

impl Default for LoopbackWire {
    fn default() -> Self {
        Self::new()
    }
}

/// PWM end of a [`LoopbackWire`].
#[derive(Debug)]
pub struct LoopbackPwm {
    state: Arc<WireState>,
    pin: Option<u8>,
}

impl LoopbackPwm {
    pub fn pin(&self) -> Option<u8> {
        self.pin
    }
}

impl DutyOutput for LoopbackPwm {
    fn configure(&mut self, pin: u8, carrier_hz: u32) -> Result<(), HalError> {
        if carrier_hz == 0 {
            return Err(HalError::Config);
        }
        self.pin = Some(pin);
        self.state.duty.store(IDLE_DUTY, Ordering::Release);
        Ok(())
    }

    #[inline]
    fn set_duty(&mut self, duty: u8) -> Result<(), HalError> {
        self.state.duty.store(duty, Ordering::Release);
        self.state.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// ADC end of a [`LoopbackWire`].
#[derive(Debug)]
pub struct LoopbackAdc {
    state: Arc<WireState>,
    pin: Option<u8>,
}

impl LoopbackAdc {
    pub fn pin(&self) -> Option<u8> {
        self.pin
    }
}

impl SampleInput for LoopbackAdc {
    fn configure(&mut self, pin: u8) -> Result<(), HalError> {
        self.pin = Some(pin);
        Ok(())
    }

    #[inline]
    fn read_raw(&mut self) -> Result<u16, HalError> {
        self.state.reads.fetch_add(1, Ordering::Relaxed);
        Ok(duty_to_adc(self.state.duty.load(Ordering::Acquire)))
    }
}
