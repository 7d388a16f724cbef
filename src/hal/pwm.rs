//! LEDC PWM output.
//!
//! Low-speed timer 0 drives channel 0 with 8-bit duty resolution. The duty
//! write and the commit (`ledc_update_duty`) happen in one call.

use esp_idf_svc::sys::{self, esp};

use super::{DutyOutput, HalError};
use crate::sample::IDLE_DUTY;

const SPEED_MODE: sys::ledc_mode_t = sys::ledc_mode_t_LEDC_LOW_SPEED_MODE;
const TIMER: sys::ledc_timer_t = sys::ledc_timer_t_LEDC_TIMER_0;
const CHANNEL: sys::ledc_channel_t = sys::ledc_channel_t_LEDC_CHANNEL_0;

/// PWM output on an LEDC channel.
#[derive(Debug, Default)]
pub struct LedcOutput {
    configured: bool,
}

impl LedcOutput {
    pub const fn new() -> Self {
        Self { configured: false }
    }
}

impl DutyOutput for LedcOutput {
    fn configure(&mut self, pin: u8, carrier_hz: u32) -> Result<(), HalError> {
        let timer = sys::ledc_timer_config_t {
            speed_mode: SPEED_MODE,
            duty_resolution: sys::ledc_timer_bit_t_LEDC_TIMER_8_BIT,
            timer_num: TIMER,
            freq_hz: carrier_hz,
            // clk_cfg: zero is LEDC_AUTO_CLK
            ..Default::default()
        };
        // SAFETY: plain driver call with a fully initialised config
        esp!(unsafe { sys::ledc_timer_config(&timer) }).map_err(|_| HalError::Config)?;

        let channel = sys::ledc_channel_config_t {
            gpio_num: i32::from(pin),
            speed_mode: SPEED_MODE,
            channel: CHANNEL,
            intr_type: sys::ledc_intr_type_t_LEDC_INTR_DISABLE,
            timer_sel: TIMER,
            duty: u32::from(IDLE_DUTY),
            hpoint: 0,
            ..Default::default()
        };
        // SAFETY: as above
        esp!(unsafe { sys::ledc_channel_config(&channel) }).map_err(|_| HalError::InvalidPin)?;

        self.configured = true;
        Ok(())
    }

    #[inline]
    fn set_duty(&mut self, duty: u8) -> Result<(), HalError> {
        if !self.configured {
            return Err(HalError::Write);
        }
        // SAFETY: channel configured above; both calls return immediately
        unsafe {
            esp!(sys::ledc_set_duty(SPEED_MODE, CHANNEL, u32::from(duty))).map_err(|_| HalError::Write)?;
            esp!(sys::ledc_update_duty(SPEED_MODE, CHANNEL)).map_err(|_| HalError::Write)
        }
    }
}
