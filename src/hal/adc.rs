//! ADC1 sample input.
//!
//! Legacy one-shot ADC1 driver: 12-bit width, 11 dB attenuation (full
//! 0-3.3 V swing), one conversion per `read_raw`.

#[cfg(target_os = "espidf")]
use super::{HalError, SampleInput};

/// ADC1 channel wired to a GPIO on the ESP32, `None` if the pin has no
/// ADC1 channel (ADC2 is unusable while Wi-Fi runs).
pub const fn adc1_channel_for_pin(pin: u8) -> Option<u8> {
    match pin {
        36 => Some(0),
        37 => Some(1),
        38 => Some(2),
        39 => Some(3),
        32 => Some(4),
        33 => Some(5),
        34 => Some(6),
        35 => Some(7),
        _ => None,
    }
}

/// Sample input on an ADC1 channel.
#[cfg(target_os = "espidf")]
#[derive(Debug, Default)]
pub struct Adc1Input {
    channel: Option<esp_idf_svc::sys::adc1_channel_t>,
}

#[cfg(target_os = "espidf")]
impl Adc1Input {
    pub const fn new() -> Self {
        Self { channel: None }
    }
}

#[cfg(target_os = "espidf")]
impl SampleInput for Adc1Input {
    fn configure(&mut self, pin: u8) -> Result<(), HalError> {
        use esp_idf_svc::sys::{self, esp};

        let channel = adc1_channel_for_pin(pin).ok_or(HalError::InvalidPin)? as sys::adc1_channel_t;
        // SAFETY: plain driver calls with valid enum values
        unsafe {
            esp!(sys::adc1_config_width(sys::adc_bits_width_t_ADC_WIDTH_BIT_12)).map_err(|_| HalError::Config)?;
            esp!(sys::adc1_config_channel_atten(channel, sys::adc_atten_t_ADC_ATTEN_DB_11))
                .map_err(|_| HalError::Config)?;
        }
        self.channel = Some(channel);
        Ok(())
    }

    #[inline]
    fn read_raw(&mut self) -> Result<u16, HalError> {
        let channel = self.channel.ok_or(HalError::Read)?;
        // SAFETY: channel configured above
        let raw = unsafe { esp_idf_svc::sys::adc1_get_raw(channel) };
        if raw < 0 {
            return Err(HalError::Read);
        }
        Ok(raw as u16)
    }
}
