//! Module: sample
//!
//! Purpose: Wire mapping between codec samples and the two peripherals.
//! The codec speaks signed audio samples; the PWM channel wants an unsigned
//! 8-bit duty and the ADC delivers unsigned 12-bit codes centred on a DC bias
//! of half full scale.
//!
//! Architecture:
//! - One [`Sample`] trait, two wire variants (`i8`, `i16`)
//! - [`SampleWidth`] picks the variant at session configuration time; the
//!   real-time loops are monomorphised per variant (no per-sample branch)
//!
//! Safety: Safe. No unsafe blocks.

/// PWM duty resolution in bits.
pub const DUTY_BITS: u32 = 8;

/// Largest PWM duty value.
pub const MAX_DUTY: u8 = u8::MAX;

/// Mid-scale duty: the idle output level (signal zero).
pub const IDLE_DUTY: u8 = 128;

/// ADC conversion width in bits.
pub const ADC_BITS: u32 = 12;

/// Largest ADC code.
pub const ADC_MAX_CODE: u16 = (1 << ADC_BITS) - 1;

/// ADC code of a zero signal (input biased to half full scale).
pub const ADC_MID_CODE: u16 = 1 << (ADC_BITS - 1);

/// Sample width used by a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleWidth {
    /// Signed 8-bit samples. Duty mapping is a bijection.
    #[default]
    S8,
    /// Signed 16-bit samples. Duty keeps the top 8 bits.
    S16,
}

impl SampleWidth {
    /// Bits per sample.
    pub const fn bits(self) -> u32 {
        match self {
            SampleWidth::S8 => 8,
            SampleWidth::S16 => 16,
        }
    }
}

/// A signed audio sample as exchanged with the codec engine.
pub trait Sample: Copy + Default + Send + Sync + 'static {
    /// Width tag of this variant.
    const WIDTH: SampleWidth;

    /// Build from a full-scale `i16` reference level (truncating).
    fn from_level(level: i16) -> Self;

    /// Widen to a full-scale `i16` reference level.
    fn to_level(self) -> i16;

    /// Map to a center-justified 8-bit PWM duty.
    fn to_duty(self) -> u8;

    /// Quantize a raw 12-bit ADC code. Codes above the ADC range saturate.
    fn from_adc(raw: u16) -> Self;
}

impl Sample for i8 {
    const WIDTH: SampleWidth = SampleWidth::S8;

    #[inline]
    fn from_level(level: i16) -> Self {
        (level >> 8) as i8
    }

    #[inline]
    fn to_level(self) -> i16 {
        i16::from(self) << 8
    }

    /// `-128..=127` onto `0..=255`, one to one.
    #[inline]
    fn to_duty(self) -> u8 {
        (self as u8) ^ 0x80
    }

    /// `(raw >> 4) - 128`: the exact inverse of `duty * 16`.
    #[inline]
    fn from_adc(raw: u16) -> Self {
        let code = raw.min(ADC_MAX_CODE) >> (ADC_BITS - 8);
        (code as u8 ^ 0x80) as i8
    }
}

impl Sample for i16 {
    const WIDTH: SampleWidth = SampleWidth::S16;

    #[inline]
    fn from_level(level: i16) -> Self {
        level
    }

    #[inline]
    fn to_level(self) -> i16 {
        self
    }

    #[inline]
    fn to_duty(self) -> u8 {
        ((self >> 8) as u8) ^ 0x80
    }

    #[inline]
    fn from_adc(raw: u16) -> Self {
        let centred = i32::from(raw.min(ADC_MAX_CODE)) - i32::from(ADC_MID_CODE);
        (centred << (16 - ADC_BITS)) as i16
    }
}

/// ADC code a given duty produces when the PWM output is looped back
/// through an RC filter into the ADC (ideal, no loss).
#[inline]
pub const fn duty_to_adc(duty: u8) -> u16 {
    (duty as u16) << (ADC_BITS - DUTY_BITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_matches_type() {
        assert_eq!(<i8 as Sample>::WIDTH.bits(), i8::BITS);
        assert_eq!(<i16 as Sample>::WIDTH.bits(), i16::BITS);
        assert_eq!(SampleWidth::default().bits(), 8);
    }

    #[test]
    fn test_i8_duty_is_bijective() {
        let mut seen = [false; 256];
        for s in i8::MIN..=i8::MAX {
            let d = s.to_duty();
            assert!(!seen[d as usize], "duty {} hit twice", d);
            seen[d as usize] = true;
        }
        assert!(seen.iter().all(|&x| x));
        assert_eq!(0i8.to_duty(), IDLE_DUTY);
        assert_eq!(i8::MIN.to_duty(), 0);
        assert_eq!(i8::MAX.to_duty(), MAX_DUTY);
    }

    #[test]
    fn test_i16_duty_covers_range() {
        assert_eq!(i16::MIN.to_duty(), 0);
        assert_eq!(i16::MAX.to_duty(), MAX_DUTY);
        assert_eq!(0i16.to_duty(), IDLE_DUTY);
    }

    #[test]
    fn test_adc_mid_code_is_zero() {
        assert_eq!(i8::from_adc(ADC_MID_CODE), 0);
        assert_eq!(i16::from_adc(ADC_MID_CODE), 0);
        assert_eq!(i8::from_adc(0), i8::MIN);
        assert_eq!(i8::from_adc(ADC_MAX_CODE), i8::MAX);
        assert_eq!(i8::from_adc(u16::MAX), i8::MAX);
    }

    #[test]
    fn test_duty_adc_loopback_i8() {
        for s in i8::MIN..=i8::MAX {
            assert_eq!(i8::from_adc(duty_to_adc(s.to_duty())), s);
        }
    }
}
