//! One encoder and one decoder behind a single object.
//!
//! Both sessions run at the fixed sample rate; `begin_*` only takes the
//! frame rate and the pin. Dropping the node stops both tasks before their
//! engines are released.

use crate::clock::MicrosTimer;
use crate::codec::{CodecFactory, LtcCodec};
use crate::config::SessionConfig;
use crate::hal::timer::SystemTimer;
use crate::hal::{DutyOutput, SampleInput};
use crate::lifecycle::SessionState;
use crate::sample::SampleWidth;
use crate::session::{DecoderSession, EncoderSession, SessionError};
use crate::timecode::{Timecode, TimecodeError, TimecodeText};

/// LTC generator and reader.
pub struct LtcNode<P, I, C = LtcCodec, T = SystemTimer>
where
    P: DutyOutput,
    I: SampleInput,
    C: CodecFactory + Clone,
    T: MicrosTimer + Clone + Send + 'static,
{
    encoder: EncoderSession<P, C, T>,
    decoder: DecoderSession<I, C, T>,
    width: SampleWidth,
}

impl<P: DutyOutput, I: SampleInput> LtcNode<P, I> {
    pub fn new(output: P, input: I) -> Self {
        Self::with_parts(output, input, LtcCodec, SystemTimer::default())
    }
}

impl<P, I, C, T> LtcNode<P, I, C, T>
where
    P: DutyOutput,
    I: SampleInput,
    C: CodecFactory + Clone,
    T: MicrosTimer + Clone + Send + 'static,
{
    pub fn with_parts(output: P, input: I, codec: C, timer: T) -> Self {
        Self {
            encoder: EncoderSession::with_parts(output, codec.clone(), timer.clone()),
            decoder: DecoderSession::with_parts(input, codec, timer),
            width: SampleWidth::default(),
        }
    }

    /// Sample width used by later `begin_*` calls.
    pub fn with_width(mut self, width: SampleWidth) -> Self {
        self.width = width;
        self
    }

    pub fn begin_encoder(&mut self, fps: u32, output_pin: u8) -> Result<(), SessionError> {
        self.encoder
            .begin(SessionConfig::new(fps, output_pin).with_width(self.width))
    }

    pub fn begin_decoder(&mut self, fps: u32, input_pin: u8) -> Result<(), SessionError> {
        self.decoder
            .begin(SessionConfig::new(fps, input_pin).with_width(self.width))
    }

    pub fn set_timecode(&mut self, tc: Timecode) -> Result<(), TimecodeError> {
        self.encoder.set_timecode(tc)
    }

    /// Set from `hh:mm:ss:ff`.
    pub fn set_timecode_str(&mut self, text: &str) -> Result<(), TimecodeError> {
        self.encoder.set_timecode_str(text)
    }

    /// Set from discrete fields.
    pub fn set_timecode_fields(&mut self, hours: u8, minutes: u8, seconds: u8, frames: u8) -> Result<(), TimecodeError> {
        self.encoder.set_timecode(Timecode {
            hours,
            minutes,
            seconds,
            frames,
        })
    }

    pub fn run_encoder(&mut self) -> bool {
        self.encoder.run()
    }

    pub fn stop_encoder(&mut self) {
        self.encoder.stop();
    }

    pub fn run_decoder(&mut self) -> bool {
        self.decoder.run()
    }

    pub fn stop_decoder(&mut self) {
        self.decoder.stop();
    }

    /// `true` once per newly decoded frame.
    pub fn available(&self) -> bool {
        self.decoder.available()
    }

    /// Latest decoded timecode.
    pub fn timecode_string(&self) -> TimecodeText {
        self.decoder.timecode_string()
    }

    pub fn encoder_state(&mut self) -> SessionState {
        self.encoder.state()
    }

    pub fn decoder_state(&mut self) -> SessionState {
        self.decoder.state()
    }

    pub fn encoder(&mut self) -> &mut EncoderSession<P, C, T> {
        &mut self.encoder
    }

    pub fn decoder(&mut self) -> &mut DecoderSession<I, C, T> {
        &mut self.decoder
    }
}
