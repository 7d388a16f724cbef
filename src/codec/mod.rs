//! Timecode codec engine.
//!
//! The sessions only see the [`EncodeEngine`] / [`DecodeEngine`] traits and
//! create engines through a [`CodecFactory`]; [`LtcCodec`] is the built-in
//! SMPTE-12M implementation.
//!
//! Engines are generic over the wire [`Sample`] type, so one engine serves
//! both the 8-bit and the 16-bit variant.

pub mod decoder;
pub mod encoder;
pub mod frame;

pub use decoder::LtcDecoder;
pub use encoder::LtcEncoder;
pub use frame::FRAME_BITS;

use core::fmt;

use crate::config::MAX_FPS;
use crate::sample::Sample;
use crate::timecode::Timecode;

/// Minimum samples per bit the decoder can resolve.
pub const MIN_SAMPLES_PER_BIT: u32 = 8;

/// Extra queue slots on top of one second of frames.
pub const QUEUE_MARGIN: usize = 2;

/// Samples in one frame: `ceil(sample_rate / fps)`.
///
/// This is both the size of the encoder's frame buffer and the number of
/// samples one [`EncodeEngine::encode_frame`] call fills.
#[inline]
pub const fn frame_len(sample_rate: u32, fps: u32) -> usize {
    sample_rate.div_ceil(fps) as usize
}

/// Decoder queue depth for a frame rate. The decoder needs a few frames of
/// history to find sync; one second plus a margin is plenty.
#[inline]
pub const fn queue_depth_for(fps: u32) -> usize {
    fps as usize + QUEUE_MARGIN
}

/// Engine creation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// C01: fps is zero or above the supported maximum
    UnsupportedFps,
    /// C02: sample rate is zero or too low for the frame rate
    UnsupportedSampleRate,
    /// C03: decoder queue depth is zero
    ZeroQueue,
    /// C04: engine storage could not be allocated
    OutOfMemory,
}

impl CodecError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFps => "C01",
            Self::UnsupportedSampleRate => "C02",
            Self::ZeroQueue => "C03",
            Self::OutOfMemory => "C04",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnsupportedFps => "unsupported frame rate",
            Self::UnsupportedSampleRate => "unsupported sample rate",
            Self::ZeroQueue => "queue depth must be non-zero",
            Self::OutOfMemory => "out of memory",
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// A frame recovered by a decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedFrame {
    pub timecode: Timecode,
    pub user_bits: u32,
    pub drop_frame: bool,
    /// Stream position (in samples) where the frame began, approximately.
    pub sample_start: u64,
    /// Stream position (in samples) at which the frame completed.
    pub sample_end: u64,
}

/// Encode side of a codec engine.
pub trait EncodeEngine: Send + 'static {
    /// Samples produced per frame.
    fn frame_len(&self) -> usize;

    /// Timecode of the next frame to encode.
    fn timecode(&self) -> Timecode;

    /// Replace the timecode counter.
    fn set_timecode(&mut self, tc: Timecode);

    /// User bits carried by subsequent frames (eight 4-bit groups).
    fn set_user_bits(&mut self, bits: u32);

    /// Render the current frame into `out`, returning the number of samples
    /// written (`frame_len()` when `out` is large enough).
    fn encode_frame<S: Sample>(&mut self, out: &mut [S]) -> usize;

    /// Step the timecode counter to the next frame.
    fn advance(&mut self);
}

/// Decode side of a codec engine.
pub trait DecodeEngine: Send + 'static {
    /// Feed samples. Any number of frames may complete as a result.
    fn write<S: Sample>(&mut self, samples: &[S]);

    /// Pop the oldest completed frame.
    fn read(&mut self) -> Option<DecodedFrame>;

    /// Number of completed frames waiting.
    fn pending(&self) -> usize;
}

/// Creates engines for the sessions.
pub trait CodecFactory: Send + 'static {
    type Encoder: EncodeEngine;
    type Decoder: DecodeEngine;

    fn create_encoder(&self, sample_rate: u32, fps: u32) -> Result<Self::Encoder, CodecError>;

    fn create_decoder(&self, sample_rate: u32, fps: u32, queue_depth: usize) -> Result<Self::Decoder, CodecError>;
}

/// Built-in SMPTE-12M LTC codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct LtcCodec;

impl LtcCodec {
    fn check(sample_rate: u32, fps: u32) -> Result<(), CodecError> {
        if fps == 0 || fps > MAX_FPS {
            return Err(CodecError::UnsupportedFps);
        }
        if sample_rate == 0 || sample_rate / (fps * FRAME_BITS as u32) < MIN_SAMPLES_PER_BIT {
            return Err(CodecError::UnsupportedSampleRate);
        }
        Ok(())
    }
}

impl CodecFactory for LtcCodec {
    type Encoder = LtcEncoder;
    type Decoder = LtcDecoder;

    fn create_encoder(&self, sample_rate: u32, fps: u32) -> Result<LtcEncoder, CodecError> {
        Self::check(sample_rate, fps)?;
        Ok(LtcEncoder::new(sample_rate, fps))
    }

    fn create_decoder(&self, sample_rate: u32, fps: u32, queue_depth: usize) -> Result<LtcDecoder, CodecError> {
        Self::check(sample_rate, fps)?;
        if queue_depth == 0 {
            return Err(CodecError::ZeroQueue);
        }
        LtcDecoder::new(sample_rate, fps, queue_depth)
    }
}
