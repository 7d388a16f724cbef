//! Biphase-mark LTC encoder.
//!
//! Every bit period starts with a level transition; a `1` adds a second
//! transition at mid-bit. The output level carries over from frame to frame.

use super::frame::{pack_frame, FrameFields, FRAME_BITS};
use super::{frame_len, EncodeEngine};
use crate::sample::Sample;
use crate::timecode::Timecode;

/// Output amplitude as a full-scale `i16` level (about -3 dBFS).
pub const DEFAULT_AMPLITUDE: i16 = 23_000;

/// LTC encoder engine.
#[derive(Debug)]
pub struct LtcEncoder {
    fps: u32,
    frame_len: usize,
    timecode: Timecode,
    user_bits: u32,
    /// Current output polarity.
    high: bool,
}

impl LtcEncoder {
    pub(crate) fn new(sample_rate: u32, fps: u32) -> Self {
        Self {
            fps,
            frame_len: frame_len(sample_rate, fps),
            timecode: Timecode::ZERO,
            user_bits: 0,
            high: false,
        }
    }

    #[inline]
    fn level<S: Sample>(&self) -> S {
        if self.high {
            S::from_level(DEFAULT_AMPLITUDE)
        } else {
            S::from_level(-DEFAULT_AMPLITUDE)
        }
    }
}

impl EncodeEngine for LtcEncoder {
    fn frame_len(&self) -> usize {
        self.frame_len
    }

    fn timecode(&self) -> Timecode {
        self.timecode
    }

    fn set_timecode(&mut self, tc: Timecode) {
        self.timecode = tc;
    }

    fn set_user_bits(&mut self, bits: u32) {
        self.user_bits = bits;
    }

    fn encode_frame<S: Sample>(&mut self, out: &mut [S]) -> usize {
        let word = pack_frame(
            &FrameFields {
                timecode: self.timecode,
                user_bits: self.user_bits,
                drop_frame: false,
            },
            self.fps,
        );

        let len = self.frame_len;
        let written = len.min(out.len());

        for bit in 0..FRAME_BITS {
            let start = bit * len / FRAME_BITS;
            let end = (bit + 1) * len / FRAME_BITS;
            let mid = start + (end - start) / 2;
            let one = (word >> bit) & 1 == 1;

            self.high = !self.high;
            for i in start..end {
                if one && i == mid {
                    self.high = !self.high;
                }
                if i < written {
                    out[i] = self.level();
                }
            }
        }
        written
    }

    fn advance(&mut self) {
        self.timecode.increment(self.fps);
    }
}
