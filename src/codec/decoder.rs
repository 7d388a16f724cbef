//! Streaming biphase-mark LTC decoder.
//!
//! # Pipeline
//!
//! ```text
//! samples ──▶ hysteresis ──▶ edge intervals ──▶ bits ──▶ 80-bit window ──▶ frames
//!             (±3% FS)       long = 0           shift     sync word at
//!                            short+short = 1    register  bits 64..80
//! ```
//!
//! The bit period starts at its nominal value for (sample rate, fps) and
//! follows the incoming signal, so moderate speed deviations still lock.

use std::collections::VecDeque;

use super::frame::{has_sync, unpack_frame, FRAME_BITS};
use super::{CodecError, DecodeEngine, DecodedFrame};
use crate::sample::Sample;

/// Hysteresis threshold as a full-scale `i16` level.
const HYSTERESIS: i16 = 1024;

/// Fixed-point shift of the bit period estimate.
const Q: u32 = 8;

/// LTC decoder engine.
#[derive(Debug)]
pub struct LtcDecoder {
    /// Nominal samples per bit, Q8.
    nominal_q8: u32,
    /// Tracked samples per bit, Q8.
    period_q8: u32,
    /// Current input polarity, `None` until the signal leaves the dead band.
    high: Option<bool>,
    /// Samples since the last edge, saturating at `max_interval`.
    since_edge: u32,
    /// Longer than any interval that keeps sync (four nominal bits).
    max_interval: u32,
    /// First half of a `1` seen, waiting for the second.
    half_pending: bool,
    /// Received bits, newest at bit 79.
    window: u128,
    /// Bits received since the last frame or sync loss.
    bit_count: u32,
    /// Stream position (samples consumed).
    position: u64,
    queue: VecDeque<DecodedFrame>,
    depth: usize,
    /// Frames dropped because the queue was full.
    dropped: u32,
}

impl LtcDecoder {
    pub(crate) fn new(sample_rate: u32, fps: u32, queue_depth: usize) -> Result<Self, CodecError> {
        let nominal_q8 = (sample_rate << Q) / (fps * FRAME_BITS as u32);
        let mut queue = VecDeque::new();
        queue
            .try_reserve_exact(queue_depth)
            .map_err(|_| CodecError::OutOfMemory)?;
        Ok(Self {
            nominal_q8,
            period_q8: nominal_q8,
            high: None,
            since_edge: 0,
            max_interval: ((nominal_q8 >> Q) + 1) * 4,
            half_pending: false,
            window: 0,
            bit_count: 0,
            position: 0,
            queue,
            depth: queue_depth,
            dropped: 0,
        })
    }

    /// Current bit period estimate in samples (rounded down).
    pub fn bit_period(&self) -> u32 {
        self.period_q8 >> Q
    }

    /// Frames discarded because nobody read them in time.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Total samples consumed.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn lose_sync(&mut self) {
        self.half_pending = false;
        self.bit_count = 0;
        self.period_q8 = self.nominal_q8;
    }

    fn on_edge(&mut self, interval: u32) {
        let iv_q8 = interval << Q;
        let t = self.period_q8;

        if iv_q8 > t + t * 3 / 4 || iv_q8 < t / 4 {
            self.lose_sync();
            return;
        }

        if iv_q8 * 4 > t * 3 {
            // Whole bit without a mid transition.
            if self.half_pending {
                self.lose_sync();
                return;
            }
            self.period_q8 = t - t / 16 + iv_q8 / 16;
            self.period_q8 = self
                .period_q8
                .clamp(self.nominal_q8 / 2, self.nominal_q8 * 2);
            self.push_bit(false);
        } else if self.half_pending {
            self.half_pending = false;
            self.push_bit(true);
        } else {
            self.half_pending = true;
        }
    }

    fn push_bit(&mut self, one: bool) {
        self.window = (self.window >> 1) | (u128::from(one) << (FRAME_BITS - 1));
        self.bit_count += 1;

        if self.bit_count < FRAME_BITS as u32 || !has_sync(self.window) {
            return;
        }

        if let Some(fields) = unpack_frame(self.window) {
            let span = u64::from((self.period_q8 * FRAME_BITS as u32) >> Q);
            let frame = DecodedFrame {
                timecode: fields.timecode,
                user_bits: fields.user_bits,
                drop_frame: fields.drop_frame,
                sample_start: self.position.saturating_sub(span),
                sample_end: self.position,
            };
            if self.queue.len() >= self.depth {
                self.queue.pop_front();
                self.dropped = self.dropped.saturating_add(1);
            }
            self.queue.push_back(frame);
        }
        self.bit_count = 0;
    }

    #[inline]
    fn feed(&mut self, level: i16) {
        self.position += 1;
        if self.since_edge < self.max_interval {
            self.since_edge += 1;
        }

        let now_high = if level > HYSTERESIS {
            Some(true)
        } else if level < -HYSTERESIS {
            Some(false)
        } else {
            self.high
        };

        match (self.high, now_high) {
            (None, Some(_)) => {
                // First excursion out of the dead band marks an edge.
                self.high = now_high;
                self.since_edge = 0;
            }
            (Some(was), Some(is)) if was != is => {
                self.high = now_high;
                let interval = self.since_edge;
                self.since_edge = 0;
                self.on_edge(interval);
            }
            _ => {}
        }
    }
}

impl DecodeEngine for LtcDecoder {
    fn write<S: Sample>(&mut self, samples: &[S]) {
        for s in samples {
            self.feed(s.to_level());
        }
    }

    fn read(&mut self) -> Option<DecodedFrame> {
        self.queue.pop_front()
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }
}
