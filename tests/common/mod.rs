//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ltc_node::codec::{queue_depth_for, CodecError, CodecFactory, DecodeEngine, EncodeEngine, LtcCodec};
use ltc_node::config::SAMPLE_RATE_HZ;
use ltc_node::hal::{DutyOutput, HalError, SampleInput};
use ltc_node::sample::{duty_to_adc, Sample, ADC_MID_CODE};
use ltc_node::Timecode;

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        std::thread::yield_now();
    }
    cond()
}

pub const TIMEOUT: Duration = Duration::from_secs(20);

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Shared view of the duties a [`RecordingOutput`] received.
#[derive(Clone, Default)]
pub struct DutyLog(Arc<Mutex<Vec<u8>>>);

impl DutyLog {
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn snapshot(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

/// PWM output that records every duty write.
pub struct RecordingOutput {
    log: DutyLog,
    pin: Option<u8>,
    carrier_hz: u32,
    /// Writes accepted before every further write fails.
    fail_after: Option<usize>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self {
            log: DutyLog::default(),
            pin: None,
            carrier_hz: 0,
            fail_after: None,
        }
    }

    pub fn failing_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::new()
        }
    }

    pub fn log(&self) -> DutyLog {
        self.log.clone()
    }
}

impl DutyOutput for RecordingOutput {
    fn configure(&mut self, pin: u8, carrier_hz: u32) -> Result<(), HalError> {
        self.pin = Some(pin);
        self.carrier_hz = carrier_hz;
        Ok(())
    }

    fn set_duty(&mut self, duty: u8) -> Result<(), HalError> {
        let mut log = self.log.0.lock().unwrap();
        if self.fail_after.is_some_and(|n| log.len() >= n) {
            return Err(HalError::Write);
        }
        log.push(duty);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Feed handle of a [`ScriptedInput`].
#[derive(Clone, Default)]
pub struct Script {
    codes: Arc<Mutex<VecDeque<u16>>>,
    reads: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl Script {
    /// Release a gated input: from now on an empty queue reads as silence.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn push(&self, codes: &[u16]) {
        self.codes.lock().unwrap().extend(codes.iter().copied());
    }

    /// Codes not yet read.
    pub fn remaining(&self) -> usize {
        self.codes.lock().unwrap().len()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

/// ADC input replaying queued codes, then silence (mid code).
///
/// A gated input instead waits for more codes while its queue is empty, so
/// the decoder sees one continuous signal however slowly the test feeds it.
/// The wait ends on [`Script::close`] or after [`TIMEOUT`].
pub struct ScriptedInput {
    script: Script,
    pin: Option<u8>,
    fail_reads: bool,
    gated: bool,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self {
            script: Script::default(),
            pin: None,
            fail_reads: false,
            gated: false,
        }
    }

    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_reads: true,
            ..Self::new()
        }
    }

    pub fn script(&self) -> Script {
        self.script.clone()
    }
}

impl SampleInput for ScriptedInput {
    fn configure(&mut self, pin: u8) -> Result<(), HalError> {
        if ltc_node::hal::adc1_channel_for_pin(pin).is_none() {
            return Err(HalError::InvalidPin);
        }
        self.pin = Some(pin);
        Ok(())
    }

    fn read_raw(&mut self) -> Result<u16, HalError> {
        if self.fail_reads {
            return Err(HalError::Read);
        }
        self.script.reads.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        loop {
            if let Some(code) = self.script.codes.lock().unwrap().pop_front() {
                return Ok(code);
            }
            if !self.gated || self.script.closed.load(Ordering::Acquire) || start.elapsed() > TIMEOUT {
                return Ok(ADC_MID_CODE);
            }
            std::thread::yield_now();
        }
    }
}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Engine accounting shared by a [`CountingCodec`] and its engines.
#[derive(Default)]
pub struct EngineCounts {
    live: AtomicUsize,
    max_live: AtomicUsize,
    created: AtomicUsize,
}

impl EngineCounts {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    fn on_create(&self) {
        self.created.fetch_add(1, Ordering::SeqCst);
        let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(live, Ordering::SeqCst);
    }
}

/// Engine wrapper that reports its drop.
pub struct Counted<E> {
    inner: E,
    counts: Arc<EngineCounts>,
    huge_frames: bool,
}

impl<E> Drop for Counted<E> {
    fn drop(&mut self) {
        self.counts.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<E: EncodeEngine> EncodeEngine for Counted<E> {
    fn frame_len(&self) -> usize {
        if self.huge_frames {
            usize::MAX
        } else {
            self.inner.frame_len()
        }
    }

    fn timecode(&self) -> Timecode {
        self.inner.timecode()
    }

    fn set_timecode(&mut self, tc: Timecode) {
        self.inner.set_timecode(tc);
    }

    fn set_user_bits(&mut self, bits: u32) {
        self.inner.set_user_bits(bits);
    }

    fn encode_frame<S: Sample>(&mut self, out: &mut [S]) -> usize {
        self.inner.encode_frame(out)
    }

    fn advance(&mut self) {
        self.inner.advance();
    }
}

impl<D: DecodeEngine> DecodeEngine for Counted<D> {
    fn write<S: Sample>(&mut self, samples: &[S]) {
        self.inner.write(samples);
    }

    fn read(&mut self) -> Option<ltc_node::DecodedFrame> {
        self.inner.read()
    }

    fn pending(&self) -> usize {
        self.inner.pending()
    }
}

/// [`LtcCodec`] with live-engine accounting.
#[derive(Clone, Default)]
pub struct CountingCodec {
    counts: Arc<EngineCounts>,
    huge_frames: bool,
}

impl CountingCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encoders whose frame buffer can never be allocated.
    pub fn with_huge_frames() -> Self {
        Self {
            huge_frames: true,
            ..Self::default()
        }
    }

    pub fn counts(&self) -> Arc<EngineCounts> {
        Arc::clone(&self.counts)
    }
}

impl CodecFactory for CountingCodec {
    type Encoder = Counted<<LtcCodec as CodecFactory>::Encoder>;
    type Decoder = Counted<<LtcCodec as CodecFactory>::Decoder>;

    fn create_encoder(&self, sample_rate: u32, fps: u32) -> Result<Self::Encoder, CodecError> {
        let inner = LtcCodec.create_encoder(sample_rate, fps)?;
        self.counts.on_create();
        Ok(Counted {
            inner,
            counts: Arc::clone(&self.counts),
            huge_frames: self.huge_frames,
        })
    }

    fn create_decoder(&self, sample_rate: u32, fps: u32, queue_depth: usize) -> Result<Self::Decoder, CodecError> {
        let inner = LtcCodec.create_decoder(sample_rate, fps, queue_depth)?;
        self.counts.on_create();
        Ok(Counted {
            inner,
            counts: Arc::clone(&self.counts),
            huge_frames: false,
        })
    }
}

// ---------------------------------------------------------------------------
// Signal helpers
// ---------------------------------------------------------------------------

/// ADC codes of `frames` LTC frames starting at `start`, as the decoder
/// would read them from a looped-back PWM output.
pub fn encoded_adc_codes<S: Sample>(start: Timecode, fps: u32, frames: usize) -> Vec<u16> {
    let mut enc = LtcCodec.create_encoder(SAMPLE_RATE_HZ, fps).unwrap();
    enc.set_timecode(start);
    let mut buf = vec![S::default(); enc.frame_len()];
    let mut codes = Vec::with_capacity(buf.len() * frames);
    for _ in 0..frames {
        let n = enc.encode_frame(&mut buf);
        codes.extend(buf[..n].iter().map(|s| duty_to_adc(s.to_duty())));
        enc.advance();
    }
    codes
}

/// Decode a recorded duty stream the way the decoder task would.
pub fn decode_duties<S: Sample>(duties: &[u8], fps: u32) -> Vec<Timecode> {
    let mut dec = LtcCodec
        .create_decoder(SAMPLE_RATE_HZ, fps, queue_depth_for(fps))
        .unwrap();
    let mut out = Vec::new();
    for &duty in duties {
        let sample = S::from_adc(duty_to_adc(duty));
        dec.write(std::slice::from_ref(&sample));
        while let Some(frame) = dec.read() {
            out.push(frame.timecode);
        }
    }
    out
}

pub fn tc(hours: u8, minutes: u8, seconds: u8, frames: u8) -> Timecode {
    Timecode {
        hours,
        minutes,
        seconds,
        frames,
    }
}
