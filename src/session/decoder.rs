//! Decoder session: ADC codes → codec samples → frame mailbox.
//!
//! # Real-time loop (per sample)
//!
//! ```text
//! ┌─▶ cancelled? ─▶ exit
//! │   raw = input.read_raw()
//! │   engine.write([S::from_adc(raw)])
//! │   while let Some(frame) = engine.read() ─▶ mailbox.publish
//! └── clock.tick()
//! ```

use std::sync::Arc;

use crate::clock::{MicrosTimer, Pacer, SampleClock};
use crate::codec::{queue_depth_for, CodecFactory, DecodeEngine, LtcCodec};
use crate::config::{SessionConfig, TaskSpec};
use crate::fault::{FaultCode, FaultSnapshot};
use crate::hal::task::{CancelToken, RtTask};
use crate::hal::timer::SystemTimer;
use crate::hal::SampleInput;
use crate::lifecycle::{Lifecycle, LifecycleEvent, SessionState};
use crate::logging::LogSource;
use crate::mailbox::FrameMailbox;
use crate::sample::{Sample, SampleWidth};
use crate::session::{check_rate, SessionError, TaskStats};
use crate::timecode::{Timecode, TimecodeText};
use crate::{ltc_debug, ltc_error, ltc_info, ltc_warn, APP_LOG_STREAM, RT_LOG_STREAM};

struct DecoderParts<I, D> {
    input: I,
    engine: D,
}

#[derive(Default)]
struct DecoderShared {
    mailbox: FrameMailbox,
    stats: TaskStats,
}

type DecodeLoop<I, D, T> = fn(&mut DecoderParts<I, D>, T, u32, &DecoderShared, &CancelToken);

/// Recovers LTC from an ADC input in a real-time task.
pub struct DecoderSession<I, C = LtcCodec, T = SystemTimer>
where
    I: SampleInput,
    C: CodecFactory,
    T: MicrosTimer + Clone + Send + 'static,
{
    codec: C,
    timer: T,
    config: Option<SessionConfig>,
    lifecycle: Lifecycle,
    input: Option<I>,
    engine: Option<C::Decoder>,
    task: Option<RtTask<DecoderParts<I, C::Decoder>>>,
    shared: Arc<DecoderShared>,
}

impl<I: SampleInput> DecoderSession<I> {
    /// Session with the built-in codec and the system timer.
    pub fn new(input: I) -> Self {
        Self::with_parts(input, LtcCodec, SystemTimer::default())
    }
}

impl<I, C, T> DecoderSession<I, C, T>
where
    I: SampleInput,
    C: CodecFactory,
    T: MicrosTimer + Clone + Send + 'static,
{
    pub fn with_parts(input: I, codec: C, timer: T) -> Self {
        Self {
            codec,
            timer,
            config: None,
            lifecycle: Lifecycle::new(),
            input: Some(input),
            engine: None,
            task: None,
            shared: Arc::new(DecoderShared::default()),
        }
    }

    /// Configure the session: stop any running task, free the old engine,
    /// create a new one with a queue of `fps + 2` frames and select the ADC
    /// channel.
    pub fn begin(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        self.halt();
        drop(self.engine.take());
        self.config = None;
        self.shared.stats.reset();
        self.shared.mailbox.clear();

        match self.configure(config) {
            Ok(()) => {
                self.apply(LifecycleEvent::Begin);
                ltc_info!(
                    APP_LOG_STREAM,
                    LogSource::Decoder,
                    "begin: {} fps on GPIO{}, queue {}, {}-bit",
                    config.fps,
                    config.pin,
                    queue_depth_for(config.fps),
                    config.width.bits()
                );
                Ok(())
            }
            Err(err) => {
                self.apply(LifecycleEvent::BeginFailed);
                ltc_error!(APP_LOG_STREAM, LogSource::Decoder, "begin failed: {}", err);
                Err(err)
            }
        }
    }

    fn configure(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        check_rate(config.sample_rate)?;
        let input = self.input.as_mut().ok_or(SessionError::NoPeripheral)?;
        let engine = self
            .codec
            .create_decoder(config.sample_rate, config.fps, queue_depth_for(config.fps))?;
        input.configure(config.pin)?;
        self.engine = Some(engine);
        self.config = Some(config);
        Ok(())
    }

    /// Start the real-time task. Returns `true` if it is now running.
    pub fn run(&mut self) -> bool {
        self.reap();
        if !self.guard(LifecycleEvent::Run) {
            return false;
        }
        let Some(config) = self.config else {
            return false;
        };
        let parts = match (self.input.take(), self.engine.take()) {
            (Some(input), Some(engine)) => DecoderParts { input, engine },
            (input, engine) => {
                self.input = input;
                self.engine = engine;
                return false;
            }
        };

        let body: DecodeLoop<I, C::Decoder, T> = match config.width {
            SampleWidth::S8 => decode_loop::<i8, I, C::Decoder, T>,
            SampleWidth::S16 => decode_loop::<i16, I, C::Decoder, T>,
        };
        let shared = Arc::clone(&self.shared);
        let timer = self.timer.clone();
        let rate = config.sample_rate;

        let spawned = RtTask::spawn_with(&TaskSpec::DECODER, parts, move |mut parts, cancel| {
            body(&mut parts, timer, rate, &shared, &cancel);
            parts
        });

        match spawned {
            Ok(task) => {
                self.task = Some(task);
                self.apply(LifecycleEvent::Run);
                true
            }
            Err((err, parts)) => {
                if let Some(parts) = parts {
                    self.input = Some(parts.input);
                    self.engine = Some(parts.engine);
                }
                ltc_error!(APP_LOG_STREAM, LogSource::Decoder, "run failed: {}", err);
                false
            }
        }
    }

    /// Cancel the task and wait for it. No-op unless running.
    pub fn stop(&mut self) {
        self.reap();
        if !self.guard(LifecycleEvent::Stop) {
            return;
        }
        self.halt();
        self.apply(LifecycleEvent::Stop);
    }

    /// `true` exactly once per newly decoded frame.
    pub fn available(&self) -> bool {
        self.shared.mailbox.take_available()
    }

    /// Latest decoded timecode as `hh:mm:ss:ff`. Does not consume
    /// [`available`](Self::available).
    pub fn timecode_string(&self) -> TimecodeText {
        self.shared.mailbox.text()
    }

    /// Latest decoded timecode, `None` before the first frame.
    pub fn latest(&self) -> Option<Timecode> {
        self.shared.mailbox.latest()
    }

    /// Frames decoded since the last `begin`.
    pub fn frames_decoded(&self) -> u32 {
        self.shared.stats.frames()
    }

    /// Sample clock overrun events since the last `begin`.
    pub fn clock_overruns(&self) -> u32 {
        self.shared.stats.overruns()
    }

    pub fn fault(&self) -> FaultSnapshot {
        self.shared.stats.fault.snapshot()
    }

    /// Current state. Notices a task that ended on its own.
    pub fn state(&mut self) -> SessionState {
        self.reap();
        self.lifecycle.state()
    }

    pub fn is_running(&mut self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn config(&self) -> Option<SessionConfig> {
        self.config
    }

    fn halt(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        match task.stop() {
            Ok(parts) => {
                self.input = Some(parts.input);
                self.engine = Some(parts.engine);
            }
            Err(err) => {
                ltc_error!(APP_LOG_STREAM, LogSource::Decoder, "task lost: {}", err);
            }
        }
    }

    fn reap(&mut self) {
        if !self.task.as_ref().is_some_and(|t| t.is_finished()) {
            return;
        }
        self.halt();
        drop(self.engine.take());
        self.config = None;
        let fault = self.shared.stats.fault.snapshot();
        ltc_warn!(APP_LOG_STREAM, LogSource::Decoder, "task ended: {}, begin again", fault.code);
        self.apply(LifecycleEvent::TaskFailed);
    }

    fn guard(&self, event: LifecycleEvent) -> bool {
        let allowed = self.lifecycle.allows(event);
        if !allowed {
            ltc_debug!(
                APP_LOG_STREAM,
                LogSource::Session,
                "decoder: {:?} ignored while {}",
                event,
                self.lifecycle.state()
            );
        }
        allowed
    }

    fn apply(&mut self, event: LifecycleEvent) {
        if let Err(err) = self.lifecycle.apply(event) {
            ltc_debug!(APP_LOG_STREAM, LogSource::Session, "decoder: {}", err);
        }
    }
}

impl<I, C, T> Drop for DecoderSession<I, C, T>
where
    I: SampleInput,
    C: CodecFactory,
    T: MicrosTimer + Clone + Send + 'static,
{
    fn drop(&mut self) {
        self.halt();
        drop(self.engine.take());
    }
}

fn decode_loop<S, I, D, T>(
    parts: &mut DecoderParts<I, D>,
    timer: T,
    sample_rate: u32,
    shared: &DecoderShared,
    cancel: &CancelToken,
) where
    S: Sample,
    I: SampleInput,
    D: DecodeEngine,
    T: MicrosTimer,
{
    let mut clock = SampleClock::for_sample_rate(timer, sample_rate);
    clock.start();

    while !cancel.is_cancelled() {
        let raw = match parts.input.read_raw() {
            Ok(raw) => raw,
            Err(err) => {
                shared.stats.fault.set(FaultCode::InputRead, 0);
                ltc_error!(RT_LOG_STREAM, LogSource::Decoder, "sample read failed: {}", err);
                return;
            }
        };

        let sample = S::from_adc(raw);
        parts.engine.write(core::slice::from_ref(&sample));
        while let Some(frame) = parts.engine.read() {
            shared.mailbox.publish(frame.timecode);
            shared.stats.add_frame();
        }

        shared.stats.note_tick(clock.tick());
    }
}
