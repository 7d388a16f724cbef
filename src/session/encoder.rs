//! Encoder session: timecode → codec samples → PWM duty.
//!
//! # Real-time loop
//!
//! ```text
//! ┌─▶ pending timecode? ─▶ engine.set_timecode
//! │   engine.encode_frame(buffer)          (buffer allocated once)
//! │   for each sample:
//! │       cancelled? ─▶ exit
//! │       output.set_duty(sample.to_duty())
//! │       clock.tick()                     (one sample period)
//! └── engine.advance()
//! ```
//!
//! On exit the output goes back to idle duty and the task hands the engine
//! and output back to the session.

use std::sync::Arc;

use crate::clock::{MicrosTimer, Pacer, SampleClock};
use crate::codec::{CodecFactory, EncodeEngine, LtcCodec};
use crate::config::{SessionConfig, TaskSpec, PWM_CARRIER_HZ};
use crate::fault::{FaultCode, FaultSnapshot};
use crate::hal::task::{CancelToken, RtTask};
use crate::hal::timer::SystemTimer;
use crate::hal::DutyOutput;
use crate::lifecycle::{Lifecycle, LifecycleEvent, SessionState};
use crate::logging::LogSource;
use crate::sample::{Sample, SampleWidth, IDLE_DUTY};
use crate::session::{check_rate, PendingTimecode, SessionError, TaskStats};
use crate::timecode::{Timecode, TimecodeError};
use crate::{ltc_debug, ltc_error, ltc_info, ltc_warn, APP_LOG_STREAM, RT_LOG_STREAM};

/// What the encoder task owns while it runs.
struct EncoderParts<P, E> {
    output: P,
    engine: E,
}

#[derive(Default)]
struct EncoderShared {
    pending: PendingTimecode,
    stats: TaskStats,
}

type EncodeLoop<P, E, T> = fn(&mut EncoderParts<P, E>, T, u32, &EncoderShared, &CancelToken);

/// Drives a PWM output with LTC from a real-time task.
pub struct EncoderSession<P, C = LtcCodec, T = SystemTimer>
where
    P: DutyOutput,
    C: CodecFactory,
    T: MicrosTimer + Clone + Send + 'static,
{
    codec: C,
    timer: T,
    config: Option<SessionConfig>,
    lifecycle: Lifecycle,
    /// `None` while the task owns it.
    output: Option<P>,
    /// `None` while uninitialized or while the task owns it.
    engine: Option<C::Encoder>,
    task: Option<RtTask<EncoderParts<P, C::Encoder>>>,
    shared: Arc<EncoderShared>,
}

impl<P: DutyOutput> EncoderSession<P> {
    /// Session with the built-in codec and the system timer.
    pub fn new(output: P) -> Self {
        Self::with_parts(output, LtcCodec, SystemTimer::default())
    }
}

impl<P, C, T> EncoderSession<P, C, T>
where
    P: DutyOutput,
    C: CodecFactory,
    T: MicrosTimer + Clone + Send + 'static,
{
    pub fn with_parts(output: P, codec: C, timer: T) -> Self {
        Self {
            codec,
            timer,
            config: None,
            lifecycle: Lifecycle::new(),
            output: Some(output),
            engine: None,
            task: None,
            shared: Arc::new(EncoderShared::default()),
        }
    }

    /// Configure the session: stop any running task, free the old engine,
    /// create a new one and set the output to idle duty.
    ///
    /// On failure the session is left uninitialized; `run` is then a no-op
    /// until a later `begin` succeeds.
    pub fn begin(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        self.halt();
        drop(self.engine.take());
        self.config = None;
        self.shared.stats.reset();
        let _ = self.shared.pending.take();

        match self.configure(config) {
            Ok(()) => {
                self.apply(LifecycleEvent::Begin);
                ltc_info!(
                    APP_LOG_STREAM,
                    LogSource::Encoder,
                    "begin: {} fps on GPIO{}, {} samples/frame, {}-bit",
                    config.fps,
                    config.pin,
                    self.engine.as_ref().map_or(0, |e| e.frame_len()),
                    config.width.bits()
                );
                Ok(())
            }
            Err(err) => {
                self.apply(LifecycleEvent::BeginFailed);
                ltc_error!(APP_LOG_STREAM, LogSource::Encoder, "begin failed: {}", err);
                Err(err)
            }
        }
    }

    fn configure(&mut self, config: SessionConfig) -> Result<(), SessionError> {
        check_rate(config.sample_rate)?;
        let output = self.output.as_mut().ok_or(SessionError::NoPeripheral)?;
        let engine = self.codec.create_encoder(config.sample_rate, config.fps)?;
        output.configure(config.pin, PWM_CARRIER_HZ)?;
        output.set_duty(IDLE_DUTY)?;
        self.engine = Some(engine);
        self.config = Some(config);
        Ok(())
    }

    /// Set the timecode of the next frame.
    ///
    /// While the task runs the value is applied at the next frame boundary,
    /// never mid-frame. Without an engine this is a no-op.
    pub fn set_timecode(&mut self, tc: Timecode) -> Result<(), TimecodeError> {
        self.reap();
        let Some(config) = self.config else {
            ltc_debug!(APP_LOG_STREAM, LogSource::Session, "encoder: set_timecode without engine");
            return Ok(());
        };
        tc.validate(config.fps)?;

        match self.engine.as_mut() {
            Some(engine) => engine.set_timecode(tc),
            None => self.shared.pending.put(tc),
        }
        Ok(())
    }

    /// Parse `hh:mm:ss:ff` and set it, see [`set_timecode`](Self::set_timecode).
    pub fn set_timecode_str(&mut self, text: &str) -> Result<(), TimecodeError> {
        let tc: Timecode = text.parse()?;
        self.set_timecode(tc)
    }

    /// Start the real-time task. Returns `true` if it is now running.
    ///
    /// No-op without a successful `begin` or while already running.
    pub fn run(&mut self) -> bool {
        self.reap();
        if !self.guard(LifecycleEvent::Run) {
            return false;
        }
        let Some(config) = self.config else {
            return false;
        };
        let parts = match (self.output.take(), self.engine.take()) {
            (Some(output), Some(engine)) => EncoderParts { output, engine },
            (output, engine) => {
                self.output = output;
                self.engine = engine;
                return false;
            }
        };

        let body: EncodeLoop<P, C::Encoder, T> = match config.width {
            SampleWidth::S8 => encode_loop::<i8, P, C::Encoder, T>,
            SampleWidth::S16 => encode_loop::<i16, P, C::Encoder, T>,
        };
        let shared = Arc::clone(&self.shared);
        let timer = self.timer.clone();
        let rate = config.sample_rate;

        let spawned = RtTask::spawn_with(&TaskSpec::ENCODER, parts, move |mut parts, cancel| {
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
                    self.output = Some(parts.output);
                    self.engine = Some(parts.engine);
                }
                ltc_error!(APP_LOG_STREAM, LogSource::Encoder, "run failed: {}", err);
                false
            }
        }
    }

    /// Cancel the task and wait for it. The output is left at idle duty.
    ///
    /// No-op unless running.
    pub fn stop(&mut self) {
        self.reap();
        if !self.guard(LifecycleEvent::Stop) {
            return;
        }
        self.halt();
        if let (Some(engine), Some(tc)) = (self.engine.as_mut(), self.shared.pending.take()) {
            engine.set_timecode(tc);
        }
        self.apply(LifecycleEvent::Stop);
    }

    /// Current state. Notices a task that ended on its own.
    pub fn state(&mut self) -> SessionState {
        self.reap();
        self.lifecycle.state()
    }

    pub fn is_running(&mut self) -> bool {
        self.state() == SessionState::Running
    }

    /// Active configuration, `None` while uninitialized.
    pub fn config(&self) -> Option<SessionConfig> {
        self.config
    }

    /// Timecode of the next frame, readable while the task is not running.
    pub fn timecode(&self) -> Option<Timecode> {
        self.engine.as_ref().map(|e| e.timecode())
    }

    /// Frames emitted since the last `begin`.
    pub fn frames_emitted(&self) -> u32 {
        self.shared.stats.frames()
    }

    /// Sample clock overrun events since the last `begin`.
    pub fn clock_overruns(&self) -> u32 {
        self.shared.stats.overruns()
    }

    pub fn fault(&self) -> FaultSnapshot {
        self.shared.stats.fault.snapshot()
    }

    /// Stop and join the task, taking its parts back.
    fn halt(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        match task.stop() {
            Ok(parts) => {
                self.output = Some(parts.output);
                self.engine = Some(parts.engine);
            }
            Err(err) => {
                ltc_error!(APP_LOG_STREAM, LogSource::Encoder, "task lost: {}", err);
            }
        }
    }

    /// Collect a task that returned on its own (fault) and drop its engine.
    fn reap(&mut self) {
        if !self.task.as_ref().is_some_and(|t| t.is_finished()) {
            return;
        }
        self.halt();
        drop(self.engine.take());
        self.config = None;
        let fault = self.shared.stats.fault.snapshot();
        ltc_warn!(
            APP_LOG_STREAM,
            LogSource::Encoder,
            "task ended: {} ({}), begin again",
            fault.code,
            fault.data
        );
        self.apply(LifecycleEvent::TaskFailed);
    }

    fn guard(&self, event: LifecycleEvent) -> bool {
        let allowed = self.lifecycle.allows(event);
        if !allowed {
            ltc_debug!(
                APP_LOG_STREAM,
                LogSource::Session,
                "encoder: {:?} ignored while {}",
                event,
                self.lifecycle.state()
            );
        }
        allowed
    }

    fn apply(&mut self, event: LifecycleEvent) {
        if let Err(err) = self.lifecycle.apply(event) {
            ltc_debug!(APP_LOG_STREAM, LogSource::Session, "encoder: {}", err);
        }
    }
}

impl<P, C, T> Drop for EncoderSession<P, C, T>
where
    P: DutyOutput,
    C: CodecFactory,
    T: MicrosTimer + Clone + Send + 'static,
{
    fn drop(&mut self) {
        // Task first, engine second.
        self.halt();
        drop(self.engine.take());
    }
}

fn encode_loop<S, P, E, T>(
    parts: &mut EncoderParts<P, E>,
    timer: T,
    sample_rate: u32,
    shared: &EncoderShared,
    cancel: &CancelToken,
) where
    S: Sample,
    P: DutyOutput,
    E: EncodeEngine,
    T: MicrosTimer,
{
    let len = parts.engine.frame_len();
    let mut frame: Vec<S> = Vec::new();
    if frame.try_reserve_exact(len).is_err() {
        shared
            .stats
            .fault
            .set(FaultCode::BufferAlloc, u32::try_from(len).unwrap_or(u32::MAX));
        ltc_error!(RT_LOG_STREAM, LogSource::Encoder, "no memory for {} sample frame", len);
        return;
    }
    frame.resize(len, S::default());

    let mut clock = SampleClock::for_sample_rate(timer, sample_rate);
    clock.start();

    'frames: while !cancel.is_cancelled() {
        if let Some(tc) = shared.pending.take() {
            parts.engine.set_timecode(tc);
        }
        let n = parts.engine.encode_frame(&mut frame);

        for &sample in &frame[..n] {
            if cancel.is_cancelled() {
                break 'frames;
            }
            if parts.output.set_duty(sample.to_duty()).is_err() {
                shared.stats.fault.set(FaultCode::OutputWrite, 0);
                ltc_error!(RT_LOG_STREAM, LogSource::Encoder, "duty write failed");
                break 'frames;
            }
            shared.stats.note_tick(clock.tick());
        }

        parts.engine.advance();
        shared.stats.add_frame();
    }

    if let Err(err) = parts.output.set_duty(IDLE_DUTY) {
        if !shared.stats.fault.is_active() {
            shared.stats.fault.set(FaultCode::OutputWrite, u32::from(IDLE_DUTY));
        }
        ltc_error!(RT_LOG_STREAM, LogSource::Encoder, "idle duty restore failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{LoopbackWire, StepTimer};

    #[test]
    fn test_begin_sets_idle_and_state() {
        let wire = LoopbackWire::new();
        let mut enc = EncoderSession::with_parts(wire.output(), LtcCodec, StepTimer::default());
        assert_eq!(enc.state(), SessionState::Uninitialized);

        enc.begin(SessionConfig::new(25, 25)).unwrap();
        assert_eq!(enc.state(), SessionState::Initialized);
        assert_eq!(wire.duty(), IDLE_DUTY);
        assert_eq!(enc.timecode(), Some(Timecode::ZERO));
    }

    #[test]
    fn test_begin_bad_fps_leaves_uninitialized() {
        let wire = LoopbackWire::new();
        let mut enc = EncoderSession::with_parts(wire.output(), LtcCodec, StepTimer::default());
        let err = enc.begin(SessionConfig::new(0, 25)).unwrap_err();
        assert_eq!(err, SessionError::Codec(crate::codec::CodecError::UnsupportedFps));
        assert_eq!(enc.state(), SessionState::Uninitialized);
        assert!(!enc.run());
    }

    #[test]
    fn test_set_timecode_before_run_updates_engine() {
        let wire = LoopbackWire::new();
        let mut enc = EncoderSession::with_parts(wire.output(), LtcCodec, StepTimer::default());
        enc.begin(SessionConfig::new(25, 25)).unwrap();
        enc.set_timecode_str("10:20:30:24").unwrap();
        assert_eq!(enc.timecode(), Some(Timecode { hours: 10, minutes: 20, seconds: 30, frames: 24 }));
        assert!(enc.set_timecode_str("10:20:30:25").is_err());
    }

    #[test]
    fn test_run_stop_returns_to_idle() {
        let wire = LoopbackWire::new();
        let mut enc = EncoderSession::with_parts(wire.output(), LtcCodec, StepTimer::new(4));
        enc.begin(SessionConfig::new(30, 25)).unwrap();
        assert!(enc.run());
        assert!(!enc.run());

        while wire.writes() < 100 {
            std::thread::yield_now();
        }
        enc.stop();
        assert_eq!(enc.state(), SessionState::Stopped);
        assert_eq!(wire.duty(), IDLE_DUTY);

        assert!(enc.run());
        enc.stop();
    }

    /// Accepts signal duties, rejects the idle duty once armed.
    struct StuckOutput {
        armed: bool,
        writes: Arc<core::sync::atomic::AtomicU32>,
    }

    impl DutyOutput for StuckOutput {
        fn configure(&mut self, _pin: u8, _carrier_hz: u32) -> Result<(), crate::hal::HalError> {
            Ok(())
        }

        fn set_duty(&mut self, duty: u8) -> Result<(), crate::hal::HalError> {
            if self.armed && duty == IDLE_DUTY {
                return Err(crate::hal::HalError::Write);
            }
            self.armed = true;
            self.writes.fetch_add(1, core::sync::atomic::Ordering::Relaxed);
            Ok(())
        }
    }

    #[test]
    fn test_failed_idle_restore_is_recorded() {
        let writes = Arc::new(core::sync::atomic::AtomicU32::new(0));
        let output = StuckOutput {
            armed: false,
            writes: Arc::clone(&writes),
        };
        let mut enc = EncoderSession::with_parts(output, LtcCodec, StepTimer::new(4));
        enc.begin(SessionConfig::new(25, 25)).unwrap();
        assert!(!enc.fault().active);

        assert!(enc.run());
        while writes.load(core::sync::atomic::Ordering::Relaxed) < 100 {
            std::thread::yield_now();
        }
        enc.stop();

        assert_eq!(enc.state(), SessionState::Stopped);
        let fault = enc.fault();
        assert!(fault.active);
        assert_eq!(fault.code, FaultCode::OutputWrite);
        assert_eq!(fault.data, u32::from(IDLE_DUTY));
    }
}
