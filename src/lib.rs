//! # ltc-node
//!
//! SMPTE Linear Timecode generator and reader for the ESP32: PWM out,
//! ADC in, both paced sample by sample at 48 kHz.
//!
//! ## Architecture
//!
//! ```text
//!  application                 real-time tasks (one per session)
//!  ───────────                 ─────────────────────────────────
//!  EncoderSession ─ pending ─▶ encode loop ─▶ DutyOutput (LEDC)
//!  DecoderSession ◀─ mailbox ─ decode loop ◀─ SampleInput (ADC1)
//!                                  │
//!                             SampleClock (spin on µs timer)
//! ```
//!
//! - A running task owns its engine and peripheral; `stop` hands them back,
//!   so an engine is never freed under its task.
//! - Application and tasks share only atomics: the pending timecode slot,
//!   the [`FrameMailbox`], fault state and counters.
//! - Real-time code logs through [`RT_LOG_STREAM`] and never blocks on
//!   output; the log drain task writes it out.

pub mod clock;
pub mod codec;
pub mod config;
pub mod fault;
pub mod hal;
pub mod lifecycle;
pub mod log_drain;
pub mod log_globals;
pub mod logging;
pub mod mailbox;
pub mod node;
pub mod sample;
pub mod session;
pub mod timecode;

pub use clock::{MicrosTimer, Pacer, SampleClock, Tick};
pub use codec::{CodecError, CodecFactory, DecodeEngine, DecodedFrame, EncodeEngine, LtcCodec};
pub use config::SessionConfig;
pub use fault::{FaultCode, FaultState};
pub use hal::{DutyOutput, HalError, SampleInput};
pub use lifecycle::{LifecycleError, SessionState};
pub use log_globals::{APP_LOG_STREAM, RT_LOG_STREAM};
pub use mailbox::FrameMailbox;
pub use node::LtcNode;
pub use sample::{Sample, SampleWidth};
pub use session::{DecoderSession, EncoderSession, SessionError};
pub use timecode::{Timecode, TimecodeError, TimecodeText};
