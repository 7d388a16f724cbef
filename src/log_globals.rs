//! Global log stream instances.
//!
//! One stream per context class so a chatty application can never push the
//! real-time tasks' messages out of the ring.

use crate::logging::LogStream;

/// Stream of the encoder and decoder tasks.
pub static RT_LOG_STREAM: LogStream = LogStream::new();

/// Stream of the application context (session control, node, binary).
pub static APP_LOG_STREAM: LogStream = LogStream::new();
