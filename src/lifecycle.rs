//! Session lifecycle controller.
//!
//! ```text
//!              begin                run
//! Uninitialized ─────▶ Initialized ─────▶ Running
//!       ▲                   ▲  ▲   stop      │
//!       │ begin failed /    │  └─────────────┤
//!       │ task failed       │ begin          ▼
//!       └───────────────────┴──────────── Stopped ──run──▶ Running
//! ```
//!
//! `begin` is accepted from every state; the session must already have
//! stopped the task and released the old engine when it applies the event
//! (stop before free). Every other transition is checked here, in one
//! table, instead of as scattered null checks.

use core::fmt;

/// State of an encoder or decoder session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No engine.
    #[default]
    Uninitialized,
    /// Engine and peripheral configured, no task.
    Initialized,
    /// Real-time task scheduled.
    Running,
    /// Task cancelled; engine still held, may run again.
    Stopped,
}

impl SessionState {
    /// True if the session holds an engine.
    #[inline]
    pub fn has_engine(self) -> bool {
        !matches!(self, SessionState::Uninitialized)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initialized => "initialized",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to the lifecycle table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Engine created and peripheral configured.
    Begin,
    /// Engine creation or peripheral configuration failed.
    BeginFailed,
    /// Task scheduled.
    Run,
    /// Task cancelled and joined.
    Stop,
    /// Task ended on its own because of a fault; engine released.
    TaskFailed,
}

/// Rejected transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// L01: event not valid in the current state
    Misuse {
        state: SessionState,
        event: LifecycleEvent,
    },
}

impl LifecycleError {
    pub fn code(&self) -> &'static str {
        "L01"
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleError::Misuse { state, event } => {
                write!(f, "{}: {:?} not allowed while {}", self.code(), event, state)
            }
        }
    }
}

/// Validated session state.
#[derive(Clone, Copy, Debug, Default)]
pub struct Lifecycle {
    state: SessionState,
}

impl Lifecycle {
    pub const fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Would `event` be accepted now?
    pub fn allows(&self, event: LifecycleEvent) -> bool {
        Self::next(self.state, event).is_some()
    }

    /// Apply an event, returning the new state.
    pub fn apply(&mut self, event: LifecycleEvent) -> Result<SessionState, LifecycleError> {
        match Self::next(self.state, event) {
            Some(next) => {
                self.state = next;
                Ok(next)
            }
            None => Err(LifecycleError::Misuse {
                state: self.state,
                event,
            }),
        }
    }

    fn next(state: SessionState, event: LifecycleEvent) -> Option<SessionState> {
        use LifecycleEvent as E;
        use SessionState as S;

        match (state, event) {
            (_, E::Begin) => Some(S::Initialized),
            (_, E::BeginFailed) => Some(S::Uninitialized),
            (S::Initialized | S::Stopped, E::Run) => Some(S::Running),
            (S::Running, E::Stop) => Some(S::Stopped),
            (S::Running, E::TaskFailed) => Some(S::Uninitialized),
            _ => None,
        }
    }
}
