//! Real-time task spawning and cooperative cancellation.
//!
//! Tasks are `std::thread`s on both targets. On ESP-IDF the spawn is
//! wrapped in a `ThreadSpawnConfiguration` so the underlying FreeRTOS task
//! gets its name, stack size, priority and core from a [`TaskSpec`].
//!
//! Cancellation is a flag the loop checks once per sample; [`RtTask::stop`]
//! raises it and joins, handing back whatever the task returned.

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::config::TaskSpec;

/// Task control error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// K01: the scheduler refused the task
    Spawn,
    /// K02: the task panicked
    Panicked,
    /// K03: the task never received its input
    Lost,
}

impl TaskError {
    /// Get error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Spawn => "K01",
            Self::Panicked => "K02",
            Self::Lost => "K03",
        }
    }

    /// Get error message
    pub fn message(&self) -> &'static str {
        match self {
            Self::Spawn => "task could not be scheduled",
            Self::Panicked => "task panicked",
            Self::Lost => "task input lost",
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Shared cancellation flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the task to return.
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Handle of a running real-time task returning `T`.
pub struct RtTask<T> {
    name: &'static str,
    cancel: CancelToken,
    handle: JoinHandle<Option<T>>,
}

impl<T: Send + 'static> RtTask<T> {
    /// Spawn `body` with `input` moved into the task.
    ///
    /// If the task cannot be scheduled, `input` is handed back with the
    /// error so the caller keeps its resources.
    pub fn spawn_with<I, F>(spec: &TaskSpec, input: I, body: F) -> Result<Self, (TaskError, Option<I>)>
    where
        I: Send + 'static,
        F: FnOnce(I, CancelToken) -> T + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Some(input)));
        let task_slot = Arc::clone(&slot);
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let spawned = spawn_thread(spec, move || {
            let input = task_slot.lock().ok().and_then(|mut guard| guard.take());
            drop(task_slot);
            input.map(|input| body(input, token))
        });

        match spawned {
            Ok(handle) => Ok(Self {
                name: spec.name_str(),
                cancel,
                handle,
            }),
            Err(err) => {
                let input = Arc::try_unwrap(slot)
                    .ok()
                    .and_then(|m| m.into_inner().ok())
                    .flatten();
                Err((err, input))
            }
        }
    }

    /// Task name (without terminator).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True once the task body has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Raise the cancellation flag without waiting.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task to return.
    pub fn join(self) -> Result<T, TaskError> {
        match self.handle.join() {
            Ok(Some(out)) => Ok(out),
            Ok(None) => Err(TaskError::Lost),
            Err(_) => Err(TaskError::Panicked),
        }
    }

    /// Cancel and join. The task gets at most one sample period to notice.
    pub fn stop(self) -> Result<T, TaskError> {
        self.cancel();
        self.join()
    }
}

#[cfg(target_os = "espidf")]
fn spawn_thread<F, R>(spec: &TaskSpec, f: F) -> Result<JoinHandle<R>, TaskError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    use esp_idf_svc::hal::cpu::Core;
    use esp_idf_svc::hal::task::thread::ThreadSpawnConfiguration;

    let pin_to_core = match spec.core {
        Some(0) => Some(Core::Core0),
        Some(_) => Some(Core::Core1),
        None => None,
    };

    ThreadSpawnConfiguration {
        name: Some(spec.name),
        stack_size: spec.stack_size,
        priority: spec.priority,
        pin_to_core,
        ..Default::default()
    }
    .set()
    .map_err(|_| TaskError::Spawn)?;

    let spawned = std::thread::Builder::new()
        .name(spec.name_str().into())
        .stack_size(spec.stack_size)
        .spawn(f)
        .map_err(|_| TaskError::Spawn);

    // Later spawns (log drain, user threads) get the defaults back.
    let _ = ThreadSpawnConfiguration::default().set();

    spawned
}

#[cfg(not(target_os = "espidf"))]
fn spawn_thread<F, R>(spec: &TaskSpec, f: F) -> Result<JoinHandle<R>, TaskError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    std::thread::Builder::new()
        .name(spec.name_str().into())
        .spawn(f)
        .map_err(|_| TaskError::Spawn)
}
