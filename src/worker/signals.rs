//! Signal escalation state for the worker supervisor.
//!
//! Three termination-signal classes are recognized, each with its own
//! escalation policy:
//!
//! - **interrupt** (SIGINT): graceful shutdown only; the in-flight task
//!   is never killed.
//! - **terminate** (SIGTERM): graceful shutdown, plus the in-flight task
//!   process is killed immediately.
//! - **quit** (SIGQUIT): first occurrence behaves like interrupt; the
//!   second and later occurrences escalate to killing the task.
//!
//! All of this is one explicit state struct mutated through a single
//! synchronized entry point - the listener tasks delivering signals run
//! concurrently with the supervisor loop.

use std::sync::Mutex;

use tracing::{info, warn};

/// The three termination-signal classes the supervisor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalClass {
    Interrupt,
    Terminate,
    Quit,
}

impl SignalClass {
    /// Signal name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalClass::Interrupt => "SIGINT",
            SignalClass::Terminate => "SIGTERM",
            SignalClass::Quit => "SIGQUIT",
        }
    }
}

#[derive(Debug, Default)]
struct SignalStateInner {
    shutdown: bool,
    interrupts: u32,
    terminates: u32,
    quits: u32,
    task_pid: Option<u32>,
}

/// Shutdown flag, per-class signal counters, and the tracked pid of the
/// in-flight task process.
///
/// Shared between the supervisor loop and the signal listener tasks.
#[derive(Debug, Default)]
pub struct SignalState {
    inner: Mutex<SignalStateInner>,
}

/// What a recorded signal asks the delivering side to do.
#[derive(Debug, PartialEq, Eq)]
pub struct SignalAction {
    /// How many times this class has been seen, including this one.
    pub occurrence: u32,
    /// Pid of the in-flight task process to kill, when escalation says
    /// so and a task is in flight.
    pub kill_pid: Option<u32>,
}

impl SignalState {
    /// Creates a fresh state: no shutdown requested, no tracked task.
    pub fn new() -> Self {
        Self::default()
    }

    /// The single synchronized entry point for signal delivery.
    ///
    /// Always requests shutdown (idempotently - the flag only ever moves
    /// from false to true). When the class's escalation policy calls for
    /// it, the tracked task pid is taken out of the state and returned
    /// for the caller to kill.
    pub fn record(&self, class: SignalClass) -> SignalAction {
        let mut inner = self.inner.lock().expect("signal state lock poisoned");

        inner.shutdown = true;

        let occurrence = match class {
            SignalClass::Interrupt => {
                inner.interrupts += 1;
                inner.interrupts
            }
            SignalClass::Terminate => {
                inner.terminates += 1;
                inner.terminates
            }
            SignalClass::Quit => {
                inner.quits += 1;
                inner.quits
            }
        };

        let escalate = match class {
            SignalClass::Interrupt => false,
            SignalClass::Terminate => true,
            SignalClass::Quit => occurrence >= 2,
        };

        let kill_pid = if escalate { inner.task_pid.take() } else { None };

        SignalAction {
            occurrence,
            kill_pid,
        }
    }

    /// Whether graceful shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.inner.lock().expect("signal state lock poisoned").shutdown
    }

    /// Records the pid of the task process currently in flight.
    pub fn track_task(&self, pid: u32) {
        self.inner.lock().expect("signal state lock poisoned").task_pid = Some(pid);
    }

    /// Clears the tracked task pid (the task process has exited).
    pub fn clear_task(&self) {
        self.inner.lock().expect("signal state lock poisoned").task_pid = None;
    }

    /// Returns the currently tracked task pid, if any.
    pub fn tracked_task(&self) -> Option<u32> {
        self.inner.lock().expect("signal state lock poisoned").task_pid
    }
}

/// Applies a delivered signal: records it, logs it, and kills the
/// in-flight task process when the escalation policy calls for it.
///
/// The supervisor's wait loop then observes the abnormal exit and marks
/// the task failed through its normal path.
pub fn deliver(state: &SignalState, class: SignalClass) {
    let action = state.record(class);
    info!(
        signal = class.as_str(),
        occurrence = action.occurrence,
        "shutdown requested"
    );

    if let Some(pid) = action.kill_pid {
        warn!(signal = class.as_str(), pid, "killing in-flight task process");
        force_kill(pid);
    }
}

/// Sends SIGKILL to a process.
pub fn force_kill(pid: u32) {
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        warn!(pid, "failed to deliver SIGKILL");
    }
}

/// Makes the current process ignore the termination signals the
/// supervisor reacts to.
///
/// Task processes call this on startup: they either finish or are killed
/// outright, never stopped gracefully mid-task.
pub fn ignore_termination_signals() {
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_IGN);
        libc::signal(libc::SIGTERM, libc::SIG_IGN);
        libc::signal(libc::SIGQUIT, libc::SIG_IGN);
    }
}
