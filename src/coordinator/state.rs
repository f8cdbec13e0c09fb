//! Coordinator state shared between the edit side and the worker

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::messages::WorkerSignal;

/// Flags driving the worker loop.
///
/// `stopping` is never cleared once set. `snapshot_ready` means a captured
/// snapshot sits in the handoff slot waiting for the locks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorState {
    pub dirty: bool,
    pub snapshot_ready: bool,
    pub stopping: bool,
}

impl CoordinatorState {
    pub fn apply(&mut self, signal: WorkerSignal) {
        match signal {
            WorkerSignal::ParseRequested => {
                if !self.stopping {
                    self.dirty = true;
                }
            }
            WorkerSignal::Stop => self.stopping = true,
        }
    }

    /// Work is pending and the worker should not sleep
    pub fn has_work(&self) -> bool {
        self.dirty || self.snapshot_ready
    }
}

/// Where the worker loop currently is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerPhase {
    #[default]
    Idle,
    AwaitingSnapshot,
    Parsing,
    Stopped,
}

#[derive(Debug, Default)]
pub(crate) struct SignalState {
    pub state: CoordinatorState,
    pub phase: WorkerPhase,
}

/// Condition-variable mailbox the worker sleeps on
#[derive(Debug, Default)]
pub(crate) struct Signals {
    pub inner: Mutex<SignalState>,
    pub wake: Condvar,
}

impl Signals {
    pub fn new(initial: CoordinatorState) -> Self {
        Self {
            inner: Mutex::new(SignalState {
                state: initial,
                phase: WorkerPhase::Idle,
            }),
            wake: Condvar::new(),
        }
    }

    pub fn send(&self, signal: WorkerSignal) {
        self.inner.lock().state.apply(signal);
        match signal {
            WorkerSignal::ParseRequested => {
                self.wake.notify_one();
            }
            WorkerSignal::Stop => {
                self.wake.notify_all();
            }
        }
    }

    pub fn set_phase(&self, phase: WorkerPhase) {
        let mut inner = self.inner.lock();
        if inner.phase != phase {
            tracing::trace!(from = ?inner.phase, to = ?phase, "worker phase");
            inner.phase = phase;
        }
    }

    /// Sleep for at most `timeout`, returning early on any signal
    pub fn pause(&self, timeout: Duration) {
        let mut inner = self.inner.lock();
        if !inner.state.stopping {
            self.wake.wait_for(&mut inner, timeout);
        }
    }
}

/// Counters describing the worker's history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Reparse calls handed to the backend (or attempted without one)
    pub cycles: u64,
    /// Cycles that did not produce a new parse state
    pub failures: u64,
    /// Times the worker backed off because a lock was busy
    pub deferrals: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub cycles: AtomicU64,
    pub failures: AtomicU64,
    pub deferrals: AtomicU64,
}

impl StatsCounters {
    pub fn snapshot(&self) -> CoordinatorStats {
        CoordinatorStats {
            cycles: self.cycles.load(Ordering::Acquire),
            failures: self.failures.load(Ordering::Acquire),
            deferrals: self.deferrals.load(Ordering::Acquire),
        }
    }

    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::AcqRel);
    }
}
