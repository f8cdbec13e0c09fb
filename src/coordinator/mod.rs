//! Asynchronous reparse coordination
//!
//! One worker thread keeps the backend parsed against the latest buffer
//! snapshot. The edit side only flips a dirty flag; the worker captures a
//! snapshot, takes the backend-access lock and reparses, then reports a
//! `ParseEvent` to the consumer.
//!
//! Guarantees:
//! - at most one backend call (reparse, completion or extraction) at a time,
//!   all serialized on the backend-access lock
//! - edits are coalesced: the latest state is always parsed eventually
//! - `shutdown` joins the worker and takes the backend lock before dropping
//!   the backend, so teardown never overlaps a parse

mod state;
mod worker;

pub use state::{CoordinatorState, CoordinatorStats, WorkerPhase};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::ParseBackend;
use crate::completion;
use crate::error::{BackendError, CoordinatorError};
use crate::messages::{ParseEvent, WorkerSignal};
use crate::model::CompletionSuggestion;
use crate::snapshot::{BufferSnapshot, FileIdentity, SnapshotProvider};
use state::{Signals, StatsCounters};

/// Default delay before retrying a parse whose locks were busy
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Tuning knobs for a coordinator
#[derive(Debug, Clone)]
pub struct CoordinatorOptions {
    /// Parse an include-redacted snapshot first, then the real content
    pub redact_first_parse: bool,
    /// How long the worker backs off when a lock is busy
    pub retry_interval: Duration,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            redact_first_parse: true,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// The backend behind the backend-access lock
pub(crate) enum BackendSlot<B> {
    Ready {
        backend: B,
        /// Revision of the last successfully parsed snapshot
        parsed_revision: Option<u64>,
    },
    Unavailable(String),
    TornDown,
}

pub(crate) struct Shared<B> {
    file: FileIdentity,
    provider: Arc<dyn SnapshotProvider>,
    options: CoordinatorOptions,
    backend: Mutex<BackendSlot<B>>,
    /// Mirrors `BackendSlot::Ready` so availability never waits on a parse
    available: AtomicBool,
    /// Snapshot handoff slot
    pending: Mutex<Option<BufferSnapshot>>,
    signals: Arc<Signals>,
    events: Sender<ParseEvent>,
    stats: StatsCounters,
}

/// Cheap handle for reporting edits from any thread
#[derive(Clone)]
pub struct EditNotifier {
    signals: Arc<Signals>,
}

impl EditNotifier {
    /// Mark the buffer dirty. O(1), never waits on a parse.
    pub fn notify_edit(&self) {
        self.signals.send(WorkerSignal::ParseRequested);
    }
}

impl std::fmt::Debug for EditNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditNotifier").finish_non_exhaustive()
    }
}

/// Owns the parse worker and the backend for one file
pub struct ParseCoordinator<B: ParseBackend> {
    shared: Arc<Shared<B>>,
    worker: Option<JoinHandle<()>>,
}

impl<B: ParseBackend> ParseCoordinator<B> {
    /// Start the worker for `file`.
    ///
    /// A failed backend construction is not fatal: the coordinator runs, and
    /// every cycle reports `ParseStatus::Unavailable`. The first cycle starts
    /// immediately.
    pub fn spawn(
        file: FileIdentity,
        backend: Result<B, BackendError>,
        provider: Arc<dyn SnapshotProvider>,
        options: CoordinatorOptions,
    ) -> Result<(Self, Receiver<ParseEvent>), CoordinatorError> {
        let slot = match backend {
            Ok(backend) => BackendSlot::Ready {
                backend,
                parsed_revision: None,
            },
            Err(err) => {
                tracing::warn!(file = %file, "starting without a parse backend: {}", err);
                BackendSlot::Unavailable(err.to_string())
            }
        };

        let available = matches!(slot, BackendSlot::Ready { .. });
        let (events, receiver) = mpsc::channel();
        let initial = CoordinatorState {
            dirty: true,
            ..CoordinatorState::default()
        };
        let shared = Arc::new(Shared {
            file,
            provider,
            options,
            backend: Mutex::new(slot),
            available: AtomicBool::new(available),
            pending: Mutex::new(None),
            signals: Arc::new(Signals::new(initial)),
            events,
            stats: StatsCounters::default(),
        });

        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("parse-worker".to_string())
            .spawn(move || worker::run(worker_shared))?;

        Ok((
            Self {
                shared,
                worker: Some(worker),
            },
            receiver,
        ))
    }

    pub fn file(&self) -> &FileIdentity {
        &self.shared.file
    }

    /// Handle to give to edit observers
    pub fn notifier(&self) -> EditNotifier {
        EditNotifier {
            signals: self.shared.signals.clone(),
        }
    }

    /// Mark the buffer dirty
    pub fn notify_edit(&self) {
        self.shared.signals.send(WorkerSignal::ParseRequested);
    }

    pub fn state(&self) -> CoordinatorState {
        self.shared.signals.inner.lock().state
    }

    pub fn phase(&self) -> WorkerPhase {
        self.shared.signals.inner.lock().phase
    }

    pub fn stats(&self) -> CoordinatorStats {
        self.shared.stats.snapshot()
    }

    /// False if the backend failed to construct or has been torn down.
    ///
    /// Does not take the backend lock.
    pub fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::Acquire)
    }

    pub fn is_shut_down(&self) -> bool {
        self.worker.is_none()
    }

    /// Run `f` with exclusive access to the backend.
    ///
    /// Blocks until any in-flight parse finishes. `f` also receives the
    /// revision of the last successful parse, which is the revision any data
    /// pulled from the backend belongs to.
    pub fn with_backend<R>(
        &self,
        f: impl FnOnce(&mut B, Option<u64>) -> R,
    ) -> Result<R, CoordinatorError> {
        let mut slot = self.shared.backend.lock();
        match &mut *slot {
            BackendSlot::Ready {
                backend,
                parsed_revision,
            } => Ok(f(backend, *parsed_revision)),
            BackendSlot::Unavailable(reason) => {
                Err(BackendError::Unavailable(reason.clone()).into())
            }
            BackendSlot::TornDown => Err(CoordinatorError::ShutDown),
        }
    }

    /// Complete at `(line, column)` as if the buffer ended at the cursor.
    ///
    /// Blocks on the backend lock. Never returns an empty list: with nothing
    /// to offer the result is the single sentinel entry.
    pub fn request_completion(&self, line: usize, column: usize) -> Vec<CompletionSuggestion> {
        let snapshot = self.shared.provider.capture().truncated_at(line, column);
        let file = &self.shared.file;
        let result =
            self.with_backend(|backend, _| backend.complete(file, &snapshot, line, column));
        let raw = match result {
            Ok(Ok(suggestions)) => suggestions,
            Ok(Err(err)) => {
                tracing::warn!(file = %file, line, column, "completion failed: {}", err);
                Vec::new()
            }
            Err(err) => {
                tracing::debug!(file = %file, "completion skipped: {}", err);
                Vec::new()
            }
        };
        tracing::debug!(file = %file, count = raw.len(), "completion suggestions");
        completion::finalize(raw)
    }

    /// Stop the worker and release the backend.
    ///
    /// Returns once the worker has exited and the backend has been dropped
    /// under its lock. Calling it again is a no-op.
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        tracing::debug!(file = %self.shared.file, "shutting down parse coordinator");
        self.shared.signals.send(WorkerSignal::Stop);
        if worker.join().is_err() {
            tracing::error!(file = %self.shared.file, "parse worker panicked");
        }

        // Waits for any backend call still holding the lock
        let mut slot = self.shared.backend.lock();
        self.shared.available.store(false, Ordering::Release);
        let backend = std::mem::replace(&mut *slot, BackendSlot::TornDown);
        drop(backend);
        drop(slot);
        tracing::debug!(file = %self.shared.file, "parse backend released");
    }
}

impl<B: ParseBackend> Drop for ParseCoordinator<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
