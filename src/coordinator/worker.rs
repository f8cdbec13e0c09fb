//! The parse worker loop
//!
//! ```text
//! Idle ──dirty──▶ AwaitingSnapshot ──locks acquired──▶ Parsing ──▶ Idle
//!   ▲                   │ lock busy: pause(retry) and retry   │
//!   └───────────────────┴──────────── stop ───────────────────┴──▶ Stopped
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use super::state::{StatsCounters, WorkerPhase};
use super::{BackendSlot, Shared};
use crate::backend::ParseBackend;
use crate::error::BackendError;
use crate::messages::{ParseEvent, ParseOutcome, ParseStatus, WorkerSignal};
use crate::snapshot::BufferSnapshot;

/// What the worker should do after waking up
enum Wake {
    Capture,
    Retry,
    Stop,
}

pub(super) fn run<B: ParseBackend>(shared: Arc<Shared<B>>) {
    tracing::debug!(file = %shared.file, "parse worker started");
    let mut first_parse = shared.options.redact_first_parse;

    loop {
        match wait_for_work(&shared) {
            Wake::Stop => break,
            Wake::Capture => {
                // Captured outside the signal lock so edits never wait on us
                let snapshot = if first_parse {
                    shared.provider.capture_redacted()
                } else {
                    shared.provider.capture()
                };
                tracing::trace!(revision = snapshot.revision(), "snapshot captured");
                let mut pending = shared.pending.lock();
                *pending = Some(snapshot);
                shared.signals.inner.lock().state.snapshot_ready = true;
                drop(pending);
            }
            Wake::Retry => {}
        }

        let Some((slot, snapshot)) = try_begin_parse(&shared) else {
            StatsCounters::bump(&shared.stats.deferrals);
            tracing::trace!("backend or snapshot lock busy, deferring parse");
            shared.signals.pause(shared.options.retry_interval);
            continue;
        };

        let outcome = parse(&shared, slot, snapshot);
        shared.signals.set_phase(WorkerPhase::Idle);

        if outcome.redacted {
            // The redacted parse only seeds highlighting; follow up with the real content
            first_parse = false;
            shared.signals.send(WorkerSignal::ParseRequested);
        }

        if shared.events.send(ParseEvent::ParseCompleted(outcome)).is_err() {
            tracing::trace!("parse event receiver dropped");
        }
    }

    shared.signals.set_phase(WorkerPhase::Stopped);
    let _ = shared.events.send(ParseEvent::Stopped);
    tracing::debug!(file = %shared.file, "parse worker stopped");
}

/// Block until there is something to do or a stop is requested.
///
/// The dirty flag is cleared here, before the snapshot is taken, so any edit
/// racing with the capture or the parse re-arms it for the next cycle.
fn wait_for_work<B: ParseBackend>(shared: &Shared<B>) -> Wake {
    let mut inner = shared.signals.inner.lock();
    loop {
        if inner.state.stopping {
            return Wake::Stop;
        }
        if inner.state.has_work() {
            break;
        }
        inner.phase = WorkerPhase::Idle;
        shared.signals.wake.wait(&mut inner);
    }

    inner.phase = WorkerPhase::AwaitingSnapshot;
    if inner.state.dirty {
        inner.state.dirty = false;
        Wake::Capture
    } else {
        Wake::Retry
    }
}

type BackendGuard<'a, B> = parking_lot::MutexGuard<'a, BackendSlot<B>>;

/// Non-blocking acquisition of both the backend and the pending snapshot
fn try_begin_parse<B: ParseBackend>(
    shared: &Shared<B>,
) -> Option<(BackendGuard<'_, B>, BufferSnapshot)> {
    let backend = shared.backend.try_lock()?;
    let mut pending = shared.pending.try_lock()?;
    // The flag only changes while the handoff slot is locked
    let mut inner = shared.signals.inner.lock();
    inner.state.snapshot_ready = false;
    let snapshot = pending.take()?;
    drop(pending);

    inner.phase = WorkerPhase::Parsing;
    Some((backend, snapshot))
}

fn parse<B: ParseBackend>(
    shared: &Shared<B>,
    mut slot: BackendGuard<'_, B>,
    snapshot: BufferSnapshot,
) -> ParseOutcome {
    let started = Instant::now();
    let revision = snapshot.revision();
    StatsCounters::bump(&shared.stats.cycles);

    let status = match &mut *slot {
        BackendSlot::Ready {
            backend,
            parsed_revision,
        } => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                backend.reparse(&shared.file, &snapshot)
            }))
            .unwrap_or_else(|_| {
                Err(BackendError::ReparseFailed {
                    file: shared.file.clone(),
                    reason: "backend panicked".to_string(),
                })
            });
            match result {
                Ok(()) => {
                    *parsed_revision = Some(revision);
                    ParseStatus::Parsed
                }
                Err(err) => {
                    tracing::warn!(file = %shared.file, revision, "reparse failed: {}", err);
                    ParseStatus::Failed(err)
                }
            }
        }
        BackendSlot::Unavailable(reason) => {
            tracing::debug!(file = %shared.file, "no backend, skipping parse: {}", reason);
            ParseStatus::Unavailable(reason.clone())
        }
        BackendSlot::TornDown => ParseStatus::Unavailable("backend torn down".to_string()),
    };
    drop(slot);

    if !matches!(status, ParseStatus::Parsed) {
        StatsCounters::bump(&shared.stats.failures);
    }

    let outcome = ParseOutcome {
        revision,
        status,
        redacted: snapshot.is_redacted(),
        elapsed: started.elapsed(),
    };
    tracing::debug!(
        file = %shared.file,
        revision,
        success = outcome.is_success(),
        redacted = outcome.redacted,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "parse cycle finished"
    );
    outcome
}
