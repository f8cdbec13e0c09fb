//! Message types exchanged between the edit side and the parse worker
//!
//! The worker is driven by `WorkerSignal`s (delivered through its condition
//! variable) and reports back to the consumer with `ParseEvent`s over a
//! channel the consumer drains on its own thread.

use std::time::Duration;

use crate::error::BackendError;

/// Signals delivered to the parse worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerSignal {
    /// The buffer changed; parse the latest content
    ParseRequested,
    /// Terminate the worker loop
    Stop,
}

/// How a reparse cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    /// Backend state now reflects the snapshot
    Parsed,
    /// Backend reported failure; previous state retained
    Failed(BackendError),
    /// No backend could be constructed; nothing was parsed
    Unavailable(String),
}

/// Result of one reparse cycle.
///
/// Tokens, diagnostics and completions are pulled from the backend after the
/// fact; the outcome only says which snapshot was parsed and how it went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Revision of the snapshot that was handed to the backend
    pub revision: u64,
    pub status: ParseStatus,
    /// True for the include-redacted first parse
    pub redacted: bool,
    pub elapsed: Duration,
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ParseStatus::Parsed)
    }
}

/// Events delivered to the consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// A reparse cycle finished (successfully or not)
    ParseCompleted(ParseOutcome),
    /// The worker loop exited
    Stopped,
}
