//! Parse backend interface
//!
//! The backend turns snapshots into tokens, diagnostics and completions. The
//! coordinator owns exactly one instance and serializes every call on its
//! backend-access lock, so implementations need `Send` but not `Sync`.

use crate::error::BackendError;
use crate::model::{CompletionSuggestion, Diagnostic, TextRange, Token};
use crate::snapshot::{BufferSnapshot, FileIdentity};

pub trait ParseBackend: Send + 'static {
    /// Reparse `file` from `snapshot`.
    ///
    /// On failure the previous parse state must stay queryable.
    fn reparse(&mut self, file: &FileIdentity, snapshot: &BufferSnapshot)
        -> Result<(), BackendError>;

    /// Tokens of the current parse state intersecting `range`, in document order
    fn tokens(&self, range: TextRange) -> Vec<Token>;

    /// Diagnostics of the current parse state, each tagged with its file
    fn diagnostics(&self) -> Vec<Diagnostic>;

    /// Completion candidates at `(line, column)` of a cursor-truncated snapshot
    fn complete(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
        line: usize,
        column: usize,
    ) -> Result<Vec<CompletionSuggestion>, BackendError>;
}

impl<B: ParseBackend + ?Sized> ParseBackend for Box<B> {
    fn reparse(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
    ) -> Result<(), BackendError> {
        (**self).reparse(file, snapshot)
    }

    fn tokens(&self, range: TextRange) -> Vec<Token> {
        (**self).tokens(range)
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        (**self).diagnostics()
    }

    fn complete(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
        line: usize,
        column: usize,
    ) -> Result<Vec<CompletionSuggestion>, BackendError> {
        (**self).complete(file, snapshot, line, column)
    }
}
