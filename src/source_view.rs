//! Consumer-side facade for one source file
//!
//! Owns the buffer, the parse coordinator and the annotation publisher. The
//! consumer thread edits through the view and calls `process_events()` to
//! pick up finished parses; nothing here runs on the worker thread except the
//! edit notification.

use std::path::Path;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::annotations::{AnnotationSet, Publisher};
use crate::backend::ParseBackend;
use crate::buffer::SharedBuffer;
use crate::compile_db::{default_project, CompilationDatabase};
use crate::completion::is_trigger;
use crate::config::SourceConfig;
use crate::coordinator::ParseCoordinator;
use crate::error::{BackendError, ViewError};
use crate::messages::{ParseEvent, ParseOutcome, ParseStatus};
use crate::model::{CompletionSuggestion, Position};
use crate::snapshot::FileIdentity;
use crate::syntax::TreeSitterBackend;

/// What the view knows about its parse state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// No cycle has completed yet
    NotParsed,
    /// Annotations for this revision are published
    Parsed(u64),
    /// The file has no parse backend
    Unavailable,
}

type ParseCallback = Box<dyn FnMut(&ParseOutcome, Option<&AnnotationSet>)>;

pub struct SourceView<B: ParseBackend = TreeSitterBackend> {
    buffer: SharedBuffer,
    config: SourceConfig,
    coordinator: ParseCoordinator<B>,
    events: Receiver<ParseEvent>,
    publisher: Publisher,
    state: ParseState,
    /// Revision of the last completed full (non-redacted) cycle
    settled_revision: Option<u64>,
    on_parse_complete: Option<ParseCallback>,
}

impl SourceView<TreeSitterBackend> {
    /// Open `path` from disk.
    ///
    /// Compiler arguments come from `compile_commands.json` in `project`
    /// (or the file's directory). Files whose extension is not configured
    /// get a view without a backend.
    pub fn open(
        path: &Path,
        project: Option<&Path>,
        config: SourceConfig,
    ) -> Result<Self, ViewError> {
        let text = std::fs::read_to_string(path).map_err(|source| ViewError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::open_with_text(path, &text, project, config)
    }

    /// Like `open`, with the initial content supplied by the caller
    pub fn open_with_text(
        path: &Path,
        text: &str,
        project: Option<&Path>,
        config: SourceConfig,
    ) -> Result<Self, ViewError> {
        let file = FileIdentity::from(path);
        let buffer = SharedBuffer::new(file.clone(), text);

        let legal = file
            .extension()
            .is_some_and(|ext| config.is_legal_extension(&ext));
        let backend = if legal {
            let project = project
                .map(Path::to_path_buf)
                .unwrap_or_else(|| default_project(path));
            let database = CompilationDatabase::load_or_empty(&project);
            let args = database.arguments_for(path);
            tracing::debug!(file = %file, ?args, "resolved compiler arguments");
            TreeSitterBackend::new(&file, &args)
        } else {
            Err(BackendError::Unavailable(format!(
                "{file} is not a configured source file"
            )))
        };

        Self::from_buffer(buffer, backend, config)
    }
}

impl<B: ParseBackend> SourceView<B> {
    /// Wire an existing buffer to `backend` and start parsing
    pub fn from_buffer(
        buffer: SharedBuffer,
        backend: Result<B, BackendError>,
        config: SourceConfig,
    ) -> Result<Self, ViewError> {
        let (coordinator, events) = ParseCoordinator::spawn(
            buffer.file().clone(),
            backend,
            Arc::new(buffer.clone()),
            config.coordinator_options(),
        )?;

        let notifier = coordinator.notifier();
        buffer.observe(move |_| notifier.notify_edit());

        Ok(Self {
            buffer,
            config,
            coordinator,
            events,
            publisher: Publisher::new(),
            state: ParseState::NotParsed,
            settled_revision: None,
            on_parse_complete: None,
        })
    }

    pub fn file(&self) -> &FileIdentity {
        self.buffer.file()
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    pub fn coordinator(&self) -> &ParseCoordinator<B> {
        &self.coordinator
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Called on the consumer thread once per completed cycle, after the
    /// cycle's annotations (if any) are published
    pub fn on_parse_complete(
        &mut self,
        callback: impl FnMut(&ParseOutcome, Option<&AnnotationSet>) + 'static,
    ) {
        self.on_parse_complete = Some(Box::new(callback));
    }

    pub fn insert(&self, position: Position, text: &str) -> u64 {
        self.buffer.insert(position, text)
    }

    pub fn remove(&self, range: std::ops::Range<usize>) -> u64 {
        self.buffer.remove(range)
    }

    pub fn replace(&self, range: std::ops::Range<usize>, text: &str) -> u64 {
        self.buffer.replace(range, text)
    }

    pub fn append(&self, text: &str) -> u64 {
        self.buffer.append(text)
    }

    pub fn set_text(&self, text: &str) -> u64 {
        self.buffer.set_text(text)
    }

    /// Handle every event already delivered. Returns the number of completed
    /// cycles seen.
    pub fn process_events(&mut self) -> usize {
        let mut completed = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.handle_event(event) {
                completed += 1;
            }
        }
        completed
    }

    /// Block until a full parse of the current buffer revision has completed
    /// or `timeout` runs out. Returns whether the view is current.
    pub fn wait_until_current(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_events();
            if self.is_current() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                tracing::debug!(
                    file = %self.file(),
                    revision = self.buffer.revision(),
                    "timed out waiting for parse"
                );
                return false;
            }
            match self.events.recv_timeout(remaining) {
                Ok(event) => {
                    self.handle_event(event);
                }
                Err(RecvTimeoutError::Timeout) => return self.is_current(),
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn is_current(&self) -> bool {
        self.settled_revision == Some(self.buffer.revision())
    }

    fn handle_event(&mut self, event: ParseEvent) -> bool {
        let outcome = match event {
            ParseEvent::ParseCompleted(outcome) => outcome,
            ParseEvent::Stopped => {
                tracing::debug!(file = %self.file(), "parse worker stopped");
                return false;
            }
        };

        match &outcome.status {
            ParseStatus::Parsed => self.refresh_annotations(outcome.revision),
            ParseStatus::Failed(err) => {
                tracing::warn!(
                    file = %self.file(),
                    revision = outcome.revision,
                    "keeping previous annotations: {}",
                    err
                );
            }
            ParseStatus::Unavailable(reason) => {
                tracing::trace!(file = %self.file(), "no backend: {}", reason);
                self.state = ParseState::Unavailable;
            }
        }

        if !outcome.redacted {
            self.settled_revision = Some(outcome.revision);
        }

        if let Some(callback) = self.on_parse_complete.as_mut() {
            callback(&outcome, self.publisher.current());
        }
        true
    }

    fn refresh_annotations(&mut self, outcome_revision: u64) {
        let file = self.buffer.file().clone();
        let config = &self.config;
        let extracted = self.coordinator.with_backend(|backend, parsed_revision| {
            AnnotationSet::extract(
                &*backend,
                &file,
                parsed_revision.unwrap_or(outcome_revision),
                config,
            )
        });
        match extracted {
            Ok(set) => {
                let revision = set.revision;
                if self.publisher.publish(set) {
                    self.state = ParseState::Parsed(revision);
                }
            }
            Err(err) => {
                tracing::debug!(file = %file, "annotation refresh skipped: {}", err);
            }
        }
    }

    /// Complete at `(line, column)`; never empty
    pub fn request_completion(&self, line: usize, column: usize) -> Vec<CompletionSuggestion> {
        self.coordinator.request_completion(line, column)
    }

    /// Called after `ch` was typed with the cursor now at `cursor`. Returns
    /// suggestions only when `ch` completes a trigger (`.`, `->`, `::`).
    pub fn completion_for_key(
        &self,
        cursor: Position,
        ch: char,
    ) -> Option<Vec<CompletionSuggestion>> {
        let before = self.buffer.line_before(cursor);
        if !is_trigger(&before, ch) {
            return None;
        }
        Some(self.request_completion(cursor.line, cursor.column))
    }

    pub fn annotations(&self) -> Option<&AnnotationSet> {
        self.publisher.current()
    }

    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }

    pub fn hover_at(&self, position: Position) -> Vec<&str> {
        self.publisher
            .current()
            .map(|set| set.hover_at(position))
            .unwrap_or_default()
    }

    pub fn parse_status(&self) -> ParseState {
        self.state
    }

    /// Stop parsing and release the backend. Edits after this are kept in
    /// the buffer but never parsed.
    pub fn shutdown(&mut self) {
        self.coordinator.shutdown();
        self.process_events();
    }
}

impl<B: ParseBackend> std::fmt::Debug for SourceView<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceView")
            .field("buffer", &self.buffer)
            .field("state", &self.state)
            .field("published", &self.publisher.revision())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SourceConfig {
        SourceConfig {
            redact_includes_on_first_parse: false,
            ..SourceConfig::default()
        }
    }

    #[test]
    fn test_unknown_extension_has_no_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut view =
            SourceView::open_with_text(&dir.path().join("notes.txt"), "hello", None, config())
                .unwrap();
        assert!(view.wait_until_current(Duration::from_secs(5)));
        assert_eq!(view.parse_status(), ParseState::Unavailable);
        assert!(view.annotations().is_none());
        view.shutdown();
    }

    #[test]
    fn test_open_reads_file_and_publishes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.c");
        std::fs::write(&path, "int answer = 42;\n").unwrap();

        let mut view = SourceView::open(&path, None, config()).unwrap();
        assert!(view.wait_until_current(Duration::from_secs(5)));
        assert_eq!(view.parse_status(), ParseState::Parsed(1));
        let set = view.annotations().unwrap();
        assert!(set.highlights.iter().any(|h| h.tag == "number"));
        assert_eq!(view.hover_at(Position::new(0, 5)), vec!["Type: int"]);
        view.shutdown();
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = SourceView::open(&dir.path().join("gone.c"), None, config()).unwrap_err();
        assert!(matches!(err, ViewError::Read { .. }));
    }

    #[test]
    fn test_callback_runs_after_publication() {
        let dir = tempfile::tempdir().unwrap();
        let mut view =
            SourceView::open_with_text(&dir.path().join("a.c"), "int x;\n", None, config())
                .unwrap();
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = seen.clone();
        view.on_parse_complete(move |outcome, set| {
            sink.borrow_mut()
                .push((outcome.revision, set.map(|s| s.revision)));
        });
        assert!(view.wait_until_current(Duration::from_secs(5)));
        assert_eq!(seen.borrow().last(), Some(&(1, Some(1))));
        view.shutdown();
    }

    #[test]
    fn test_completion_for_key_requires_trigger() {
        let dir = tempfile::tempdir().unwrap();
        let text = "struct P { int x; };\nvoid f(struct P p) { p. }\n";
        let mut view =
            SourceView::open_with_text(&dir.path().join("p.c"), text, None, config()).unwrap();
        assert!(view.wait_until_current(Duration::from_secs(5)));

        assert!(view.completion_for_key(Position::new(1, 22), 'p').is_none());
        let members = view.completion_for_key(Position::new(1, 23), '.').unwrap();
        assert!(members.iter().any(|s| s.insertable_text == "x"));
        view.shutdown();
    }
}
