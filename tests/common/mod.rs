//! Shared test helpers for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use reparse::model::{
    CompletionSuggestion, Diagnostic, Position, Severity, SymbolKind, TextRange, Token, TokenKind,
};
use reparse::{
    BackendError, BufferSnapshot, CoordinatorOptions, FileIdentity, ParseBackend, ParseEvent,
    ParseOutcome, SourceConfig,
};

/// Options with include redaction off and a short retry interval
pub fn fast_options() -> CoordinatorOptions {
    CoordinatorOptions {
        redact_first_parse: false,
        retry_interval: Duration::from_millis(2),
    }
}

pub fn test_config() -> SourceConfig {
    SourceConfig {
        redact_includes_on_first_parse: false,
        retry_interval_ms: 2,
        ..SourceConfig::default()
    }
}

/// Counters shared between a fake backend and the test observing it
#[derive(Debug, Default)]
pub struct Probe {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    pub reparses: AtomicUsize,
    pub completions: AtomicUsize,
    pub dropped: AtomicBool,
    pub parsed: Mutex<Vec<(u64, String)>>,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(self)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn reparse_count(&self) -> usize {
        self.reparses.load(Ordering::SeqCst)
    }

    pub fn parsed_revisions(&self) -> Vec<u64> {
        self.parsed.lock().iter().map(|(rev, _)| *rev).collect()
    }

    pub fn last_parsed_text(&self) -> Option<String> {
        self.parsed.lock().last().map(|(_, text)| text.clone())
    }
}

struct InFlight<'a>(&'a Probe);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A latch a backend call waits on until the test opens it
#[derive(Debug, Default)]
pub struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
    entered: Mutex<usize>,
    arrived: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn pass(&self) {
        *self.entered.lock() += 1;
        self.arrived.notify_all();
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }

    /// Wait until `count` calls are blocked in (or have passed) the gate
    pub fn wait_entered(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut entered = self.entered.lock();
        while *entered < count {
            if self.arrived.wait_until(&mut entered, deadline).timed_out() {
                return *entered >= count;
            }
        }
        true
    }
}

/// Scriptable backend.
///
/// Each parse turns every whitespace-separated word of the primary file into
/// an identifier token typed `word_t`, and reports one diagnostic for its
/// own file plus one for a foreign header.
pub struct FakeBackend {
    probe: Arc<Probe>,
    delay: Duration,
    gate: Option<Arc<Gate>>,
    fail_when: Option<String>,
    suggestions: Vec<CompletionSuggestion>,
    file: FileIdentity,
    text: String,
}

impl FakeBackend {
    pub fn new(probe: Arc<Probe>, file: &FileIdentity) -> Self {
        Self {
            probe,
            delay: Duration::ZERO,
            gate: None,
            fail_when: None,
            suggestions: Vec::new(),
            file: file.clone(),
            text: String::new(),
        }
    }

    /// Every reparse sleeps for `delay`
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every reparse blocks on `gate`
    pub fn gated(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Reparse fails whenever the snapshot contains `marker`
    pub fn failing_when(mut self, marker: &str) -> Self {
        self.fail_when = Some(marker.to_string());
        self
    }

    pub fn suggesting(mut self, suggestions: Vec<CompletionSuggestion>) -> Self {
        self.suggestions = suggestions;
        self
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.probe.dropped.store(true, Ordering::SeqCst);
    }
}

impl ParseBackend for FakeBackend {
    fn reparse(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
    ) -> Result<(), BackendError> {
        let _guard = self.probe.enter();
        self.probe.reparses.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let content = snapshot.get(file).ok_or_else(|| BackendError::ReparseFailed {
            file: file.clone(),
            reason: "file missing from snapshot".to_string(),
        })?;
        if let Some(marker) = &self.fail_when {
            if content.contains(marker.as_str()) {
                return Err(BackendError::ReparseFailed {
                    file: file.clone(),
                    reason: format!("found '{marker}'"),
                });
            }
        }

        self.text = content.to_string();
        self.probe
            .parsed
            .lock()
            .push((snapshot.revision(), self.text.clone()));
        Ok(())
    }

    fn tokens(&self, range: TextRange) -> Vec<Token> {
        let _guard = self.probe.enter();
        word_tokens(&self.text)
            .into_iter()
            .filter(|token| token.range().intersects(&range))
            .collect()
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        let _guard = self.probe.enter();
        if self.text.is_empty() {
            return Vec::new();
        }
        vec![
            Diagnostic {
                path: self.file.clone(),
                severity: Severity::Warning,
                range: TextRange::new(Position::ZERO, Position::new(0, 1)),
                message: format!("{} bytes", self.text.len()),
            },
            Diagnostic {
                path: FileIdentity::new("other.h"),
                severity: Severity::Error,
                range: TextRange::new(Position::ZERO, Position::new(0, 1)),
                message: "foreign".to_string(),
            },
        ]
    }

    fn complete(
        &mut self,
        _file: &FileIdentity,
        _snapshot: &BufferSnapshot,
        _line: usize,
        _column: usize,
    ) -> Result<Vec<CompletionSuggestion>, BackendError> {
        let _guard = self.probe.enter();
        self.probe.completions.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        Ok(self.suggestions.clone())
    }
}

fn word_tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let mut start = None;
        for (col, ch) in line.chars().chain(std::iter::once(' ')).enumerate() {
            match (ch.is_whitespace(), start) {
                (false, None) => start = Some(col),
                (true, Some(begin)) => {
                    let word: String = line.chars().skip(begin).take(col - begin).collect();
                    tokens.push(
                        Token::new(
                            TokenKind::Identifier,
                            Position::new(line_no, begin),
                            Position::new(line_no, col),
                        )
                        .with_symbol(SymbolKind::Variable)
                        .with_type(format!("{word}_t")),
                    );
                    start = None;
                }
                _ => {}
            }
        }
    }
    tokens
}

/// Receive events until a completed cycle satisfies `pred`
pub fn wait_for_outcome(
    events: &std::sync::mpsc::Receiver<ParseEvent>,
    timeout: Duration,
    mut pred: impl FnMut(&ParseOutcome) -> bool,
) -> Option<ParseOutcome> {
    let deadline = Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(ParseEvent::ParseCompleted(outcome)) if pred(&outcome) => return Some(outcome),
            Ok(_) => {}
            Err(_) => return None,
        }
    }
}

/// Poll `cond` until it holds or `timeout` passes
pub fn eventually(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}
