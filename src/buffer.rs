//! Shared editable buffer and the snapshot provider built on it
//!
//! Content lives in a `Rope` next to a revision counter, both behind one
//! lock. Every mutation bumps the revision inside the same write section, so
//! a capture (rope clone under the read lock) always pairs content with the
//! revision that produced it.

use std::ops::Range;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use ropey::Rope;

use crate::model::Position;
use crate::snapshot::{BufferSnapshot, FileIdentity, SnapshotProvider};

type EditObserver = Box<dyn Fn(u64) + Send + Sync>;

struct BufferState {
    rope: Rope,
    revision: u64,
}

/// Thread-safe text buffer. Cloning shares the same content.
#[derive(Clone)]
pub struct SharedBuffer {
    file: FileIdentity,
    state: Arc<RwLock<BufferState>>,
    observers: Arc<Mutex<Vec<EditObserver>>>,
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("file", &self.file)
            .field("revision", &self.revision())
            .finish()
    }
}

impl SharedBuffer {
    pub fn new(file: FileIdentity, text: &str) -> Self {
        Self {
            file,
            state: Arc::new(RwLock::new(BufferState {
                rope: Rope::from_str(text),
                revision: 1,
            })),
            observers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn file(&self) -> &FileIdentity {
        &self.file
    }

    /// Register a callback run after every mutation with the new revision.
    ///
    /// Callbacks run on the mutating thread after the write lock is released
    /// and must not block.
    pub fn observe(&self, observer: impl Fn(u64) + Send + Sync + 'static) {
        self.observers.lock().push(Box::new(observer));
    }

    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Full content as a String
    pub fn text(&self) -> String {
        self.state.read().rope.to_string()
    }

    /// Number of lines (always >= 1)
    pub fn line_count(&self) -> usize {
        self.state.read().rope.len_lines()
    }

    pub fn len_chars(&self) -> usize {
        self.state.read().rope.len_chars()
    }

    /// Line content without its trailing newline
    pub fn line(&self, line: usize) -> Option<String> {
        let state = self.state.read();
        if line >= state.rope.len_lines() {
            return None;
        }
        let text = state.rope.line(line).to_string();
        Some(text.trim_end_matches(['\n', '\r']).to_string())
    }

    /// Text of `line` up to `column`
    pub fn line_before(&self, pos: Position) -> String {
        self.line(pos.line)
            .map(|text| text.chars().take(pos.column).collect())
            .unwrap_or_default()
    }

    /// Convert a position to a char offset, clamping to the buffer
    pub fn position_to_offset(&self, pos: Position) -> usize {
        let state = self.state.read();
        position_to_char(&state.rope, pos)
    }

    /// Position at the end of the buffer
    pub fn end_position(&self) -> Position {
        let state = self.state.read();
        let last = state.rope.len_lines().saturating_sub(1);
        let len = state.rope.line(last).len_chars();
        Position::new(last, len)
    }

    /// Insert text at a position
    pub fn insert(&self, pos: Position, text: &str) -> u64 {
        self.mutate(|rope| {
            let offset = position_to_char(rope, pos);
            rope.insert(offset, text);
        })
    }

    /// Remove the chars in `range` (char offsets, clamped)
    pub fn remove(&self, range: Range<usize>) -> u64 {
        self.mutate(|rope| {
            let end = range.end.min(rope.len_chars());
            let start = range.start.min(end);
            rope.remove(start..end);
        })
    }

    /// Replace the chars in `range` with `text` as a single edit
    pub fn replace(&self, range: Range<usize>, text: &str) -> u64 {
        self.mutate(|rope| {
            let end = range.end.min(rope.len_chars());
            let start = range.start.min(end);
            rope.remove(start..end);
            rope.insert(start, text);
        })
    }

    /// Append text at the end of the buffer
    pub fn append(&self, text: &str) -> u64 {
        self.mutate(|rope| {
            let end = rope.len_chars();
            rope.insert(end, text);
        })
    }

    /// Replace the whole content
    pub fn set_text(&self, text: &str) -> u64 {
        self.mutate(|rope| *rope = Rope::from_str(text))
    }

    fn mutate(&self, edit: impl FnOnce(&mut Rope)) -> u64 {
        let revision = {
            let mut state = self.state.write();
            edit(&mut state.rope);
            state.revision += 1;
            state.revision
        };
        tracing::trace!(file = %self.file, revision, "buffer edited");
        for observer in self.observers.lock().iter() {
            observer(revision);
        }
        revision
    }
}

impl SnapshotProvider for SharedBuffer {
    fn capture(&self) -> BufferSnapshot {
        let (rope, revision) = {
            let state = self.state.read();
            (state.rope.clone(), state.revision)
        };
        BufferSnapshot::new(self.file.clone(), rope.to_string(), revision)
    }
}

fn position_to_char(rope: &Rope, pos: Position) -> usize {
    if pos.line >= rope.len_lines() {
        return rope.len_chars();
    }
    let line_start = rope.line_to_char(pos.line);
    let line = rope.line(pos.line);
    let mut line_len = line.len_chars();
    // Do not place the offset past the line's own newline
    if line_len > 0 && line.char(line_len - 1) == '\n' {
        line_len -= 1;
    }
    line_start + pos.column.min(line_len)
}
