//! Immutable buffer snapshots handed to the parse worker
//!
//! A snapshot maps file identities to content captured at one point in time.
//! The primary file is the one being edited; other entries carry unsaved
//! content of files the backend may pull in.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Path-like key identifying the edited file
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileIdentity(PathBuf);

impl FileIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Lowercased extension, if any
    pub fn extension(&self) -> Option<String> {
        self.0
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for FileIdentity {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for FileIdentity {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for FileIdentity {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

/// Point-in-time copy of the editable content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSnapshot {
    revision: u64,
    primary: FileIdentity,
    files: BTreeMap<FileIdentity, Arc<str>>,
    redacted: bool,
}

impl BufferSnapshot {
    pub fn new(primary: FileIdentity, content: impl Into<Arc<str>>, revision: u64) -> Self {
        let mut files = BTreeMap::new();
        files.insert(primary.clone(), content.into());
        Self {
            revision,
            primary,
            files,
            redacted: false,
        }
    }

    /// Add unsaved content for another file
    pub fn with_file(mut self, file: FileIdentity, content: impl Into<Arc<str>>) -> Self {
        if file != self.primary {
            self.files.insert(file, content.into());
        }
        self
    }

    /// Buffer revision this snapshot was captured at
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn primary(&self) -> &FileIdentity {
        &self.primary
    }

    /// Content of the primary file
    pub fn content(&self) -> &str {
        self.files.get(&self.primary).map(|c| c.as_ref()).unwrap_or("")
    }

    pub fn get(&self, file: &FileIdentity) -> Option<&str> {
        self.files.get(file).map(|c| c.as_ref())
    }

    pub fn files(&self) -> impl Iterator<Item = (&FileIdentity, &str)> {
        self.files.iter().map(|(file, content)| (file, content.as_ref()))
    }

    /// True if include directives were blanked out
    pub fn is_redacted(&self) -> bool {
        self.redacted
    }

    /// Copy with include directives of the primary file blanked out
    pub fn redacted(&self) -> Self {
        let mut snapshot = self.clone();
        let redacted = redact_includes(self.content());
        snapshot
            .files
            .insert(self.primary.clone(), Arc::from(redacted));
        snapshot.redacted = true;
        snapshot
    }

    /// Copy whose primary content ends at `(line, column)`, followed by a newline.
    ///
    /// Used for completion: the backend sees the file as if typing stopped at
    /// the cursor. Positions past the end clamp to the end of the content.
    pub fn truncated_at(&self, line: usize, column: usize) -> Self {
        let content = self.content();
        let mut end = content.len();
        let mut offset = 0;
        for (index, text) in content.split_inclusive('\n').enumerate() {
            if index == line {
                let body = text.strip_suffix('\n').unwrap_or(text);
                let byte_col = body
                    .char_indices()
                    .nth(column)
                    .map(|(byte, _)| byte)
                    .unwrap_or(body.len());
                end = offset + byte_col;
                break;
            }
            offset += text.len();
        }

        let mut truncated = String::with_capacity(end + 1);
        truncated.push_str(&content[..end]);
        truncated.push('\n');

        let mut snapshot = self.clone();
        snapshot
            .files
            .insert(self.primary.clone(), Arc::from(truncated));
        snapshot
    }
}

/// Produces snapshots of the editable content.
///
/// `capture` must return a self-consistent copy even while edits happen on
/// another thread, and must not change anything the caller can observe.
pub trait SnapshotProvider: Send + Sync {
    fn capture(&self) -> BufferSnapshot;

    /// Snapshot for the very first parse: include directives blanked so
    /// parsing does not depend on other files existing yet.
    fn capture_redacted(&self) -> BufferSnapshot {
        self.capture().redacted()
    }
}

const INCLUDE_DIRECTIVE: &str = "#include";

/// Blank out `#include` lines, keeping every line the same length.
///
/// Only directives at the start of a line are touched. The replaced span runs
/// from the directive up to (not including) the newline; a directive on a
/// last line with no newline is left alone.
pub fn redact_includes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(newline) = rest.find('\n') {
        let line = &rest[..newline];
        if line.starts_with(INCLUDE_DIRECTIVE) {
            out.extend(std::iter::repeat(' ').take(line.chars().count()));
        } else {
            out.push_str(line);
        }
        out.push('\n');
        rest = &rest[newline + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_includes_preserves_offsets() {
        let source = "#include <stdio.h>\n#include \"local.h\"\nint x;\n";
        let redacted = redact_includes(source);
        assert_eq!(redacted.len(), source.len());
        assert_eq!(
            redacted,
            format!("{}\n{}\nint x;\n", " ".repeat(18), " ".repeat(18))
        );
    }

    #[test]
    fn test_redact_only_line_start() {
        let source = "int a; #include <x>\n  #include <y>\n";
        assert_eq!(redact_includes(source), source);
    }

    #[test]
    fn test_redact_leaves_unterminated_last_line() {
        let source = "int a;\n#include <vector>";
        assert_eq!(redact_includes(source), source);
    }

    #[test]
    fn test_snapshot_redacted_keeps_revision() {
        let snap = BufferSnapshot::new("main.c".into(), "#include <a.h>\nint x;\n", 7);
        let redacted = snap.redacted();
        assert!(redacted.is_redacted());
        assert!(!snap.is_redacted());
        assert_eq!(redacted.revision(), 7);
        assert_eq!(redacted.content(), format!("{}\nint x;\n", " ".repeat(14)));
    }

    #[test]
    fn test_truncated_at_cursor() {
        let snap = BufferSnapshot::new("main.cpp".into(), "int main() {\n  foo.bar();\n}\n", 3);
        let truncated = snap.truncated_at(1, 6);
        assert_eq!(truncated.content(), "int main() {\n  foo.\n");
        assert_eq!(truncated.revision(), 3);
    }

    #[test]
    fn test_truncated_clamps_past_end() {
        let snap = BufferSnapshot::new("a.c".into(), "ab\ncd", 1);
        assert_eq!(snap.truncated_at(1, 99).content(), "ab\ncd\n");
        assert_eq!(snap.truncated_at(9, 0).content(), "ab\ncd\n");
        assert_eq!(snap.truncated_at(0, 1).content(), "a\n");
    }

    #[test]
    fn test_truncated_counts_chars() {
        let snap = BufferSnapshot::new("a.c".into(), "é = x;\n", 1);
        assert_eq!(snap.truncated_at(0, 1).content(), "é\n");
    }

    #[test]
    fn test_with_file_ignores_primary() {
        let snap = BufferSnapshot::new("a.c".into(), "x", 1)
            .with_file("a.c".into(), "y")
            .with_file("b.h".into(), "z");
        assert_eq!(snap.content(), "x");
        assert_eq!(snap.get(&"b.h".into()), Some("z"));
        assert_eq!(snap.files().count(), 2);
    }
}
