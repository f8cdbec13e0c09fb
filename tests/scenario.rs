//! End-to-end tests with the tree-sitter backend
//!
//! A real file on disk, a real compilation database and the full
//! edit -> parse -> publish path.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::test_config;
use parking_lot::Mutex;
use reparse::annotations::AnnotationSet;
use reparse::model::{
    CompletionSuggestion, Diagnostic, DiagnosticClass, Position, SymbolKind, TextRange, Token,
    TokenKind,
};
use reparse::{
    BackendError, BufferSnapshot, FileIdentity, ParseBackend, ParseState, SharedBuffer,
    SourceConfig, SourceView, TreeSitterBackend,
};
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Tree-sitter backend that records every snapshot it reparses
struct Recording {
    inner: TreeSitterBackend,
    seen: Arc<Mutex<Vec<(u64, String)>>>,
}

impl ParseBackend for Recording {
    fn reparse(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
    ) -> Result<(), BackendError> {
        self.seen
            .lock()
            .push((snapshot.revision(), snapshot.content().to_string()));
        self.inner.reparse(file, snapshot)
    }

    fn tokens(&self, range: TextRange) -> Vec<Token> {
        self.inner.tokens(range)
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.inner.diagnostics()
    }

    fn complete(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
        line: usize,
        column: usize,
    ) -> Result<Vec<CompletionSuggestion>, BackendError> {
        self.inner.complete(file, snapshot, line, column)
    }
}

#[test]
fn test_append_closing_brace_then_highlight() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("main.c");
    let file = FileIdentity::from(path.as_path());
    let buffer = SharedBuffer::new(file.clone(), "int main(){");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let backend = TreeSitterBackend::new(&file, &[]).map(|inner| Recording {
        inner,
        seen: seen.clone(),
    });
    let mut view = SourceView::from_buffer(buffer, backend, SourceConfig::default()).unwrap();

    view.append("}\n");
    view.coordinator().notify_edit();
    view.coordinator().notify_edit();
    assert!(view.wait_until_current(TIMEOUT));
    assert_eq!(view.parse_status(), ParseState::Parsed(2));

    // Once the append is visible, the backend only ever sees the latest content
    let seen = seen.lock().clone();
    let latest = seen.iter().position(|(rev, _)| *rev == 2).unwrap();
    assert!(seen[..latest]
        .iter()
        .all(|(rev, text)| *rev == 1 && text == "int main(){"));
    assert!(seen[latest..]
        .iter()
        .all(|(rev, text)| *rev == 2 && text == "int main(){}\n"));

    let tokens = view
        .coordinator()
        .with_backend(|backend, _| backend.tokens(TextRange::document()))
        .unwrap();
    assert_eq!(tokens[0].kind, TokenKind::Keyword);
    assert_eq!(
        tokens[0].range(),
        TextRange::new(Position::new(0, 0), Position::new(0, 3))
    );
    assert_eq!(tokens[1].kind, TokenKind::Identifier);
    assert_eq!(tokens[1].symbol, Some(SymbolKind::Function));
    assert_eq!(
        tokens[1].range(),
        TextRange::new(Position::new(0, 4), Position::new(0, 8))
    );

    let set = view.annotations().unwrap();
    let tags: Vec<_> = set
        .highlights_on_line(0)
        .map(|h| h.tag.as_str())
        .take(2)
        .collect();
    assert_eq!(tags, vec!["keyword", "function"]);
    assert!(set.diagnostics.is_empty());
    assert_eq!(view.hover_at(Position::new(0, 5)), vec!["Type: int ()"]);
    view.shutdown();
}

#[test]
fn test_burst_of_edits_matches_direct_parse() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("burst.c");
    let mut view = SourceView::open_with_text(&path, "", None, test_config()).unwrap();

    for i in 0..30 {
        view.append(&format!("int value_{i} = {i};\n"));
    }
    view.insert(Position::new(0, 0), "/* header */\n");
    assert!(view.wait_until_current(TIMEOUT));

    let revision = view.buffer().revision();
    let text = view.buffer().text();
    let file = view.file().clone();
    let mut fresh = TreeSitterBackend::new(&file, &[]).unwrap();
    fresh
        .reparse(&file, &BufferSnapshot::new(file.clone(), text, revision))
        .unwrap();
    let direct = AnnotationSet::extract(&fresh, &file, revision, view.config());

    assert_eq!(view.annotations(), Some(&direct));
    assert_eq!(direct.types.len(), 30);
    view.shutdown();
}

#[test]
fn test_deeply_nested_expression_parses_on_worker() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("deep.c");
    let depth = 20_000;
    let text = format!("int x = {}1{};\n", "(".repeat(depth), ")".repeat(depth));
    let mut view = SourceView::open_with_text(&path, &text, None, test_config()).unwrap();

    assert!(view.wait_until_current(TIMEOUT));
    assert_eq!(view.parse_status(), ParseState::Parsed(1));
    assert!(view.annotations().is_some_and(|s| s.diagnostics.is_empty()));
    assert_eq!(view.hover_at(Position::new(0, 4)), vec!["Type: int"]);
    view.shutdown();
}

#[test]
fn test_syntax_error_appears_and_clears() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.c");
    std::fs::write(&path, "int main(){\n").unwrap();

    let mut view = SourceView::open(&path, None, test_config()).unwrap();
    assert!(view.wait_until_current(TIMEOUT));
    let errors = view
        .annotations()
        .map(|set| set.count_by_class(DiagnosticClass::Error))
        .unwrap_or_default();
    assert!(errors > 0);

    view.append("}\n");
    assert!(view.wait_until_current(TIMEOUT));
    assert_eq!(view.annotations().map(|s| s.diagnostics.len()), Some(0));
    view.shutdown();
}

#[test]
fn test_missing_include_published_after_redacted_parse() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("main.c");
    let text = "#include \"absent.h\"\nint value;\n";
    std::fs::write(&path, text).unwrap();

    let mut view = SourceView::open(&path, None, SourceConfig::default()).unwrap();
    let redacted_seen = std::rc::Rc::new(std::cell::Cell::new(false));
    let seen = redacted_seen.clone();
    view.on_parse_complete(move |outcome, set| {
        if outcome.redacted {
            seen.set(true);
            assert!(set.is_some_and(|s| s.diagnostics.is_empty()));
        }
    });
    assert!(view.wait_until_current(TIMEOUT));
    assert!(redacted_seen.get());

    let set = view.annotations().unwrap();
    assert_eq!(set.diagnostics.len(), 1);
    assert_eq!(set.diagnostics[0].class, DiagnosticClass::Error);
    assert_eq!(
        set.diagnostics[0].tooltip,
        "Fatal error:\n'absent.h' file not found"
    );
    view.shutdown();
}

#[test]
fn test_compilation_database_drives_includes_and_macros() {
    let dir = TempDir::new().unwrap();
    let project = dir.path().display().to_string();
    std::fs::create_dir(dir.path().join("inc")).unwrap();
    std::fs::write(
        dir.path().join("inc").join("api.h"),
        "int api_version(void);\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("compile_commands.json"),
        format!(
            r#"[{{"directory": "{project}", "file": "main.c",
                 "arguments": ["cc", "-Iinc", "-DFEATURE_X", "-c", "main.c"]}}]"#
        ),
    )
    .unwrap();

    let path = dir.path().join("main.c");
    let text = "#include <api.h>\nint main() {\n  return 0;\n}\n";
    std::fs::write(&path, text).unwrap();

    let mut view = SourceView::open(&path, Some(dir.path()), test_config()).unwrap();
    assert!(view.wait_until_current(TIMEOUT));
    assert!(view.annotations().is_some_and(|s| s.diagnostics.is_empty()));

    let suggestions = view.request_completion(2, 9);
    let displays: Vec<_> = suggestions.iter().map(|s| s.display_text.as_str()).collect();
    assert!(displays.contains(&"api_version(void) --> int"));
    assert!(displays.contains(&"FEATURE_X"));
    view.shutdown();
}

#[test]
fn test_unconfigured_extension_stays_plain() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("README.md");
    std::fs::write(&path, "# title\n").unwrap();

    let mut view = SourceView::open(&path, None, test_config()).unwrap();
    assert!(view.wait_until_current(TIMEOUT));
    assert_eq!(view.parse_status(), ParseState::Unavailable);
    assert!(view.request_completion(0, 1)[0].is_sentinel());

    view.append("more\n");
    assert!(view.wait_until_current(TIMEOUT));
    assert!(view.annotations().is_none());
    view.shutdown();
}
