//! Tree-sitter parse backend
//!
//! Keeps the last successfully parsed unit (tree, tokens, diagnostics and
//! declarations) and reparses incrementally against it. A failed reparse
//! leaves the previous unit in place.

use std::path::{Path, PathBuf};

use tree_sitter::{InputEdit, Parser, Point, Tree};

use super::candidates::{self, CompletionContext};
use super::declarations::Declarations;
use super::diagnostics::{
    directive_diagnostics, include_directives, missing_include, syntax_diagnostics,
    IncludeDirective,
};
use super::languages::LanguageId;
use super::tokens::collect_tokens;
use crate::backend::ParseBackend;
use crate::error::BackendError;
use crate::model::{CompletionSuggestion, Diagnostic, Position, TextRange, Token};
use crate::snapshot::{BufferSnapshot, FileIdentity};

/// Byte offsets of line starts, for byte -> (line, char column) conversion
#[derive(Debug, Clone, Default)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    /// Position of `byte` in `text`, which must be the indexed text
    pub fn position(&self, text: &str, byte: usize) -> Position {
        let byte = byte.min(text.len());
        let line = self.starts.partition_point(|&start| start <= byte) - 1;
        let line_start = self.starts[line];
        let mut end = byte;
        while end > line_start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let column = text.get(line_start..end).map_or(0, |s| s.chars().count());
        Position::new(line, column)
    }
}

/// Convert a byte offset to a tree-sitter Point (row, column in bytes)
fn byte_to_point(text: &str, byte_offset: usize) -> Point {
    let before = &text.as_bytes()[..byte_offset.min(text.len())];
    let row = before.iter().filter(|&&b| b == b'\n').count();
    let column = before
        .iter()
        .rev()
        .position(|&b| b == b'\n')
        .unwrap_or(before.len());
    Point { row, column }
}

/// Describe the change from `old_src` to `new_src` as a single edit over the
/// differing middle section. `None` if the sources are identical.
fn compute_incremental_edit(old_src: &str, new_src: &str) -> Option<InputEdit> {
    if old_src == new_src {
        return None;
    }

    let old_bytes = old_src.as_bytes();
    let new_bytes = new_src.as_bytes();

    let start = old_bytes
        .iter()
        .zip(new_bytes)
        .take_while(|(a, b)| a == b)
        .count();

    // Common suffix, not overlapping the prefix
    let max_suffix = old_bytes.len().min(new_bytes.len()) - start;
    let suffix = old_bytes
        .iter()
        .rev()
        .zip(new_bytes.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_end = old_bytes.len() - suffix;
    let new_end = new_bytes.len() - suffix;

    Some(InputEdit {
        start_byte: start,
        old_end_byte: old_end,
        new_end_byte: new_end,
        start_position: byte_to_point(old_src, start),
        old_end_position: byte_to_point(old_src, old_end),
        new_end_position: byte_to_point(new_src, new_end),
    })
}

/// Compiler arguments the backend understands; everything else is ignored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendArgs {
    /// Language forced with `-x`
    pub language: Option<LanguageId>,
    pub include_dirs: Vec<PathBuf>,
    /// Names defined with `-D`
    pub macros: Vec<String>,
}

impl BackendArgs {
    /// Interpret `args`; relative include dirs resolve against `base_dir`
    pub fn parse(args: &[String], base_dir: &Path) -> Result<Self, BackendError> {
        let mut parsed = Self::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let arg = arg.as_str();
            if let Some(value) = flag_value(arg, "-x", &mut iter) {
                let language = LanguageId::from_x_flag(&value).ok_or_else(|| {
                    BackendError::Unavailable(format!("unsupported language '{value}'"))
                })?;
                parsed.language = Some(language);
            } else if let Some(dir) = flag_value(arg, "-I", &mut iter)
                .or_else(|| separate_value(arg, "-isystem", &mut iter))
                .or_else(|| separate_value(arg, "-iquote", &mut iter))
            {
                parsed.include_dirs.push(base_dir.join(dir));
            } else if let Some(define) = flag_value(arg, "-D", &mut iter) {
                let name = define.split('=').next().unwrap_or("").trim();
                if !name.is_empty() {
                    parsed.macros.push(name.to_string());
                }
            }
        }

        Ok(parsed)
    }
}

/// Value of `-Xvalue` or `-X value`
fn flag_value<'a>(
    arg: &str,
    flag: &str,
    rest: &mut impl Iterator<Item = &'a String>,
) -> Option<String> {
    let value = arg.strip_prefix(flag)?;
    if value.is_empty() {
        rest.next().cloned()
    } else {
        Some(value.to_string())
    }
}

/// Value of `-flag value`
fn separate_value<'a>(
    arg: &str,
    flag: &str,
    rest: &mut impl Iterator<Item = &'a String>,
) -> Option<String> {
    if arg == flag {
        rest.next().cloned()
    } else {
        None
    }
}

/// One successful parse of the primary file, immutable once built
struct ParsedUnit {
    revision: u64,
    source: String,
    tree: Tree,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
    declarations: Declarations,
    /// Declarations contributed by included files
    included: Declarations,
}

/// Parse backend for C and C++ built on tree-sitter
pub struct TreeSitterBackend {
    file: FileIdentity,
    language: LanguageId,
    args: BackendArgs,
    parser: Parser,
    unit: Option<ParsedUnit>,
}

impl TreeSitterBackend {
    /// Create a backend for `file` with compiler-style `args`.
    ///
    /// Fails with `BackendError::Unavailable` when neither the extension nor
    /// a `-x` argument names a supported language.
    pub fn new(file: &FileIdentity, args: &[String]) -> Result<Self, BackendError> {
        let base_dir = file
            .as_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let args = BackendArgs::parse(args, &base_dir)?;
        let language = args
            .language
            .or_else(|| LanguageId::from_path(file.as_path()))
            .ok_or_else(|| {
                BackendError::Unavailable(format!("no C or C++ grammar for {file}"))
            })?;

        let mut parser = Parser::new();
        parser
            .set_language(&language.grammar())
            .map_err(|e| BackendError::Unavailable(format!("failed to load grammar: {e}")))?;

        tracing::debug!(
            file = %file,
            language = language.display_name(),
            include_dirs = args.include_dirs.len(),
            "created tree-sitter backend"
        );

        Ok(Self {
            file: file.clone(),
            language,
            args,
            parser,
            unit: None,
        })
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn args(&self) -> &BackendArgs {
        &self.args
    }

    /// Revision of the snapshot the current state was parsed from
    pub fn parsed_revision(&self) -> Option<u64> {
        self.unit.as_ref().map(|unit| unit.revision)
    }

    fn parse_source(&mut self, source: &str, incremental: bool) -> Option<Tree> {
        let old_tree = match (&self.unit, incremental) {
            (Some(unit), true) => {
                let mut tree = unit.tree.clone();
                match compute_incremental_edit(&unit.source, source) {
                    Some(edit) => {
                        tracing::trace!(
                            "Incremental parse: edit at byte {}..{} -> {}..{}",
                            edit.start_byte,
                            edit.old_end_byte,
                            edit.start_byte,
                            edit.new_end_byte
                        );
                        tree.edit(&edit);
                    }
                    None => tracing::trace!("Source unchanged, reusing tree"),
                }
                Some(tree)
            }
            _ => None,
        };
        self.parser.parse(source, old_tree.as_ref())
    }

    /// Find an include on disk or in the snapshot
    fn resolve_include(
        &self,
        include: &IncludeDirective,
        snapshot: &BufferSnapshot,
    ) -> Option<(FileIdentity, String)> {
        let own_dir = self.file.as_path().parent().map(Path::to_path_buf);
        let search = include
            .quoted
            .then_some(own_dir)
            .flatten()
            .into_iter()
            .chain(self.args.include_dirs.iter().cloned());

        for dir in search {
            let identity = FileIdentity::new(dir.join(&include.target));
            if let Some(content) = snapshot.get(&identity) {
                return Some((identity, content.to_string()));
            }
            if identity.as_path().is_file() {
                match std::fs::read_to_string(identity.as_path()) {
                    Ok(content) => return Some((identity, content)),
                    Err(e) => {
                        tracing::debug!("Failed to read include {}: {}", identity, e);
                    }
                }
            }
        }
        None
    }

    fn build_unit(&mut self, source: &str, tree: Tree, snapshot: &BufferSnapshot) -> ParsedUnit {
        let lines = LineIndex::new(source);
        let declarations = Declarations::collect(tree.root_node(), source, true);

        let mut diagnostics = syntax_diagnostics(&tree, source, &lines, &self.file);
        diagnostics.extend(directive_diagnostics(&tree, source, &lines, &self.file));

        let mut included = Declarations::default();
        for include in include_directives(&tree, source, &lines) {
            let Some((identity, content)) = self.resolve_include(&include, snapshot) else {
                if include.quoted {
                    diagnostics.push(missing_include(&include, &self.file));
                } else {
                    tracing::trace!("System include {} not found", include.target);
                }
                continue;
            };

            // One level deep: the included file's own includes are not followed
            let Some(header_tree) = self.parser.parse(&content, None) else {
                continue;
            };
            let header_lines = LineIndex::new(&content);
            diagnostics.extend(syntax_diagnostics(
                &header_tree,
                &content,
                &header_lines,
                &identity,
            ));
            included.extend(Declarations::collect(header_tree.root_node(), &content, false));
        }

        let mut visible = declarations.clone();
        visible.extend(included.clone());
        let tokens = collect_tokens(&tree, source, &lines, &visible);

        ParsedUnit {
            revision: snapshot.revision(),
            source: source.to_string(),
            tree,
            tokens,
            diagnostics,
            declarations,
            included,
        }
    }
}

impl ParseBackend for TreeSitterBackend {
    fn reparse(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
    ) -> Result<(), BackendError> {
        let Some(source) = snapshot.get(file) else {
            return Err(BackendError::ReparseFailed {
                file: file.clone(),
                reason: "file missing from snapshot".to_string(),
            });
        };
        let source = source.to_string();

        let tree = self
            .parse_source(&source, true)
            .ok_or_else(|| BackendError::ReparseFailed {
                file: file.clone(),
                reason: "parser produced no tree".to_string(),
            })?;

        let unit = self.build_unit(&source, tree, snapshot);
        tracing::debug!(
            file = %file,
            revision = unit.revision,
            tokens = unit.tokens.len(),
            diagnostics = unit.diagnostics.len(),
            declarations = unit.declarations.len(),
            "reparsed"
        );
        self.unit = Some(unit);
        Ok(())
    }

    fn tokens(&self, range: TextRange) -> Vec<Token> {
        let Some(unit) = &self.unit else {
            return Vec::new();
        };
        unit.tokens
            .iter()
            .filter(|token| token.range().intersects(&range))
            .cloned()
            .collect()
    }

    fn diagnostics(&self) -> Vec<Diagnostic> {
        self.unit
            .as_ref()
            .map(|unit| unit.diagnostics.clone())
            .unwrap_or_default()
    }

    fn complete(
        &mut self,
        file: &FileIdentity,
        snapshot: &BufferSnapshot,
        line: usize,
        column: usize,
    ) -> Result<Vec<CompletionSuggestion>, BackendError> {
        let source = snapshot
            .get(file)
            .ok_or_else(|| BackendError::CompletionFailed("file missing from snapshot".into()))?
            .to_string();

        // A separate parse: the current unit stays as it is
        let tree = self
            .parse_source(&source, false)
            .ok_or_else(|| BackendError::CompletionFailed("parser produced no tree".into()))?;

        let mut declarations = Declarations::collect(tree.root_node(), &source, true);
        if let Some(unit) = &self.unit {
            declarations.extend(unit.included.clone());
        }

        let before_cursor: String = source
            .lines()
            .nth(line)
            .unwrap_or("")
            .chars()
            .take(column)
            .collect();
        let context = CompletionContext::at(&before_cursor);
        tracing::trace!(?context, "completion context");

        Ok(candidates::suggestions(
            &context,
            &declarations,
            self.language,
            &self.args.macros,
        ))
    }
}
