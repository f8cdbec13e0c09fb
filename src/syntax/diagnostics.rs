//! Diagnostics derived from a syntax tree

use tree_sitter::{Node, Tree};

use super::declarations::text;
use super::parser::LineIndex;
use crate::model::{Diagnostic, Severity, TextRange};
use crate::snapshot::FileIdentity;

/// Longest offending text quoted in an "unexpected" message
const MAX_QUOTED_LEN: usize = 24;

/// Parse errors and missing tokens
pub(crate) fn syntax_diagnostics(
    tree: &Tree,
    source: &str,
    lines: &LineIndex,
    path: &FileIdentity,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    if !tree.root_node().has_error() {
        return out;
    }

    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if let Some(message) = error_message(node, source) {
            out.push(diagnostic(node, source, lines, path, Severity::Error, message));
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|child| child.has_error())
            .collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Message for a missing or erroneous node; `None` for nodes that only contain errors
fn error_message(node: Node<'_>, source: &str) -> Option<String> {
    if node.is_missing() {
        return Some(if node.is_named() {
            format!("expected {}", node.kind())
        } else {
            format!("expected '{}'", node.kind())
        });
    }
    if !node.is_error() {
        return None;
    }
    let offending = text(node, source).trim();
    Some(
        if !offending.is_empty() && offending.len() <= MAX_QUOTED_LEN && !offending.contains('\n') {
            format!("unexpected '{offending}'")
        } else {
            "syntax error".to_string()
        },
    )
}

/// `#warning` and `#error` directives
pub(crate) fn directive_diagnostics(
    tree: &Tree,
    source: &str,
    lines: &LineIndex,
    path: &FileIdentity,
) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.kind() == "preproc_call" {
            if let Some(found) = directive(node, source, lines, path) {
                out.push(found);
            }
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

fn directive(
    node: Node<'_>,
    source: &str,
    lines: &LineIndex,
    path: &FileIdentity,
) -> Option<Diagnostic> {
    let name_node = node.child_by_field_name("directive")?;
    let severity = match text(name_node, source).trim() {
        "#warning" => Severity::Warning,
        "#error" => Severity::Error,
        _ => return None,
    };

    let argument = node.child_by_field_name("argument");
    let message = argument
        .map(|arg| text(arg, source).trim().to_string())
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| text(name_node, source).trim().to_string());
    let end_byte = argument.unwrap_or(name_node).end_byte();
    let end = text_end(source, name_node.start_byte(), end_byte);

    Some(Diagnostic {
        path: path.clone(),
        severity,
        range: TextRange::new(
            lines.position(source, name_node.start_byte()),
            lines.position(source, end),
        ),
        message,
    })
}

/// An `#include` directive found in the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IncludeDirective {
    /// Path as written, without quotes or angle brackets
    pub target: String,
    /// `"local.h"` rather than `<system.h>`
    pub quoted: bool,
    pub range: TextRange,
}

pub(crate) fn include_directives(tree: &Tree, source: &str, lines: &LineIndex) -> Vec<IncludeDirective> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if node.kind() != "preproc_include" {
            // Includes may sit inside conditional blocks
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
            continue;
        }
        let Some(path_node) = node.child_by_field_name("path") else {
            continue;
        };
        let written = text(path_node, source).trim();
        let quoted = path_node.kind() == "string_literal";
        let target = written
            .trim_start_matches(['"', '<'])
            .trim_end_matches(['"', '>'])
            .to_string();
        if target.is_empty() {
            continue;
        }
        out.push(IncludeDirective {
            target,
            quoted,
            range: TextRange::new(
                lines.position(source, path_node.start_byte()),
                lines.position(source, path_node.end_byte()),
            ),
        });
    }
    out
}

/// Diagnostic for an include that could not be found
pub(crate) fn missing_include(include: &IncludeDirective, path: &FileIdentity) -> Diagnostic {
    Diagnostic {
        path: path.clone(),
        severity: Severity::Fatal,
        range: include.range,
        message: format!("'{}' file not found", include.target),
    }
}

fn diagnostic(
    node: Node<'_>,
    source: &str,
    lines: &LineIndex,
    path: &FileIdentity,
    severity: Severity,
    message: String,
) -> Diagnostic {
    let end = text_end(source, node.start_byte(), node.end_byte());
    Diagnostic {
        path: path.clone(),
        severity,
        range: TextRange::new(
            lines.position(source, node.start_byte()),
            lines.position(source, end),
        ),
        message,
    }
}

/// End of `start..end` with trailing whitespace dropped
fn text_end(source: &str, start: usize, end: usize) -> usize {
    let span = source.get(start..end).unwrap_or("");
    start + span.trim_end().len()
}
