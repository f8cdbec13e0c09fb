//! Lexical tokens from a syntax tree
//!
//! Walks the leaves of the tree in document order and classifies each one.
//! Literals and comments with inner structure (string contents, escapes)
//! are reported as a single token.

use tree_sitter::{Node, Tree};

use super::declarations::{text, Declarations};
use super::parser::LineIndex;
use crate::model::{Position, SymbolKind, Token, TokenKind};

/// Nodes reported whole even though they have children
const ATOMIC_KINDS: &[&str] = &[
    "string_literal",
    "raw_string_literal",
    "char_literal",
    "system_lib_string",
    "comment",
    "number_literal",
    "null",
];

pub(crate) fn collect_tokens(
    tree: &Tree,
    source: &str,
    lines: &LineIndex,
    declarations: &Declarations,
) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        let atomic = ATOMIC_KINDS.contains(&node.kind());
        if !atomic && cursor.goto_first_child() {
            continue;
        }

        let blank = text(node, source).trim().is_empty();
        if !blank && !node.is_missing() {
            if let Some(token) = classify(node, source, lines, declarations) {
                tokens.push(token);
            }
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    tokens
}

fn classify(
    node: Node<'_>,
    source: &str,
    lines: &LineIndex,
    declarations: &Declarations,
) -> Option<Token> {
    let start = lines.position(source, node.start_byte());
    let end = lines.position(source, node.end_byte());
    let kind = node.kind();

    let token = match kind {
        "comment" => Token::new(TokenKind::Comment, start, end),
        "ERROR" => return None,
        _ => {
            if let Some(sub) = literal_kind(kind) {
                let mut token = Token::new(TokenKind::Literal, start, end);
                token.literal = Some(sub);
                token
            } else if kind == "primitive_type" || is_keyword(node) {
                Token::new(TokenKind::Keyword, start, end)
            } else if is_identifier(kind) {
                identifier(node, source, start, end, declarations)
            } else {
                Token::new(TokenKind::Punctuation, start, end)
            }
        }
    };
    Some(token)
}

fn literal_kind(kind: &str) -> Option<&'static str> {
    match kind {
        "number_literal" => Some("number"),
        "string_literal" | "raw_string_literal" | "system_lib_string" => Some("string"),
        "char_literal" => Some("character"),
        "true" | "false" => Some("boolean"),
        "null" | "nullptr" => Some("null"),
        _ => None,
    }
}

/// Anonymous word tokens (`return`, `struct`, `#include`) are keywords
fn is_keyword(node: Node<'_>) -> bool {
    let kind = node.kind();
    if kind == "preproc_directive" {
        return true;
    }
    if node.is_named() {
        return false;
    }
    let word = kind.strip_prefix('#').unwrap_or(kind);
    word.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && word.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_identifier(kind: &str) -> bool {
    matches!(
        kind,
        "identifier"
            | "field_identifier"
            | "type_identifier"
            | "namespace_identifier"
            | "statement_identifier"
    )
}

fn identifier(
    node: Node<'_>,
    source: &str,
    start: Position,
    end: Position,
    declarations: &Declarations,
) -> Token {
    let name = text(node, source);
    let declaration = declarations.resolve(name, node.start_byte());
    let mut token = Token::new(TokenKind::Identifier, start, end);

    let symbol = match node.kind() {
        "type_identifier" => Some(SymbolKind::Type),
        "namespace_identifier" => Some(SymbolKind::Namespace),
        "statement_identifier" => Some(SymbolKind::Label),
        "field_identifier" => Some(if is_called(node) {
            SymbolKind::Function
        } else {
            SymbolKind::Field
        }),
        _ => contextual_symbol(node).or_else(|| declaration.map(|d| d.kind)),
    };
    token.symbol = symbol;
    token.type_info = declaration.and_then(|d| d.type_info());
    token
}

/// Symbol kind implied by where an identifier sits, regardless of declarations
fn contextual_symbol(node: Node<'_>) -> Option<SymbolKind> {
    let parent = node.parent()?;
    match parent.kind() {
        "preproc_def" | "preproc_function_def" => Some(SymbolKind::Macro),
        "preproc_params" => Some(SymbolKind::Parameter),
        _ if is_called(node) => Some(SymbolKind::Function),
        _ => None,
    }
}

/// True for the name in a call or in a function declarator
fn is_called(node: Node<'_>) -> bool {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "qualified_identifier" | "template_function" | "template_method" => {}
            "field_expression" => {
                if parent.child_by_field_name("field") != Some(current) {
                    return false;
                }
            }
            "call_expression" => return parent.child_by_field_name("function") == Some(current),
            "function_declarator" => {
                return parent.child_by_field_name("declarator") == Some(current)
            }
            _ => return false,
        }
        current = parent;
    }
    false
}
