//! Completion candidates from the declaration index

use super::declarations::{Declaration, Declarations};
use super::languages::LanguageId;
use crate::model::{CompletionSuggestion, SymbolKind};

/// What precedes the identifier being completed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Access {
    /// `object.` or `object->`
    Member { object: Option<String> },
    /// `Qualifier::`
    Scope { qualifier: Option<String> },
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompletionContext {
    /// Identifier characters already typed
    pub prefix: String,
    pub access: Access,
}

impl CompletionContext {
    /// Inspect the text of the cursor line up to the cursor
    pub fn at(before_cursor: &str) -> Self {
        let (rest, prefix) = split_trailing_identifier(before_cursor);

        let access = if let Some(rest) = rest.strip_suffix('.') {
            Access::Member {
                object: trailing_identifier(rest),
            }
        } else if let Some(rest) = rest.strip_suffix("->") {
            Access::Member {
                object: trailing_identifier(rest),
            }
        } else if let Some(rest) = rest.strip_suffix("::") {
            Access::Scope {
                qualifier: trailing_identifier(rest),
            }
        } else {
            Access::Global
        };

        Self {
            prefix: prefix.to_string(),
            access,
        }
    }
}

pub(crate) fn suggestions(
    context: &CompletionContext,
    declarations: &Declarations,
    language: LanguageId,
    macros: &[String],
) -> Vec<CompletionSuggestion> {
    let prefix = context.prefix.as_str();
    let matching = |d: &&Declaration| d.name.starts_with(prefix);

    let mut out: Vec<CompletionSuggestion> = match &context.access {
        Access::Member { object } => {
            let owner = object
                .as_deref()
                .and_then(|name| owner_of(declarations, name));
            declarations
                .members(owner.as_deref())
                .filter(matching)
                .map(Declaration::suggestion)
                .collect()
        }
        Access::Scope { qualifier } => {
            let scoped = qualifier
                .as_deref()
                .filter(|q| declarations.has_members(q));
            declarations
                .iter()
                .filter(|d| match scoped {
                    Some(q) => d.owner.as_deref() == Some(q) && d.kind != SymbolKind::Parameter,
                    None => matches!(
                        d.kind,
                        SymbolKind::Type | SymbolKind::Function | SymbolKind::Namespace
                    ),
                })
                .filter(matching)
                .map(Declaration::suggestion)
                .collect()
        }
        Access::Global => {
            let mut out: Vec<CompletionSuggestion> = declarations
                .iter()
                .filter(|d| !matches!(d.kind, SymbolKind::Field | SymbolKind::Label))
                .filter(|d| !(d.kind == SymbolKind::Function && is_class_member(declarations, d)))
                .filter(matching)
                .map(Declaration::suggestion)
                .collect();
            out.extend(
                language
                    .keywords()
                    .iter()
                    .filter(|k| k.starts_with(prefix))
                    .map(|k| CompletionSuggestion::from_parts(k, None)),
            );
            out.extend(
                macros
                    .iter()
                    .filter(|m| m.starts_with(prefix))
                    .map(|m| CompletionSuggestion::from_parts(m, None)),
            );
            out
        }
    };

    // The identifier being typed is not a useful suggestion for itself
    out.retain(|s| !s.insertable_text.is_empty() && s.insertable_text != prefix);
    out
}

/// Struct or class whose members an object of `name` has
fn owner_of(declarations: &Declarations, name: &str) -> Option<String> {
    let declared = declarations.resolve(name, usize::MAX)?;
    let mut type_name = base_type_name(declared.type_name.as_deref()?);
    if declarations.has_members(&type_name) {
        return Some(type_name);
    }

    // One level of typedef
    let alias = declarations
        .resolve(&type_name, usize::MAX)
        .filter(|d| d.kind == SymbolKind::Type)?;
    type_name = base_type_name(alias.type_name.as_deref()?);
    declarations.has_members(&type_name).then_some(type_name)
}

fn is_class_member(declarations: &Declarations, declaration: &Declaration) -> bool {
    declaration.owner.as_deref().is_some_and(|owner| {
        declarations
            .resolve(owner, usize::MAX)
            .is_some_and(|d| d.kind == SymbolKind::Type)
    })
}

/// `const struct point *` -> `point`
fn base_type_name(type_name: &str) -> String {
    let without_suffix = type_name
        .split(['*', '&', '['])
        .next()
        .unwrap_or(type_name);
    without_suffix
        .split_whitespace()
        .filter(|word| {
            !matches!(
                *word,
                "const" | "volatile" | "struct" | "class" | "union" | "enum"
            )
        })
        .last()
        .unwrap_or("")
        .rsplit("::")
        .next()
        .unwrap_or("")
        .to_string()
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn split_trailing_identifier(text: &str) -> (&str, &str) {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_identifier_char(*c))
        .last()
        .map_or(text.len(), |(i, _)| i);
    text.split_at(start)
}

fn trailing_identifier(text: &str) -> Option<String> {
    let (_, ident) = split_trailing_identifier(text.trim_end());
    (!ident.is_empty()).then(|| ident.to_string())
}
