//! Highlight categories and tag lookup
//!
//! Tokens report a hierarchical category name (`literal.string`,
//! `variable.parameter`). The tag table maps category names to the tag a
//! consumer applies to the token's range.

use std::collections::BTreeMap;

/// Every category name a token can report
pub const CATEGORY_NAMES: &[&str] = &[
    "comment",
    "function",
    "identifier",
    "keyword",
    "label",
    "literal",
    "literal.boolean",
    "literal.character",
    "literal.null",
    "literal.number",
    "literal.string",
    "macro",
    "namespace",
    "property",
    "punctuation",
    "type",
    "variable",
    "variable.parameter",
];

/// Tags applied when the config does not override them.
///
/// Plain identifiers, variables and punctuation have no tag.
pub fn default_tags() -> BTreeMap<String, String> {
    [
        ("comment", "comment"),
        ("function", "function"),
        ("keyword", "keyword"),
        ("label", "label"),
        ("literal", "literal"),
        ("literal.string", "string"),
        ("literal.character", "string"),
        ("literal.number", "number"),
        ("macro", "preprocessor"),
        ("namespace", "namespace"),
        ("property", "property"),
        ("type", "type"),
        ("variable.parameter", "parameter"),
    ]
    .into_iter()
    .map(|(category, tag)| (category.to_string(), tag.to_string()))
    .collect()
}

/// Look up the tag for a category.
///
/// Tries the exact name first, then progressively shorter parents
/// (`literal.string` -> `literal`). `None` means the category is not
/// highlighted.
pub fn tag_for_category<'a>(tags: &'a BTreeMap<String, String>, category: &str) -> Option<&'a str> {
    let mut current = category;
    loop {
        if let Some(tag) = tags.get(current) {
            return Some(tag.as_str());
        }

        let dot_pos = current.rfind('.')?;
        current = &current[..dot_pos];
    }
}
