//! Completion list post-processing and trigger detection

use std::collections::BTreeMap;

use crate::model::CompletionSuggestion;

/// Turn raw backend suggestions into the list shown to the user.
///
/// Entries with nothing to insert are dropped and duplicates by display text
/// collapse (the later entry wins). The list is ordered by display text and
/// is never empty: with nothing left it holds the sentinel entry.
pub fn finalize(raw: Vec<CompletionSuggestion>) -> Vec<CompletionSuggestion> {
    let mut rows: BTreeMap<String, String> = BTreeMap::new();
    for suggestion in raw {
        if suggestion.insertable_text.is_empty() {
            continue;
        }
        rows.insert(suggestion.display_text, suggestion.insertable_text);
    }

    if rows.is_empty() {
        return vec![CompletionSuggestion::sentinel()];
    }

    rows.into_iter()
        .map(|(display, insert)| CompletionSuggestion::new(display, insert))
        .collect()
}

/// Decide whether typing `ch` should open a completion list.
///
/// `line_before_cursor` is the current line up to the cursor and already
/// includes `ch`. Member access (`.`, `->`) and scope resolution (`::`)
/// trigger; nothing triggers on a line holding a string quote or a `//`
/// comment before the cursor.
pub fn is_trigger(line_before_cursor: &str, ch: char) -> bool {
    let Some(before_key) = line_before_cursor.strip_suffix(ch) else {
        return false;
    };
    if before_key.contains('"') || before_key.contains("//") {
        return false;
    }

    match ch {
        '.' => true,
        ':' => before_key.ends_with(':'),
        '>' => before_key.ends_with('-'),
        _ => false,
    }
}
