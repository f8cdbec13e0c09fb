//! Completion suggestions

/// Display text shown when the backend has nothing to offer
pub const NO_SUGGESTIONS: &str = "No suggestions found...";

/// One entry of a completion list
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompletionSuggestion {
    /// Text shown in the list (unique within a list)
    pub display_text: String,
    /// Text inserted at the cursor when chosen
    pub insertable_text: String,
}

impl CompletionSuggestion {
    pub fn new(display_text: impl Into<String>, insertable_text: impl Into<String>) -> Self {
        Self {
            display_text: display_text.into(),
            insertable_text: insertable_text.into(),
        }
    }

    /// Build a suggestion from its typed text and optional result type.
    ///
    /// `foo(int a)` with result `int` displays as `foo(int a) --> int`.
    pub fn from_parts(text: &str, result_type: Option<&str>) -> Self {
        let display_text = match result_type {
            Some(result) if !result.is_empty() => format!("{text} --> {result}"),
            _ => text.to_string(),
        };
        Self::new(display_text, text)
    }

    /// The "no suggestions" placeholder
    pub fn sentinel() -> Self {
        Self::new(NO_SUGGESTIONS, "")
    }

    pub fn is_sentinel(&self) -> bool {
        self.display_text == NO_SUGGESTIONS && self.insertable_text.is_empty()
    }
}
