//! Annotations derived from the backend after each parse
//!
//! Every completed cycle rebuilds the whole set from the backend's current
//! state: highlight spans, hover types and diagnostics. Nothing is carried
//! over from earlier sets. The publisher refuses sets older than the one it
//! already applied.

use crate::backend::ParseBackend;
use crate::config::SourceConfig;
use crate::model::{DiagnosticClass, Position, Severity, TextRange};
use crate::snapshot::FileIdentity;

/// A token range with the tag it is rendered with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub range: TextRange,
    pub category: String,
    pub tag: String,
}

/// Hover text for a token with a known type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub range: TextRange,
    pub display_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticAnnotation {
    pub range: TextRange,
    pub severity: Severity,
    pub class: DiagnosticClass,
    /// `"<severity>:\n<message>"`
    pub tooltip: String,
}

/// Everything a consumer renders for one parsed revision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationSet {
    /// Revision of the snapshot the backend state was parsed from
    pub revision: u64,
    pub highlights: Vec<HighlightSpan>,
    pub types: Vec<TypeAnnotation>,
    pub diagnostics: Vec<DiagnosticAnnotation>,
}

impl AnnotationSet {
    /// Rebuild all annotations from the backend's current state
    pub fn extract<B: ParseBackend + ?Sized>(
        backend: &B,
        file: &FileIdentity,
        revision: u64,
        config: &SourceConfig,
    ) -> Self {
        let mut set = Self {
            revision,
            ..Self::default()
        };

        let mut skipped = 0usize;
        for token in backend.tokens(TextRange::document()) {
            let category = token.category();
            match config.tag_for(&category) {
                Some(tag) => set.highlights.push(HighlightSpan {
                    range: token.range(),
                    tag: tag.to_string(),
                    category,
                }),
                None => skipped += 1,
            }

            if let Some(type_info) = &token.type_info {
                set.types.push(TypeAnnotation {
                    range: token.range(),
                    display_text: format!("Type: {type_info}"),
                });
            }
        }

        let mut foreign = 0usize;
        for diagnostic in backend.diagnostics() {
            if &diagnostic.path != file {
                foreign += 1;
                continue;
            }
            set.diagnostics.push(DiagnosticAnnotation {
                range: diagnostic.range,
                severity: diagnostic.severity,
                class: diagnostic.severity.class(),
                tooltip: format!("{}:\n{}", diagnostic.severity.spelling(), diagnostic.message),
            });
        }

        tracing::debug!(
            file = %file,
            revision,
            highlights = set.highlights.len(),
            untagged = skipped,
            types = set.types.len(),
            diagnostics = set.diagnostics.len(),
            foreign_diagnostics = foreign,
            "annotations extracted"
        );
        set
    }

    /// Hover tooltips at `position`: types first, then diagnostics
    pub fn hover_at(&self, position: Position) -> Vec<&str> {
        let types = self
            .types
            .iter()
            .filter(|t| t.range.contains(position))
            .map(|t| t.display_text.as_str());
        let diagnostics = self
            .diagnostics
            .iter()
            .filter(|d| d.range.contains(position))
            .map(|d| d.tooltip.as_str());
        types.chain(diagnostics).collect()
    }

    /// Highlight spans starting on `line`
    pub fn highlights_on_line(&self, line: usize) -> impl Iterator<Item = &HighlightSpan> {
        self.highlights
            .iter()
            .filter(move |span| span.range.start.line == line)
    }

    pub fn count_by_class(&self, class: DiagnosticClass) -> usize {
        self.diagnostics.iter().filter(|d| d.class == class).count()
    }
}

/// Applies annotation sets in revision order
#[derive(Debug, Default)]
pub struct Publisher {
    current: Option<AnnotationSet>,
    published: u64,
    rejected: u64,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `set` unless it is older than the current one.
    ///
    /// An equal revision replaces the current set (a re-extraction of the
    /// same state). Returns whether the set was applied.
    pub fn publish(&mut self, set: AnnotationSet) -> bool {
        if let Some(current) = &self.current {
            if set.revision < current.revision {
                tracing::debug!(
                    current = current.revision,
                    stale = set.revision,
                    "rejecting stale annotations"
                );
                self.rejected += 1;
                return false;
            }
        }
        tracing::trace!(revision = set.revision, "publishing annotations");
        self.current = Some(set);
        self.published += 1;
        true
    }

    pub fn current(&self) -> Option<&AnnotationSet> {
        self.current.as_ref()
    }

    /// Revision of the applied set
    pub fn revision(&self) -> Option<u64> {
        self.current.as_ref().map(|set| set.revision)
    }

    pub fn published_count(&self) -> u64 {
        self.published
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected
    }
}
