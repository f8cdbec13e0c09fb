//! Document coordinates
//!
//! Lines and columns are 0-indexed; columns count characters, not bytes.

/// A position in the document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in chars)
    pub column: usize,
}

impl Position {
    /// Start of the document
    pub const ZERO: Position = Position::new(0, 0);

    /// Create a new position
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Half-open range `[start, end)` in document coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Range covering any document
    pub const fn document() -> Self {
        Self {
            start: Position::ZERO,
            end: Position::new(usize::MAX, usize::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Check whether `pos` lies in the range.
    ///
    /// Empty ranges (e.g. a missing token) contain their start position so
    /// they can still be hovered.
    pub fn contains(&self, pos: Position) -> bool {
        if self.is_empty() {
            return pos == self.start;
        }
        pos >= self.start && pos < self.end
    }

    /// Check whether two ranges share at least one position
    pub fn intersects(&self, other: &TextRange) -> bool {
        if self.is_empty() {
            return other.contains(self.start);
        }
        if other.is_empty() {
            return self.contains(other.start);
        }
        self.start < other.end && other.start < self.end
    }
}

/// 1-indexed `line:column`, as compilers print it
impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

impl std::fmt::Display for TextRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
