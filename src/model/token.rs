//! Lexical tokens reported by a parse backend

use super::position::{Position, TextRange};

/// Lexical class of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Punctuation,
    Keyword,
    Identifier,
    Literal,
    Comment,
}

/// What an identifier refers to, when the backend can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Function,
    Type,
    Variable,
    Parameter,
    Field,
    Namespace,
    Macro,
    Label,
}

impl SymbolKind {
    /// Highlight category name for this symbol
    pub fn category(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Type => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Parameter => "variable.parameter",
            SymbolKind::Field => "property",
            SymbolKind::Namespace => "namespace",
            SymbolKind::Macro => "macro",
            SymbolKind::Label => "label",
        }
    }
}

/// A single token in document coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Semantic refinement for identifiers
    pub symbol: Option<SymbolKind>,
    /// Literal sub-class, e.g. "string" or "number"
    pub literal: Option<&'static str>,
    pub start: Position,
    /// Exclusive
    pub end: Position,
    /// Semantic type, when known (drives hover annotations)
    pub type_info: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, start: Position, end: Position) -> Self {
        Self {
            kind,
            symbol: None,
            literal: None,
            start,
            end,
            type_info: None,
        }
    }

    pub fn with_symbol(mut self, symbol: SymbolKind) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_type(mut self, type_info: impl Into<String>) -> Self {
        self.type_info = Some(type_info.into());
        self
    }

    pub fn range(&self) -> TextRange {
        TextRange::new(self.start, self.end)
    }

    /// Highlight category for this token.
    ///
    /// Names are hierarchical (`literal.string`); lookup falls back to the
    /// parent name when the full name has no tag.
    pub fn category(&self) -> String {
        match self.kind {
            TokenKind::Keyword => "keyword".to_string(),
            TokenKind::Comment => "comment".to_string(),
            TokenKind::Literal => match self.literal {
                Some(sub) => format!("literal.{sub}"),
                None => "literal".to_string(),
            },
            TokenKind::Identifier => match self.symbol {
                Some(symbol) => symbol.category().to_string(),
                None => "identifier".to_string(),
            },
            TokenKind::Punctuation => "punctuation".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names() {
        let p = Position::ZERO;
        assert_eq!(Token::new(TokenKind::Keyword, p, p).category(), "keyword");
        assert_eq!(
            Token::new(TokenKind::Identifier, p, p)
                .with_symbol(SymbolKind::Function)
                .category(),
            "function"
        );
        assert_eq!(
            Token::new(TokenKind::Identifier, p, p).category(),
            "identifier"
        );

        let mut literal = Token::new(TokenKind::Literal, p, p);
        literal.literal = Some("string");
        assert_eq!(literal.category(), "literal.string");
    }
}
