//! Data model shared by the coordinator, the backends and the consumer side

pub mod completion;
pub mod diagnostic;
pub mod position;
pub mod token;

pub use completion::{CompletionSuggestion, NO_SUGGESTIONS};
pub use diagnostic::{Diagnostic, DiagnosticClass, Severity};
pub use position::{Position, TextRange};
pub use token::{SymbolKind, Token, TokenKind};
