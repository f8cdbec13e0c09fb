//! Tree-sitter parse backend for C and C++
//!
//! Provides the concrete `ParseBackend` used by source views:
//! - Language detection from file extensions and `-x` arguments
//! - Incremental reparsing against the last good tree
//! - Token, diagnostic and declaration extraction
//! - Declaration-based completion
//!
//! ## Pipeline
//!
//! ```text
//! snapshot → parse (old tree reused) → declarations (+ one level of includes)
//!          → tokens + diagnostics → ParsedUnit swapped in
//! ```

mod candidates;
mod declarations;
mod diagnostics;
mod highlights;
mod languages;
mod parser;
mod tokens;

pub use declarations::{Declaration, Declarations};
pub use highlights::{default_tags, tag_for_category, CATEGORY_NAMES};
pub use languages::LanguageId;
pub use parser::{BackendArgs, LineIndex, TreeSitterBackend};
