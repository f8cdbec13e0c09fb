//! reparse - background reparse coordination for live source annotations
//!
//! A worker thread keeps one parse backend in step with an editable buffer:
//! edits coalesce into a single pending parse, the backend is touched by at
//! most one caller at a time, and the consumer pulls tokens, diagnostics and
//! completions from the latest successful parse.

pub mod annotations;
pub mod backend;
pub mod buffer;
pub mod cli;
pub mod compile_db;
pub mod completion;
pub mod config;
pub mod config_paths;
pub mod coordinator;
pub mod error;
pub mod messages;
pub mod model;
pub mod snapshot;
pub mod source_view;
pub mod syntax;
pub mod tracing;

// Re-export commonly used types
pub use annotations::{AnnotationSet, Publisher};
pub use backend::ParseBackend;
pub use buffer::SharedBuffer;
pub use config::SourceConfig;
pub use coordinator::{CoordinatorOptions, EditNotifier, ParseCoordinator};
pub use error::{BackendError, CoordinatorError, ViewError};
pub use messages::{ParseEvent, ParseOutcome, ParseStatus};
pub use snapshot::{BufferSnapshot, FileIdentity, SnapshotProvider};
pub use source_view::{ParseState, SourceView};
pub use syntax::TreeSitterBackend;
