//! Aula SDK
//!
//! Shared library providing the domain types and error handling used by the
//! Aula engine: intents extracted from questions, resolved time windows,
//! schedule entries and the subject catalog.

/// Error types and handling
pub mod errors;

/// Domain types
pub mod types;

// Re-export commonly used types
pub use errors::{AulaErrorExt, EngineError};
pub use types::{Intent, IntentKind, ScheduleEntry, SubjectCatalog, TimeWindow};
