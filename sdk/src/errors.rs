//! Error types and handling
//!
//! This module provides the error types used throughout the Aula engine.
//! All errors implement the `AulaErrorExt` trait which provides user-friendly
//! hints and indicates whether the current session can keep going.
//!
//! # Security
//!
//! Hints are static strings. They never echo provider responses, API keys or
//! database paths back to the person asking the question.

use thiserror::Error;

/// Trait for Aula error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait AulaErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors end the current question's turn only; the session
    /// loop keeps accepting questions. Non-recoverable errors stop startup.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Database**: SQLite schema or query failures
/// - **Connectivity**: Schedule store or language model unreachable
/// - **Extraction**: Language model answered with something we can't use
/// - **Keyring**: OS credential store access failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{AulaErrorExt, EngineError};
///
/// let error = EngineError::Extraction("missing field 'hora'".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal = EngineError::Config("bad log level".to_string());
/// assert!(!fatal.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(String),

    // Store or language model unreachable
    #[error("Connectivity failure: {0}")]
    Connectivity(String),

    // Language model response missing or malformed
    #[error("Extraction failure: {0}")]
    Extraction(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AulaErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Database(_) => "The schedule database could not be queried. Try again later",
            Self::Connectivity(_) => {
                "Could not reach the schedule or the language service. Check your connection"
            }
            Self::Extraction(_) => "Sorry, I didn't understand your question. Try rephrasing it",
            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) | Self::KeyringError(_) => false,

            // Per-turn failures; the session keeps going
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_errors_are_recoverable() {
        assert!(EngineError::Connectivity("timeout".into()).is_recoverable());
        assert!(EngineError::Extraction("not json".into()).is_recoverable());
        assert!(EngineError::Database("locked".into()).is_recoverable());
    }

    #[test]
    fn test_hint_does_not_leak_details() {
        let err = EngineError::Connectivity("sk-abcdefghijklmnopqrstuvwxyz".into());
        assert!(!err.user_hint().contains("sk-"));
        assert!(err.to_string().contains("Connectivity failure"));
    }
}
