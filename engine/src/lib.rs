//! Aula Engine Library
//!
//! Answers free-text questions about the class schedule. The pipeline is:
//! [`intent`] extraction, [`time_normalizer`], then [`query`] resolution
//! against the [`db`] store, driven one question at a time by [`session`].
//! It is used by both the `aula` binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Database persistence module
pub mod db;

/// LLM provider abstraction layer
pub mod llm;

/// Question to intent extraction
pub mod intent;

/// Date and time expression normalization
pub mod time_normalizer;

/// Intent to schedule entry resolution
pub mod query;

/// Question/answer session loop
pub mod session;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
