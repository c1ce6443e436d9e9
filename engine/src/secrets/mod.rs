pub mod string;

pub use string::SecretString;

use keyring::Entry;
use regex::Regex;
use sdk::errors::EngineError;
use std::sync::OnceLock;

/// SecretManager reads and writes API keys in the OS keychain.
///
/// Secrets are stored in:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service (libsecret)
///
/// Lookups never prompt. A missing key simply means the provider that needs
/// it cannot be built; the caller decides what to report.
pub struct SecretManager {
    service_name: String,
}

/// Regex patterns for detecting common secret formats.
static SECRET_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// Initializes and returns the secret detection patterns.
///
/// Patterns match:
/// - OpenAI API keys: sk-[a-zA-Z0-9]{20,}
/// - Bearer tokens: Bearer\s+[^\s]{20,}
fn get_secret_patterns() -> &'static Vec<Regex> {
    SECRET_PATTERNS.get_or_init(|| {
        vec![
            // Includes variants like sk-proj-, sk-test-, etc.
            Regex::new(r"sk-[a-zA-Z0-9\-_]{20,}").expect("Invalid OpenAI pattern"),
            Regex::new(r"Bearer\s+[^\s]{20,}").expect("Invalid Bearer pattern"),
        ]
    })
}

/// Scrubs secrets from text by replacing them with [REDACTED].
///
/// Provider error bodies are passed through this before they are logged or
/// shown at the prompt.
///
/// # Examples
/// ```
/// use aula_engine::secrets::scrub;
///
/// let scrubbed = scrub("Incorrect API key provided: sk-1234567890abcdefghij");
/// assert_eq!(scrubbed, "Incorrect API key provided: [REDACTED]");
/// ```
pub fn scrub(text: &str) -> String {
    let mut result = text.to_string();

    for pattern in get_secret_patterns() {
        result = pattern.replace_all(&result, "[REDACTED]").to_string();
    }

    result
}

impl SecretManager {
    /// Creates a new SecretManager with the given service name.
    ///
    /// The service name is used to namespace secrets in the OS keychain.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, EngineError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            EngineError::KeyringError(format!("Failed to create keyring entry: {}", e))
        })
    }

    /// Retrieves a secret from the OS keychain.
    ///
    /// Returns `Ok(None)` when no entry exists.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<Option<SecretString>, EngineError> {
        match self.entry(key)?.get_password() {
            Ok(secret) => {
                tracing::debug!("Retrieved secret '{}' from keychain", key);
                Ok(Some(SecretString::new(secret)))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(EngineError::KeyringError(format!(
                "Failed to retrieve secret '{}': {}",
                key, e
            ))),
        }
    }

    /// Stores a secret in the OS keychain.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if the value is empty or keychain
    /// access fails
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), EngineError> {
        if value.trim().is_empty() {
            return Err(EngineError::KeyringError(
                "Secret cannot be empty".to_string(),
            ));
        }

        self.entry(key)?.set_password(value.trim()).map_err(|e| {
            EngineError::KeyringError(format!("Failed to store secret '{}': {}", key, e))
        })?;

        tracing::info!("Stored secret '{}' in keychain", key);
        Ok(())
    }
}

/// Resolve an API key once, at startup.
///
/// Order: the environment variable named in config, then the keychain entry.
/// The result is handed to the provider constructor; nothing is cached
/// process-wide.
pub fn resolve_api_key(
    env_var: &str,
    manager: &SecretManager,
    keychain_key: &str,
) -> Result<Option<SecretString>, EngineError> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            tracing::debug!("Using API key from ${}", env_var);
            return Ok(Some(SecretString::new(value.trim())));
        }
    }

    manager.get_secret(keychain_key)
}
