//! Intent extraction
//!
//! An [`IntentExtractor`] turns a free-text question into an [`Intent`],
//! grounded on the session's [`SubjectCatalog`]. The production extractor is
//! [`LlmIntentExtractor`]; tests substitute deterministic stubs.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::{Intent, SubjectCatalog};

use crate::llm::LLMError;
use crate::secrets::scrub;

pub mod llm;

pub use llm::{parse_response, LlmIntentExtractor};

/// Why a question could not be turned into an intent
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The language model could not be reached
    #[error("language model unavailable: {0}")]
    Unavailable(LLMError),

    /// The language model answered with something that is not a valid intent
    #[error("malformed extraction response: {0}")]
    Malformed(String),
}

impl From<ExtractionError> for EngineError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::Unavailable(e) => EngineError::Connectivity(scrub(&e.to_string())),
            ExtractionError::Malformed(reason) => EngineError::Extraction(scrub(&reason)),
        }
    }
}

/// Capability that understands questions
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    /// Extract the intent of `question`.
    ///
    /// `catalog` lists the known subject names so misspellings can be
    /// corrected to the closest one.
    async fn extract(
        &self,
        question: &str,
        catalog: &SubjectCatalog,
    ) -> Result<Intent, ExtractionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_maps_to_connectivity() {
        let err: EngineError = ExtractionError::Unavailable(LLMError::Timeout).into();
        assert!(matches!(err, EngineError::Connectivity(_)));
    }

    #[test]
    fn test_malformed_maps_to_extraction_and_is_scrubbed() {
        let err: EngineError =
            ExtractionError::Malformed("echoed sk-abcdefghijklmnopqrstuvwxyz".into()).into();
        match err {
            EngineError::Extraction(msg) => assert!(msg.contains("[REDACTED]")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
