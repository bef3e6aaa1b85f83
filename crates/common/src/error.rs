//! Error types for Conclave.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConclaveError {
    /// Transport failures, timeouts, rate limits and non-success statuses
    /// reported by the generation backend.
    #[error("Model service error: {0}")]
    ModelService(String),

    /// The model answered, but the answer did not satisfy the structured
    /// contract it was asked for.
    #[error("Schema validation error: {reason}")]
    SchemaValidation { raw: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConclaveError {
    pub fn schema_validation(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaValidation {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelService(_) => "MODEL_SERVICE_ERROR",
            Self::SchemaValidation { .. } => "SCHEMA_VALIDATION_ERROR",
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::Agent(_) => "AGENT_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the generation backend reported a timeout.
    ///
    /// Only the summary before the first `:` is inspected; anything after it
    /// is provider detail such as a response body.
    pub fn is_timeout(&self) -> bool {
        let Self::ModelService(msg) = self else {
            return false;
        };
        model_service_summary(msg).to_lowercase().contains("timed out")
    }
}

/// The part of a model-service message written by the adapter itself.
pub fn model_service_summary(msg: &str) -> &str {
    msg.split_once(':').map_or(msg, |(summary, _)| summary)
}

pub type Result<T> = std::result::Result<T, ConclaveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_distinct_per_failure_class() {
        let service = ConclaveError::ModelService("503 Service Unavailable".into());
        let schema = ConclaveError::schema_validation("not json", "expected value");
        let config = ConclaveError::Config("GEMINI_API_KEY is not set".into());

        assert_eq!(service.kind(), "MODEL_SERVICE_ERROR");
        assert_eq!(schema.kind(), "SCHEMA_VALIDATION_ERROR");
        assert_eq!(config.kind(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn schema_validation_keeps_raw_text() {
        let err = ConclaveError::schema_validation("{\"pass\": maybe}", "expected bool");
        match err {
            ConclaveError::SchemaValidation { raw, reason } => {
                assert_eq!(raw, "{\"pass\": maybe}");
                assert_eq!(reason, "expected bool");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn timeout_detection_only_applies_to_model_service() {
        assert!(
            ConclaveError::ModelService("Gemini request timed out after 100ms".into()).is_timeout()
        );
        assert!(!ConclaveError::ModelService("Gemini API error 500".into()).is_timeout());
        assert!(!ConclaveError::Agent("timed out".into()).is_timeout());
    }

    #[test]
    fn timeout_text_in_a_response_body_is_ignored() {
        let err = ConclaveError::ModelService(
            "Gemini API error 400 Bad Request: {\"message\": \"upstream timed out\"}".into(),
        );
        assert!(!err.is_timeout());
    }
}
