//! Tier-aware text and structured generation.
//!
//! Structured generation is a two-step contract: the target JSON Schema is
//! written into the system prompt, and the reply is parsed and validated
//! afterwards. Any failure in the second step is reported as
//! [`ConclaveError::SchemaValidation`] with the raw reply attached, so it can
//! never be confused with a transport failure from the first step.

use std::sync::Arc;

use conclave_common::{ConclaveError, Result};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{ChatMessage, LlmClient, LlmRequest};
use crate::config::LlmConfig;

/// Temperature for schema-bound calls and plain `generate` calls such as the writer.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Quality/cost class of a generation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Smart,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelTier::Fast => f.write_str("fast"),
            ModelTier::Smart => f.write_str("smart"),
        }
    }
}

/// Concrete model ids behind each tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTiers {
    pub fast: String,
    pub smart: String,
}

impl ModelTiers {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Smart => &self.smart,
        }
    }
}

/// A type the model can be asked to produce as JSON.
///
/// Deserialization covers shape and types; `validate` covers the rules a
/// JSON Schema generated from the type cannot express.
pub trait StructuredOutput: DeserializeOwned + JsonSchema {
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

/// Append the JSON-only instruction and the target schema to a system prompt.
pub fn structured_system_prompt<T: StructuredOutput>(system: &str) -> Result<String> {
    let schema = schemars::schema_for!(T);
    let schema_json = serde_json::to_string_pretty(&schema)?;
    Ok(format!(
        "{}\n\nRespond with ONLY a single JSON object that validates against this JSON Schema. \
         Do not wrap it in Markdown and do not add any text before or after it.\n\n{}",
        system.trim_end(),
        schema_json
    ))
}

/// Remove one surrounding Markdown code fence (```` ```json ... ``` ````), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line.
    match body.split_once('\n') {
        Some((info, inner)) if !info.trim().contains(['{', '[']) => inner.trim(),
        _ => body.trim(),
    }
}

/// Parse and validate a model reply against `T`.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T> {
    let body = strip_code_fence(raw);
    let value: T = serde_json::from_str(body)
        .map_err(|e| ConclaveError::schema_validation(raw, e.to_string()))?;
    value
        .validate()
        .map_err(|reason| ConclaveError::schema_validation(raw, reason))?;
    Ok(value)
}

/// The generation capability every pipeline stage talks to.
///
/// Built once at startup and shared; it holds no per-request state.
pub struct GenerationClient {
    llm: Arc<dyn LlmClient>,
    tiers: ModelTiers,
    max_output_tokens: Option<u32>,
}

impl GenerationClient {
    pub fn new(llm: Arc<dyn LlmClient>, tiers: ModelTiers) -> Self {
        Self {
            llm,
            tiers,
            max_output_tokens: None,
        }
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self {
            llm,
            tiers: config.tiers(),
            max_output_tokens: config.max_output_tokens,
        }
    }

    pub fn tiers(&self) -> &ModelTiers {
        &self.tiers
    }

    /// Free-form text at the default temperature.
    pub async fn generate(&self, tier: ModelTier, system: &str, user: &str) -> Result<String> {
        self.generate_with_temperature(tier, system, user, DEFAULT_TEMPERATURE)
            .await
    }

    /// Free-form text, trimmed of surrounding whitespace.
    pub async fn generate_with_temperature(
        &self,
        tier: ModelTier,
        system: &str,
        user: &str,
        temperature: f32,
    ) -> Result<String> {
        let model = self.tiers.model_for(tier).to_string();
        let request = LlmRequest {
            model: model.clone(),
            system_prompt: Some(system.to_string()),
            messages: vec![ChatMessage::user(user)],
            temperature: Some(temperature),
            max_tokens: self.max_output_tokens,
        };

        debug!(
            %tier,
            model = %model,
            system_len = system.len(),
            user_len = user.len(),
            "Generating"
        );

        let response = self.llm.complete(request).await?;

        debug!(
            %tier,
            model = %response.model,
            output_len = response.content.len(),
            finish_reason = ?response.finish_reason,
            "Generation finished"
        );

        Ok(response.content.trim().to_string())
    }

    /// Ask for JSON matching `T`, then parse and validate the reply.
    pub async fn generate_structured<T: StructuredOutput>(
        &self,
        tier: ModelTier,
        system: &str,
        user: &str,
    ) -> Result<T> {
        let system = structured_system_prompt::<T>(system)?;
        let raw = self
            .generate_with_temperature(tier, &system, user, DEFAULT_TEMPERATURE)
            .await?;

        parse_structured(&raw).inspect_err(|e| {
            warn!(
                %tier,
                error = %e,
                preview = %raw.chars().take(200).collect::<String>(),
                "Model output failed structured validation"
            );
        })
    }
}
