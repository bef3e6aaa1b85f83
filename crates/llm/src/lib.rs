//! Generation backend: the [`LlmClient`] seam, the Gemini implementation,
//! retry and concurrency wrappers, and tier-aware structured generation.

pub mod client;
pub mod config;
pub mod gemini;
pub mod retry;
pub mod structured;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{ChatMessage, LlmClient, LlmRequest, LlmResponse, Role, TokenUsage};
pub use config::{LlmConfig, SemaphoredClient, build_llm_client};
pub use gemini::GeminiClient;
pub use retry::{RetryConfig, RetryingClient};
pub use structured::{
    DEFAULT_TEMPERATURE, GenerationClient, ModelTier, ModelTiers, StructuredOutput,
    parse_structured, structured_system_prompt,
};
