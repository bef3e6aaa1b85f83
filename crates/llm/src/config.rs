use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conclave_common::{ConclaveError, Result};
use serde::{Deserialize, Serialize};

use crate::client::{LlmClient, LlmRequest, LlmResponse};
use crate::gemini::GeminiClient;
use crate::retry::{RetryConfig, RetryingClient};
use crate::structured::ModelTiers;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const FAST_MODEL_ENV: &str = "GEMINI_MODEL_FAST";
pub const SMART_MODEL_ENV: &str = "GEMINI_MODEL_SMART";
pub const API_URL_ENV: &str = "GEMINI_API_URL";
pub const TIMEOUT_ENV: &str = "CONCLAVE_LLM_TIMEOUT_MS";
pub const MAX_CONCURRENT_ENV: &str = "CONCLAVE_MAX_CONCURRENT";

pub const DEFAULT_FAST_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SMART_MODEL: &str = "gemini-2.5-pro";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Prefer the `GEMINI_API_KEY` environment variable over the config file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    #[serde(default = "default_fast_model")]
    pub fast_model: String,
    #[serde(default = "default_smart_model")]
    pub smart_model: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_fast_model() -> String {
    DEFAULT_FAST_MODEL.into()
}

fn default_smart_model() -> String {
    DEFAULT_SMART_MODEL.into()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            fast_model: default_fast_model(),
            smart_model: default_smart_model(),
            timeout_ms: default_timeout_ms(),
            max_output_tokens: None,
            max_concurrent_requests: default_max_concurrent(),
            retry: RetryConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Overlay values from environment variables.
    ///
    /// `lookup` resolves a variable name; pass `|k| std::env::var(k).ok()` in
    /// production. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(url) = get(API_URL_ENV) {
            self.api_url = Some(url);
        }
        if let Some(model) = get(FAST_MODEL_ENV) {
            self.fast_model = model;
        }
        if let Some(model) = get(SMART_MODEL_ENV) {
            self.smart_model = model;
        }
        if let Some(raw) = get(TIMEOUT_ENV) {
            self.timeout_ms = parse_number(TIMEOUT_ENV, &raw)?;
        }
        if let Some(raw) = get(MAX_CONCURRENT_ENV) {
            self.max_concurrent_requests = parse_number(MAX_CONCURRENT_ENV, &raw)?;
        }
        Ok(())
    }

    /// The API key, or a configuration error when none is set.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConclaveError::Config(format!(
                    "Missing {API_KEY_ENV}. Set it in the environment before starting."
                ))
            })
    }

    pub fn tiers(&self) -> ModelTiers {
        ModelTiers {
            fast: self.fast_model.clone(),
            smart: self.smart_model.clone(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ConclaveError::Config(format!("{key} must be a number, got '{raw}'")))
}

/// Caps the number of generation calls in flight at once.
pub struct SemaphoredClient {
    inner: Arc<dyn LlmClient>,
    semaphore: Arc<tokio::sync::Semaphore>,
}

impl SemaphoredClient {
    pub fn new(inner: Arc<dyn LlmClient>, max_concurrent: usize) -> Self {
        Self {
            inner,
            semaphore: Arc::new(tokio::sync::Semaphore::new(max_concurrent.max(1))),
        }
    }
}

#[async_trait]
impl LlmClient for SemaphoredClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ConclaveError::ModelService(format!("Semaphore acquire failed: {e}")))?;
        self.inner.complete(request).await
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}

/// Build the process-wide client: Gemini, wrapped in retry, wrapped in a
/// concurrency limit.
pub fn build_llm_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let api_key = config.require_api_key()?.to_string();
    let base_client: Box<dyn LlmClient> = Box::new(GeminiClient::new(
        config.api_url.clone(),
        api_key,
        Duration::from_millis(config.timeout_ms),
    )?);

    let retrying: Box<dyn LlmClient> =
        Box::new(RetryingClient::new(base_client, config.retry.clone()));

    let semaphored = SemaphoredClient::new(Arc::from(retrying), config.max_concurrent_requests);

    Ok(Arc::new(semaphored))
}
