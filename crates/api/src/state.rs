//! Application state for the API server.

use std::sync::Arc;

use conclave_common::Result;
use conclave_coordinator::{CoordinatorConfig, FanOutMode, Pipeline};
use conclave_llm::{LlmClient, ModelTiers, build_llm_client};

/// Shared, read-only state. Nothing here changes per request.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,

    /// Reported by `/health`.
    pub tiers: ModelTiers,

    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(pipeline: Pipeline, tiers: ModelTiers) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            tiers,
            start_time: std::time::Instant::now(),
        }
    }

    /// Validate the configuration and build the Gemini-backed pipeline.
    pub fn from_config(config: &CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        let llm = build_llm_client(&config.llm)?;
        Ok(Self::with_client(llm, config))
    }

    /// Build the pipeline over an already constructed client.
    pub fn with_client(llm: Arc<dyn LlmClient>, config: &CoordinatorConfig) -> Self {
        Self::new(Pipeline::from_config(llm, config), config.llm.tiers())
    }

    pub fn fan_out(&self) -> FanOutMode {
        self.pipeline.fan_out()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
