//! Pipeline controller.
//!
//! ```text
//! Start ──► Routed ──► ClarifyAndStop                      (questions asked)
//!              │
//!              └─────► Drafted ──► Audited ──► Finalized
//! ```
//!
//! Stages run strictly downstream and any failure aborts the request.

use std::str::FromStr;
use std::sync::Arc;

use conclave_agents::{QaGate, QaReport, SpecialistRunner, Writer};
use conclave_common::{AgentResult, AgentRole, ConclaveError, ConversationTurn, Result};
use conclave_llm::{GenerationClient, LlmClient};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::config::CoordinatorConfig;
use crate::routing::{Router, RouterDecision};

const CLARIFICATION_PREFIX: &str = "Jeg mangler lige lidt info:\n- ";

/// How specialist drafts are produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOutMode {
    #[default]
    Sequential,
    /// Specialists run as separate tasks; drafts still come back in
    /// router order. The tasks never outlive the request.
    Concurrent,
}

impl FromStr for FanOutMode {
    type Err = ConclaveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(ConclaveError::Config(format!(
                "Unknown fan-out mode '{other}' (expected 'sequential' or 'concurrent')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Routed,
    ClarifyAndStop,
    Drafted,
    Audited,
    Finalized,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Routed => "routed",
            Self::ClarifyAndStop => "clarify_and_stop",
            Self::Drafted => "drafted",
            Self::Audited => "audited",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ConversationTurn>,
}

/// Diagnostic trace. Only `router` is present on a clarification turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    pub router: RouterDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drafts: Option<Vec<AgentResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qa: Option<QaReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub debug: DebugTrace,
}

pub fn clarification_answer(questions: &[String]) -> String {
    format!("{CLARIFICATION_PREFIX}{}", questions.join("\n- "))
}

/// Roles that draft, in router order. `writer` and `qa` are skipped.
pub fn drafting_roles(decision: &RouterDecision) -> Vec<AgentRole> {
    decision
        .selected_agents
        .iter()
        .copied()
        .filter(|role| {
            let keep = role.is_drafting_specialist();
            if !keep {
                warn!(agent = %role, "Skipping reserved role selected as specialist");
            }
            keep
        })
        .collect()
}

pub struct Pipeline {
    router: Router,
    specialists: Arc<SpecialistRunner>,
    qa: QaGate,
    writer: Writer,
    fan_out: FanOutMode,
}

impl Pipeline {
    pub fn new(generation: Arc<GenerationClient>, fan_out: FanOutMode) -> Self {
        Self {
            router: Router::new(generation.clone()),
            specialists: Arc::new(SpecialistRunner::new(generation.clone())),
            qa: QaGate::new(generation.clone()),
            writer: Writer::new(generation),
            fan_out,
        }
    }

    pub fn from_config(llm: Arc<dyn LlmClient>, config: &CoordinatorConfig) -> Self {
        let generation = Arc::new(GenerationClient::from_config(llm, &config.llm));
        Self::new(generation, config.pipeline.fan_out)
    }

    pub fn fan_out(&self) -> FanOutMode {
        self.fan_out
    }

    /// Run one chat request end to end.
    pub async fn run(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let request_id = Uuid::new_v4();
        let span = info_span!("chat", %request_id);
        self.execute(request).instrument(span).await
    }

    async fn execute(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let message = request.message.as_str();
        let history = request.history.as_slice();

        info!(
            message_len = message.len(),
            history_len = history.len(),
            fan_out = ?self.fan_out,
            "Chat request received"
        );

        let router = self.router.route(message, history).await?;
        info!(stage = %PipelineStage::Routed, "Stage complete");

        if router.needs_clarification() {
            info!(
                stage = %PipelineStage::ClarifyAndStop,
                questions = router.clarifying_questions.len(),
                "Asking for clarification"
            );
            return Ok(ChatResponse {
                answer: clarification_answer(&router.clarifying_questions),
                debug: DebugTrace {
                    router,
                    drafts: None,
                    qa: None,
                },
            });
        }

        let roles = drafting_roles(&router);
        let drafts = match self.fan_out {
            FanOutMode::Sequential => self.draft_sequential(&roles, message, history).await?,
            FanOutMode::Concurrent => self.draft_concurrent(&roles, message, history).await?,
        };
        info!(stage = %PipelineStage::Drafted, drafts = drafts.len(), "Stage complete");

        let qa = self.qa.review(message, history, &drafts).await?;
        info!(stage = %PipelineStage::Audited, passed = qa.passed, "Stage complete");

        let answer = self.writer.finalize(message, history, &drafts, &qa).await?;
        info!(stage = %PipelineStage::Finalized, answer_len = answer.len(), "Stage complete");

        Ok(ChatResponse {
            answer,
            debug: DebugTrace {
                router,
                drafts: Some(drafts),
                qa: Some(qa),
            },
        })
    }

    async fn draft_sequential(
        &self,
        roles: &[AgentRole],
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<Vec<AgentResult>> {
        let mut drafts = Vec::with_capacity(roles.len());
        for &role in roles {
            drafts.push(self.specialists.run(role, message, history).await?);
        }
        Ok(drafts)
    }

    async fn draft_concurrent(
        &self,
        roles: &[AgentRole],
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<Vec<AgentResult>> {
        let message: Arc<str> = Arc::from(message);
        let history: Arc<[ConversationTurn]> = Arc::from(history);

        // Dropping the set aborts every specialist still running, so a
        // cancelled request leaves no calls behind.
        let mut tasks = JoinSet::new();
        for (index, &role) in roles.iter().enumerate() {
            let runner = self.specialists.clone();
            let message = message.clone();
            let history = history.clone();
            tasks.spawn(
                async move { (index, runner.run(role, &message, &history).await) }
                    .in_current_span(),
            );
        }

        debug!(tasks = tasks.len(), "Specialists spawned");

        let mut indexed = Vec::with_capacity(roles.len());
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined
                .map_err(|e| ConclaveError::Agent(format!("Specialist task failed: {e}")))?;
            indexed.push((index, outcome?));
        }

        // Completion order is arbitrary; drafts follow router order.
        indexed.sort_by_key(|(index, _)| *index);
        Ok(indexed.into_iter().map(|(_, draft)| draft).collect())
    }
}
