//! Router: picks the specialists for a message, or asks for clarification.

use std::collections::HashSet;
use std::sync::Arc;

use conclave_agents::prompts::ROUTER_SYSTEM;
use conclave_common::{AgentRole, ConversationTurn, Result, render_history};
use conclave_llm::{GenerationClient, ModelTier, StructuredOutput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Structured routing decision returned by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RouterDecision {
    /// Which specialist agents to run for this user message.
    pub selected_agents: Vec<AgentRole>,

    /// If needed, ask user for missing info. Keep short.
    #[serde(default)]
    pub clarifying_questions: Vec<String>,

    /// One-sentence summary of what user wants.
    pub user_intent: String,
}

impl RouterDecision {
    /// Clarification wins over any selected agents.
    pub fn needs_clarification(&self) -> bool {
        !self.clarifying_questions.is_empty()
    }
}

impl StructuredOutput for RouterDecision {
    fn validate(&self) -> std::result::Result<(), String> {
        let mut seen = HashSet::new();
        for role in &self.selected_agents {
            if !seen.insert(role) {
                return Err(format!("selected_agents lists '{role}' more than once"));
            }
        }
        Ok(())
    }
}

pub fn router_user_prompt(context: &str, message: &str) -> String {
    format!("Conversation so far:\n{context}\n\nNew user message:\n{message}\n")
}

pub struct Router {
    generation: Arc<GenerationClient>,
}

impl Router {
    pub fn new(generation: Arc<GenerationClient>) -> Self {
        Self { generation }
    }

    pub async fn route(
        &self,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<RouterDecision> {
        let user = router_user_prompt(&render_history(history), message);

        let decision: RouterDecision = self
            .generation
            .generate_structured(ModelTier::Fast, ROUTER_SYSTEM, &user)
            .await?;

        info!(
            selected = ?decision.selected_agents,
            clarifying_questions = decision.clarifying_questions.len(),
            intent = %decision.user_intent,
            "Routing decision"
        );

        Ok(decision)
    }
}
