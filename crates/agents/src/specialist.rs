//! Specialist runner: one domain role, one free-form draft.

use std::sync::Arc;

use conclave_common::{
    AgentResult, AgentRole, ConclaveError, ConversationTurn, Result, render_history,
};
use conclave_llm::{GenerationClient, ModelTier};
use tracing::{debug, info};

use crate::prompts::{FIN_SYSTEM, LOG_SYSTEM, TECH_SYSTEM, WRITER_SYSTEM};

pub const SPECIALIST_TEMPERATURE: f32 = 0.3;

pub fn specialist_user_prompt(context: &str, message: &str) -> String {
    format!(
        "Conversation so far:\n{context}\n\nUser question:\n{message}\n\n\
         Respond with:\n- A short answer\n- Key points (bullets)\n- Assumptions (bullets)\n"
    )
}

/// Runs a single specialist role against the shared generation client.
pub struct SpecialistRunner {
    generation: Arc<GenerationClient>,
}

impl SpecialistRunner {
    pub fn new(generation: Arc<GenerationClient>) -> Self {
        Self { generation }
    }

    /// Domain specialists get the smart tier; anything else runs fast.
    pub fn tier_for(role: AgentRole) -> ModelTier {
        if role.is_drafting_specialist() {
            ModelTier::Smart
        } else {
            ModelTier::Fast
        }
    }

    pub fn system_prompt(role: AgentRole) -> Result<&'static str> {
        match role {
            AgentRole::Tech => Ok(TECH_SYSTEM),
            AgentRole::Finance => Ok(FIN_SYSTEM),
            AgentRole::Logistics => Ok(LOG_SYSTEM),
            AgentRole::Writer => Ok(WRITER_SYSTEM),
            AgentRole::Qa => Err(ConclaveError::Agent(
                "qa is the audit stage and cannot run as a specialist".to_string(),
            )),
        }
    }

    /// Produce one draft. `key_points` and `assumptions` stay empty.
    pub async fn run(
        &self,
        role: AgentRole,
        message: &str,
        history: &[ConversationTurn],
    ) -> Result<AgentResult> {
        let system = Self::system_prompt(role)?;
        let tier = Self::tier_for(role);
        let user = specialist_user_prompt(&render_history(history), message);

        info!(agent = %role, %tier, "Running specialist");

        let answer = self
            .generation
            .generate_with_temperature(tier, system, &user, SPECIALIST_TEMPERATURE)
            .await?;

        debug!(agent = %role, answer_len = answer.len(), "Specialist draft ready");

        Ok(AgentResult::draft(role, answer))
    }
}
