//! Writer/finalizer: reuse QA's corrected answer or compose a new one.

use std::sync::Arc;

use conclave_common::{AgentResult, ConversationTurn, Result, combine_drafts, render_history};
use conclave_llm::{GenerationClient, ModelTier};
use tracing::info;

use crate::prompts::WRITER_SYSTEM;
use crate::review::QaReport;

fn bullet_values(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join("; ")
    }
}

pub fn writer_user_prompt(
    context: &str,
    message: &str,
    drafts: &[AgentResult],
    qa: &QaReport,
) -> String {
    format!(
        "Conversation so far:\n{context}\n\nUser question:\n{message}\n\n\
         Draft answers:\n{}\n\n\
         QA issues to address:\n- Issues: {}\n- Required fixes: {}\n\n\
         Write the final answer to the user (Danish), concise but helpful, with next steps.\n\
         Do not add new facts not supported by drafts.\n",
        combine_drafts(drafts),
        bullet_values(&qa.issues),
        bullet_values(&qa.required_fixes),
    )
}

pub struct Writer {
    generation: Arc<GenerationClient>,
}

impl Writer {
    pub fn new(generation: Arc<GenerationClient>) -> Self {
        Self { generation }
    }

    pub async fn finalize(
        &self,
        message: &str,
        history: &[ConversationTurn],
        drafts: &[AgentResult],
        qa: &QaReport,
    ) -> Result<String> {
        if let Some(answer) = qa.usable_final_answer() {
            info!(path = "fast", "Using QA corrected answer");
            return Ok(answer.to_string());
        }

        info!(path = "slow", drafts = drafts.len(), "Composing final answer");

        let user = writer_user_prompt(&render_history(history), message, drafts, qa);
        self.generation
            .generate(ModelTier::Fast, WRITER_SYSTEM, &user)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_common::AgentRole;

    #[test]
    fn prompt_embeds_every_issue_and_fix() {
        let qa = QaReport {
            passed: false,
            issues: vec!["Opfundet T-kode".to_string(), "Mangler antagelser".to_string()],
            required_fixes: vec!["Fjern T-koden".to_string()],
            safe_final_answer: None,
        };
        let drafts = vec![AgentResult::draft(AgentRole::Finance, "Brug KS01")];
        let prompt = writer_user_prompt("USER: hej", "Cost center?", &drafts, &qa);

        for needle in [
            "Opfundet T-kode",
            "Mangler antagelser",
            "Fjern T-koden",
            "[FINANCE]\nBrug KS01",
        ] {
            assert!(prompt.contains(needle), "missing {needle}");
        }
        assert!(prompt.contains("(Danish)"));
    }

    #[test]
    fn empty_feedback_renders_as_none() {
        let qa = QaReport {
            passed: true,
            issues: vec![],
            required_fixes: vec![],
            safe_final_answer: None,
        };
        let prompt = writer_user_prompt("", "q", &[], &qa);
        assert!(prompt.contains("- Issues: none\n- Required fixes: none\n"));
    }
}
