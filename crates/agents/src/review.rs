//! QA gate: one structured audit over all drafts.

use std::sync::Arc;

use conclave_common::{AgentResult, ConversationTurn, Result, combine_drafts, render_history};
use conclave_llm::{GenerationClient, ModelTier, StructuredOutput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prompts::QA_SYSTEM;

/// Structured verdict from the QA stage. On the wire `passed` is `pass`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QaReport {
    #[serde(rename = "pass")]
    pub passed: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub required_fixes: Vec<String>,
    /// A corrected final answer. When non-blank it replaces the drafts verbatim.
    #[serde(default)]
    pub safe_final_answer: Option<String>,
}

impl QaReport {
    /// The corrected answer, trimmed, if QA supplied a non-blank one.
    pub fn usable_final_answer(&self) -> Option<&str> {
        self.safe_final_answer
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl StructuredOutput for QaReport {}

pub fn qa_user_prompt(context: &str, message: &str, drafts: &[AgentResult]) -> String {
    format!(
        "Conversation so far:\n{context}\n\nUser question:\n{message}\n\n\
         Draft answers from agents:\n{}\n\nReturn QA report JSON.\n",
        combine_drafts(drafts)
    )
}

pub struct QaGate {
    generation: Arc<GenerationClient>,
}

impl QaGate {
    pub fn new(generation: Arc<GenerationClient>) -> Self {
        Self { generation }
    }

    pub async fn review(
        &self,
        message: &str,
        history: &[ConversationTurn],
        drafts: &[AgentResult],
    ) -> Result<QaReport> {
        let user = qa_user_prompt(&render_history(history), message, drafts);

        info!(drafts = drafts.len(), "Running QA gate");

        let report: QaReport = self
            .generation
            .generate_structured(ModelTier::Fast, QA_SYSTEM, &user)
            .await?;

        info!(
            passed = report.passed,
            issues = report.issues.len(),
            required_fixes = report.required_fixes.len(),
            has_safe_answer = report.usable_final_answer().is_some(),
            "QA verdict"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_common::AgentRole;

    #[test]
    fn pass_field_uses_wire_name() {
        let report = QaReport {
            passed: true,
            issues: vec![],
            required_fixes: vec![],
            safe_final_answer: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["pass"], true);
        assert!(json.get("passed").is_none());

        let back: QaReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }

    #[test]
    fn optional_fields_default() {
        let report: QaReport = serde_json::from_str(r#"{"pass": false}"#).unwrap();
        assert!(!report.passed);
        assert!(report.issues.is_empty());
        assert!(report.required_fixes.is_empty());
        assert!(report.safe_final_answer.is_none());
    }

    #[test]
    fn blank_safe_answer_is_not_usable() {
        let mut report: QaReport =
            serde_json::from_str(r#"{"pass": true, "safe_final_answer": "  \n "}"#).unwrap();
        assert_eq!(report.usable_final_answer(), None);

        report.safe_final_answer = Some("  Brug KS01.  ".to_string());
        assert_eq!(report.usable_final_answer(), Some("Brug KS01."));
    }

    #[test]
    fn prompt_contains_labelled_drafts_in_order() {
        let drafts = vec![
            AgentResult::draft(AgentRole::Tech, "tech draft"),
            AgentResult::draft(AgentRole::Logistics, "log draft"),
        ];
        let prompt = qa_user_prompt("", "q", &drafts);
        let tech = prompt.find("[TECH]\ntech draft").unwrap();
        let log = prompt.find("[LOGISTICS]\nlog draft").unwrap();
        assert!(tech < log);
        assert!(prompt.ends_with("Return QA report JSON.\n"));
    }
}
