//! Agent roles and the drafts they produce.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The fixed set of roles the router may select.
///
/// Only [`AgentRole::Tech`], [`AgentRole::Finance`] and
/// [`AgentRole::Logistics`] draft answers. `writer` and `qa` name later
/// pipeline stages and are skipped when selected as specialists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    Tech,
    Finance,
    Logistics,
    Writer,
    Qa,
}

impl AgentRole {
    pub const ALL: [AgentRole; 5] = [
        AgentRole::Tech,
        AgentRole::Finance,
        AgentRole::Logistics,
        AgentRole::Writer,
        AgentRole::Qa,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tech => "tech",
            Self::Finance => "finance",
            Self::Logistics => "logistics",
            Self::Writer => "writer",
            Self::Qa => "qa",
        }
    }

    /// Label used when drafts are concatenated into a prompt, e.g. `[FINANCE]`.
    pub fn label(self) -> String {
        self.as_str().to_uppercase()
    }

    /// Whether the pipeline runs this role as a drafting specialist.
    pub fn is_drafting_specialist(self) -> bool {
        matches!(self, Self::Tech | Self::Finance | Self::Logistics)
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A specialist's draft answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: AgentRole,
    pub answer: String,

    /// Not populated by the specialist stage.
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Not populated by the specialist stage.
    #[serde(default)]
    pub assumptions: Vec<String>,
}

impl AgentResult {
    pub fn draft(agent: AgentRole, answer: impl Into<String>) -> Self {
        Self {
            agent,
            answer: answer.into(),
            key_points: Vec::new(),
            assumptions: Vec::new(),
        }
    }
}

/// Concatenate drafts as `[ROLE]\nanswer` blocks separated by blank lines.
pub fn combine_drafts(drafts: &[AgentResult]) -> String {
    drafts
        .iter()
        .map(|d| format!("[{}]\n{}", d.agent.label(), d.answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}
