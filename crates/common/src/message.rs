//! Conversation history supplied by the caller.

use serde::{Deserialize, Serialize};

/// Number of most recent turns rendered into prompts.
pub const HISTORY_WINDOW: usize = 12;

/// One caller-supplied turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default = "default_role")]
    pub role: String,

    #[serde(default)]
    pub content: String,
}

fn default_role() -> String {
    "user".into()
}

impl ConversationTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Render the last [`HISTORY_WINDOW`] turns as `ROLE: content` lines, oldest first.
pub fn render_history(history: &[ConversationTurn]) -> String {
    let start = history.len().saturating_sub(HISTORY_WINDOW);
    history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.role.to_uppercase(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}
