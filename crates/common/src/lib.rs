//! Common types shared across Conclave crates.
//!
//! This crate holds the error taxonomy every stage reports through, the
//! caller-supplied conversation history, and the agent roles and drafts
//! that flow between pipeline stages.

pub mod agent;
pub mod error;
pub mod message;

pub use agent::{AgentResult, AgentRole, combine_drafts};
pub use error::{ConclaveError, Result, model_service_summary};
pub use message::{ConversationTurn, HISTORY_WINDOW, render_history};
