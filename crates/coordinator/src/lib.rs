//! Orchestration for Conclave.
//!
//! The coordinator turns one chat request into a single pass through the
//! stages:
//!
//! ```text
//! ChatRequest
//!      │
//!      ▼
//! ┌──────────┐   questions?   ┌──────────────────┐
//! │  Router  │ ─────────────► │ clarification    │
//! └────┬─────┘                └──────────────────┘
//!      │ selected_agents
//!      ▼
//! [tech] [finance] [logistics]     specialist drafts, router order
//!      │
//!      ▼
//! ┌──────────┐     ┌──────────┐
//! │ QA gate  │ ──► │  Writer  │ ──► ChatResponse { answer, debug }
//! └──────────┘     └──────────┘
//! ```

pub mod config;
pub mod pipeline;
pub mod routing;

pub use config::{CoordinatorConfig, PipelineConfig};
pub use pipeline::{
    ChatRequest, ChatResponse, DebugTrace, FanOutMode, Pipeline, PipelineStage,
    clarification_answer, drafting_roles,
};
pub use routing::{Router, RouterDecision, router_user_prompt};
