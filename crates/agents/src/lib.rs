//! The stages that talk to the model on behalf of a chat request.
//!
//! - **Prompt library**: one system prompt per role, all carrying the SAP
//!   safety rules
//! - **Specialist runner**: a free-form draft from one domain role
//! - **QA gate**: a structured audit of all drafts
//! - **Writer**: the final answer, either QA's correction or a new synthesis
//!
//! Every stage borrows the same [`conclave_llm::GenerationClient`].

pub mod prompts;
pub mod review;
pub mod specialist;
pub mod writing;

pub use review::{QaGate, QaReport, qa_user_prompt};
pub use specialist::{SPECIALIST_TEMPERATURE, SpecialistRunner, specialist_user_prompt};
pub use writing::{Writer, writer_user_prompt};
