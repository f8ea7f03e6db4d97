//! Role-specialized generation agents.

mod email_agent;
pub mod prompts;
mod role;

pub use email_agent::{AgentOutput, EmailAgent};
pub use role::{AgentRole, PromptContext};
