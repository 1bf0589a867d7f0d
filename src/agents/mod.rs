//! Agents module - the participants of a pipeline.
//!
//! # Pieces
//! - **AgentSpec**: name, role, description and system prompt of one agent
//! - **AgentFactory**: builds specs from static prompt text
//! - **MessageFilter**: narrows what a late-stage agent sees
//! - **ChatAgent**: turns a spec into LLM calls
//!
//! Agents hold no conversation state; the transcript is owned by the
//! pipeline and passed in on every turn.

mod chat;
mod context;
mod factory;
mod filter;
pub mod prompts;
mod types;

pub use chat::ChatAgent;
pub use context::AgentContext;
pub use factory::AgentFactory;
pub use filter::{MessageFilter, Position, SourceRule};
pub use types::{AgentError, AgentRole, AgentSpec, AgentTurn};

use async_trait::async_trait;
use std::sync::Arc;

use crate::workflow::Transcript;

/// Shared handle to an agent.
pub type AgentRef = Arc<dyn Agent>;

/// Base trait for all agents.
///
/// # Invariants
/// - `respond()` never mutates the transcript; the pipeline appends the reply
/// - `respond()` never panics; failures are returned as `Err`
#[async_trait]
pub trait Agent: Send + Sync {
    /// The agent's static configuration.
    fn spec(&self) -> &AgentSpec;

    /// Speaker name used in the transcript.
    fn name(&self) -> &str {
        &self.spec().name
    }

    fn role(&self) -> AgentRole {
        self.spec().role
    }

    /// Produce the next message given everything said so far.
    ///
    /// # Errors
    /// Returns `Err` if the model call fails or the run is cancelled.
    async fn respond(
        &self,
        transcript: &Transcript,
        ctx: &AgentContext,
    ) -> Result<AgentTurn, AgentError>;
}
