//! Agent execution context - shared state for one workflow run.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::llm::{ChatOptions, LlmClient};
use crate::workflow::WorkflowEvent;

/// Shared context passed to every agent turn.
///
/// Cheap to clone: the client is shared, the token is a handle.
#[derive(Clone)]
pub struct AgentContext {
    /// Application configuration
    pub config: Config,

    /// LLM client for model calls
    pub llm: Arc<dyn LlmClient>,

    /// Cooperative cancellation for the whole run
    pub cancel_token: CancellationToken,

    /// Optional sink for progress events
    pub events: Option<broadcast::Sender<WorkflowEvent>>,
}

impl AgentContext {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            config,
            llm,
            cancel_token: CancellationToken::new(),
            events: None,
        }
    }

    pub fn with_events(mut self, sender: broadcast::Sender<WorkflowEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: WorkflowEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Sampling options derived from configuration.
    pub fn chat_options(&self) -> ChatOptions {
        ChatOptions {
            temperature: Some(self.config.temperature),
            max_tokens: self.config.max_tokens,
        }
    }
}
