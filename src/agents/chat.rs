//! Chat agent - one LLM call per turn.

use async_trait::async_trait;

use super::filter::MessageFilter;
use super::types::{AgentError, AgentSpec, AgentTurn};
use super::{Agent, AgentContext};
use crate::llm::ChatMessage;
use crate::workflow::{Transcript, TranscriptEntry, USER_SPEAKER};

/// Agent backed by the context's [`LlmClient`](crate::llm::LlmClient).
///
/// # Turn Flow
/// 1. Narrow the transcript through the optional filter
/// 2. Prepend the system prompt
/// 3. Map own messages to `assistant`, everyone else's to `user`
/// 4. Send one chat completion, racing the run's cancellation token
pub struct ChatAgent {
    spec: AgentSpec,
    filter: Option<MessageFilter>,
}

impl ChatAgent {
    pub fn new(spec: AgentSpec) -> Self {
        Self { spec, filter: None }
    }

    pub fn with_filter(mut self, filter: MessageFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Build the request messages for the given transcript.
    pub fn build_messages(&self, transcript: &Transcript, apply_filter: bool) -> Vec<ChatMessage> {
        let visible: Vec<&TranscriptEntry> = match (&self.filter, apply_filter) {
            (Some(filter), true) => filter.apply(transcript.entries()),
            _ => transcript.entries().iter().collect(),
        };

        let mut messages = Vec::with_capacity(visible.len() + 1);
        messages.push(ChatMessage::system(self.spec.system_prompt.clone()));
        for entry in visible {
            let message = if entry.speaker == self.spec.name {
                ChatMessage::assistant(entry.content.clone())
            } else if entry.speaker == USER_SPEAKER {
                ChatMessage::user(entry.content.clone())
            } else {
                ChatMessage::user(format!("{}:\n{}", entry.speaker, entry.content))
                    .with_name(entry.speaker.clone())
            };
            messages.push(message);
        }
        messages
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn spec(&self) -> &AgentSpec {
        &self.spec
    }

    async fn respond(
        &self,
        transcript: &Transcript,
        ctx: &AgentContext,
    ) -> Result<AgentTurn, AgentError> {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled(self.spec.name.clone()));
        }

        let messages =
            self.build_messages(transcript, ctx.config.workflow.enable_message_filtering);
        tracing::debug!(
            "{} sending {} messages to {}",
            self.spec.name,
            messages.len(),
            ctx.config.default_model
        );

        let request = ctx
            .llm
            .chat_completion(&ctx.config.default_model, &messages, ctx.chat_options());

        let response = tokio::select! {
            _ = ctx.cancel_token.cancelled() => {
                return Err(AgentError::Cancelled(self.spec.name.clone()));
            }
            result = request => result.map_err(|e| AgentError::Llm {
                agent: self.spec.name.clone(),
                message: e.to_string(),
            })?,
        };

        if response.content.trim().is_empty() {
            tracing::warn!("{} returned an empty reply", self.spec.name);
        }

        Ok(AgentTurn {
            content: response.content,
            usage: response.usage,
            model: response.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentFactory, AgentRole};
    use crate::llm::Role;
    use crate::testing::{test_context, ScriptedClient};
    use std::sync::Arc;

    fn reviewer() -> ChatAgent {
        ChatAgent::new(AgentFactory::new().basic_team().remove(1))
    }

    fn transcript() -> Transcript {
        let mut t = Transcript::new("Write a cache");
        t.push("CodeWriter", "```python\nclass Cache: ...\n```");
        t.push("CodeReviewer", "Needs eviction.");
        t.push("CodeWriter", "Added eviction.");
        t
    }

    #[test]
    fn test_message_mapping() {
        let messages = reviewer().build_messages(&transcript(), true);
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::User, Role::Assistant, Role::User]
        );
        assert_eq!(messages[1].content, "Write a cache");
        assert!(messages[1].name.is_none());
        assert!(messages[2].content.starts_with("CodeWriter:\n"));
        assert_eq!(messages[2].name.as_deref(), Some("CodeWriter"));
        assert_eq!(messages[3].content, "Needs eviction.");
    }

    #[test]
    fn test_filter_respects_switch() {
        let spec = AgentFactory::new()
            .advanced_team(&crate::task::LanguageProfile::lookup("python"))
            .into_iter()
            .find(|s| s.role == AgentRole::CodeOptimizer)
            .unwrap();
        let agent = ChatAgent::new(spec).with_filter(
            MessageFilter::for_role(AgentRole::CodeOptimizer).unwrap(),
        );

        // system + first CodeWriter + last CodeReviewer
        assert_eq!(agent.build_messages(&transcript(), true).len(), 3);
        assert_eq!(agent.build_messages(&transcript(), false).len(), 5);
    }

    #[tokio::test]
    async fn test_respond_returns_reply() {
        let client = Arc::new(ScriptedClient::new(["Score: 9/10. APPROVE"]));
        let ctx = test_context(client.clone());
        let turn = reviewer().respond(&transcript(), &ctx).await.unwrap();
        assert_eq!(turn.content, "Score: 9/10. APPROVE");
        assert!(turn.usage.is_some());

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].role, Role::System);
    }

    #[tokio::test]
    async fn test_respond_surfaces_llm_errors() {
        let client = Arc::new(ScriptedClient::failing("upstream down"));
        let ctx = test_context(client);
        let err = reviewer().respond(&transcript(), &ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm { ref agent, .. } if agent == "CodeReviewer"));
    }

    #[tokio::test]
    async fn test_respond_honors_cancellation() {
        let token = tokio_util::sync::CancellationToken::new();
        let ctx = test_context(Arc::new(ScriptedClient::new(["unused"])))
            .with_cancel_token(token.clone());
        token.cancel();
        let err = reviewer().respond(&transcript(), &ctx).await.unwrap_err();
        assert!(matches!(err, AgentError::Cancelled(_)));
    }
}
