//! LLM client module for talking to chat-completion models.
//!
//! Agents only see the [`LlmClient`] trait; [`OpenAiClient`] is the one
//! concrete implementation and speaks the OpenAI-compatible
//! `/chat/completions` protocol.

mod error;
mod openai;

pub use error::{classify_http_status, LlmError, LlmErrorKind, RetryConfig};
pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Role in a chat conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Optional participant name, forwarded so the model can tell speakers apart.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    /// Create a message without a participant name.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Attach a participant name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage object ensuring `total_tokens` is consistent.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Component-wise sum.
    pub fn add(&self, other: &TokenUsage) -> TokenUsage {
        TokenUsage::new(
            self.prompt_tokens.saturating_add(other.prompt_tokens),
            self.completion_tokens.saturating_add(other.completion_tokens),
        )
    }
}

/// Optional sampling parameters for chat completions.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: Option<f64>,
    /// Maximum output tokens to generate.
    pub max_tokens: Option<u64>,
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_total_is_consistent() {
        let usage = TokenUsage::new(120, 30).add(&TokenUsage::new(5, 5));
        assert_eq!(usage.prompt_tokens, 125);
        assert_eq!(usage.completion_tokens, 35);
        assert_eq!(usage.total_tokens, 160);
    }

    #[test]
    fn test_message_serialization_skips_missing_name() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("name").is_none());

        let named = serde_json::to_value(ChatMessage::user("hi").with_name("CodeWriter")).unwrap();
        assert_eq!(named["name"], "CodeWriter");
    }
}
