//! Test doubles shared by unit tests across the crate.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::agents::AgentContext;
use crate::config::Config;
use crate::llm::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage};

type Responder = Box<dyn Fn(&[ChatMessage]) -> anyhow::Result<String> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<String>>),
    Responder(Responder),
    Fail(String),
}

/// An [`LlmClient`] that replays canned replies and records every request.
pub struct ScriptedClient {
    script: Script,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    /// Reply with `replies` in order, then with `"ok"` forever.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Queue(Mutex::new(
            replies.into_iter().map(Into::into).collect(),
        )))
    }

    /// Compute each reply from the request messages.
    pub fn responder<F>(f: F) -> Self
    where
        F: Fn(&[ChatMessage]) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self::with_script(Script::Responder(Box::new(f)))
    }

    /// Fail every request with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of requests that were awaiting a reply at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn reply(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        match &self.script {
            Script::Queue(queue) => Ok(queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "ok".to_string())),
            Script::Responder(f) => f(messages),
            Script::Fail(message) => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let content = self.reply(messages)?;
        Ok(ChatResponse {
            content,
            finish_reason: Some("stop".to_string()),
            usage: Some(TokenUsage::new(10, 5)),
            model: Some(model.to_string()),
        })
    }
}

/// Context with a test config and the given client.
pub fn test_context(client: Arc<ScriptedClient>) -> AgentContext {
    AgentContext::new(
        Config::new("test-key".to_string(), "test-model".to_string()),
        client,
    )
}

/// Name of the agent a request is addressed to, read from its system prompt.
pub fn addressed_role(messages: &[ChatMessage]) -> Option<crate::agents::AgentRole> {
    let system = &messages.first()?.content;
    let factory = crate::agents::AgentFactory::new();
    let python = crate::task::LanguageProfile::lookup("python");
    crate::agents::AgentRole::ALL.into_iter().find(|role| {
        [crate::workflow::WorkflowMode::Basic, crate::workflow::WorkflowMode::Advanced]
            .into_iter()
            .filter_map(|mode| factory.spec_for(*role, mode, &python))
            .any(|spec| &spec.system_prompt == system)
    })
}
