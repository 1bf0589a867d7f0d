//! OpenAI-compatible chat-completion client with automatic retry for transient errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::error::{LlmError, RetryConfig};
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TokenUsage};

/// Client for any endpoint that implements `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    organization: Option<String>,
    retry_config: RetryConfig,
}

impl OpenAiClient {
    /// Create a client with default retry configuration.
    pub fn new(
        api_key: String,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            organization: None,
            retry_config: RetryConfig::default(),
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &crate::config::Config) -> anyhow::Result<Self> {
        let mut client = Self::new(
            config.api_key.clone(),
            config.base_url.clone(),
            config.request_timeout,
        )?;
        client.organization = config.org_id.clone();
        Ok(client)
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Parse a `Retry-After` header given in seconds.
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
    }

    /// Execute a single request without retry.
    async fn execute_request(&self, request: &CompletionRequest) -> Result<ChatResponse, LlmError> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(request);
        if let Some(org) = &self.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::network(format!("request timeout: {}", e))
            } else if e.is_connect() {
                LlmError::network(format!("connection failed: {}", e))
            } else {
                LlmError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), body, retry_after));
        }

        parse_completion(&body, &request.model)
    }

    /// Execute a request, retrying transient failures with backoff.
    async fn execute_with_retry(&self, request: &CompletionRequest) -> anyhow::Result<ChatResponse> {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            let error = match self.execute_request(request).await {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            "Request succeeded after {} retries ({:?})",
                            attempt,
                            start.elapsed()
                        );
                    }
                    return Ok(response);
                }
                Err(error) => error,
            };

            if !self.retry_config.should_retry(&error, attempt) {
                tracing::error!("Chat completion failed after {} retries: {}", attempt, error);
                return Err(error.into());
            }

            let remaining = self
                .retry_config
                .max_retry_duration
                .saturating_sub(start.elapsed());
            if remaining.is_zero() {
                tracing::warn!("Retry budget exhausted: {}", error);
                return Err(error.into());
            }
            // A zero delay (Retry-After: 0) retries immediately.
            let delay = error.backoff(attempt).min(remaining);

            tracing::warn!(
                "Attempt {} failed with {}, retrying in {:?}",
                attempt + 1,
                error.kind,
                delay
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Decode a completion body into a [`ChatResponse`].
fn parse_completion(body: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        LlmError::parse(format!(
            "failed to parse response: {}, body: {}",
            e,
            body.chars().take(500).collect::<String>()
        ))
    })?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::parse("no choices in response"))?;

    Ok(ChatResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage: parsed
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        model: parsed.model.or_else(|| Some(requested_model.to_string())),
    })
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> anyhow::Result<ChatResponse> {
        let request = CompletionRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        };

        tracing::debug!(
            "Sending chat completion: model={} messages={}",
            model,
            messages.len()
        );

        self.execute_with_retry(&request).await
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const COMPLETION_BODY: &str =
        r#"{"choices": [{"message": {"content": "done"}, "finish_reason": "stop"}]}"#;

    fn http_response(status: &str, headers: &[&str], body: &str) -> String {
        let mut response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
            status,
            body.len()
        );
        for header in headers {
            response.push_str(header);
            response.push_str("\r\n");
        }
        response.push_str("\r\n");
        response.push_str(body);
        response
    }

    fn ok_response() -> String {
        http_response("200 OK", &[], COMPLETION_BODY)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    /// Serve `responses` in order, one connection each, counting requests.
    async fn serve(responses: Vec<String>) -> (String, Arc<AtomicUsize>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let served = Arc::new(AtomicUsize::new(0));
        let counter = served.clone();
        let handle = tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                socket.write_all(response.as_bytes()).await.unwrap();
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{}/v1", addr), served, handle)
    }

    fn local_client(base_url: &str, retry_config: RetryConfig) -> OpenAiClient {
        OpenAiClient {
            client: Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
            api_key: "test-key".to_string(),
            base_url: base_url.to_string(),
            organization: None,
            retry_config: RetryConfig::default(),
        }
        .with_retry_config(retry_config)
    }

    async fn complete(client: &OpenAiClient) -> anyhow::Result<ChatResponse> {
        client
            .chat_completion("test-model", &[ChatMessage::user("hi")], ChatOptions::default())
            .await
    }

    #[tokio::test]
    async fn test_retries_server_error_then_succeeds() {
        let (url, served, server) = serve(vec![
            http_response("503 Service Unavailable", &[], "overloaded"),
            ok_response(),
        ])
        .await;
        let client = local_client(
            &url,
            RetryConfig {
                max_retries: 2,
                max_retry_duration: Duration::from_millis(500),
            },
        );

        let response = complete(&client).await.unwrap();
        assert_eq!(response.content, "done");
        assert_eq!(served.load(Ordering::SeqCst), 2);
        server.abort();
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (url, served, server) = serve(vec![
            http_response("401 Unauthorized", &[], "bad key"),
            ok_response(),
        ])
        .await;
        let client = local_client(
            &url,
            RetryConfig {
                max_retries: 2,
                max_retry_duration: Duration::from_secs(5),
            },
        );

        let err = complete(&client).await.unwrap_err();
        let llm_err = err.downcast_ref::<LlmError>().unwrap();
        assert_eq!(llm_err.status, Some(401));
        assert_eq!(llm_err.kind, LlmErrorKind::ClientError);
        assert_eq!(served.load(Ordering::SeqCst), 1);
        server.abort();
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let limited = http_response("429 Too Many Requests", &["Retry-After: 0"], "slow down");
        let (url, served, server) = serve(vec![limited; 4]).await;
        let client = local_client(
            &url,
            RetryConfig {
                max_retries: 2,
                max_retry_duration: Duration::from_secs(5),
            },
        );

        let err = complete(&client).await.unwrap_err();
        let llm_err = err.downcast_ref::<LlmError>().unwrap();
        assert_eq!(llm_err.kind, LlmErrorKind::RateLimited);
        assert_eq!(served.load(Ordering::SeqCst), 3);
        server.abort();
    }

    #[tokio::test]
    async fn test_zero_retry_after_retries_immediately() {
        let (url, served, server) = serve(vec![
            http_response("429 Too Many Requests", &["Retry-After: 0"], "slow down"),
            ok_response(),
        ])
        .await;
        let client = local_client(
            &url,
            RetryConfig {
                max_retries: 1,
                max_retry_duration: Duration::from_secs(5),
            },
        );

        let started = Instant::now();
        let response = complete(&client).await.unwrap();
        assert_eq!(response.content, "done");
        assert_eq!(served.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(4));
        server.abort();
    }

    #[tokio::test]
    async fn test_stops_when_retry_budget_is_spent() {
        let unavailable = http_response("503 Service Unavailable", &[], "overloaded");
        let (url, served, server) = serve(vec![unavailable; 4]).await;
        let client = local_client(
            &url,
            RetryConfig {
                max_retries: 5,
                max_retry_duration: Duration::from_millis(200),
            },
        );

        let err = complete(&client).await.unwrap_err();
        assert_eq!(err.downcast_ref::<LlmError>().unwrap().status, Some(503));
        assert_eq!(served.load(Ordering::SeqCst), 2);
        server.abort();
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{
            "model": "gpt-4o-2024-08-06",
            "choices": [{"message": {"role": "assistant", "content": "def f(): pass"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }"#;
        let response = parse_completion(body, "gpt-4o").unwrap();
        assert_eq!(response.content, "def f(): pass");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage.unwrap().total_tokens, 14);
        assert_eq!(response.model.as_deref(), Some("gpt-4o-2024-08-06"));
    }

    #[test]
    fn test_parse_completion_without_model_or_usage() {
        let body = r#"{"choices": [{"message": {"content": null}, "finish_reason": null}]}"#;
        let response = parse_completion(body, "gpt-4o").unwrap();
        assert_eq!(response.content, "");
        assert!(response.usage.is_none());
        assert_eq!(response.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_parse_completion_rejects_empty_choices() {
        let err = parse_completion(r#"{"choices": []}"#, "gpt-4o").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);

        let err = parse_completion("not json", "gpt-4o").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);
    }

    #[test]
    fn test_request_omits_unset_options() {
        let request = CompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage::user("hello")],
            temperature: Some(0.1),
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["temperature"], 0.1);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OpenAiClient::new(
            "key".to_string(),
            "http://localhost:8080/v1/",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
