use crate::{error::Result, types::Credentials, PipelineError};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Lazy, single-pass sequence of text fragments from a streamed completion.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Configuration for completion requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LlmConfig {
    /// Model identifier sent to the completion service.
    pub model: String,

    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f64,

    /// Maximum tokens to generate per call.
    pub max_tokens: u32,

    /// Stream stage output fragment by fragment.
    pub streaming: bool,

    /// Per-call timeout. `None` waits as long as the service does.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 2000,
            streaming: true,
            timeout: None,
        }
    }
}

impl LlmConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_streaming(mut self, enabled: bool) -> Self {
        self.streaming = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Handle to a completion service, configured for one pipeline run.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `prompt` and wait for the whole completion.
    async fn complete_once(&self, prompt: &str) -> Result<String>;

    /// Send `prompt` and return the completion as it is produced.
    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream>;
}

/// Builds a fresh [`CompletionService`] from request-scoped parameters.
///
/// Construction performs no I/O; bad credentials only surface when a stage
/// calls the service.
pub trait ClientFactory: Send + Sync {
    fn build(&self, credentials: &Credentials, config: &LlmConfig) -> Arc<dyn CompletionService>;
}

/// Factory for OpenAI-compatible `/chat/completions` endpoints.
///
/// Only the connection pool is shared between the clients it builds.
#[derive(Debug, Clone, Default)]
pub struct OpenAiClientFactory {
    http: Client,
}

impl OpenAiClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http_client(http: Client) -> Self {
        Self { http }
    }
}

impl ClientFactory for OpenAiClientFactory {
    fn build(&self, credentials: &Credentials, config: &LlmConfig) -> Arc<dyn CompletionService> {
        Arc::new(OpenAiClient::new(self.http.clone(), credentials, config.clone()))
    }
}

/// Client for one set of credentials and one model configuration.
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    url: String,
    config: LlmConfig,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("url", &self.url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OpenAiClient {
    pub fn new(http: Client, credentials: &Credentials, config: LlmConfig) -> Self {
        Self {
            http,
            api_key: credentials.api_key.clone(),
            url: format!(
                "{}/chat/completions",
                credentials.base_url.trim_end_matches('/')
            ),
            config,
        }
    }

    fn request_body(&self, prompt: &str, stream: bool) -> Value {
        json!({
            "model": self.config.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "stream": stream,
        })
    }

    async fn send(&self, body: &Value) -> Result<reqwest::Response> {
        let mut req = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(body);
        if let Some(timeout) = self.config.timeout {
            req = req.timeout(timeout);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Http { status, body });
        }
        Ok(resp)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete_once(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.config.model, url = %self.url, "chat completion");
        let resp = self.send(&self.request_body(prompt, false)).await?;
        let completion: ChatCompletion = resp.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| PipelineError::Provider("response contained no choices".to_string()))
    }

    async fn complete_stream(&self, prompt: &str) -> Result<FragmentStream> {
        debug!(model = %self.config.model, url = %self.url, "streaming chat completion");
        let resp = self.send(&self.request_body(prompt, true)).await?;
        let byte_stream = resp.bytes_stream();

        let stream = async_stream::stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut finished = false;
            futures::pin_mut!(byte_stream);

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(PipelineError::Request(e));
                        finished = true;
                        break;
                    }
                };
                buffer.extend_from_slice(&chunk);

                // Split on raw bytes so multi-byte characters cut across
                // network chunks are decoded whole.
                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    match parse_sse_line(&String::from_utf8_lossy(&line)) {
                        SseLine::Fragment(text) => yield Ok(text),
                        SseLine::Skip => {}
                        SseLine::Done => {
                            finished = true;
                            break;
                        }
                        SseLine::Error(message) => {
                            yield Err(PipelineError::Provider(message));
                            finished = true;
                            break;
                        }
                    }
                }
                if finished {
                    break;
                }
            }

            if !finished && !buffer.is_empty() {
                match parse_sse_line(&String::from_utf8_lossy(&buffer)) {
                    SseLine::Fragment(text) => yield Ok(text),
                    SseLine::Error(message) => yield Err(PipelineError::Provider(message)),
                    SseLine::Skip | SseLine::Done => {}
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// One decoded line of a server-sent event stream.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum SseLine {
    Fragment(String),
    Skip,
    Done,
    Error(String),
}

pub(crate) fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return SseLine::Skip;
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => {
            if let Some(error) = chunk.error {
                let message = error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| error.to_string());
                return SseLine::Error(message);
            }
            match chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
            {
                Some(text) if !text.is_empty() => SseLine::Fragment(text),
                _ => SseLine::Skip,
            }
        }
        Err(e) => {
            debug!(error = %e, "skipping unparseable stream event");
            SseLine::Skip
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_defaults() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 2000);
        assert!(config.streaming);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_llm_config_builder() {
        let config = LlmConfig::default()
            .with_model("gpt-4o")
            .with_temperature(0.3)
            .with_max_tokens(4096)
            .with_streaming(false)
            .with_timeout(Duration::from_secs(30));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, 4096);
        assert!(!config.streaming);
        assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_client_url_joins_base() {
        let creds = Credentials::new("k", "https://api.example.com/v1/");
        let client = OpenAiClient::new(Client::new(), &creds, LlmConfig::default());
        assert_eq!(client.url, "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn test_request_body_carries_config() {
        let creds = Credentials::new("k", "http://x");
        let config = LlmConfig::default().with_model("m").with_temperature(0.2);
        let client = OpenAiClient::new(Client::new(), &creds, config);
        let body = client.request_body("hi", true);
        assert_eq!(body["model"], "m");
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_parse_sse_fragment() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(line), SseLine::Fragment("Hel".to_string()));
    }

    #[test]
    fn test_parse_sse_skips_role_and_comments() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseLine::Skip
        );
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_sse_line(""), SseLine::Skip);
        assert_eq!(parse_sse_line("data: not-json"), SseLine::Skip);
    }

    #[test]
    fn test_parse_sse_done_and_error() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(
            parse_sse_line(r#"data: {"error":{"message":"quota exceeded"}}"#),
            SseLine::Error("quota exceeded".to_string())
        );
    }
}
