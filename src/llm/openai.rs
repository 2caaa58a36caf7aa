//! OpenAI-compatible chat-completions transport.
//!
//! Sends the full persona history plus its tool schemas to
//! `/v1/chat/completions` (non-streaming) and turns the first choice into a
//! [`Completion`]. Any OpenAI-compatible server works by pointing
//! [`OpenAiConfig::with_base_url`] at it.
//!
//! # Examples
//!
//! ```rust,no_run
//! use wingman::llm::openai::{OpenAiConfig, OpenAiTransport};
//! use wingman::llm::provider::{LlmTransport, ModelRef};
//! use wingman::llm::message::Message;
//!
//! # async fn example() -> Result<(), wingman::llm::error::LlmError> {
//! let transport = OpenAiTransport::new(OpenAiConfig::new("sk-..."))?;
//! let messages = vec![Message::system("You are Cora."), Message::user("Hello")];
//! let reply = transport.ask(&messages, &[], &ModelRef::new("gpt-4o-mini")).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::Instrument;

use super::error::LlmError;
use super::message::{AssistantToolCall, Message, MessageContent, Role};
use super::provider::{Completion, LlmTransport, ModelRef, ToolDefinition};
use super::spans::{FIELD_MODEL, FIELD_PROVIDER, SPAN_MODEL_CALL};

/// Default OpenAI API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

// ── Configuration ─────────────────────────────────────────────

/// Configuration for the OpenAI transport.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Base URL (defaults to `https://api.openai.com`).
    pub base_url: String,
    /// Optional organization ID.
    pub org_id: Option<String>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            org_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set a custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the organization ID.
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ── Request Builders ──────────────────────────────────────────

/// Build the JSON request body for the Chat Completions API.
pub fn build_completions_request(
    model: &ModelRef,
    messages: &[Message],
    tools: &[ToolDefinition],
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model.model_id,
        "messages": messages.iter().map(message_to_openai).collect::<Vec<_>>(),
    });

    if !tools.is_empty()
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("tools".into(), tools_to_openai(tools));
        obj.insert("tool_choice".into(), serde_json::json!("auto"));
    }

    body
}

/// Convert a single message to OpenAI format.
fn message_to_openai(msg: &Message) -> serde_json::Value {
    let role = match msg.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    match &msg.content {
        MessageContent::Text { text } => {
            let mut obj = serde_json::json!({
                "role": role,
                "content": text,
            });

            if msg.has_tool_calls() {
                let calls: Vec<serde_json::Value> = msg
                    .tool_calls
                    .iter()
                    .map(|tc| {
                        serde_json::json!({
                            "id": tc.call_id,
                            "type": "function",
                            "function": {
                                "name": tc.function_name,
                                "arguments": tc.arguments,
                            }
                        })
                    })
                    .collect();
                if let Some(obj) = obj.as_object_mut() {
                    obj.insert("tool_calls".into(), serde_json::json!(calls));
                }
            }

            obj
        }
        MessageContent::ToolResult { call_id, content } => {
            let mut obj = serde_json::json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": content,
            });
            if let Some(name) = &msg.name
                && let Some(obj) = obj.as_object_mut()
            {
                obj.insert("name".into(), serde_json::json!(name));
            }
            obj
        }
    }
}

/// Convert tool definitions to OpenAI tools format.
fn tools_to_openai(tools: &[ToolDefinition]) -> serde_json::Value {
    let tools_json: Vec<serde_json::Value> = tools
        .iter()
        .map(|t| {
            serde_json::json!({
                "type": "function",
                "function": {
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters,
                }
            })
        })
        .collect();
    serde_json::json!(tools_json)
}

// ── Response Parsing ──────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CompletionsResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChoiceToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChoiceToolCall {
    id: String,
    function: ChoiceFunction,
}

#[derive(Debug, Deserialize)]
struct ChoiceFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Parse a Chat Completions response body into a [`Completion`].
pub fn parse_completions_response(body: &str) -> Result<Completion, LlmError> {
    let parsed: CompletionsResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::ResponseError(format!("invalid completions body: {e}")))?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::ResponseError("completions response has no choices".into()))?;

    let calls: Vec<AssistantToolCall> = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| AssistantToolCall::new(tc.id, tc.function.name, tc.function.arguments))
        .collect();

    let message = if calls.is_empty() {
        Message::assistant(choice.message.content.unwrap_or_default())
    } else {
        Message::assistant_with_tool_calls(choice.message.content, calls)
    };

    Ok(Completion {
        message,
        model: parsed.model,
    })
}

// ── Transport ─────────────────────────────────────────────────

/// Chat-completions transport for OpenAI and compatible servers.
pub struct OpenAiTransport {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTransport")
            .field("base_url", &self.config.base_url)
            .field("org_id", &self.config.org_id)
            .finish()
    }
}

impl OpenAiTransport {
    /// Create a new transport with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::ConfigError("OpenAI API key is empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Map an HTTP error status to the appropriate [`LlmError`].
    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 => LlmError::AuthError(format!("OpenAI authentication failed: {message}")),
            429 => LlmError::RequestError(format!("OpenAI rate limited: {message}")),
            _ => LlmError::ProviderError(format!("OpenAI HTTP {}: {message}", status.as_u16())),
        }
    }
}

/// Extract an error message from an OpenAI error response body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl LlmTransport for OpenAiTransport {
    fn name(&self) -> &str {
        "openai"
    }

    async fn ask(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &ModelRef,
    ) -> Result<Completion, LlmError> {
        let span = tracing::info_span!(
            SPAN_MODEL_CALL,
            { FIELD_PROVIDER } = "openai",
            { FIELD_MODEL } = %model,
        );

        async {
            let url = format!("{}/v1/chat/completions", self.config.base_url);
            let body = build_completions_request(model, messages, tools);

            let mut request = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .header("Content-Type", "application/json");

            if let Some(org_id) = &self.config.org_id {
                request = request.header("OpenAI-Organization", org_id);
            }

            tracing::debug!(messages = messages.len(), tools = tools.len(), "sending completion request");

            let response = request
                .json(&body)
                .send()
                .await
                .map_err(|e| LlmError::RequestError(format!("OpenAI request failed: {e}")))?;

            let status = response.status();
            let body_text = response
                .text()
                .await
                .map_err(|e| LlmError::RequestError(format!("OpenAI body read failed: {e}")))?;

            if !status.is_success() {
                return Err(Self::map_http_error(status, &body_text));
            }

            parse_completions_response(&body_text)
        }
        .instrument(span)
        .await
    }
}
