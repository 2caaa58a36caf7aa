//! Transport trait for chat-completion backends.
//!
//! The router only ever asks one question of a model: given this history,
//! these tools and this model, what does the assistant say next? Everything
//! provider-specific lives behind [`LlmTransport`].

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::LlmError;
use super::message::{AssistantToolCall, Message};

/// A tool definition provided to the LLM for function calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The function name (e.g. `"switch_context"`).
    pub name: String,
    /// Human-readable description of the function's purpose.
    pub description: String,
    /// JSON Schema describing the function's parameters.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Provider-specific model identifier (e.g. `"gpt-4o-mini"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    /// Model ID as the provider knows it.
    pub model_id: String,
}

impl ModelRef {
    /// Create a new model reference.
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model_id)
    }
}

/// The assistant's reply to one [`LlmTransport::ask`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The assistant message, appended verbatim to the active history.
    pub message: Message,
    /// Model that actually served the request, if the provider reports it.
    pub model: Option<String>,
}

impl Completion {
    /// Wrap an assistant message.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            model: None,
        }
    }

    /// Plain text reply without tool calls.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Message::assistant(text))
    }

    /// Reply that requests the given tool calls.
    pub fn tool_calls(calls: Vec<AssistantToolCall>) -> Self {
        Self::new(Message::assistant_with_tool_calls(None, calls))
    }

    /// The tool calls requested by the model, in order.
    pub fn requested_calls(&self) -> &[AssistantToolCall] {
        &self.message.tool_calls
    }
}

/// A chat-completion backend.
///
/// An `Err` means "no response this turn": the orchestrator logs it and
/// finishes the turn silently. Implementations must not retry on their own.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Returns the transport name (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Ask the model for the next assistant message.
    async fn ask(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &ModelRef,
    ) -> Result<Completion, LlmError>;
}
