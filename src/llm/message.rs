//! Message types for persona conversations.
//!
//! Provides the [`Message`], [`Role`], and [`MessageContent`] types that make
//! up every persona context's history.
//!
//! # Examples
//!
//! ```
//! use wingman::llm::message::{Message, Role};
//!
//! let user_msg = Message::user("Where can I sell Laranite?");
//! assert_eq!(user_msg.role, Role::User);
//!
//! let result = Message::tool_result("call_123", "switch_context", "switched");
//! assert_eq!(result.role, Role::Tool);
//! ```

use serde::{Deserialize, Serialize};

/// The role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona instructions. Always at position 0.
    System,
    /// Transcribed player speech.
    User,
    /// Model output.
    Assistant,
    /// Tool-call result.
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// The content of a message.
///
/// Tool results carry the call ID for correlation with the assistant tool
/// call that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Tool-call result.
    ToolResult {
        /// The tool call ID this result corresponds to.
        call_id: String,
        /// The handler's output, usually a JSON payload.
        content: String,
    },
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantToolCall {
    /// Unique identifier for this tool call.
    pub call_id: String,
    /// The function name being called.
    pub function_name: String,
    /// JSON-encoded arguments string.
    pub arguments: String,
}

impl AssistantToolCall {
    /// Create a tool call.
    pub fn new(
        call_id: impl Into<String>,
        function_name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            function_name: function_name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A message in a persona conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message.
    pub role: Role,
    /// The message content.
    pub content: MessageContent,
    /// Tool calls made by the assistant (only for Assistant role).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<AssistantToolCall>,
    /// Function name of a tool result (only for Tool role).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a text message with the given role.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text { text: text.into() },
            tool_calls: Vec::new(),
            name: None,
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::text(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    /// Create an assistant message with tool calls and optional text.
    pub fn assistant_with_tool_calls(
        text: Option<String>,
        tool_calls: Vec<AssistantToolCall>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text {
                text: text.unwrap_or_default(),
            },
            tool_calls,
            name: None,
        }
    }

    /// Create a tool result message for the call `call_id` of `function_name`.
    pub fn tool_result(
        call_id: impl Into<String>,
        function_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::ToolResult {
                call_id: call_id.into(),
                content: content.into(),
            },
            tool_calls: Vec::new(),
            name: Some(function_name.into()),
        }
    }

    /// The textual body of the message, whatever its kind.
    pub fn body(&self) -> &str {
        match &self.content {
            MessageContent::Text { text } => text,
            MessageContent::ToolResult { content, .. } => content,
        }
    }

    /// The call ID if this is a tool result.
    pub fn call_id(&self) -> Option<&str> {
        match &self.content {
            MessageContent::ToolResult { call_id, .. } => Some(call_id),
            MessageContent::Text { .. } => None,
        }
    }

    /// Whether this assistant message still expects tool results.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
