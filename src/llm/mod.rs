//! LLM plumbing: message types, the transport trait and the OpenAI transport.

pub mod error;
pub mod message;
pub mod openai;
pub mod provider;
pub mod spans;

pub use error::LlmError;
pub use message::{AssistantToolCall, Message, MessageContent, Role};
pub use openai::{OpenAiConfig, OpenAiTransport};
pub use provider::{Completion, LlmTransport, ModelRef, ToolDefinition};
