//! Error types for the wingman router.

use crate::llm::error::LlmError;

/// Top-level error type for the conversation router and its collaborators.
///
/// None of these are fatal to a running session: the orchestrator logs them
/// and turns them into failure payloads or a silent turn.
#[derive(Debug, thiserror::Error)]
pub enum WingmanError {
    /// Configuration could not be read, parsed or written.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM transport error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// A persona context name that is not part of the closed set.
    #[error("unknown context: {0}")]
    UnknownContext(String),

    /// Key injection failed or the command could not be resolved.
    #[error("keypress error: {0}")]
    Keypress(String),

    /// Trading data could not be loaded or queried.
    #[error("trading error: {0}")]
    Trading(String),

    /// Speech playback error.
    #[error("speech error: {0}")]
    Speech(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, WingmanError>;
