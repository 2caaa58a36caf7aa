//! Wingman: a voice-driven game companion that routes player transcripts
//! between persona contexts.
//!
//! A transcript either matches an instant command phrase and runs locally,
//! or goes to a chat-completion model together with the active persona's
//! history and function schemas. Function calls are dispatched to trading
//! lookups, key injection or a context switch.
//!
//! # Architecture
//!
//! - **Personas**: a closed set (ship companion, trade division), each with
//!   its own system prompt, history, tools, model and voice
//! - **Router**: history retention, context store and switcher, tool-call
//!   dispatcher and the turn orchestrator
//! - **LLM**: message types, the transport trait and an OpenAI-compatible
//!   transport via `reqwest`
//! - **Services**: trading data, keybindings, key injection and speech output

pub mod config;
pub mod error;
pub mod llm;
pub mod persona;
pub mod router;
pub mod services;
pub mod voice_command;

pub use config::WingmanConfig;
pub use error::{Result, WingmanError};
pub use persona::Persona;
pub use router::{TurnOrchestrator, TurnOutcome};
