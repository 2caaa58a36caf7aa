//! Multi-context conversation routing.
//!
//! - [`history`]: per-context retention policy
//! - [`store`]: checkpoints of inactive persona contexts
//! - [`switcher`]: saving, restoring and splicing contexts on a switch
//! - [`tools`]: function schemas offered to the model
//! - [`commands`]: configured command and keybinding execution
//! - [`dispatcher`]: routing of model-issued function calls
//! - [`orchestrator`]: the per-transcript state machine

pub mod commands;
pub mod dispatcher;
pub mod history;
pub mod orchestrator;
pub mod store;
pub mod switcher;
pub mod tools;

pub use dispatcher::{BatchOutcome, DispatchOutcome, SwitchBudget, ToolCallDispatcher};
pub use history::{TrimReport, trim_history};
pub use orchestrator::{TurnOrchestrator, TurnOutcome, TurnState};
pub use store::{ContextState, ContextStore};
pub use switcher::{ActiveSession, ContextSwitcher, PersonaDirectory, SwitchReport};
