//! Saved persona contexts.

use std::collections::HashMap;

use crate::llm::message::Message;
use crate::llm::provider::ToolDefinition;
use crate::persona::Persona;

/// One persona's conversation and tool set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextState {
    /// History; position 0 is the persona's system message.
    pub messages: Vec<Message>,
    /// Functions offered to the model in this context.
    pub tools: Vec<ToolDefinition>,
    /// Exchange pairs kept before eviction.
    pub retention: Option<usize>,
}

impl ContextState {
    /// A fresh context holding only its system message.
    pub fn new(
        system_prompt: impl Into<String>,
        tools: Vec<ToolDefinition>,
        retention: Option<usize>,
    ) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            tools,
            retention,
        }
    }
}

/// Checkpoints of every persona context activated so far.
///
/// Entries are created lazily and never deleted. The active context lives in
/// the orchestrator's session; the store only sees it when it is saved on a
/// switch.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: HashMap<Persona, ContextState>,
}

impl ContextStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the saved state for `persona`, or create and record a fresh one.
    ///
    /// The second element is `true` when the context was created by this call.
    pub fn get_or_create(
        &mut self,
        persona: Persona,
        system_prompt: impl FnOnce() -> String,
        tools: impl FnOnce() -> Vec<ToolDefinition>,
        retention: Option<usize>,
    ) -> (ContextState, bool) {
        if let Some(state) = self.contexts.get(&persona) {
            return (state.clone(), false);
        }
        let state = ContextState::new(system_prompt(), tools(), retention);
        self.contexts.insert(persona, state.clone());
        (state, true)
    }

    /// Save `state` under `persona`. Last write wins.
    pub fn save(&mut self, persona: Persona, state: ContextState) {
        self.contexts.insert(persona, state);
    }

    /// Saved state, if any.
    pub fn get(&self, persona: Persona) -> Option<&ContextState> {
        self.contexts.get(&persona)
    }

    /// Whether `persona` has been activated before.
    pub fn contains(&self, persona: Persona) -> bool {
        self.contexts.contains_key(&persona)
    }

    /// Number of saved contexts.
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no context was saved yet.
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
