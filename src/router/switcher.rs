//! Persona context switching.
//!
//! The active context lives in [`ActiveSession`]; every other context is a
//! checkpoint in the [`ContextStore`]. A switch moves the in-flight exchange
//! (the user request and the assistant message that asked for the switch)
//! from the old context into the new one, so the new persona can answer the
//! same request.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::WingmanConfig;
use crate::error::{Result, WingmanError};
use crate::llm::message::{Message, Role};
use crate::llm::provider::{ModelRef, ToolDefinition};
use crate::llm::spans::{FIELD_PERSONA, SPAN_CONTEXT_SWITCH};
use crate::persona::{Persona, VoiceSource, build_system_prompt};
use crate::router::store::{ContextState, ContextStore};
use crate::router::tools::ToolCatalog;
use crate::services::speech::VoiceSettings;

/// Model and voice of the active persona.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// Chat model.
    pub model: ModelRef,
    /// Playback voice and effects.
    pub voice: VoiceSettings,
}

/// The context currently talking to the player.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    /// Active persona.
    pub persona: Persona,
    /// Its live history and tools.
    pub state: ContextState,
    /// Its model and voice.
    pub settings: SessionSettings,
    sub_role_voices: HashMap<Persona, String>,
}

impl ActiveSession {
    /// Live history of the active context.
    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    /// Selected sub-role voice of `persona`, if one was chosen.
    pub fn sub_role_voice(&self, persona: Persona) -> Option<&str> {
        self.sub_role_voices.get(&persona).map(String::as_str)
    }
}

/// What a switch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchReport {
    /// Persona switched away from.
    pub from: Persona,
    /// Persona now active.
    pub to: Persona,
    /// Messages moved from the old context into the new one.
    pub carried: usize,
    /// Whether the target context was created by this switch.
    pub created: bool,
}

/// Builds prompts, tools and settings for each persona.
#[derive(Debug, Clone)]
pub struct PersonaDirectory {
    config: Arc<WingmanConfig>,
    catalog: ToolCatalog,
}

impl PersonaDirectory {
    /// Create a directory over `config` with schemas from `catalog`.
    pub fn new(config: Arc<WingmanConfig>, catalog: ToolCatalog) -> Self {
        Self { config, catalog }
    }

    /// System prompt of a fresh context.
    pub fn system_prompt(&self, persona: Persona) -> String {
        build_system_prompt(persona, &self.config)
    }

    /// Function schemas of a fresh context.
    pub fn tools(&self, persona: Persona) -> Vec<ToolDefinition> {
        self.catalog.for_persona(persona)
    }

    /// Model and voice while `persona` is active.
    pub fn settings(&self, persona: Persona, sub_role_voice: Option<&str>) -> SessionSettings {
        let persona_config = persona.config(&self.config);
        let profile = persona.profile();
        let voice = match profile.voice_source {
            VoiceSource::Fixed => persona_config.voice.clone(),
            VoiceSource::SubRole => sub_role_voice
                .map(str::to_string)
                .unwrap_or_else(|| persona_config.voice.clone()),
        };
        SessionSettings {
            model: ModelRef::new(persona_config.model.clone()),
            voice: VoiceSettings::new(voice, profile.effects),
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &WingmanConfig {
        &self.config
    }

    /// Schema name lists.
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }
}

/// Detach the in-flight exchange from the end of `messages`.
///
/// Requires at least three messages (system, user, assistant); otherwise
/// nothing is detached. Normally this is exactly the last two messages. When
/// tool results of earlier calls in the same assistant turn already follow
/// the user request, the detached range starts at that user request so that
/// no tool result is separated from its assistant message.
pub fn detach_in_flight(messages: &mut Vec<Message>) -> Vec<Message> {
    if messages.len() < 3 {
        return Vec::new();
    }
    let last_two = messages.len() - 2;
    let start = match messages.iter().rposition(|m| m.role == Role::User) {
        Some(i)
            if i >= 1
                && i < last_two
                && messages[i + 1..]
                    .iter()
                    .all(|m| matches!(m.role, Role::Assistant | Role::Tool)) =>
        {
            i
        }
        _ => last_two,
    };
    messages.split_off(start)
}

/// Saves, restores and creates persona contexts.
#[derive(Debug)]
pub struct ContextSwitcher {
    store: ContextStore,
    directory: PersonaDirectory,
}

impl ContextSwitcher {
    /// Create a switcher with an empty store.
    pub fn new(directory: PersonaDirectory) -> Self {
        Self {
            store: ContextStore::new(),
            directory,
        }
    }

    /// Activate the first persona of a session.
    pub fn activate_initial(&mut self, persona: Persona) -> ActiveSession {
        let (state, _) = self.load(persona);
        tracing::info!({ FIELD_PERSONA } = %persona, "session started");
        ActiveSession {
            persona,
            state,
            settings: self.directory.settings(persona, None),
            sub_role_voices: HashMap::new(),
        }
    }

    /// Switch to the context called `context_name`.
    ///
    /// # Errors
    ///
    /// Returns [`WingmanError::UnknownContext`] for names outside the persona
    /// set; the session is left untouched.
    pub fn switch(&mut self, session: &mut ActiveSession, context_name: &str) -> Result<SwitchReport> {
        let Some(target) = Persona::from_context_name(context_name) else {
            tracing::warn!(context = %context_name, "ignoring switch to unknown context");
            return Err(WingmanError::UnknownContext(context_name.to_string()));
        };
        Ok(self.switch_to(session, target))
    }

    /// Switch to `target`, carrying the in-flight exchange along.
    pub fn switch_to(&mut self, session: &mut ActiveSession, target: Persona) -> SwitchReport {
        let span = tracing::info_span!(SPAN_CONTEXT_SWITCH, from = %session.persona, to = %target);
        let _enter = span.enter();

        let from = session.persona;
        let carried = detach_in_flight(&mut session.state.messages);
        self.store.save(from, std::mem::take(&mut session.state));

        let (mut state, created) = self.load(target);
        let carried_len = carried.len();
        state.messages.extend(carried);
        state.retention = target.profile().retention;

        session.persona = target;
        session.state = state;
        session.settings = self
            .directory
            .settings(target, session.sub_role_voices.get(&target).map(String::as_str));

        tracing::info!(
            carried = carried_len,
            created,
            voice = %session.settings.voice.voice,
            model = %session.settings.model,
            "switched context"
        );

        SwitchReport {
            from,
            to: target,
            carried: carried_len,
            created,
        }
    }

    /// Select `voice` for the sub-role of `persona`. Applies immediately when
    /// `persona` is active.
    pub fn set_sub_role_voice(&self, session: &mut ActiveSession, persona: Persona, voice: &str) {
        session.sub_role_voices.insert(persona, voice.to_string());
        if session.persona == persona {
            session.settings = self.directory.settings(persona, Some(voice));
        }
    }

    /// Drop the active history back to its system message. Returns the
    /// number of messages removed.
    pub fn reset_active(&self, session: &mut ActiveSession) -> usize {
        let removed = session.state.messages.len().saturating_sub(1);
        session.state.messages.truncate(1);
        tracing::info!({ FIELD_PERSONA } = %session.persona, removed, "conversation history reset");
        removed
    }

    /// Saved checkpoints.
    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Prompt, tool and settings source.
    pub fn directory(&self) -> &PersonaDirectory {
        &self.directory
    }

    fn load(&mut self, persona: Persona) -> (ContextState, bool) {
        let directory = &self.directory;
        let retention = persona.profile().retention;
        let (state, created) = self.store.get_or_create(
            persona,
            || directory.system_prompt(persona),
            || directory.tools(persona),
            retention,
        );
        if created {
            tracing::info!({ FIELD_PERSONA } = %persona, "creating context");
        } else {
            tracing::info!({ FIELD_PERSONA } = %persona, "loading context");
        }
        (state, created)
    }
}
