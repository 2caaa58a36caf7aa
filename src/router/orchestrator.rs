//! Turn orchestration.
//!
//! One transcript in, one [`TurnOutcome`] out. A turn walks through
//!
//! ```text
//! Idle → MatchingInstant → InstantHandled ─────────────────────┐
//!                        └→ CallingModel ⇄ ToolDispatch ──────→ Finalized
//! ```
//!
//! The orchestrator owns the active session exclusively; `&mut self` on
//! [`TurnOrchestrator::handle_transcript`] means a second transcript cannot
//! start before the first one is finished.

use std::fmt;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::config::{ResponseMode, WingmanConfig};
use crate::llm::message::Message;
use crate::llm::provider::LlmTransport;
use crate::llm::spans::{FIELD_PERSONA, FIELD_TURN_ID, SPAN_TURN};
use crate::persona::Persona;
use crate::router::commands::select_response;
use crate::router::dispatcher::{SwitchBudget, ToolCallDispatcher};
use crate::router::history::trim_history;
use crate::router::switcher::{ActiveSession, ContextSwitcher, PersonaDirectory};
use crate::services::speech::{SpeechOutput, should_speak};
use crate::voice_command::match_instant;

/// Name of the configured command that also wipes the active history.
pub const RESET_COMMAND: &str = "ResetConversationHistory";

/// Where a turn currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Waiting for a transcript.
    Idle,
    /// Checking instant phrases.
    MatchingInstant,
    /// An instant command answered the turn.
    InstantHandled,
    /// Waiting for the model.
    CallingModel,
    /// Running the model's function calls.
    ToolDispatch,
    /// Done; the reply (if any) has been played.
    Finalized,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::MatchingInstant => "matching_instant",
            Self::InstantHandled => "instant_handled",
            Self::CallingModel => "calling_model",
            Self::ToolDispatch => "tool_dispatch",
            Self::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// An instant command ran and one of its canned replies was played.
    Instant {
        /// Command name.
        command: String,
        /// Reply played.
        response: String,
    },
    /// An explicitly silent instant command ran.
    Acknowledged {
        /// Command name.
        command: String,
    },
    /// The model answered without calling functions.
    Reply {
        /// Assistant text.
        text: String,
    },
    /// The model called functions; this is the final text of the turn.
    ToolSummary {
        /// Final text (model summary or a playback cue from a tool).
        text: String,
        /// Function calls run during the turn.
        tool_calls: usize,
    },
    /// No usable response this turn.
    NoResponse,
}

impl TurnOutcome {
    /// The user-facing text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Instant { response, .. } => Some(response),
            Self::Reply { text } | Self::ToolSummary { text, .. } => Some(text),
            Self::Acknowledged { .. } | Self::NoResponse => None,
        }
    }
}

/// Drives transcripts through instant matching, the model and tool dispatch.
pub struct TurnOrchestrator {
    config: Arc<WingmanConfig>,
    transport: Arc<dyn LlmTransport>,
    speech: Arc<dyn SpeechOutput>,
    dispatcher: ToolCallDispatcher,
    switcher: ContextSwitcher,
    session: ActiveSession,
    state: TurnState,
}

impl fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("transport", &self.transport.name())
            .field("persona", &self.session.persona)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl TurnOrchestrator {
    /// Create an orchestrator with the companion active.
    pub fn new(
        config: Arc<WingmanConfig>,
        transport: Arc<dyn LlmTransport>,
        speech: Arc<dyn SpeechOutput>,
        dispatcher: ToolCallDispatcher,
    ) -> Self {
        let directory = PersonaDirectory::new(Arc::clone(&config), dispatcher.catalog());
        let mut switcher = ContextSwitcher::new(directory);
        let session = switcher.activate_initial(Persona::Companion);
        Self {
            config,
            transport,
            speech,
            dispatcher,
            switcher,
            session,
            state: TurnState::Idle,
        }
    }

    /// The active session.
    pub fn session(&self) -> &ActiveSession {
        &self.session
    }

    /// Saved contexts.
    pub fn switcher(&self) -> &ContextSwitcher {
        &self.switcher
    }

    /// State of the last (or current) turn.
    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Process one transcript to completion.
    pub async fn handle_transcript(&mut self, transcript: &str) -> TurnOutcome {
        let span = tracing::info_span!(
            SPAN_TURN,
            { FIELD_TURN_ID } = %Uuid::new_v4(),
            { FIELD_PERSONA } = %self.session.persona,
        );
        self.run_turn(transcript).instrument(span).await
    }

    async fn run_turn(&mut self, transcript: &str) -> TurnOutcome {
        self.state = TurnState::Idle;
        let transcript = transcript.trim();
        if transcript.is_empty() {
            tracing::debug!("empty transcript ignored");
            self.transition(TurnState::Finalized);
            return TurnOutcome::NoResponse;
        }
        tracing::info!(%transcript, "transcript received");

        self.transition(TurnState::MatchingInstant);
        if let Some(outcome) = self.try_instant(transcript).await {
            return outcome;
        }

        self.transition(TurnState::CallingModel);
        let report = trim_history(&mut self.session.state.messages, self.session.state.retention);
        if !report.is_empty() {
            tracing::debug!(
                evicted_pairs = report.evicted_pairs,
                orphaned = report.orphaned_tool_results,
                "history trimmed before turn"
            );
        }
        self.session.state.messages.push(Message::user(transcript));

        let mut budget = SwitchBudget::new(self.config.llm.max_context_switches_per_turn);
        let mut tool_calls = 0usize;

        for round in 0..self.config.llm.max_model_rounds {
            self.transition(TurnState::CallingModel);
            let completion = match self
                .transport
                .ask(
                    &self.session.state.messages,
                    &self.session.state.tools,
                    &self.session.settings.model,
                )
                .await
            {
                Ok(completion) => completion,
                Err(e) => {
                    tracing::warn!(error = %e, round, "model call failed, no response this turn");
                    self.transition(TurnState::Finalized);
                    return TurnOutcome::NoResponse;
                }
            };

            let calls = completion.requested_calls().to_vec();
            let text = completion.message.body().to_string();
            self.session.state.messages.push(completion.message);

            if calls.is_empty() {
                self.finalize(&text).await;
                return if tool_calls == 0 {
                    TurnOutcome::Reply { text }
                } else {
                    TurnOutcome::ToolSummary { text, tool_calls }
                };
            }

            self.transition(TurnState::ToolDispatch);
            tool_calls += calls.len();
            let batch = self
                .dispatcher
                .dispatch_all(&mut self.session, &mut self.switcher, &mut budget, &calls)
                .await;

            if let Some(persona) = batch.switched {
                tracing::debug!(%persona, "context switched, asking again in the new context");
                continue;
            }
            if let Some(cue) = batch.last_playback {
                self.finalize(&cue).await;
                return TurnOutcome::ToolSummary {
                    text: cue,
                    tool_calls,
                };
            }
        }

        tracing::warn!(
            rounds = self.config.llm.max_model_rounds,
            "model round limit reached without a final answer"
        );
        self.transition(TurnState::Finalized);
        TurnOutcome::NoResponse
    }

    async fn try_instant(&mut self, transcript: &str) -> Option<TurnOutcome> {
        let config = Arc::clone(&self.config);
        let matched = match_instant(transcript, &config.commands)?;
        let command = matched.command;
        tracing::info!(command = %command.name, ratio = matched.ratio, "instant activation");

        if let Err(e) = self.dispatcher.commands().run_configured(command).await {
            tracing::warn!(command = %command.name, error = %e, "instant command failed");
        }
        if command.name == RESET_COMMAND {
            self.switcher.reset_active(&mut self.session);
        }

        match command.response_mode() {
            ResponseMode::Phrases(_) => {
                let response = select_response(command).unwrap_or_default();
                self.transition(TurnState::InstantHandled);
                self.finalize(&response).await;
                Some(TurnOutcome::Instant {
                    command: command.name.clone(),
                    response,
                })
            }
            ResponseMode::Silent => {
                self.transition(TurnState::InstantHandled);
                self.transition(TurnState::Finalized);
                Some(TurnOutcome::Acknowledged {
                    command: command.name.clone(),
                })
            }
            ResponseMode::Unspecified => {
                tracing::debug!(command = %command.name, "no canned reply, handing over to the model");
                None
            }
        }
    }

    async fn finalize(&mut self, text: &str) {
        self.transition(TurnState::Finalized);
        if !self.config.features.speak_responses || !should_speak(text) {
            return;
        }
        if let Err(e) = self.speech.speak(text, &self.session.settings.voice).await {
            tracing::warn!(error = %e, "playback failed");
        }
    }

    fn transition(&mut self, next: TurnState) {
        tracing::debug!(from = %self.state, to = %next, "turn state");
        self.state = next;
    }
}
