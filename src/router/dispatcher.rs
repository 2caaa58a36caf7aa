//! Tool-call dispatch.
//!
//! Every function the model calls is routed through [`ToolFunction`]. Calls of
//! one assistant message run one after the other, in the order received, and
//! each leaves exactly one tool-result message in the active history before
//! the next call starts. Nothing in here fails the turn: bad arguments,
//! unknown names and executor errors all become failure payloads the model
//! can read.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::Instrument;

use crate::config::{CommandConfig, WingmanConfig};
use crate::llm::message::{AssistantToolCall, Message};
use crate::llm::spans::{FIELD_CALL_ID, FIELD_FUNCTION, SPAN_TOOL_DISPATCH};
use crate::persona::Persona;
use crate::router::commands::{CommandRunner, select_response};
use crate::router::switcher::{ActiveSession, ContextSwitcher};
use crate::router::tools::{ToolCatalog, ToolFunction, TradeQuery};
use crate::services::keybindings::ResolveError;
use crate::services::speech::SILENT_ACK;
use crate::services::trading::{TradeQueryResult, TradingProvider};

/// Tool result of a configured command that has no canned reply.
pub const COMMAND_DONE_PAYLOAD: &str = r#"{"success":true,"instruction":"Don't make any function call!"}"#;

/// Content of a successful context switch.
pub fn switched_content(context_name: &str) -> String {
    format!("switched to context {context_name}, reevaluate the user request, keep the users language")
}

/// `{"success": false, "instructions": ...}`: the model should ask the player
/// for clarification.
pub fn failure_instructions(instructions: &str) -> String {
    json!({ "success": false, "instructions": instructions }).to_string()
}

/// `{"success": false, "error": ...}`: the action itself failed.
pub fn failure_error(error: &str) -> String {
    json!({ "success": false, "error": error }).to_string()
}

/// Context switches still allowed in the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchBudget {
    remaining: u32,
}

impl SwitchBudget {
    /// Allow `max` switches.
    pub fn new(max: u32) -> Self {
        Self { remaining: max }
    }

    /// Consume one switch if any are left.
    pub fn try_take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Switches left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

/// Result of one tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Tool-result content for the model.
    pub content: String,
    /// Text to play to the player right away, ending the turn.
    pub playback: Option<String>,
    /// Persona switched to by this call.
    pub switched: Option<Persona>,
}

impl DispatchOutcome {
    fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            playback: None,
            switched: None,
        }
    }

    fn with_playback(mut self, playback: Option<String>) -> Self {
        self.playback = playback;
        self
    }
}

/// Result of all tool calls of one assistant message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Playback cue of the last call that produced one.
    pub last_playback: Option<String>,
    /// Last persona switched to during the batch.
    pub switched: Option<Persona>,
    /// Tool-result messages appended.
    pub results: usize,
}

// ── Arguments ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SwitchContextArgs {
    context_name: String,
}

#[derive(Debug, Deserialize)]
struct SwitchEmployeeArgs {
    #[serde(default)]
    employee_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecuteCommandArgs {
    command_name: String,
}

#[derive(Debug, Deserialize)]
struct FromLocationArgs {
    location_name: String,
    #[serde(default)]
    include_illegal_commodities: bool,
}

#[derive(Debug, Deserialize)]
struct BetweenLocationsArgs {
    location_name_from: String,
    location_name_to: String,
    #[serde(default)]
    include_illegal_commodities: bool,
}

#[derive(Debug, Deserialize)]
struct SellAtLocationArgs {
    location_name_to: String,
    commodity_name: String,
}

#[derive(Debug, Deserialize)]
struct CommodityArgs {
    commodity_name: String,
}

fn parse_args<T: DeserializeOwned>(function: &str, arguments: &str) -> Result<T, String> {
    let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
    serde_json::from_str(arguments).map_err(|e| {
        tracing::warn!(%function, error = %e, "invalid tool arguments");
        failure_instructions(&format!(
            "The arguments for {function} were incomplete or invalid ({e}). Ask the player to repeat the request."
        ))
    })
}

// ── Dispatcher ──────────────────────────────────────────────

/// Routes tool calls to their handlers.
#[derive(Clone)]
pub struct ToolCallDispatcher {
    config: Arc<WingmanConfig>,
    trading: Arc<dyn TradingProvider>,
    commands: CommandRunner,
}

impl std::fmt::Debug for ToolCallDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolCallDispatcher")
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}

impl ToolCallDispatcher {
    /// Create a dispatcher.
    pub fn new(
        config: Arc<WingmanConfig>,
        trading: Arc<dyn TradingProvider>,
        commands: CommandRunner,
    ) -> Self {
        Self {
            config,
            trading,
            commands,
        }
    }

    /// Command runner shared with the instant path.
    pub fn commands(&self) -> &CommandRunner {
        &self.commands
    }

    /// Schema name lists from the current command, keybinding and trading data.
    ///
    /// Configured commands come first, followed by the allowed keybindings.
    /// Commands with instant phrases are left out; they only run locally.
    pub fn catalog(&self) -> ToolCatalog {
        let mut command_names: Vec<String> = self
            .config
            .commands
            .iter()
            .filter(|c| !c.is_instant())
            .map(|c| c.name.clone())
            .collect();
        for name in self.commands.keybindings().names() {
            if !command_names.contains(&name) {
                command_names.push(name);
            }
        }
        ToolCatalog {
            command_names,
            location_names: self.trading.location_names(),
            area_names: self.trading.area_names(),
            commodity_names: self.trading.commodity_names(),
            employee_ids: self.config.personas.trade_division.sub_role_voices.clone(),
        }
    }

    /// Run every call of one assistant message, in order, appending one
    /// tool-result message per call to the currently active history.
    pub async fn dispatch_all(
        &self,
        session: &mut ActiveSession,
        switcher: &mut ContextSwitcher,
        budget: &mut SwitchBudget,
        calls: &[AssistantToolCall],
    ) -> BatchOutcome {
        let mut batch = BatchOutcome::default();
        for call in calls {
            let span = tracing::info_span!(
                SPAN_TOOL_DISPATCH,
                { FIELD_FUNCTION } = %call.function_name,
                { FIELD_CALL_ID } = %call.call_id,
            );
            let outcome = self
                .dispatch(session, switcher, budget, &call.function_name, &call.arguments)
                .instrument(span)
                .await;

            session.state.messages.push(Message::tool_result(
                call.call_id.clone(),
                call.function_name.clone(),
                outcome.content,
            ));
            batch.results += 1;
            if outcome.playback.is_some() {
                batch.last_playback = outcome.playback;
            }
            if outcome.switched.is_some() {
                batch.switched = outcome.switched;
            }
        }
        batch
    }

    /// Run one call. The caller appends the returned content as the call's
    /// tool result.
    pub async fn dispatch(
        &self,
        session: &mut ActiveSession,
        switcher: &mut ContextSwitcher,
        budget: &mut SwitchBudget,
        function_name: &str,
        arguments: &str,
    ) -> DispatchOutcome {
        tracing::debug!(function = %function_name, %arguments, "dispatching tool call");
        let Some(function) = ToolFunction::from_name(function_name) else {
            tracing::warn!(function = %function_name, "model called an unknown function");
            return DispatchOutcome::content(failure_error(&format!(
                "Unknown function {function_name}"
            )));
        };

        let result = match function {
            ToolFunction::SwitchContext => parse_args(function_name, arguments)
                .map(|args| self.switch_context(session, switcher, budget, args)),
            ToolFunction::SwitchSubRole => parse_args(function_name, arguments)
                .map(|args| self.switch_employee(session, switcher, args)),
            ToolFunction::ExecuteCommand => match parse_args(function_name, arguments) {
                Ok(args) => Ok(self.execute_command(args).await),
                Err(e) => Err(e),
            },
            ToolFunction::Trade(query) => self.trade(query, function_name, arguments),
        };
        result.unwrap_or_else(|failure| DispatchOutcome::content(failure))
    }

    fn switch_context(
        &self,
        session: &mut ActiveSession,
        switcher: &mut ContextSwitcher,
        budget: &mut SwitchBudget,
        args: SwitchContextArgs,
    ) -> DispatchOutcome {
        if Persona::from_context_name(&args.context_name).is_some() && !budget.try_take() {
            tracing::warn!(context = %args.context_name, "context switch limit reached for this turn");
            return DispatchOutcome::content(failure_instructions(
                "The context was already switched for this request. Answer the player in the current context without switching again.",
            ));
        }
        match switcher.switch(session, &args.context_name) {
            Ok(report) => DispatchOutcome {
                content: switched_content(report.to.context_name()),
                playback: None,
                switched: Some(report.to),
            },
            Err(e) => DispatchOutcome::content(failure_instructions(&format!(
                "{e}. The request was ignored, answer in the current context."
            ))),
        }
    }

    fn switch_employee(
        &self,
        session: &mut ActiveSession,
        switcher: &ContextSwitcher,
        args: SwitchEmployeeArgs,
    ) -> DispatchOutcome {
        let persona = Persona::TradeDivision;
        let voices = &persona.config(&self.config).sub_role_voices;
        let current = session
            .sub_role_voice(persona)
            .map(str::to_string)
            .unwrap_or_else(|| persona.config(&self.config).voice.clone());

        let requested = args.employee_id.filter(|id| voices.contains(id));
        let voice = match requested {
            Some(id) => id,
            None => {
                use rand::seq::SliceRandom;
                let others: Vec<&String> = voices.iter().filter(|v| **v != current).collect();
                match others.choose(&mut rand::thread_rng()) {
                    Some(v) => (*v).clone(),
                    None => current.clone(),
                }
            }
        };

        switcher.set_sub_role_voice(session, persona, &voice);
        tracing::info!(from = %current, to = %voice, "trade division employee changed");
        DispatchOutcome::content(
            json!({
                "success": true,
                "instructions": "You are now a different employee of the Trade and Development Division. Briefly introduce yourself with a first name, your position in the requested department and how you can help the player."
            })
            .to_string(),
        )
    }

    async fn execute_command(&self, args: ExecuteCommandArgs) -> DispatchOutcome {
        match self.config.command(&args.command_name) {
            Some(command) => self.execute_configured(command).await,
            None => self.execute_keybinding(&args.command_name).await,
        }
    }

    async fn execute_configured(&self, command: &CommandConfig) -> DispatchOutcome {
        if let Err(e) = self.commands.run_configured(command).await {
            tracing::warn!(command = %command.name, error = %e, "command failed");
            return DispatchOutcome::content(failure_error(&e.to_string()));
        }
        let response = select_response(command);
        // Plain key sequences acknowledge like a keybinding.
        let fallback = if command.game_commands.is_empty() {
            SILENT_ACK
        } else {
            COMMAND_DONE_PAYLOAD
        };
        let content = response.clone().unwrap_or_else(|| fallback.to_string());
        DispatchOutcome::content(content).with_playback(response)
    }

    async fn execute_keybinding(&self, name: &str) -> DispatchOutcome {
        let command = match self.commands.keybindings().resolve(name) {
            Ok(command) => command,
            Err(e @ (ResolveError::NotFound(_) | ResolveError::NotAllowed(_))) => {
                tracing::warn!(command = %name, error = %e, "keybinding refused");
                let message = e.to_string();
                return DispatchOutcome::content(failure_error(&message))
                    .with_playback(Some(message));
            }
            Err(e @ ResolveError::UnsupportedActivation { .. }) => {
                tracing::warn!(command = %name, error = %e, "keybinding cannot be pressed");
                return DispatchOutcome::content(
                    json!({ "success": false, "message": name, "error": e.to_string() })
                        .to_string(),
                );
            }
        };
        match self.commands.press(&command).await {
            Ok(()) => DispatchOutcome::content(SILENT_ACK).with_playback(Some(SILENT_ACK.into())),
            Err(e) => {
                tracing::warn!(command = %name, error = %e, "keybinding failed");
                DispatchOutcome::content(failure_error(&e.to_string()))
            }
        }
    }

    fn trade(
        &self,
        query: TradeQuery,
        function_name: &str,
        arguments: &str,
    ) -> Result<DispatchOutcome, String> {
        let trading = &self.trading;
        let result = match query {
            TradeQuery::FromLocation => {
                let args: FromLocationArgs = parse_args(function_name, arguments)?;
                trading.best_trade_from_location(&args.location_name, args.include_illegal_commodities)
            }
            TradeQuery::BetweenLocations => {
                let args: BetweenLocationsArgs = parse_args(function_name, arguments)?;
                trading.best_trade_between_locations(
                    &args.location_name_from,
                    &args.location_name_to,
                    args.include_illegal_commodities,
                )
            }
            TradeQuery::SellPriceAtLocation => {
                let args: SellAtLocationArgs = parse_args(function_name, arguments)?;
                trading.best_sell_price_at_location(&args.location_name_to, &args.commodity_name)
            }
            TradeQuery::ForCommodity => {
                let args: CommodityArgs = parse_args(function_name, arguments)?;
                trading.best_trade_for_commodity(&args.commodity_name)
            }
            TradeQuery::SellingLocationForCommodity => {
                let args: CommodityArgs = parse_args(function_name, arguments)?;
                trading.best_selling_location_for_commodity(&args.commodity_name)
            }
        };
        log_trade_result(function_name, &result);
        let content = serde_json::to_string(&result)
            .unwrap_or_else(|e| failure_error(&format!("trade result could not be encoded: {e}")));
        Ok(DispatchOutcome::content(content))
    }
}

fn log_trade_result(function_name: &str, result: &TradeQueryResult) {
    match (result.best(), &result.message) {
        (Some(best), _) => tracing::info!(
            function = %function_name,
            routes = result.trade_routes.len(),
            best = %best.summary(),
            "trade query answered"
        ),
        (None, Some(message)) => {
            tracing::info!(function = %function_name, %message, "trade query found nothing")
        }
        (None, None) => tracing::info!(function = %function_name, "trade query returned no data"),
    }
}
