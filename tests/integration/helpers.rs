//! Shared helpers for integration tests.
//!
//! Scripted collaborators record everything the router hands them, so the
//! tests can assert on requests, key presses and playback after a turn.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wingman::WingmanConfig;
use wingman::llm::{AssistantToolCall, Completion, LlmError, LlmTransport, Message, ModelRef, ToolDefinition};
use wingman::router::commands::CommandRunner;
use wingman::router::{ToolCallDispatcher, TurnOrchestrator};
use wingman::services::keybindings::KeybindingCatalog;
use wingman::services::keypress::{KeyCommand, KeypressExecutor};
use wingman::services::speech::{SpeechOutput, VoiceSettings};
use wingman::services::trading::PriceTable;

/// A configuration with instant commands, keybindings and an avoid list.
pub(crate) const SAMPLE_CONFIG: &str = r#"
avoid_commands = ["v_self_destruct"]

[player]
name = "Mara"
ship_name = "Kestrel"

[keybindings.bindings.v_toggle_landing_gear]
keys = "n"
label = "Toggle landing gear"

[keybindings.bindings.v_self_destruct]
keys = "backspace"
activation_mode = "delayed_press_long"

[keybindings.bindings.v_afterburner]
keys = "lshift+lalt"

[keybindings.activation_modes]
press = 0
delayed_press_long = 1500

[keybindings.key_mappings]
lshift = "shiftleft"
lalt = "altleft"

[[commands]]
name = "QuantumTravel"
instant_activation = ["go to Port Olisar"]
responses = ["Plotting a course to Port Olisar"]
[[commands.keys]]
key = "b"
hold = 1.0

[[commands]]
name = "LandingGear"
responses = ["Gear down"]
[[commands.game_commands]]
command = "v_toggle_landing_gear"

[[commands]]
name = "Boost"
responses = false
[[commands.game_commands]]
command = "v_afterburner"

[[commands]]
name = "Afterburner"
instant_activation = ["afterburner on"]
responses = false
[[commands.game_commands]]
command = "v_afterburner"
"#;

/// Tradeports around Hurston and Crusader.
pub(crate) const SAMPLE_PRICES: &str = r#"
[[commodities]]
name = "Medical Supplies"
code = "MEDS"

[[commodities]]
name = "Laranite"
code = "LARA"

[[tradeports]]
name = "Lorville Central Business District"
code = "LOCBD"
planet = "Hurston"
city = "Lorville"
buy = { MEDS = 17.0 }

[[tradeports]]
name = "Port Olisar"
code = "PORO"
planet = "Crusader"
sell = { MEDS = 19.5 }
"#;

/// One recorded transport request.
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub(crate) messages: Vec<Message>,
    pub(crate) tool_names: Vec<String>,
    pub(crate) model: String,
}

/// Replies from a queue and records each request. An empty queue behaves like
/// a failed HTTP call.
pub(crate) struct ScriptedTransport {
    replies: Mutex<Vec<Completion>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(mut replies: Vec<Completion>) -> Self {
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn ask(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        model: &ModelRef,
    ) -> Result<Completion, LlmError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            model: model.model_id.clone(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LlmError::RequestError("connection reset".into()))
    }
}

/// Records key commands instead of pressing them.
#[derive(Default)]
pub(crate) struct RecordingKeypress {
    executed: Mutex<Vec<KeyCommand>>,
}

impl RecordingKeypress {
    pub(crate) fn names(&self) -> Vec<String> {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub(crate) fn executed(&self) -> Vec<KeyCommand> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl KeypressExecutor for RecordingKeypress {
    async fn execute(&self, command: &KeyCommand) -> wingman::Result<()> {
        self.executed.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// Records spoken lines with the voice they were spoken in.
#[derive(Default)]
pub(crate) struct RecordingSpeech {
    lines: Mutex<Vec<(String, VoiceSettings)>>,
}

impl RecordingSpeech {
    pub(crate) fn lines(&self) -> Vec<(String, VoiceSettings)> {
        self.lines.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|(t, _)| t).collect()
    }
}

#[async_trait]
impl SpeechOutput for RecordingSpeech {
    async fn speak(&self, text: &str, voice: &VoiceSettings) -> wingman::Result<()> {
        self.lines
            .lock()
            .unwrap()
            .push((text.to_string(), voice.clone()));
        Ok(())
    }
}

/// An orchestrator wired to recording collaborators.
pub(crate) struct Harness {
    pub(crate) orchestrator: TurnOrchestrator,
    pub(crate) transport: Arc<ScriptedTransport>,
    pub(crate) keypress: Arc<RecordingKeypress>,
    pub(crate) speech: Arc<RecordingSpeech>,
}

pub(crate) fn sample_config() -> WingmanConfig {
    toml::from_str(SAMPLE_CONFIG).expect("sample config parses")
}

/// Build a harness over `config` with the sample price table.
pub(crate) fn harness_with(config: WingmanConfig, replies: Vec<Completion>) -> Harness {
    let config = Arc::new(config);
    let transport = Arc::new(ScriptedTransport::new(replies));
    let keypress = Arc::new(RecordingKeypress::default());
    let speech = Arc::new(RecordingSpeech::default());

    let prices = PriceTable::from_toml_str(SAMPLE_PRICES).expect("sample prices parse");
    let catalog = Arc::new(KeybindingCatalog::new(&config.keybindings, &config.avoid_commands));
    let runner = CommandRunner::new(keypress.clone(), catalog);
    let dispatcher = ToolCallDispatcher::new(Arc::clone(&config), Arc::new(prices), runner);
    let orchestrator = TurnOrchestrator::new(config, transport.clone(), speech.clone(), dispatcher);

    Harness {
        orchestrator,
        transport,
        keypress,
        speech,
    }
}

/// Build a harness over the sample config.
pub(crate) fn harness(replies: Vec<Completion>) -> Harness {
    harness_with(sample_config(), replies)
}

/// A completion requesting one function call.
pub(crate) fn call(id: &str, function: &str, arguments: &str) -> Completion {
    Completion::tool_calls(vec![AssistantToolCall::new(id, function, arguments)])
}

/// A completion requesting a switch to `context_name`.
pub(crate) fn switch_to(id: &str, context_name: &str) -> Completion {
    call(
        id,
        "switch_context",
        &format!(r#"{{"context_name":"{context_name}"}}"#),
    )
}
