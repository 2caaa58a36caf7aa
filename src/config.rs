//! Configuration types for the wingman router.
//!
//! Everything is loaded from a single TOML file. Every section and field has
//! a default, so an empty file is a valid configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WingmanError};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WingmanConfig {
    /// Game keybindings the model is never allowed to trigger.
    pub avoid_commands: Vec<String>,
    /// Who the companion is talking to.
    pub player: PlayerConfig,
    /// Chat-completion transport and turn bounds.
    pub llm: LlmConfig,
    /// Per-persona prompts, models and voices.
    pub personas: PersonasConfig,
    /// Runtime toggles.
    pub features: FeatureConfig,
    /// Game keybinding catalog and key-press rules.
    pub keybindings: KeybindingConfig,
    /// Trading data source.
    pub trading: TradingConfig,
    /// Configured commands (instant phrases, key sequences, keybinding chains).
    pub commands: Vec<CommandConfig>,
}

/// Player identity woven into the companion prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// How the companion addresses the player.
    pub name: String,
    /// Rank or title.
    pub title: String,
    /// Ship call sign.
    pub ship_name: String,
    /// Language the personas should answer in.
    pub language: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: "Commander".into(),
            title: "Captain".into(),
            ship_name: "Wanderer".into(),
            language: "English".into(),
        }
    }
}

/// Chat-completion transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key. When unset, read from the variable named by `api_key_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Base URL of an OpenAI-compatible server.
    pub base_url: String,
    /// Optional organization header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Maximum model calls per transcript.
    pub max_model_rounds: u32,
    /// Maximum persona switches per transcript.
    pub max_context_switches_per_turn: u32,
}

/// Default environment variable for the API key.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default model calls per transcript.
pub const DEFAULT_MAX_MODEL_ROUNDS: u32 = 5;

/// Default persona switches per transcript.
pub const DEFAULT_MAX_CONTEXT_SWITCHES: u32 = 1;

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.into(),
            base_url: crate::llm::openai::DEFAULT_BASE_URL.into(),
            org_id: None,
            request_timeout_secs: crate::llm::openai::DEFAULT_TIMEOUT_SECS,
            max_model_rounds: DEFAULT_MAX_MODEL_ROUNDS,
            max_context_switches_per_turn: DEFAULT_MAX_CONTEXT_SWITCHES,
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from config or environment.
    ///
    /// # Errors
    ///
    /// Returns [`WingmanError::Config`] when neither source provides a non-empty key.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.to_string());
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(WingmanError::Config(format!(
                "no API key: set llm.api_key or the {} environment variable",
                self.api_key_env
            ))),
        }
    }
}

/// Prompts, models and voices for both personas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonasConfig {
    /// The ship companion.
    pub companion: PersonaConfig,
    /// The trade and development division.
    pub trade_division: PersonaConfig,
}

impl Default for PersonasConfig {
    fn default() -> Self {
        Self {
            companion: PersonaConfig {
                prompt: "You are Cora, the onboard AI companion of a starship. You execute ship \
                         and player actions on request and answer in short, precise sentences"
                    .into(),
                model: "gpt-4o-mini".into(),
                voice: "nova".into(),
                sub_role_voices: Vec::new(),
            },
            trade_division: PersonaConfig {
                prompt: "You are an employee of the Trade and Development Division. You advise \
                         pilots on profitable trade routes and commodity prices, reply like a \
                         busy clerk on a comm channel"
                    .into(),
                model: "gpt-4o-mini".into(),
                voice: "onyx".into(),
                sub_role_voices: vec![
                    "onyx".into(),
                    "echo".into(),
                    "fable".into(),
                    "alloy".into(),
                    "shimmer".into(),
                ],
            },
        }
    }
}

/// One persona's configurable side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Persona-specific part of the system prompt.
    pub prompt: String,
    /// Chat model used while this persona is active.
    pub model: String,
    /// Default playback voice.
    pub voice: String,
    /// Voices of persona-internal sub-roles (e.g. trade division employees).
    pub sub_role_voices: Vec<String>,
}

/// Runtime toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Log key presses instead of injecting them.
    pub dry_run: bool,
    /// Speak replies through the speech sink.
    pub speak_responses: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            speak_responses: true,
        }
    }
}

/// Game keybinding catalog and key-press rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    /// Game action name → bound keys.
    pub bindings: BTreeMap<String, KeybindingEntry>,
    /// Activation mode → press behaviour (hold milliseconds or a keyword).
    pub activation_modes: BTreeMap<String, ActivationSetting>,
    /// Game key name → OS key name, where they differ.
    pub key_mappings: BTreeMap<String, String>,
    /// Per-action activation-mode overrides.
    pub activation_overrides: BTreeMap<String, String>,
}

/// One bound game action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeybindingEntry {
    /// Keys joined by `+`, modifiers included (e.g. `"lalt+n"`).
    pub keys: String,
    /// Game activation mode (e.g. `"press"`, `"delayed_press_long"`).
    #[serde(default = "default_activation_mode")]
    pub activation_mode: String,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_activation_mode() -> String {
    "press".into()
}

/// How an activation mode is pressed: a hold time in milliseconds or one of
/// the keywords `double_tap`, `not_supported`, `unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActivationSetting {
    /// Hold duration in milliseconds; 0 or 1 means a plain tap.
    HoldMillis(u64),
    /// Special behaviour keyword.
    Keyword(String),
}

/// Trading data source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// TOML price table. Without one, trade queries report that no data is available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_table: Option<PathBuf>,
}

// ── Commands ────────────────────────────────────────────────

/// A configured command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Unique command name, also offered to the model via `execute_command`.
    pub name: String,
    /// Phrases that trigger the command without asking the model.
    pub instant_activation: Vec<String>,
    /// Canned replies, or `false` for none at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<ResponseSetting>,
    /// Direct key presses, in order.
    pub keys: Vec<KeyPressConfig>,
    /// Game keybindings to trigger, in order.
    pub game_commands: Vec<GameCommandRef>,
}

/// Raw `responses` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseSetting {
    /// `responses = false` silences the command; `true` is the same as unset.
    Enabled(bool),
    /// Phrases to choose from.
    Phrases(Vec<String>),
}

/// Interpreted response behaviour of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode<'a> {
    /// No canned reply configured; the model decides.
    Unspecified,
    /// Explicitly no reply.
    Silent,
    /// Pick one of these.
    Phrases(&'a [String]),
}

impl CommandConfig {
    /// Whether the command can be triggered by an instant phrase.
    pub fn is_instant(&self) -> bool {
        !self.instant_activation.is_empty()
    }

    /// Interpreted `responses` setting.
    pub fn response_mode(&self) -> ResponseMode<'_> {
        match &self.responses {
            Some(ResponseSetting::Enabled(false)) => ResponseMode::Silent,
            Some(ResponseSetting::Phrases(p)) if !p.is_empty() => ResponseMode::Phrases(p),
            _ => ResponseMode::Unspecified,
        }
    }
}

/// One direct key press.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyPressConfig {
    /// Key to press.
    pub key: String,
    /// Modifiers held while pressing.
    pub modifiers: Vec<String>,
    /// Hold duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold: Option<f64>,
    /// Text to type instead of pressing `key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typewrite: Option<String>,
    /// Pause after this press in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<f64>,
}

/// Reference to a game keybinding inside a command chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameCommandRef {
    /// Keybinding action name.
    pub command: String,
    /// Pause after triggering it, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<f64>,
}

impl WingmanConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| WingmanError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| WingmanError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `<config dir>/wingman/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp/wingman-config"))
            .join("wingman")
            .join("config.toml")
    }

    /// Find a configured command by name.
    pub fn command(&self, name: &str) -> Option<&CommandConfig> {
        self.commands.iter().find(|c| c.name == name)
    }
}
