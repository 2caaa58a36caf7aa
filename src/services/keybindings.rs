//! Game keybinding catalog.
//!
//! Parsing the game's own keybinding exports is out of scope; bindings come
//! from `[keybindings.bindings]` in the config. The catalog turns a binding
//! name into a [`KeyCommand`] using the configured activation-mode table and
//! key-name mappings.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use crate::config::{ActivationSetting, KeybindingConfig, KeybindingEntry};
use crate::services::keypress::{KeyCommand, KeyStroke, PressStyle, is_modifier, sort_by_modifier_order};

/// Why a binding could not be turned into key presses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No binding with that name.
    #[error("Command not found {0}")]
    NotFound(String),
    /// The binding is on the avoid list.
    #[error("Command not allowed {0}")]
    NotAllowed(String),
    /// The binding's activation mode cannot be reproduced.
    #[error("activation mode not supported {mode}")]
    UnsupportedActivation {
        /// Binding name.
        name: String,
        /// Activation mode.
        mode: String,
    },
}

/// Resolves game keybinding names to key commands.
#[derive(Debug, Clone, Default)]
pub struct KeybindingCatalog {
    bindings: BTreeMap<String, KeybindingEntry>,
    activation_modes: BTreeMap<String, ActivationSetting>,
    key_mappings: BTreeMap<String, String>,
    activation_overrides: BTreeMap<String, String>,
    avoid: HashSet<String>,
}

impl KeybindingCatalog {
    /// Build the catalog from config.
    pub fn new(config: &KeybindingConfig, avoid_commands: &[String]) -> Self {
        Self {
            bindings: config.bindings.clone(),
            activation_modes: config.activation_modes.clone(),
            key_mappings: config.key_mappings.clone(),
            activation_overrides: config.activation_overrides.clone(),
            avoid: avoid_commands.iter().cloned().collect(),
        }
    }

    /// Names the model may trigger, sorted. Avoided bindings are left out.
    pub fn names(&self) -> Vec<String> {
        self.bindings
            .keys()
            .filter(|name| !self.avoid.contains(*name))
            .cloned()
            .collect()
    }

    /// Whether a binding with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Number of bindings, avoided ones included.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve `name` into key presses.
    ///
    /// # Errors
    ///
    /// See [`ResolveError`].
    pub fn resolve(&self, name: &str) -> Result<KeyCommand, ResolveError> {
        let entry = self
            .bindings
            .get(name)
            .ok_or_else(|| ResolveError::NotFound(name.to_string()))?;

        if self.avoid.contains(name) {
            return Err(ResolveError::NotAllowed(name.to_string()));
        }

        let mode = match self.activation_overrides.get(name) {
            Some(over) => {
                tracing::debug!(%name, from = %entry.activation_mode, to = %over, "activation mode overridden");
                over.as_str()
            }
            None => entry.activation_mode.as_str(),
        };

        let mut keys: Vec<String> = entry
            .keys
            .split('+')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| self.key_mappings.get(k).cloned().unwrap_or_else(|| k.to_string()))
            .collect();
        sort_by_modifier_order(&mut keys);

        let (mut modifiers, mut main): (Vec<String>, Vec<String>) =
            keys.into_iter().partition(|k| is_modifier(k));
        if main.is_empty() {
            // A binding made only of modifiers presses the last one as the key.
            match modifiers.pop() {
                Some(last) => main.push(last),
                None => return Err(ResolveError::NotFound(name.to_string())),
            }
        }

        let press = self.press_style(name, mode, modifiers.is_empty() && main.len() == 1)?;

        let strokes = main
            .into_iter()
            .map(|key| KeyStroke {
                modifiers: modifiers.clone(),
                key,
                press: press.clone(),
                wait_after: None,
            })
            .collect();

        let description = entry.label.clone().unwrap_or_else(|| name.to_string());
        Ok(KeyCommand::new(name, strokes).with_description(description))
    }

    fn press_style(
        &self,
        name: &str,
        mode: &str,
        single_key: bool,
    ) -> Result<PressStyle, ResolveError> {
        let style = match self.activation_modes.get(mode) {
            None => {
                tracing::debug!(%mode, "no press rule for activation mode, assuming press");
                PressStyle::Tap
            }
            Some(ActivationSetting::HoldMillis(ms)) if *ms > 1 => {
                PressStyle::Hold(Duration::from_millis(*ms))
            }
            Some(ActivationSetting::HoldMillis(_)) => PressStyle::Tap,
            Some(ActivationSetting::Keyword(word)) => match word.as_str() {
                "double_tap" if single_key => PressStyle::DoubleTap,
                "not_supported" | "notSupported" => {
                    return Err(ResolveError::UnsupportedActivation {
                        name: name.to_string(),
                        mode: mode.to_string(),
                    });
                }
                "unknown" | "double_tap" => PressStyle::Tap,
                other => {
                    tracing::warn!(%mode, keyword = %other, "unrecognised activation keyword, assuming press");
                    PressStyle::Tap
                }
            },
        };
        Ok(style)
    }
}
