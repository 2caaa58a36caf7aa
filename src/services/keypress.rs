//! Key injection.
//!
//! The router resolves every command into a [`KeyCommand`]: an ordered list
//! of strokes, each with its modifiers already in press order. Executors
//! press modifiers in that order, press the key the way [`PressStyle`] says,
//! release modifiers in reverse order and then honour the stroke's wait.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::KeyPressConfig;
use crate::error::Result;

/// Press order of modifier keys.
pub const MODIFIER_ORDER: [&str; 9] = [
    "alt",
    "ctrl",
    "shift",
    "altleft",
    "ctrlleft",
    "shiftleft",
    "altright",
    "ctrlright",
    "shiftright",
];

/// Interval between the two presses of a double tap.
pub const DOUBLE_TAP_INTERVAL: Duration = Duration::from_millis(50);

/// Whether `key` is a modifier.
pub fn is_modifier(key: &str) -> bool {
    MODIFIER_ORDER.contains(&key)
}

/// Sort keys so modifiers come first in [`MODIFIER_ORDER`]; other keys keep
/// their relative order after them.
pub fn sort_by_modifier_order(keys: &mut [String]) {
    keys.sort_by_key(|k| {
        MODIFIER_ORDER
            .iter()
            .position(|m| m == k)
            .unwrap_or(MODIFIER_ORDER.len())
    });
}

/// How the main key of a stroke is pressed.
#[derive(Debug, Clone, PartialEq)]
pub enum PressStyle {
    /// Press and release.
    Tap,
    /// Hold down for the given duration.
    Hold(Duration),
    /// Two taps [`DOUBLE_TAP_INTERVAL`] apart.
    DoubleTap,
    /// Type the text instead of pressing the key.
    Typewrite(String),
}

/// One key press with its modifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyStroke {
    /// Modifiers in press order.
    pub modifiers: Vec<String>,
    /// Main key. Empty for a modifier-only stroke.
    pub key: String,
    /// Press behaviour of the main key.
    pub press: PressStyle,
    /// Pause after the stroke.
    pub wait_after: Option<Duration>,
}

impl KeyStroke {
    /// Tap `key` without modifiers.
    pub fn tap(key: impl Into<String>) -> Self {
        Self {
            modifiers: Vec::new(),
            key: key.into(),
            press: PressStyle::Tap,
            wait_after: None,
        }
    }

    /// Build a stroke from a configured key press.
    pub fn from_config(entry: &KeyPressConfig) -> Self {
        let mut modifiers = entry.modifiers.clone();
        sort_by_modifier_order(&mut modifiers);
        let press = if let Some(text) = &entry.typewrite {
            PressStyle::Typewrite(text.clone())
        } else if let Some(hold) = seconds(entry.hold) {
            PressStyle::Hold(hold)
        } else {
            PressStyle::Tap
        };
        Self {
            modifiers,
            key: entry.key.clone(),
            press,
            wait_after: seconds(entry.wait),
        }
    }
}

/// Seconds from config as a duration. Non-positive values mean none; values
/// that do not fit a [`Duration`] (NaN, infinite, overflowing) are ignored.
pub(crate) fn seconds(value: Option<f64>) -> Option<Duration> {
    let secs = value.filter(|s| *s > 0.0)?;
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => Some(duration),
        Err(e) => {
            tracing::warn!(seconds = secs, error = %e, "ignoring unusable duration from config");
            None
        }
    }
}

/// A resolved command ready for injection.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCommand {
    /// Command or keybinding name.
    pub name: String,
    /// Human-readable description for logs.
    pub description: String,
    /// Strokes in execution order.
    pub strokes: Vec<KeyStroke>,
}

impl KeyCommand {
    /// Create a command from strokes.
    pub fn new(name: impl Into<String>, strokes: Vec<KeyStroke>) -> Self {
        let name = name.into();
        Self {
            description: name.clone(),
            name,
            strokes,
        }
    }

    /// Replace the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Total pause time the command will spend in holds and waits.
    pub fn total_delay(&self) -> Duration {
        self.strokes
            .iter()
            .map(|s| {
                let hold = match s.press {
                    PressStyle::Hold(d) => d,
                    PressStyle::DoubleTap => DOUBLE_TAP_INTERVAL,
                    _ => Duration::ZERO,
                };
                hold.saturating_add(s.wait_after.unwrap_or_default())
            })
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Sends key events to the game.
#[async_trait]
pub trait KeypressExecutor: Send + Sync {
    /// Execute all strokes of `command` in order.
    async fn execute(&self, command: &KeyCommand) -> Result<()>;
}

/// Logs strokes instead of pressing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunKeypress;

#[async_trait]
impl KeypressExecutor for DryRunKeypress {
    async fn execute(&self, command: &KeyCommand) -> Result<()> {
        for stroke in &command.strokes {
            for modifier in &stroke.modifiers {
                tracing::debug!(%modifier, "modifier down");
            }
            match &stroke.press {
                PressStyle::Tap => tracing::debug!(key = %stroke.key, "press"),
                PressStyle::Hold(d) => {
                    tracing::debug!(key = %stroke.key, hold_ms = d.as_millis() as u64, "hold")
                }
                PressStyle::DoubleTap => tracing::debug!(key = %stroke.key, "double tap"),
                PressStyle::Typewrite(text) => tracing::debug!(%text, "typewrite"),
            }
            for modifier in stroke.modifiers.iter().rev() {
                tracing::debug!(%modifier, "modifier up");
            }
        }
        tracing::info!(
            command = %command.name,
            strokes = command.strokes.len(),
            "dry run: skipped key injection for {}",
            command.description
        );
        Ok(())
    }
}
