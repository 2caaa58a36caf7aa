//! Execution of configured commands and game keybindings.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::config::{CommandConfig, ResponseMode};
use crate::error::{Result, WingmanError};
use crate::services::keybindings::KeybindingCatalog;
use crate::services::keypress::{DryRunKeypress, KeyCommand, KeyStroke, KeypressExecutor, seconds};

/// Runs commands through the keypress executor.
#[derive(Clone)]
pub struct CommandRunner {
    keypress: Arc<dyn KeypressExecutor>,
    keybindings: Arc<KeybindingCatalog>,
    dry_run: bool,
}

impl std::fmt::Debug for CommandRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRunner")
            .field("keybindings", &self.keybindings.len())
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl CommandRunner {
    /// Create a runner.
    pub fn new(keypress: Arc<dyn KeypressExecutor>, keybindings: Arc<KeybindingCatalog>) -> Self {
        Self {
            keypress,
            keybindings,
            dry_run: false,
        }
    }

    /// Log key presses instead of handing them to the executor.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Game keybindings known to the runner.
    pub fn keybindings(&self) -> &KeybindingCatalog {
        &self.keybindings
    }

    /// Run a configured command: its direct key presses first, then its game
    /// keybindings in order, pausing after each as configured.
    ///
    /// # Errors
    ///
    /// Returns [`WingmanError::Keypress`] when a keybinding cannot be resolved
    /// or the executor fails. Steps after the failing one are not run.
    pub async fn run_configured(&self, command: &CommandConfig) -> Result<()> {
        tracing::info!(command = %command.name, "executing command");

        if !command.keys.is_empty() {
            let strokes = command.keys.iter().map(KeyStroke::from_config).collect();
            self.inject(&KeyCommand::new(command.name.clone(), strokes))
                .await?;
        }

        for step in &command.game_commands {
            self.run_keybinding(&step.command).await?;
            if let Some(wait) = seconds(step.wait) {
                tokio::time::sleep(wait).await;
            }
        }
        Ok(())
    }

    /// Resolve and press one game keybinding.
    ///
    /// # Errors
    ///
    /// Returns [`WingmanError::Keypress`] carrying the resolution failure
    /// (`"Command not found …"`, `"Command not allowed …"`) or the executor
    /// error.
    pub async fn run_keybinding(&self, name: &str) -> Result<()> {
        let command = self
            .keybindings
            .resolve(name)
            .map_err(|e| WingmanError::Keypress(e.to_string()))?;
        self.press(&command).await
    }

    /// Press an already resolved command.
    ///
    /// # Errors
    ///
    /// Returns the executor's error.
    pub async fn press(&self, command: &KeyCommand) -> Result<()> {
        tracing::info!(keybinding = %command.name, description = %command.description, "executing keybinding");
        self.inject(command).await
    }

    async fn inject(&self, command: &KeyCommand) -> Result<()> {
        if self.dry_run {
            return DryRunKeypress.execute(command).await;
        }
        self.keypress.execute(command).await
    }
}

/// Pick one of the command's canned replies at random.
pub fn select_response(command: &CommandConfig) -> Option<String> {
    match command.response_mode() {
        ResponseMode::Phrases(phrases) => phrases.choose(&mut rand::thread_rng()).cloned(),
        ResponseMode::Silent | ResponseMode::Unspecified => None,
    }
}
