//! CLI binary for wingman.
//!
//! Reads transcripts line by line from stdin and prints spoken replies to
//! stdout. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wingman::llm::{OpenAiConfig, OpenAiTransport};
use wingman::router::commands::CommandRunner;
use wingman::router::{ToolCallDispatcher, TurnOrchestrator, TurnOutcome};
use wingman::services::keybindings::KeybindingCatalog;
use wingman::services::keypress::DryRunKeypress;
use wingman::services::speech::ConsoleSpeech;
use wingman::services::trading::PriceTable;
use wingman::WingmanConfig;

/// Wingman: voice-driven game companion.
#[derive(Parser)]
#[command(name = "wingman", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log key presses instead of injecting them.
    #[arg(long)]
    dry_run: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Route transcripts read from stdin (default).
    Chat,

    /// Write the default configuration to the config path.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wingman=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli
        .config
        .clone()
        .unwrap_or_else(WingmanConfig::default_config_path);

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => {
            let mut config = if path.exists() {
                WingmanConfig::from_file(&path)?
            } else {
                info!(path = %path.display(), "no config file, using defaults");
                WingmanConfig::default()
            };
            config.features.dry_run |= cli.dry_run;
            run_chat(config).await
        }
        Command::InitConfig => {
            WingmanConfig::default().save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
    }
}

async fn run_chat(config: WingmanConfig) -> anyhow::Result<()> {
    let mut openai = OpenAiConfig::new(config.llm.resolve_api_key()?)
        .with_base_url(config.llm.base_url.clone())
        .with_timeout(Duration::from_secs(config.llm.request_timeout_secs));
    if let Some(org_id) = &config.llm.org_id {
        openai = openai.with_org_id(org_id.clone());
    }
    let transport = Arc::new(OpenAiTransport::new(openai)?);

    let trading = match &config.trading.price_table {
        Some(path) => PriceTable::from_file(path)?,
        None => PriceTable::default(),
    };

    if !config.features.dry_run {
        tracing::warn!("no key injection backend in the CLI, key presses are only logged");
    }

    let keybindings = Arc::new(KeybindingCatalog::new(
        &config.keybindings,
        &config.avoid_commands,
    ));
    let config = Arc::new(config);
    let runner = CommandRunner::new(Arc::new(DryRunKeypress), keybindings)
        .with_dry_run(config.features.dry_run);
    let dispatcher = ToolCallDispatcher::new(Arc::clone(&config), Arc::new(trading), runner);
    let mut orchestrator =
        TurnOrchestrator::new(config, transport, Arc::new(ConsoleSpeech), dispatcher);

    println!("Wingman v{}", env!("CARGO_PKG_VERSION"));
    println!("Type what you would say to your ship. Ctrl-D to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match orchestrator.handle_transcript(&line).await {
            TurnOutcome::NoResponse => info!("no response"),
            TurnOutcome::Acknowledged { command } => info!(%command, "acknowledged"),
            outcome => info!(
                persona = %orchestrator.session().persona,
                text = outcome.text().unwrap_or_default(),
                "turn finished"
            ),
        }
    }
    Ok(())
}
