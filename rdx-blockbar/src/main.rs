use anyhow::{Context, Result};
use blockbar::config::default_config_path;
use blockbar::modules::SECTIONS;
use blockbar::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal::unix::SignalKind;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Blockbar - a status line updater for i3bar-compatible bars
#[derive(Parser, Debug)]
#[command(name = "blockbar")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "BLOCKBAR_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print plain text lines instead of the i3bar JSON protocol
    #[arg(long)]
    plain: bool,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(short = 'l', long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load settings. An explicit path must exist; the default one is optional.
    let config_path = args
        .config
        .or_else(|| default_config_path().filter(|path| path.exists()));
    let settings = Settings::load(config_path.as_deref())?;

    // 2. Initialize structured logging on stderr; stdout belongs to the bar.
    let default_level = if settings.global.debug { "debug" } else { "info" };
    let level = args.log_level.unwrap_or_else(|| default_level.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    match &config_path {
        Some(path) => info!("Loaded configuration from {}", path.display()),
        None => info!("No configuration file; running with defaults."),
    }

    // 3. Assemble the ordered block units.
    let sections =
        read_sections(&settings.blocks, SECTIONS).context("invalid [blocks] section")?;
    let units = assemble(sections).context("cannot assemble blocks")?;
    debug!(
        "Assembled blocks: {:?}",
        units.iter().map(BlockUnit::kind).collect::<Vec<_>>()
    );

    // 4. Create the engine and wire up the refresh tick and signals.
    let mut engine = if args.plain {
        BlockbarEngine::new(units, PlainPublisher::new(std::io::stdout()))
    } else {
        BlockbarEngine::new(units, I3barPublisher::new(std::io::stdout()))
    };
    if let Some(timer) = settings.global.refresh_timer() {
        engine.on_interval(timer, actions::refresh);
    }
    engine.on_signal(SignalKind::interrupt(), actions::exit);
    engine.on_signal(SignalKind::terminate(), actions::exit);
    engine.on_signal(SignalKind::user_defined1(), actions::refresh);

    // 5. Run the engine until a termination signal arrives.
    engine.run().await
}
