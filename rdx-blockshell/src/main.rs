use anyhow::{Context, Result};
use blockbar::config::default_config_path;
use blockbar::modules::SECTIONS;
use blockbar::prelude::*;
use blockbar::{ENGINE_NAME, VERSION as LIB_VERSION};
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tracing::info;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct ShellHighlighter;

impl Highlighter for ShellHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Keeps the most recent render so `show` has something to print.
#[derive(Clone, Default)]
struct SnapshotPublisher {
    latest: Arc<Mutex<Vec<String>>>,
}

impl Publisher for SnapshotPublisher {
    fn render(&mut self, units: &[BlockUnit]) {
        let line = units.iter().map(|unit| unit.state.full_text.clone()).collect();
        if let Ok(mut latest) = self.latest.lock() {
            *latest = line;
        }
    }
}

/// One row of the `list` command.
struct BlockRow {
    position: usize,
    kind: &'static str,
    interval: Option<f64>,
    update_signal: Option<i32>,
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-".repeat(64).dimmed());
    println!("{}", version_string);
    println!("{}", "-".repeat(64).dimmed());
}

/// Spawns a task that prints every render while `watching` is set.
fn spawn_render_listener(engine: &BlockbarEngine, watching: Arc<AtomicBool>) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        loop {
            let event = match system_rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            };
            match event {
                SystemEvent::Rendered { fragments } if watching.load(Ordering::Relaxed) => {
                    println!("<-- [RENDER] {}", fragments.join(" | "));
                }
                SystemEvent::EngineShutdown { released } => {
                    println!("\n<-- [SYSTEM EVENT] engine stopped, {} sources released", released);
                }
                _ => {}
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| default_config_path().filter(|path| path.exists()));
    let settings = Settings::load(config_path.as_deref())?;
    let units = assemble(read_sections(&settings.blocks, SECTIONS)?)
        .context("cannot assemble blocks")?;

    let rows: Vec<BlockRow> = units
        .iter()
        .map(|unit| BlockRow {
            position: unit.position(),
            kind: unit.kind(),
            interval: unit.timer().map(|timer| timer.period().as_secs_f64()),
            update_signal: unit.update_signal(),
        })
        .collect();

    let publisher = SnapshotPublisher::default();
    let latest = publisher.latest.clone();
    let mut engine = BlockbarEngine::new(units, publisher);
    if let Some(timer) = settings.global.refresh_timer() {
        engine.on_interval(timer, actions::refresh);
    }
    let refresh_tx = engine.control(actions::refresh);
    let exit_tx = engine.control(actions::exit);
    let block_txs: HashMap<usize, mpsc::Sender<()>> = rows
        .iter()
        .filter_map(|row| Some((row.position, engine.control_block(row.position)?)))
        .collect();

    let watching = Arc::new(AtomicBool::new(false));
    spawn_render_listener(&engine, watching.clone());

    info!("Spawning {} in the background...", ENGINE_NAME.cyan());
    let engine_handle = tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    let mut rl = Editor::new()?;
    rl.set_helper(Some(ShellHighlighter));

    println!(
        "{} is running {} blocks. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan(),
        rows.len()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => {
                println!("Exiting blockshell...");
                break;
            }
        };
        rl.add_history_entry(line.as_str())?;
        let args = line.split_whitespace().collect::<Vec<_>>();

        match args.first().copied() {
            Some("list") => {
                println!("Blocks:");
                for row in &rows {
                    let interval = row
                        .interval
                        .map(|secs| format!("every {}s", secs))
                        .unwrap_or_else(|| "no timer".to_string());
                    let signal = row
                        .update_signal
                        .map(|n| format!(", signal SIGRTMIN+{}", n))
                        .unwrap_or_default();
                    println!("  #{} {:<12} {}{}", row.position, row.kind, interval, signal);
                }
            }
            Some("show") => match latest.lock() {
                Ok(latest) => println!("--> {}", latest.join(" | ")),
                Err(_) => println!("--> Error: render snapshot unavailable."),
            },
            Some("refresh") => {
                if refresh_tx.send(()).await.is_err() {
                    println!("--> Error: engine is not running.");
                }
            }
            Some("update") => match args.get(1).map(|s| s.parse::<usize>()) {
                Some(Ok(position)) => match block_txs.get(&position) {
                    Some(tx) => {
                        if tx.send(()).await.is_err() {
                            println!("--> Error: engine is not running.");
                        } else {
                            println!("--> Update requested for block #{}.", position);
                        }
                    }
                    None => println!("Error: no block at position #{}. Use 'list'.", position),
                },
                Some(Err(_)) => println!("Error: position must be a number (e.g., '1')."),
                None => println!("Usage: update <POSITION>"),
            },
            Some("watch") => match args.get(1).copied() {
                Some("on") => {
                    watching.store(true, Ordering::Relaxed);
                    println!("--> Printing every render.");
                }
                Some("off") => {
                    watching.store(false, Ordering::Relaxed);
                    println!("--> Stopped printing renders.");
                }
                _ => println!("Usage: watch on|off"),
            },
            Some("help") => {
                println!("Available commands:");
                println!("  list                  - Shows blocks with their intervals and signals.");
                println!("  show                  - Prints the most recent render.");
                println!("  refresh               - Asks the engine to publish now.");
                println!("  update <P>            - Forces an update of the block at position P.");
                println!("  watch on|off          - Toggles printing of every render.");
                println!("  exit                  - Stops the engine and quits the shell.");
            }
            Some("exit") => break,
            Some(_) => println!("Unknown command: '{}'. Type 'help'.", line.trim()),
            None => {}
        }
    }

    exit_tx.send(()).await.ok();
    engine_handle.await?;
    Ok(())
}
