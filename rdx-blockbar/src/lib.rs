//! # Blockbar
//!
//! An event-multiplexing status line updater for i3bar-compatible bars.
//!
//! Blockbar keeps an ordered set of blocks (disk, load, memory, network
//! interfaces, temperatures, clock, volume, ...). Each block refreshes its own
//! text on its own interval, and the engine publishes the combined line when
//! asked to.
//!
//! ## Core Concepts
//!
//! - **Block Unit**: one fragment of the status line, with its display state,
//!   its update interval and its acquisition routine.
//! - **Event Registry**: every source the engine waits on (block timers,
//!   signals, control channels), each bound to an action.
//! - **Verdict**: what an action hands back: refresh the output, exit, both
//!   or neither. A block's own timer only updates its state; publishing is
//!   driven by a separate refresh source so several updates are batched into
//!   one render.
//! - **Publisher**: renders the ordered blocks (i3bar JSON or plain text).
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use blockbar::prelude::*;
//! use tokio::signal::unix::SignalKind;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Load settings and assemble the ordered block units.
//!     let settings = Settings::load(None)?;
//!     let sections = read_sections(&settings.blocks, blockbar::modules::SECTIONS)?;
//!     let units = assemble(sections)?;
//!
//!     // 2. Create the engine with a publisher.
//!     let mut engine = BlockbarEngine::new(units, I3barPublisher::new(std::io::stdout()));
//!
//!     // 3. Register the global refresh tick and the termination signal.
//!     if let Some(timer) = settings.global.refresh_timer() {
//!         engine.on_interval(timer, actions::refresh);
//!     }
//!     engine.on_signal(SignalKind::interrupt(), actions::exit);
//!
//!     // 4. Run until an action asks to exit.
//!     engine.run().await
//! }
//! ```

pub const ENGINE_NAME: &str = "Blockbar Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod actions;
pub mod assembly;
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod events;
pub mod modules;
pub mod publish;
pub mod registry;

/// A prelude module for easy importing of the most common Blockbar types.
pub mod prelude {
    pub use crate::actions::{self, Verdict};
    pub use crate::assembly::{assemble, read_sections, AssemblyError, Section};
    pub use crate::common::SourceId;
    pub use crate::components::block::{
        BlockConfig, BlockConfigBase, BlockState, BlockUnit, TimerSource,
    };
    pub use crate::components::source::Source;
    pub use crate::config::{GlobalConfig, Settings};
    pub use crate::engine::BlockbarEngine;
    pub use crate::events::SystemEvent;
    pub use crate::publish::{I3barPublisher, PlainPublisher, Publisher};
    pub use crate::registry::EventRegistry;
}
