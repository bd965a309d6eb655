//! Defines the events the Blockbar engine broadcasts about itself.
//!
//! Nothing in the scheduler depends on these being received. They exist so
//! shells, tests and other observers can follow the loop without touching it.

use crate::common::SourceId;
use tokio::time::Instant;

/// Events related to the lifecycle and activity of the engine.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once all sources are armed and the initial render went out.
    EngineStarted { timestamp: Instant, sources: usize },
    /// Fired after a source became ready and its action ran.
    SourceFired { id: SourceId, owner: Option<usize> },
    /// Fired when a source can never become ready again and left the wait set.
    SourceClosed { id: SourceId },
    /// Fired after every render, with the `full_text` of each block in order.
    Rendered { fragments: Vec<String> },
    /// Fired once when the engine's `run` loop has released its sources.
    EngineShutdown { released: usize },
}
