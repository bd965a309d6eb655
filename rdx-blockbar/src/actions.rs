//! The verdict an action hands back to the scheduler, and the stock actions.

use crate::components::block::BlockUnit;

/// What the scheduler should do after an action ran.
///
/// `exit` wins over `refresh`: once exiting, nothing is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verdict {
    pub refresh: bool,
    pub exit: bool,
}

impl Verdict {
    /// Keep running, publish nothing.
    pub const IDLE: Verdict = Verdict {
        refresh: false,
        exit: false,
    };
    /// Keep running and publish the current state of every block.
    pub const REFRESH: Verdict = Verdict {
        refresh: true,
        exit: false,
    };
    /// Stop the scheduler.
    pub const EXIT: Verdict = Verdict {
        refresh: false,
        exit: true,
    };
}

/// A type-erased action bound to one registered source.
///
/// It receives the owning block when the source has one.
pub type Action = Box<dyn FnMut(Option<&mut BlockUnit>) -> Verdict + Send>;

/// Always refresh, never exit. Suited to a global redraw tick or a
/// user-requested refresh signal.
pub fn refresh(_unit: Option<&mut BlockUnit>) -> Verdict {
    Verdict::REFRESH
}

/// Never refresh, always exit. Suited to termination signals.
pub fn exit(_unit: Option<&mut BlockUnit>) -> Verdict {
    Verdict::EXIT
}

/// Updates the owning block, if any, without publishing.
///
/// This is what a block's own timer runs.
pub fn update(unit: Option<&mut BlockUnit>) -> Verdict {
    if let Some(unit) = unit {
        unit.update();
    }
    Verdict::IDLE
}

/// Updates the owning block, if any, and publishes right away.
///
/// Used for out-of-cycle updates (update signals, shell commands) where the
/// change should be visible before the next global refresh.
pub fn update_and_refresh(unit: Option<&mut BlockUnit>) -> Verdict {
    update(unit);
    Verdict::REFRESH
}
