//! The event registry: every source the scheduler waits on, with its action.

use crate::actions::{self, Action, Verdict};
use crate::common::{SourceId, SIGRTMIN};
use crate::components::block::BlockUnit;
use crate::components::source::{Source, WaitSet};
use anyhow::Context;
use slotmap::SlotMap;
use tokio::signal::unix::SignalKind;
use tracing::{debug, warn};

#[doc(hidden)]
struct Entry {
    /// Taken when the registry is armed.
    source: Option<Source>,
    action: Action,
    /// Zero-based index of the owning block.
    owner: Option<usize>,
}

/// An append-ordered collection of event sources and their actions.
///
/// The registry does not validate what it is given. It never fails on
/// insertion; arming is the first point where a bad source can surface.
#[derive(Default)]
pub struct EventRegistry {
    entries: SlotMap<SourceId, Entry>,
    order: Vec<SourceId>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one source with its action and optional owning block index.
    pub fn add(
        &mut self,
        source: Source,
        action: impl FnMut(Option<&mut BlockUnit>) -> Verdict + Send + 'static,
        owner: Option<usize>,
    ) -> SourceId {
        debug!("Registering {:?} (owner: {:?}).", source, owner);
        let id = self.entries.insert(Entry {
            source: Some(source),
            action: Box::new(action),
            owner,
        });
        self.order.push(id);
        id
    }

    /// Registers a block's timer. The action runs the block's update routine
    /// and never asks for a refresh.
    ///
    /// Blocks without a timer (non-positive interval) are not registered.
    pub fn add_for_block(&mut self, unit: &BlockUnit) -> Option<SourceId> {
        let Some(timer) = unit.timer() else {
            debug!(
                "Block #{} ({}) has no update interval; no timer registered.",
                unit.position(),
                unit.kind()
            );
            return None;
        };
        Some(self.add(Source::Timer(timer), actions::update, Some(unit.index())))
    }

    /// Registers a block's update signal (`SIGRTMIN + n`), if it has one.
    /// The action updates the block and refreshes immediately.
    pub fn add_for_block_signal(&mut self, unit: &BlockUnit) -> Option<SourceId> {
        let offset = unit.update_signal()?;
        let Some(raw) = SIGRTMIN.checked_add(offset) else {
            warn!(
                "Block #{} has an unusable update signal offset {}; not registered.",
                unit.position(),
                offset
            );
            return None;
        };
        let kind = SignalKind::from_raw(raw);
        Some(self.add(
            Source::Signal(kind),
            actions::update_and_refresh,
            Some(unit.index()),
        ))
    }

    /// Registers the timer and update signal of every block.
    pub fn add_blocks(&mut self, units: &[BlockUnit]) {
        for unit in units {
            self.add_for_block(unit);
            self.add_for_block_signal(unit);
        }
    }

    /// Registers a source that belongs to no block, such as a signal or a
    /// control channel.
    pub fn add_external(
        &mut self,
        source: Source,
        action: impl FnMut(Option<&mut BlockUnit>) -> Verdict + Send + 'static,
    ) -> SourceId {
        self.add(source, action, None)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.order.iter().copied()
    }

    pub fn owner_of(&self, id: SourceId) -> Option<usize> {
        self.entries.get(id).and_then(|entry| entry.owner)
    }

    /// Makes every registered source live and gathers them into one waiter.
    ///
    /// Must run inside the tokio runtime. Sources can only be armed once.
    pub fn arm(&mut self) -> anyhow::Result<WaitSet> {
        let mut live = Vec::with_capacity(self.order.len());
        for &id in &self.order {
            let Some(entry) = self.entries.get_mut(id) else {
                continue;
            };
            let Some(source) = entry.source.take() else {
                warn!("Source {:?} was already armed; skipping.", id);
                continue;
            };
            let description = format!("{:?}", source);
            let armed = source
                .arm()
                .with_context(|| format!("failed to arm event source {}", description))?;
            live.push((id, armed));
        }
        Ok(WaitSet::new(live))
    }

    /// Runs the action bound to `id` against its owning block.
    pub fn dispatch(&mut self, id: SourceId, units: &mut [BlockUnit]) -> Verdict {
        let Some(entry) = self.entries.get_mut(id) else {
            warn!("Dispatch for unknown source {:?}; ignoring.", id);
            return Verdict::IDLE;
        };
        let owner = entry.owner.and_then(|index| units.get_mut(index));
        (entry.action)(owner)
    }
}
