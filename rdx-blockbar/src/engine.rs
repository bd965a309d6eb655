//! The core engine that runs the Blockbar scheduler loop.

use crate::actions::{self, Verdict};
use crate::common::SourceId;
use crate::components::block::{BlockUnit, TimerSource};
use crate::components::source::Source;
use crate::events::SystemEvent;
use crate::publish::Publisher;
use crate::registry::EventRegistry;
use tokio::signal::unix::SignalKind;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, trace};

const CONTROL_CAPACITY: usize = 8;

/// The main Blockbar engine.
///
/// It owns the ordered block units, the event registry and the publisher.
/// Everything runs on the task that calls `run`, one action at a time, so
/// block state needs no locking.
pub struct BlockbarEngine {
    units: Vec<BlockUnit>,
    registry: EventRegistry,
    publisher: Box<dyn Publisher>,
    system_event_sender: broadcast::Sender<SystemEvent>,
}

// Core implementation block for the scheduler loop.
impl BlockbarEngine {
    /// Creates a new engine and registers every block's timer and update signal.
    pub fn new(units: Vec<BlockUnit>, publisher: impl Publisher + 'static) -> Self {
        let (system_event_sender, _) = broadcast::channel(64);
        let mut registry = EventRegistry::new();
        registry.add_blocks(&units);
        Self {
            units,
            registry,
            publisher: Box::new(publisher),
            system_event_sender,
        }
    }

    /// Runs the scheduler until an action asks to exit.
    ///
    /// This method will:
    /// 1. Arm every registered source.
    /// 2. Update every block once and publish the initial render.
    /// 3. Wait for one ready source at a time and act on its verdict.
    /// 4. Release every source before returning.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            "BlockbarEngine starting up with {} blocks and {} sources...",
            self.units.len(),
            self.registry.len()
        );
        let mut wait_set = self.registry.arm()?;

        for unit in self.units.iter_mut() {
            unit.update();
        }
        self.publish();
        self.system_event_sender
            .send(SystemEvent::EngineStarted {
                timestamp: tokio::time::Instant::now(),
                sources: wait_set.len(),
            })
            .ok();

        let outcome = loop {
            let ready = wait_set.next_ready().await;
            for id in wait_set.take_closed() {
                self.system_event_sender
                    .send(SystemEvent::SourceClosed { id })
                    .ok();
            }
            let Some(id) = ready else {
                break Err(anyhow::anyhow!("every event source closed; nothing left to wait on"));
            };
            let verdict = self.dispatch(id);
            if verdict.exit {
                info!("Exit requested by source {:?}.", id);
                break Ok(());
            }
            if verdict.refresh {
                self.publish();
            }
        };

        let released = wait_set.release();
        self.system_event_sender
            .send(SystemEvent::EngineShutdown { released })
            .ok();
        match &outcome {
            Ok(()) => info!("BlockbarEngine has shut down."),
            Err(e) => error!("BlockbarEngine stopped: {}", e),
        }
        outcome
    }

    #[doc(hidden)]
    fn dispatch(&mut self, id: SourceId) -> Verdict {
        let verdict = self.registry.dispatch(id, &mut self.units);
        trace!("Source {:?} fired: {:?}", id, verdict);
        self.system_event_sender
            .send(SystemEvent::SourceFired {
                id,
                owner: self.registry.owner_of(id),
            })
            .ok();
        verdict
    }

    #[doc(hidden)]
    fn publish(&mut self) {
        self.publisher.render(&self.units);
        if self.system_event_sender.receiver_count() > 0 {
            let fragments = self
                .units
                .iter()
                .map(|unit| unit.state.full_text.clone())
                .collect();
            self.system_event_sender
                .send(SystemEvent::Rendered { fragments })
                .ok();
        }
    }
}

// Public registration API.
impl BlockbarEngine {
    /// Registers an action to run every time `timer` elapses.
    pub fn on_interval(
        &mut self,
        timer: TimerSource,
        action: impl FnMut(Option<&mut BlockUnit>) -> Verdict + Send + 'static,
    ) -> SourceId {
        self.registry.add_external(Source::Timer(timer), action)
    }

    /// Registers an action to run every time the OS delivers `kind`.
    pub fn on_signal(
        &mut self,
        kind: SignalKind,
        action: impl FnMut(Option<&mut BlockUnit>) -> Verdict + Send + 'static,
    ) -> SourceId {
        self.registry.add_external(Source::Signal(kind), action)
    }

    /// Opens a control channel. Every `()` sent on the returned sender runs
    /// `action` once.
    pub fn control(
        &mut self,
        action: impl FnMut(Option<&mut BlockUnit>) -> Verdict + Send + 'static,
    ) -> mpsc::Sender<()> {
        let (tx, rx) = mpsc::channel(CONTROL_CAPACITY);
        self.registry.add_external(Source::Channel(rx), action);
        tx
    }

    /// Opens a control channel that forces an update of the block at the
    /// 1-based `position` and publishes it. `None` if no block sits there.
    pub fn control_block(&mut self, position: usize) -> Option<mpsc::Sender<()>> {
        let index = position.checked_sub(1)?;
        self.units.get(index)?;
        let (tx, rx) = mpsc::channel(CONTROL_CAPACITY);
        self.registry
            .add(Source::Channel(rx), actions::update_and_refresh, Some(index));
        Some(tx)
    }

    pub fn units(&self) -> &[BlockUnit] {
        &self.units
    }

    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut EventRegistry {
        &mut self.registry
    }

    /// Subscribes to the `SystemEvent` stream.
    pub fn subscribe_system_events(&self) -> broadcast::Receiver<SystemEvent> {
        self.system_event_sender.subscribe()
    }
}
