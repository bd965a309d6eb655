//! Defines the block unit: one independently refreshed fragment of the status line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The display state of a single block, serialized as one i3bar block object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockState {
    pub full_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub urgent: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub separator: bool,
    pub separator_block_width: u32,
}

impl BlockState {
    /// Creates an empty state for a block of the given kind.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            full_text: String::new(),
            short_text: None,
            color: None,
            urgent: false,
            name: name.into(),
            instance: None,
            separator: true,
            separator_block_width: 20,
        }
    }
}

/// Configuration fields shared by every block kind.
///
/// Block kinds flatten this into their own struct, so in the config file
/// these keys sit next to the kind-specific ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockConfigBase {
    /// 1-based position in the status line. Zero or negative disables the block.
    #[serde(default)]
    pub block_index: i64,
    /// Seconds between updates. Zero or negative means the block is never
    /// updated by a timer.
    #[serde(default)]
    pub update_interval: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: Option<String>,
    /// Offset from `SIGRTMIN` that forces an immediate update. Zero disables it;
    /// assembly rejects values outside `0..=MAX_UPDATE_SIGNAL`.
    #[serde(default)]
    pub update_signal: i32,
}

impl BlockConfigBase {
    pub fn new(block_index: i64, update_interval: f64) -> Self {
        Self {
            block_index,
            update_interval,
            ..Default::default()
        }
    }

    /// Writes the outcome of an acquisition into `state`.
    ///
    /// Failures are shown in place of the value; they never reach the scheduler.
    pub fn write_result(&self, state: &mut BlockState, result: anyhow::Result<String>) {
        state.color = self.color.clone();
        state.full_text = match result {
            Ok(text) => format!("{}{}", self.label, text),
            Err(e) => format!("{}{}", self.label, e),
        };
    }
}

/// The uniform capability every configured block exposes to the engine.
///
/// `update` is the block's acquisition routine: it computes fresh text and
/// writes it into the display state. It has no say over refreshing or exiting.
pub trait BlockConfig: fmt::Debug + Send + Sync {
    fn base(&self) -> &BlockConfigBase;

    /// The block kind, used as the i3bar `name`.
    fn kind(&self) -> &'static str;

    fn update(&self, state: &mut BlockState);
}

/// A repeating timer period. Only positive, finite periods can be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSource {
    period: Duration,
}

impl TimerSource {
    /// Returns `None` for non-positive or non-finite intervals, which must
    /// never become a live timer.
    pub fn from_secs_f64(secs: f64) -> Option<Self> {
        if !(secs > 0.0) {
            return None;
        }
        Duration::try_from_secs_f64(secs)
            .ok()
            .filter(|period| !period.is_zero())
            .map(|period| Self { period })
    }

    pub fn from_duration(period: Duration) -> Option<Self> {
        (!period.is_zero()).then_some(Self { period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

/// A configured block placed in the status line.
#[derive(Debug)]
pub struct BlockUnit {
    position: usize,
    pub state: BlockState,
    timer: Option<TimerSource>,
    update_signal: Option<i32>,
    config: Arc<dyn BlockConfig>,
}

impl BlockUnit {
    /// Builds a unit at a 1-based `position`. The timer is only created for
    /// a positive update interval.
    pub(crate) fn new(position: usize, config: Arc<dyn BlockConfig>) -> Self {
        let base = config.base();
        let timer = TimerSource::from_secs_f64(base.update_interval);
        let update_signal = (base.update_signal > 0).then_some(base.update_signal);
        Self {
            position,
            state: BlockState::new(config.kind()),
            timer,
            update_signal,
            config,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Zero-based slot in the ordered unit collection.
    pub fn index(&self) -> usize {
        self.position - 1
    }

    pub fn timer(&self) -> Option<TimerSource> {
        self.timer
    }

    pub fn update_signal(&self) -> Option<i32> {
        self.update_signal
    }

    pub fn kind(&self) -> &'static str {
        self.config.kind()
    }

    pub fn config(&self) -> &dyn BlockConfig {
        self.config.as_ref()
    }

    /// Runs the block's acquisition routine against its own display state.
    pub fn update(&mut self) {
        self.config.update(&mut self.state);
    }
}
