//! Defines the readiness sources the scheduler waits on, and the waiter itself.
//!
//! Sources are registered as inert descriptors and only become live when the
//! registry is armed inside the runtime. The live set is polled as a single
//! future that yields exactly one ready source per wakeup.

use crate::common::SourceId;
use crate::components::block::TimerSource;
use std::fmt;
use std::future::poll_fn;
use std::io;
use std::task::{Context, Poll};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Something that becomes ready, possibly many times.
pub enum Source {
    /// A repeating timer. The first firing happens one period after arming.
    Timer(TimerSource),
    /// An asynchronous OS signal.
    Signal(SignalKind),
    /// A control channel; every `()` sent makes the source ready once.
    Channel(mpsc::Receiver<()>),
}

impl Source {
    pub(crate) fn arm(self) -> io::Result<LiveSource> {
        Ok(match self {
            Source::Timer(timer) => {
                let period = timer.period();
                let mut interval = interval_at(Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                LiveSource::Timer(interval)
            }
            Source::Signal(kind) => LiveSource::Signal(signal(kind)?),
            Source::Channel(rx) => LiveSource::Channel(rx),
        })
    }
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Timer(timer) => write!(f, "Timer({:?})", timer.period()),
            Source::Signal(kind) => write!(f, "Signal({})", kind.as_raw_value()),
            Source::Channel(_) => write!(f, "Channel"),
        }
    }
}

impl From<TimerSource> for Source {
    fn from(timer: TimerSource) -> Self {
        Source::Timer(timer)
    }
}

#[doc(hidden)]
pub(crate) enum LiveSource {
    Timer(Interval),
    Signal(Signal),
    Channel(mpsc::Receiver<()>),
}

impl LiveSource {
    /// `Ready(false)` means the source can never fire again.
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<bool> {
        match self {
            LiveSource::Timer(interval) => interval.poll_tick(cx).map(|_| true),
            LiveSource::Signal(signal) => signal.poll_recv(cx).map(|r| r.is_some()),
            LiveSource::Channel(rx) => rx.poll_recv(cx).map(|r| r.is_some()),
        }
    }
}

/// The multiplexed wait over every armed source.
///
/// Polling resumes after the last serviced entry, so sources that are ready
/// at the same time are each serviced in turn. No other ordering is promised.
pub struct WaitSet {
    live: Vec<(SourceId, LiveSource)>,
    cursor: usize,
    closed: Vec<SourceId>,
}

impl WaitSet {
    pub(crate) fn new(live: Vec<(SourceId, LiveSource)>) -> Self {
        Self {
            live,
            cursor: 0,
            closed: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Suspends until one source is ready and returns its id.
    ///
    /// Returns `None` once every source has closed.
    pub async fn next_ready(&mut self) -> Option<SourceId> {
        poll_fn(|cx| self.poll_next_ready(cx)).await
    }

    fn poll_next_ready(&mut self, cx: &mut Context<'_>) -> Poll<Option<SourceId>> {
        let count = self.live.len();
        if count == 0 {
            return Poll::Ready(None);
        }
        let start = self.cursor % count;
        let mut fired = None;
        let mut closed = Vec::new();
        for offset in 0..count {
            let slot = (start + offset) % count;
            let (id, source) = &mut self.live[slot];
            match source.poll_ready(cx) {
                Poll::Ready(true) => {
                    fired = Some((slot, *id));
                    break;
                }
                Poll::Ready(false) => closed.push(slot),
                Poll::Pending => {}
            }
        }

        if let Some((slot, _)) = fired {
            self.cursor = slot + 1;
        }
        closed.sort_unstable_by(|a, b| b.cmp(a));
        for slot in closed {
            let (id, _) = self.live.remove(slot);
            debug!("Source {:?} closed and left the wait set.", id);
            self.closed.push(id);
        }

        match fired {
            Some((_, id)) => Poll::Ready(Some(id)),
            None if self.live.is_empty() => Poll::Ready(None),
            None => Poll::Pending,
        }
    }

    /// Ids of sources that closed since the last call.
    pub fn take_closed(&mut self) -> Vec<SourceId> {
        std::mem::take(&mut self.closed)
    }

    /// Stops every timer, unregisters every signal stream and closes every
    /// channel. Returns how many sources were released.
    pub fn release(self) -> usize {
        let released = self.live.len();
        debug!("Releasing {} event sources.", released);
        drop(self.live);
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;
    use std::time::Duration;

    fn ids(n: usize) -> Vec<SourceId> {
        let mut map: SlotMap<SourceId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_one_period_after_arming() {
        let id = ids(1)[0];
        let timer = TimerSource::from_secs_f64(2.0).unwrap();
        let mut set = WaitSet::new(vec![(id, Source::from(timer).arm().unwrap())]);

        let start = Instant::now();
        assert_eq!(set.next_ready().await, Some(id));
        let first = start.elapsed();
        assert!(first >= Duration::from_secs(2) && first < Duration::from_secs(3));
        assert_eq!(set.next_ready().await, Some(id));
        let second = start.elapsed();
        assert!(second >= Duration::from_secs(4) && second < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn simultaneously_ready_sources_are_each_serviced() {
        let all = ids(3);
        let mut senders = Vec::new();
        let mut live = Vec::new();
        for id in &all {
            let (tx, rx) = mpsc::channel(4);
            tx.send(()).await.unwrap();
            senders.push(tx);
            live.push((*id, Source::Channel(rx).arm().unwrap()));
        }
        let mut set = WaitSet::new(live);

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(set.next_ready().await.unwrap());
        }
        seen.sort();
        let mut expected = all.clone();
        expected.sort();
        assert_eq!(seen, expected);
    }

    #[tokio::test]
    async fn closed_channels_leave_the_set() {
        let all = ids(2);
        let (open_tx, open_rx) = mpsc::channel(1);
        let (closed_tx, closed_rx) = mpsc::channel::<()>(1);
        drop(closed_tx);
        let mut set = WaitSet::new(vec![
            (all[0], Source::Channel(closed_rx).arm().unwrap()),
            (all[1], Source::Channel(open_rx).arm().unwrap()),
        ]);

        open_tx.send(()).await.unwrap();
        assert_eq!(set.next_ready().await, Some(all[1]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.take_closed(), vec![all[0]]);
        assert!(set.take_closed().is_empty());

        drop(open_tx);
        assert_eq!(set.next_ready().await, None);
        assert!(set.is_empty());
        assert_eq!(set.take_closed(), vec![all[1]]);
    }

    #[tokio::test]
    async fn release_closes_channels() {
        let id = ids(1)[0];
        let (tx, rx) = mpsc::channel::<()>(1);
        let set = WaitSet::new(vec![(id, Source::Channel(rx).arm().unwrap())]);
        assert!(!tx.is_closed());
        assert_eq!(set.release(), 1);
        assert!(tx.is_closed());
    }
}
