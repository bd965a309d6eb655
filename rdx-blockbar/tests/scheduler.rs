use blockbar::common::SIGRTMIN;
use blockbar::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// A block whose text is the number of times it has been updated.
#[derive(Debug)]
struct Counter {
    base: BlockConfigBase,
    hits: Arc<AtomicU64>,
}

impl BlockConfig for Counter {
    fn base(&self) -> &BlockConfigBase {
        &self.base
    }

    fn kind(&self) -> &'static str {
        "counter"
    }

    fn update(&self, state: &mut BlockState) {
        let hits = self.hits.fetch_add(1, Ordering::SeqCst) + 1;
        state.full_text = hits.to_string();
    }
}

/// Records the `full_text` of every block on every render.
#[derive(Clone, Default)]
struct Recorder {
    renders: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Recorder {
    fn renders(&self) -> Vec<Vec<String>> {
        self.renders.lock().unwrap().clone()
    }
}

impl Publisher for Recorder {
    fn render(&mut self, units: &[BlockUnit]) {
        let line = units.iter().map(|u| u.state.full_text.clone()).collect();
        self.renders.lock().unwrap().push(line);
    }
}

/// Builds units from `(position, interval)` pairs, returning each block's hit counter.
fn counters(specs: &[(i64, f64)]) -> (Vec<BlockUnit>, Vec<Arc<AtomicU64>>) {
    let hits: Vec<_> = specs.iter().map(|_| Arc::new(AtomicU64::new(0))).collect();
    let blocks = specs
        .iter()
        .zip(&hits)
        .map(|(&(position, interval), hits)| {
            Arc::new(Counter {
                base: BlockConfigBase::new(position, interval),
                hits: hits.clone(),
            }) as Arc<dyn BlockConfig>
        })
        .collect();
    let units = assemble(vec![Section::List {
        name: "counters",
        blocks,
    }])
    .unwrap();
    (units, hits)
}

fn secs(secs: f64) -> TimerSource {
    TimerSource::from_duration(Duration::from_secs_f64(secs)).unwrap()
}

/// Polls `renders` until it holds `count` entries.
async fn wait_for_renders(recorder: &Recorder, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while recorder.renders().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test(start_paused = true)]
async fn block_ticks_update_state_without_rendering() {
    let (units, hits) = counters(&[(1, 1.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    engine.on_interval(secs(10.5), actions::exit);

    engine.run().await.unwrap();

    // One initial update plus ticks at 1..=10 seconds.
    assert_eq!(hits[0].load(Ordering::SeqCst), 11);
    assert_eq!(recorder.renders(), vec![vec!["1".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn refresh_renders_the_current_state() {
    let (units, hits) = counters(&[(1, 1.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    let refresh = engine.control(actions::refresh);
    let exit = engine.control(actions::exit);
    let handle = tokio::spawn(engine.run());

    tokio::time::sleep(Duration::from_millis(2500)).await;
    refresh.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    exit.send(()).await.unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(hits[0].load(Ordering::SeqCst), 3);
    assert_eq!(
        recorder.renders(),
        vec![vec!["1".to_string()], vec!["3".to_string()]]
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_requests_are_never_deduplicated() {
    let (units, _hits) = counters(&[(1, 0.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    let refresh = engine.control(actions::refresh);
    let exit = engine.control(actions::exit);
    let handle = tokio::spawn(engine.run());

    tokio::time::sleep(Duration::from_millis(10)).await;
    refresh.send(()).await.unwrap();
    refresh.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    exit.send(()).await.unwrap();
    handle.await.unwrap().unwrap();

    let renders = recorder.renders();
    assert_eq!(renders.len(), 3);
    assert!(renders.iter().all(|line| line == &vec!["1".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn exit_stops_the_loop_and_releases_every_source() {
    let (units, _hits) = counters(&[(1, 1.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    let log = Arc::new(Mutex::new(Vec::new()));

    let busy = {
        let log = log.clone();
        engine.control(move |_| {
            log.lock().unwrap().push("busy");
            Verdict::REFRESH
        })
    };
    let exit = {
        let log = log.clone();
        engine.control(move |_| {
            log.lock().unwrap().push("exit");
            Verdict { refresh: true, exit: true }
        })
    };
    let mut events = engine.subscribe_system_events();

    for _ in 0..3 {
        busy.try_send(()).unwrap();
    }
    exit.try_send(()).unwrap();
    engine.run().await.unwrap();

    let log = log.lock().unwrap().clone();
    assert_eq!(log.last(), Some(&"exit"));
    assert_eq!(log.iter().filter(|entry| **entry == "exit").count(), 1);
    // The refresh half of an exit verdict is ignored.
    let busy_runs = log.iter().filter(|entry| **entry == "busy").count();
    assert_eq!(recorder.renders().len(), 1 + busy_runs);

    assert!(busy.is_closed());
    assert!(exit.is_closed());

    let mut released = None;
    while let Ok(event) = events.try_recv() {
        if let SystemEvent::EngineShutdown { released: count } = event {
            released = Some(count);
        }
    }
    // The block timer and both control channels.
    assert_eq!(released, Some(3));
}

#[tokio::test(start_paused = true)]
async fn non_positive_intervals_never_tick() {
    let (units, hits) = counters(&[(1, 0.0), (2, -1.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    assert!(engine.registry().is_empty());

    engine.on_interval(secs(1.0), actions::refresh);
    engine.on_interval(secs(5.5), actions::exit);
    engine.run().await.unwrap();

    assert_eq!(hits[0].load(Ordering::SeqCst), 1);
    assert_eq!(hits[1].load(Ordering::SeqCst), 1);
    let renders = recorder.renders();
    assert_eq!(renders.len(), 6);
    assert!(renders
        .iter()
        .all(|line| line == &vec!["1".to_string(), "1".to_string()]));
}

#[tokio::test(start_paused = true)]
async fn global_refresh_publishes_each_tick_with_current_counters() {
    const TICKS: usize = 5;
    let (units, hits) = counters(&[(1, 1.0), (2, 1000.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    engine.on_interval(secs(1.0), actions::refresh);
    engine.on_interval(secs(TICKS as f64 + 0.5), actions::exit);

    engine.run().await.unwrap();

    let renders = recorder.renders();
    assert_eq!(renders.len(), 1 + TICKS);
    assert_eq!(renders[0], vec!["1".to_string(), "1".to_string()]);

    let mut last = 1;
    for (tick, line) in renders.iter().enumerate().skip(1) {
        // Block A and the refresh tick share a deadline, so this render saw
        // either `tick - 1` or `tick` of A's ticks on top of the initial update.
        let a: usize = line[0].parse().unwrap();
        assert!(a == tick || a == tick + 1, "render {tick} saw A = {a}");
        assert!(a >= last);
        last = a;
        assert_eq!(line[1], "1");
    }
    assert_eq!(hits[0].load(Ordering::SeqCst), 1 + TICKS as u64);
    assert_eq!(hits[1].load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn control_block_forces_an_update_and_a_render() {
    let (units, hits) = counters(&[(1, 0.0), (2, 0.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    assert!(engine.control_block(0).is_none());
    assert!(engine.control_block(3).is_none());
    let second = engine.control_block(2).unwrap();
    let exit = engine.control(actions::exit);
    let handle = tokio::spawn(engine.run());

    tokio::time::sleep(Duration::from_millis(10)).await;
    second.send(()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    exit.send(()).await.unwrap();
    handle.await.unwrap().unwrap();

    assert_eq!(hits[0].load(Ordering::SeqCst), 1);
    assert_eq!(hits[1].load(Ordering::SeqCst), 2);
    assert_eq!(
        recorder.renders().last().unwrap(),
        &vec!["1".to_string(), "2".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn actions_receive_their_owning_block() {
    let (units, _hits) = counters(&[(1, 0.0), (2, 0.0)]);
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    let (tx, rx) = mpsc::channel(1);
    engine.registry_mut().add(
        Source::Channel(rx),
        |unit| match unit {
            Some(unit) => {
                unit.state.full_text = format!("owned by #{}", unit.position());
                Verdict::EXIT
            }
            None => panic!("owner missing"),
        },
        Some(1),
    );
    tx.send(()).await.unwrap();

    engine.run().await.unwrap();
    assert_eq!(recorder.renders().len(), 1);
}

#[tokio::test]
async fn running_out_of_sources_is_an_error() {
    let (units, _hits) = counters(&[(1, 0.0)]);
    let mut engine = BlockbarEngine::new(units, Recorder::default());
    drop(engine.control(actions::refresh));
    let mut events = engine.subscribe_system_events();

    let err = engine.run().await.unwrap_err();
    assert!(err.to_string().contains("every event source closed"));

    let mut closed = 0;
    let mut released = None;
    while let Ok(event) = events.try_recv() {
        match event {
            SystemEvent::SourceClosed { .. } => closed += 1,
            SystemEvent::EngineShutdown { released: count } => released = Some(count),
            _ => {}
        }
    }
    assert_eq!(closed, 1);
    assert_eq!(released, Some(0));
}

#[tokio::test]
async fn update_signal_forces_an_update_and_a_render() {
    const OFFSET: i32 = 3;
    let hits = Arc::new(AtomicU64::new(0));
    let mut base = BlockConfigBase::new(1, 0.0);
    base.update_signal = OFFSET;
    let units = assemble(vec![Section::Single {
        name: "counter",
        block: Arc::new(Counter {
            base,
            hits: hits.clone(),
        }),
    }])
    .unwrap();
    let recorder = Recorder::default();
    let mut engine = BlockbarEngine::new(units, recorder.clone());
    assert_eq!(engine.registry().len(), 1);
    let exit = engine.control(actions::exit);
    let handle = tokio::spawn(engine.run());

    // Sources are armed before the initial render goes out.
    wait_for_renders(&recorder, 1).await;
    let status = std::process::Command::new("kill")
        .args([
            "-s",
            &(SIGRTMIN + OFFSET).to_string(),
            &std::process::id().to_string(),
        ])
        .status()
        .unwrap();
    assert!(status.success());
    wait_for_renders(&recorder, 2).await;

    exit.send(()).await.unwrap();
    handle.await.unwrap().unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(
        recorder.renders(),
        vec![vec!["1".to_string()], vec!["2".to_string()]]
    );
}
