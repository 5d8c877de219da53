#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use swvisor::testing::{ManualTimer, MemoryHost, Recorder};
use swvisor::{Event, EventKind, Subscribe, Tracker, TrackerConfig};
use tokio::sync::broadcast;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(2);

pub struct Harness {
    pub host: Arc<MemoryHost>,
    pub timer: ManualTimer,
    pub recorder: Arc<Recorder>,
    pub tracker: Tracker,
    pub events: broadcast::Receiver<Event>,
}

/// Tracker for `script` on `host`, recording every event, driven by a manual timer.
pub fn harness(host: Arc<MemoryHost>, script: &str) -> Harness {
    harness_with(host, script, Vec::new())
}

/// Like [`harness`], with extra subscribers placed before the recorder.
pub fn harness_with(
    host: Arc<MemoryHost>,
    script: &str,
    mut subs: Vec<Arc<dyn Subscribe>>,
) -> Harness {
    let timer = ManualTimer::new();
    let recorder = Arc::new(Recorder::new());
    subs.push(recorder.clone());

    let tracker = Tracker::builder(host.clone(), script)
        .with_config(TrackerConfig::default())
        .with_subscribers(subs)
        .with_timer(Arc::new(timer.clone()))
        .build();
    let events = tracker.events();

    Harness {
        host,
        timer,
        recorder,
        tracker,
        events,
    }
}

/// Waits for the next event of `kind`, skipping others.
pub async fn next_of(events: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    let found = timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) => continue,
                Err(err) => panic!("event bus failed before {kind}: {err}"),
            }
        }
    })
    .await;
    match found {
        Ok(ev) => ev,
        Err(_) => panic!("timed out waiting for {kind}"),
    }
}

pub fn page() -> Arc<MemoryHost> {
    MemoryHost::new("https://example.com/").unwrap()
}
