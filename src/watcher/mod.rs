//! Slide change detection
//!
//! Polls the notes source on a fixed interval and turns raw position reads
//! into session and slide-change events. Transient probe failures read as
//! "no change this tick"; the watcher never dies from a flaky host.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::notes::{NotesSource, SlideSnapshot};

/// Floor for the poll interval; anything lower hammers the host automation
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default poll cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Bounded wait for the poll task to wind down on stop
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// What the watcher observed
#[derive(Debug, Clone)]
pub enum SlideEvent {
    /// The host entered presentation mode
    SessionStarted,
    /// The host left presentation mode (or went away)
    SessionEnded,
    /// The visible slide changed; carries the full snapshot
    SlideChanged(SlideSnapshot),
}

/// Polls a [`NotesSource`] and emits [`SlideEvent`]s
pub struct SlideWatcher {
    source: Arc<dyn NotesSource>,
    interval: Duration,
    shutdown: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl SlideWatcher {
    /// Create a watcher. Intervals below 100ms are clamped up.
    #[must_use]
    pub fn new(source: Arc<dyn NotesSource>, interval: Duration) -> Self {
        let interval = if interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                requested_ms = interval.as_millis(),
                floor_ms = MIN_POLL_INTERVAL.as_millis(),
                "poll interval clamped to floor"
            );
            MIN_POLL_INTERVAL
        } else {
            interval
        };

        Self {
            source,
            interval,
            shutdown: None,
            task: None,
        }
    }

    /// Whether the poll task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Live host probe, independent of the poll loop
    pub async fn host_active(&self) -> bool {
        self.source.probe_active().await
    }

    /// Start polling. Returns the event stream.
    ///
    /// Calling start on a running watcher restarts it.
    pub async fn start(&mut self) -> mpsc::Receiver<SlideEvent> {
        self.stop().await;

        let (event_tx, event_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let source = Arc::clone(&self.source);
        let interval = self.interval;

        self.shutdown = Some(shutdown_tx);
        self.task = Some(tokio::spawn(async move {
            poll_loop(source, interval, event_tx, shutdown_rx).await;
        }));

        tracing::info!(interval_ms = self.interval.as_millis(), "slide watcher started");
        event_rx
    }

    /// Stop polling. Idempotent; waits a bounded time for the task to end
    /// and logs (rather than fails) if it does not.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }

        if let Some(task) = self.task.take() {
            match tokio::time::timeout(STOP_TIMEOUT, task).await {
                Ok(_) => tracing::info!("slide watcher stopped"),
                Err(_) => tracing::warn!(
                    timeout_s = STOP_TIMEOUT.as_secs(),
                    "slide watcher did not stop in time"
                ),
            }
        }
    }
}

/// One poll loop iteration state
struct PollState {
    session_active: bool,
    last_index: Option<usize>,
}

async fn poll_loop(
    source: Arc<dyn NotesSource>,
    interval: Duration,
    events: mpsc::Sender<SlideEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut state = PollState {
        session_active: false,
        last_index: None,
    };

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if tick(&source, &events, &mut state).await.is_err() {
                    // Receiver dropped: nobody is listening anymore
                    tracing::debug!("event receiver gone, poll loop ending");
                    return;
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

/// One poll tick. Errors only when the event channel is closed.
async fn tick(
    source: &Arc<dyn NotesSource>,
    events: &mpsc::Sender<SlideEvent>,
    state: &mut PollState,
) -> std::result::Result<(), mpsc::error::SendError<SlideEvent>> {
    let info = if source.probe_active().await {
        source.current_slide().await
    } else {
        None
    };

    let Some(info) = info.filter(|i| i.is_presenting) else {
        // Host gone or not presenting
        if state.session_active {
            state.session_active = false;
            state.last_index = None;
            tracing::info!("presentation session ended");
            events.send(SlideEvent::SessionEnded).await?;
        }
        return Ok(());
    };

    if !state.session_active {
        state.session_active = true;
        tracing::info!(total_slides = info.total_count, "presentation session started");
        events.send(SlideEvent::SessionStarted).await?;
    }

    if state.last_index == Some(info.index) {
        return Ok(());
    }
    state.last_index = Some(info.index);

    let raw_notes = source.notes_for(info.index).await;
    let content = source.content_for(info.index).await;
    let path = source.path().await;

    match SlideSnapshot::new(info.index, info.title, raw_notes, content, path) {
        Ok(snapshot) => {
            tracing::debug!(index = snapshot.index, title = %snapshot.title, "slide changed");
            events.send(SlideEvent::SlideChanged(snapshot)).await?;
        }
        Err(e) => {
            // Bad snapshot reads as no-change; next tick retries
            tracing::warn!(error = %e, "slide snapshot invalid, skipping");
            state.last_index = None;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::notes::SlideInfo;

    /// Notes source that replays a scripted sequence of poll results.
    /// `None` means "host inactive" for that tick; the final entry repeats.
    struct ScriptedSource {
        script: Mutex<Vec<Option<usize>>>,
        titles: Vec<&'static str>,
    }

    impl ScriptedSource {
        fn new(script: Vec<Option<usize>>, titles: Vec<&'static str>) -> Self {
            Self {
                script: Mutex::new(script),
                titles,
            }
        }

        fn current(&self) -> Option<usize> {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script.first().copied().flatten()
            }
        }
    }

    #[async_trait::async_trait]
    impl NotesSource for ScriptedSource {
        async fn probe_active(&self) -> bool {
            true
        }

        async fn current_slide(&self) -> Option<SlideInfo> {
            let index = self.current()?;
            Some(SlideInfo {
                index,
                title: self.titles.get(index).copied().unwrap_or("untitled").to_string(),
                total_count: self.titles.len(),
                is_presenting: true,
            })
        }

        async fn notes_for(&self, index: usize) -> String {
            format!("[Orik] notes for slide {index}")
        }

        async fn path(&self) -> String {
            "scripted.key".to_string()
        }
    }

    async fn collect_events(
        mut rx: mpsc::Receiver<SlideEvent>,
        count: usize,
    ) -> Vec<SlideEvent> {
        let mut events = Vec::new();
        while events.len() < count {
            match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
                Ok(Some(event)) => events.push(event),
                _ => break,
            }
        }
        events
    }

    #[tokio::test]
    async fn duplicate_polls_emit_one_change() {
        // Polls report 0, 0, 1: expect start, change(0), change(1)
        let source = Arc::new(ScriptedSource::new(
            vec![Some(0), Some(0), Some(1)],
            vec!["Intro", "Agenda"],
        ));
        let mut watcher = SlideWatcher::new(source, Duration::from_millis(100));

        let rx = watcher.start().await;
        let events = collect_events(rx, 3).await;
        watcher.stop().await;

        assert!(matches!(events[0], SlideEvent::SessionStarted));
        let SlideEvent::SlideChanged(first) = &events[1] else {
            panic!("expected slide change, got {:?}", events[1]);
        };
        assert_eq!(first.index, 0);
        let SlideEvent::SlideChanged(second) = &events[2] else {
            panic!("expected slide change, got {:?}", events[2]);
        };
        assert_eq!(second.index, 1);
        assert!(second.raw_notes.contains("slide 1"));
    }

    #[tokio::test]
    async fn session_end_is_detected() {
        let source = Arc::new(ScriptedSource::new(
            vec![Some(0), None, None],
            vec!["Only"],
        ));
        let mut watcher = SlideWatcher::new(source, Duration::from_millis(100));

        let rx = watcher.start().await;
        let events = collect_events(rx, 3).await;
        watcher.stop().await;

        assert!(matches!(events[0], SlideEvent::SessionStarted));
        assert!(matches!(events[1], SlideEvent::SlideChanged(_)));
        assert!(matches!(events[2], SlideEvent::SessionEnded));
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let source = Arc::new(ScriptedSource::new(vec![None], vec![]));
        let mut watcher = SlideWatcher::new(source, Duration::from_millis(100));

        let _rx = watcher.start().await;
        assert!(watcher.is_running());
        watcher.stop().await;
        watcher.stop().await;
        assert!(!watcher.is_running());
    }

    #[test]
    fn interval_is_clamped_to_floor() {
        let source = Arc::new(ScriptedSource::new(vec![None], vec![]));
        let watcher = SlideWatcher::new(source, Duration::from_millis(10));
        assert_eq!(watcher.interval, MIN_POLL_INTERVAL);
    }
}
