//! Pipeline orchestration
//!
//! [`Cohost`] wires the watcher, policy, and audio dispatcher together,
//! owns the system status, and fans events out to registered observers.
//! Component failures degrade the status; only a total connection failure
//! at startup is fatal.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::audio::{AudioCache, AudioDispatcher, AudioSink, PlaybackStatus};
use crate::connector::{ToolConnector, connect_all};
use crate::digs::DigLineSource;
use crate::notes::{NotesSource, SlideSnapshot, tags};
use crate::policy::{PersonalityConfig, ResponseKind, ResponsePolicy, ResponseRecord, Speech};
use crate::speech::{SpeechSource, VoiceProfile};
use crate::status::{StatusObserver, SystemStatus};
use crate::watcher::{DEFAULT_POLL_INTERVAL, SlideEvent, SlideWatcher};
use crate::{Error, Result};

/// Responses kept for inspection
const HISTORY_CAP: usize = 10;

/// Lines used when a forced response cannot be produced normally
const FORCE_FALLBACKS: &[&str] = &[
    "Well, this is awkward... my wit generator appears to be broken.",
    "Oh, you want me to improvise now? Give me a second.",
    "Even I need a moment to process whatever that was.",
];

/// Source path recorded on manually forced responses
const MANUAL_SOURCE: &str = "manual";

/// Shared state the background tasks work against
struct Inner {
    dispatcher: AudioDispatcher,
    policy: ResponsePolicy,
    personality: RwLock<PersonalityConfig>,
    voice: RwLock<VoiceProfile>,
    history: Mutex<VecDeque<ResponseRecord>>,
    status: Mutex<SystemStatus>,
    observers: RwLock<Vec<Arc<dyn StatusObserver>>>,
    digs: Arc<dyn DigLineSource>,
    current_slide: Mutex<Option<SlideSnapshot>>,
}

impl Inner {
    fn notify_status(&self) {
        let status = lock(&self.status).clone();
        for observer in read(&self.observers).iter() {
            observer.on_status_changed(&status);
        }
    }

    fn notify_error(&self, message: &str) {
        for observer in read(&self.observers).iter() {
            observer.on_error(message);
        }
    }

    fn notify_speaking(&self, speaking: bool) {
        for observer in read(&self.observers).iter() {
            observer.on_speaking_changed(speaking);
        }
    }

    fn push_history(&self, record: ResponseRecord) {
        let mut history = lock(&self.history);
        if history.len() == HISTORY_CAP {
            history.pop_front();
        }
        history.push_back(record);
    }

    /// Decide and (if spoken) queue a response for one slide
    fn respond_to_slide(&self, snapshot: &SlideSnapshot) {
        let spans = tags::extract(&snapshot.raw_notes);
        let context = snapshot.content.as_deref().unwrap_or(&snapshot.title);

        let personality = read(&self.personality).clone();
        let record = self.policy.decide(&spans, Some(context), &personality);

        tracing::debug!(
            slide = snapshot.index,
            kind = ?record.kind,
            confidence = record.confidence,
            speech = %record.speech,
            "response decided"
        );

        if let Speech::Spoken(text) = &record.speech {
            if record.confidence > 0.0 {
                let voice = read(&self.voice).clone();
                self.dispatcher.enqueue(text.clone(), voice);
            }
        }

        self.push_history(record);
        lock(&self.status).touch();
    }

    fn handle_event(&self, event: SlideEvent) {
        match event {
            SlideEvent::SessionStarted => {
                tracing::info!("presentation started, clearing response history");
                lock(&self.history).clear();
                self.digs.reset_history();
                lock(&self.status).touch();
            }
            SlideEvent::SessionEnded => {
                tracing::info!("presentation ended, stopping playback");
                self.dispatcher.stop();
                *lock(&self.current_slide) = None;
                lock(&self.status).touch();
            }
            SlideEvent::SlideChanged(snapshot) => {
                self.respond_to_slide(&snapshot);
                *lock(&self.current_slide) = Some(snapshot);
            }
        }
        self.notify_status();
    }
}

/// The presentation co-host
pub struct Cohost {
    inner: Arc<Inner>,
    source: Arc<dyn NotesSource>,
    watcher: tokio::sync::Mutex<SlideWatcher>,
    connectors: HashMap<String, Arc<ToolConnector>>,
    event_task: Mutex<Option<JoinHandle<()>>>,
    speaking_task: Mutex<Option<JoinHandle<()>>>,
}

/// Builds a [`Cohost`] from its collaborators
pub struct CohostBuilder {
    source: Arc<dyn NotesSource>,
    speech: Arc<dyn SpeechSource>,
    sink: Arc<dyn AudioSink>,
    cache: AudioCache,
    digs: Arc<dyn DigLineSource>,
    personality: PersonalityConfig,
    voice: VoiceProfile,
    poll_interval: Duration,
    connectors: HashMap<String, Arc<ToolConnector>>,
    observers: Vec<Arc<dyn StatusObserver>>,
}

impl CohostBuilder {
    #[must_use]
    pub fn new(
        source: Arc<dyn NotesSource>,
        speech: Arc<dyn SpeechSource>,
        sink: Arc<dyn AudioSink>,
        cache: AudioCache,
        digs: Arc<dyn DigLineSource>,
    ) -> Self {
        Self {
            source,
            speech,
            sink,
            cache,
            digs,
            personality: PersonalityConfig::default(),
            voice: VoiceProfile::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            connectors: HashMap::new(),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn personality(mut self, personality: PersonalityConfig) -> Self {
        self.personality = personality;
        self
    }

    #[must_use]
    pub fn voice(mut self, voice: VoiceProfile) -> Self {
        self.voice = voice;
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Register an external tool under a role name (e.g. `"speech"`)
    #[must_use]
    pub fn connector(mut self, role: impl Into<String>, connector: Arc<ToolConnector>) -> Self {
        self.connectors.insert(role.into(), connector);
        self
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn StatusObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the co-host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if the voice profile fails validation.
    pub fn build(self) -> Result<Cohost> {
        self.voice.validate()?;

        let dispatcher = AudioDispatcher::new(self.speech, self.sink, self.cache);
        let policy = ResponsePolicy::new(Arc::clone(&self.digs));

        let inner = Arc::new(Inner {
            dispatcher,
            policy,
            personality: RwLock::new(self.personality),
            voice: RwLock::new(self.voice),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAP)),
            status: Mutex::new(SystemStatus::default()),
            observers: RwLock::new(self.observers),
            digs: self.digs,
            current_slide: Mutex::new(None),
        });

        Ok(Cohost {
            inner,
            watcher: tokio::sync::Mutex::new(SlideWatcher::new(
                Arc::clone(&self.source),
                self.poll_interval,
            )),
            source: self.source,
            connectors: self.connectors,
            event_task: Mutex::new(None),
            speaking_task: Mutex::new(None),
        })
    }
}

impl Cohost {
    /// Bring the whole pipeline up.
    ///
    /// Connects registered tools concurrently (fatal only if every one
    /// fails), starts the dispatcher and the slide watcher, and begins
    /// consuming slide events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connector`] when no registered tool connects.
    pub async fn start(&self) -> Result<()> {
        if !self.connectors.is_empty() {
            let connectors: Vec<Arc<ToolConnector>> =
                self.connectors.values().map(Arc::clone).collect();
            connect_all(&connectors).await?;
        }

        self.inner.dispatcher.start();

        let events = self.watcher.lock().await.start().await;
        let inner = Arc::clone(&self.inner);
        *lock(&self.event_task) = Some(tokio::spawn(async move {
            let mut events = events;
            while let Some(event) = events.recv().await {
                inner.handle_event(event);
            }
            tracing::debug!("event loop ended");
        }));

        let inner = Arc::clone(&self.inner);
        let mut playback = self.inner.dispatcher.subscribe();
        *lock(&self.speaking_task) = Some(tokio::spawn(async move {
            let mut was_speaking = false;
            while playback.changed().await.is_ok() {
                let status = playback.borrow_and_update().clone();
                let speaking = status == PlaybackStatus::Playing;
                if speaking != was_speaking {
                    was_speaking = speaking;
                    inner.notify_speaking(speaking);
                }
                if let PlaybackStatus::Error(message) = status {
                    lock(&inner.status).error = Some(message.clone());
                    inner.notify_error(&message);
                    inner.notify_status();
                }
            }
        }));

        self.refresh_status().await;
        tracing::info!("co-host started");
        Ok(())
    }

    /// Start only the audio pipeline, without slide monitoring.
    ///
    /// Useful for one-shot speech (forced responses from the CLI).
    pub fn start_audio(&self) {
        self.inner.dispatcher.start();
    }

    /// Wait until nothing is queued or playing
    pub async fn drain_audio(&self) {
        // Two consecutive idle reads, so a just-popped item that hasn't
        // flipped the status to Playing yet doesn't read as drained
        let mut idle_reads = 0;
        while idle_reads < 2 {
            let idle = self.inner.dispatcher.queue_len() == 0
                && !matches!(self.inner.dispatcher.status(), PlaybackStatus::Playing);
            idle_reads = if idle { idle_reads + 1 } else { 0 };
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Wind everything down: watcher first, then tools, then audio.
    /// Idempotent.
    pub async fn stop(&self) {
        self.watcher.lock().await.stop().await;

        for connector in self.connectors.values() {
            connector.disconnect().await;
        }

        self.inner.dispatcher.shutdown().await;

        let tasks = [lock(&self.event_task).take(), lock(&self.speaking_task).take()];
        for task in tasks.into_iter().flatten() {
            task.abort();
        }

        {
            let mut status = lock(&self.inner.status);
            status.monitoring = false;
            status.playback_ready = false;
        }
        self.inner.notify_status();
        tracing::info!("co-host stopped");
    }

    /// Make Orik respond to a prompt right now, outside the slide flow.
    ///
    /// Never fails: when the normal path produces nothing speakable, a
    /// canned fallback is used instead.
    pub async fn force_response(&self, prompt: &str) -> ResponseRecord {
        let record = match SlideSnapshot::new(
            0,
            "forced",
            format!("[Orik] {prompt}"),
            None,
            MANUAL_SOURCE,
        ) {
            Ok(snapshot) => {
                let spans = tags::extract(&snapshot.raw_notes);
                let personality = read(&self.inner.personality).clone();
                self.inner.policy.decide(&spans, None, &personality)
            }
            Err(e) => {
                tracing::warn!(error = %e, "forced response snapshot invalid");
                ResponseRecord::silent()
            }
        };

        let record = if record.speech.is_silent() {
            let line = FORCE_FALLBACKS[rand::Rng::gen_range(
                &mut rand::thread_rng(),
                0..FORCE_FALLBACKS.len(),
            )];
            ResponseRecord {
                speech: Speech::Spoken(line.to_string()),
                confidence: 0.5,
                kind: ResponseKind::Contextual,
                produced_at: chrono::Utc::now(),
                source_text: Some(prompt.to_string()),
            }
        } else {
            record
        };

        if let Speech::Spoken(text) = &record.speech {
            let voice = read(&self.inner.voice).clone();
            self.inner.dispatcher.enqueue(text.clone(), voice);
        }

        self.inner.push_history(record.clone());
        lock(&self.inner.status).touch();
        record
    }

    /// Swap in a new personality atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] if any probability is out of range;
    /// the previous personality stays in effect.
    pub fn update_personality(&self, personality: PersonalityConfig) -> Result<()> {
        for (name, value) in [
            ("sarcasm_level", personality.sarcasm_level),
            ("interruption_frequency", personality.interruption_frequency),
            ("dig_probability", personality.dig_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Invalid(format!(
                    "{name} must be between 0.0 and 1.0, got {value}"
                )));
            }
        }

        *write(&self.inner.personality) = personality;
        tracing::info!("personality updated");
        Ok(())
    }

    /// Swap the active voice profile.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] when the profile fails validation.
    pub fn update_voice(&self, voice: VoiceProfile) -> Result<()> {
        voice.validate()?;
        *write(&self.inner.voice) = voice;
        tracing::info!("voice profile updated");
        Ok(())
    }

    pub fn add_observer(&self, observer: Arc<dyn StatusObserver>) {
        write(&self.inner.observers).push(observer);
    }

    /// Recent responses, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<ResponseRecord> {
        lock(&self.inner.history).iter().cloned().collect()
    }

    /// Slide currently on screen, if a session is running
    #[must_use]
    pub fn current_slide(&self) -> Option<SlideSnapshot> {
        lock(&self.inner.current_slide).clone()
    }

    /// Probe live component health and return the refreshed status
    pub async fn refresh_status(&self) -> SystemStatus {
        let monitoring = self.watcher.lock().await.is_running();
        let host_connected = self.source.probe_active().await;
        let playback_ready = self.inner.dispatcher.is_ready()
            && !matches!(self.inner.dispatcher.status(), PlaybackStatus::Error(_));
        let synthesis_available = self
            .connectors
            .get("speech")
            .is_none_or(|c| c.is_connected());

        let status = {
            let mut status = lock(&self.inner.status);
            status.monitoring = monitoring;
            status.host_connected = host_connected;
            status.synthesis_available = synthesis_available;
            status.playback_ready = playback_ready;
            // A standing error clears itself once everything is back up
            if status.components_up() {
                status.error = None;
            }
            status.clone()
        };

        self.inner.notify_status();
        status
    }

    /// Last computed status without probing
    #[must_use]
    pub fn status(&self) -> SystemStatus {
        lock(&self.inner.status).clone()
    }

    /// Audio cache usage
    #[must_use]
    pub fn cache_stats(&self) -> crate::audio::CacheStats {
        self.inner.dispatcher.cache_stats()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digs::DigLibrary;
    use crate::notes::DeckFileSource;

    struct SilentSource;

    #[async_trait::async_trait]
    impl SpeechSource for SilentSource {
        async fn synthesize(&self, text: &str, _voice: &VoiceProfile) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    struct NoopSink;

    #[async_trait::async_trait]
    impl AudioSink for NoopSink {
        async fn play(&self, _mp3_bytes: &[u8]) -> Result<()> {
            Ok(())
        }

        fn halt(&self) {}
    }

    fn build_cohost() -> (Cohost, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cache = AudioCache::open(dir.path().join("cache")).unwrap();
        let cohost = CohostBuilder::new(
            Arc::new(DeckFileSource::new(dir.path().join("deck.json"))),
            Arc::new(SilentSource),
            Arc::new(NoopSink),
            cache,
            Arc::new(DigLibrary::new()),
        )
        .build()
        .unwrap();
        (cohost, dir)
    }

    #[tokio::test]
    async fn history_is_capped() {
        let (cohost, _dir) = build_cohost();
        for i in 0..15 {
            let snapshot =
                SlideSnapshot::new(i, "t", format!("[Orik] line {i}"), None, "deck").unwrap();
            cohost.inner.respond_to_slide(&snapshot);
        }

        let history = cohost.history();
        assert_eq!(history.len(), HISTORY_CAP);
        // Oldest entries were evicted
        assert!(history[0].source_text.as_deref().unwrap().contains("line 5"));
    }

    #[tokio::test]
    async fn force_response_always_speaks() {
        let (cohost, _dir) = build_cohost();
        let record = cohost.force_response("say something").await;
        assert!(!record.speech.is_silent());
        assert_eq!(cohost.history().len(), 1);
    }

    #[tokio::test]
    async fn update_personality_rejects_bad_values() {
        let (cohost, _dir) = build_cohost();
        let before = read(&cohost.inner.personality).sarcasm_level;

        let bad = PersonalityConfig {
            sarcasm_level: 7.0,
            ..PersonalityConfig::default()
        };
        assert!(cohost.update_personality(bad).is_err());
        let after = read(&cohost.inner.personality).sarcasm_level;
        assert!((before - after).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn session_end_clears_current_slide() {
        let (cohost, _dir) = build_cohost();
        let snapshot = SlideSnapshot::new(0, "t", "[Orik] hello", None, "deck").unwrap();
        cohost.inner.handle_event(SlideEvent::SlideChanged(snapshot));
        assert!(cohost.current_slide().is_some());

        cohost.inner.handle_event(SlideEvent::SessionEnded);
        assert!(cohost.current_slide().is_none());
    }

    #[tokio::test]
    async fn session_start_clears_history() {
        let (cohost, _dir) = build_cohost();
        let snapshot = SlideSnapshot::new(0, "t", "[Orik] hello", None, "deck").unwrap();
        cohost.inner.handle_event(SlideEvent::SlideChanged(snapshot));
        assert_eq!(cohost.history().len(), 1);

        cohost.inner.handle_event(SlideEvent::SessionStarted);
        assert!(cohost.history().is_empty());
    }

    #[tokio::test]
    async fn stop_before_start_is_harmless() {
        let (cohost, _dir) = build_cohost();
        cohost.stop().await;
        cohost.stop().await;
        assert!(!cohost.status().monitoring);
    }
}
