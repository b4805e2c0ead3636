//! Serialized speech playback
//!
//! A FIFO queue and one consumer task guarantee Orik never talks over
//! himself. Enqueueing is fire-and-forget; synthesis goes through the cache
//! first; failures mark the status and the queue keeps moving.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use crate::Result;
use crate::audio::cache::AudioCache;
use crate::audio::playback::AudioSink;
use crate::speech::{AudioClip, AudioFormat, SpeechSource, VoiceProfile};

/// Queue state visible to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    /// Most recent item failed; the queue keeps draining
    Error(String),
}

/// One queued utterance
#[derive(Debug, Clone)]
struct SpeechRequest {
    text: String,
    voice: VoiceProfile,
}

struct Shared {
    queue: Mutex<VecDeque<SpeechRequest>>,
    wake: Notify,
    status_tx: watch::Sender<PlaybackStatus>,
}

/// Owns the speech source, the cache, and the sink; plays strictly in
/// enqueue order.
pub struct AudioDispatcher {
    shared: Arc<Shared>,
    source: Arc<dyn SpeechSource>,
    sink: Arc<dyn AudioSink>,
    cache: Arc<Mutex<AudioCache>>,
    status_rx: watch::Receiver<PlaybackStatus>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl AudioDispatcher {
    #[must_use]
    pub fn new(
        source: Arc<dyn SpeechSource>,
        sink: Arc<dyn AudioSink>,
        cache: AudioCache,
    ) -> Self {
        let (status_tx, status_rx) = watch::channel(PlaybackStatus::Idle);
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                wake: Notify::new(),
                status_tx,
            }),
            source,
            sink,
            cache: Arc::new(Mutex::new(cache)),
            status_rx,
            consumer: Mutex::new(None),
        }
    }

    /// Spawn the consumer task. A no-op if already running.
    pub fn start(&self) {
        let mut consumer = lock(&self.consumer);
        if consumer.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&self.source);
        let sink = Arc::clone(&self.sink);
        let cache = Arc::clone(&self.cache);

        *consumer = Some(tokio::spawn(async move {
            consume(shared, source, sink, cache).await;
        }));
        tracing::debug!("audio dispatcher started");
    }

    /// Queue an utterance for playback. Fire-and-forget: returns as soon as
    /// the request is queued.
    pub fn enqueue(&self, text: impl Into<String>, voice: VoiceProfile) {
        let request = SpeechRequest {
            text: text.into(),
            voice,
        };
        lock(&self.shared.queue).push_back(request);
        self.shared.wake.notify_one();
    }

    /// Cancel the current clip and drop everything queued behind it.
    /// Idempotent; the consumer stays alive for future enqueues.
    pub fn stop(&self) {
        let dropped = {
            let mut queue = lock(&self.shared.queue);
            let n = queue.len();
            queue.clear();
            n
        };
        self.sink.halt();
        self.shared.status_tx.send_replace(PlaybackStatus::Idle);
        if dropped > 0 {
            tracing::info!(dropped, "playback stopped, queue drained");
        }
    }

    /// Stop playback and end the consumer task
    pub async fn shutdown(&self) {
        self.stop();
        let handle = lock(&self.consumer).take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        tracing::debug!("audio dispatcher shut down");
    }

    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.status_rx.borrow().clone()
    }

    /// Watch status transitions (Idle -> Playing -> ...)
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_rx.clone()
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    /// Whether the sink is ready (consumer running)
    #[must_use]
    pub fn is_ready(&self) -> bool {
        lock(&self.consumer).as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cache usage, for status reporting
    #[must_use]
    pub fn cache_stats(&self) -> crate::audio::cache::CacheStats {
        lock(&self.cache).stats()
    }
}

/// Consumer loop: pop, synthesize (cache first), play
async fn consume(
    shared: Arc<Shared>,
    source: Arc<dyn SpeechSource>,
    sink: Arc<dyn AudioSink>,
    cache: Arc<Mutex<AudioCache>>,
) {
    loop {
        let request = lock(&shared.queue).pop_front();

        let Some(request) = request else {
            shared.status_tx.send_replace(PlaybackStatus::Idle);
            shared.wake.notified().await;
            continue;
        };

        shared.status_tx.send_replace(PlaybackStatus::Playing);

        match speak(&request, &source, &sink, &cache).await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!(error = %e, text = %request.text, "speech item failed");
                shared.status_tx.send_replace(PlaybackStatus::Error(e.to_string()));
            }
        }
    }
}

async fn speak(
    request: &SpeechRequest,
    source: &Arc<dyn SpeechSource>,
    sink: &Arc<dyn AudioSink>,
    cache: &Arc<Mutex<AudioCache>>,
) -> Result<()> {
    let cached = lock(cache).get(&request.text, &request.voice);

    let bytes = if let Some(bytes) = cached {
        bytes
    } else {
        let bytes = source.synthesize(&request.text, &request.voice).await?;
        if let Err(e) = lock(cache).store(&request.text, &request.voice, &bytes, 0) {
            // A full or unwritable cache must not block speech
            tracing::warn!(error = %e, "audio cache store failed");
        }
        bytes
    };

    // Rejects empty payloads before they reach the sink
    let clip = AudioClip::new(
        bytes,
        AudioFormat::Mp3,
        0,
        request.voice.clone(),
        request.text.clone(),
    )?;

    sink.play(&clip.bytes).await
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
