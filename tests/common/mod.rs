//! Shared test utilities

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use orik_cohost::audio::AudioSink;
use orik_cohost::{Result, SpeechSource, StatusObserver, SystemStatus, VoiceProfile};

/// Speech source that returns the input text as bytes and counts calls
pub struct FakeSpeech {
    pub calls: AtomicU32,
}

impl FakeSpeech {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
        })
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechSource for FakeSpeech {
    async fn synthesize(&self, text: &str, _voice: &VoiceProfile) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text.as_bytes().to_vec())
    }
}

/// Sink that records everything it plays
pub struct FakeSink {
    pub played: Mutex<Vec<Vec<u8>>>,
}

impl FakeSink {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            played: Mutex::new(Vec::new()),
        })
    }

    /// Played payloads decoded back to strings
    #[must_use]
    pub fn played_texts(&self) -> Vec<String> {
        self.lock_played()
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    fn lock_played(&self) -> MutexGuard<'_, Vec<Vec<u8>>> {
        self.played.lock().expect("sink mutex poisoned")
    }
}

#[async_trait::async_trait]
impl AudioSink for FakeSink {
    async fn play(&self, mp3_bytes: &[u8]) -> Result<()> {
        self.lock_played().push(mp3_bytes.to_vec());
        Ok(())
    }

    fn halt(&self) {}
}

/// Observer that records every callback
#[derive(Default)]
pub struct FakeObserver {
    pub statuses: Mutex<Vec<SystemStatus>>,
    pub speaking: Mutex<Vec<bool>>,
    pub errors: Mutex<Vec<String>>,
}

impl FakeObserver {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl StatusObserver for FakeObserver {
    fn on_status_changed(&self, status: &SystemStatus) {
        self.statuses
            .lock()
            .expect("observer mutex poisoned")
            .push(status.clone());
    }

    fn on_speaking_changed(&self, speaking: bool) {
        self.speaking
            .lock()
            .expect("observer mutex poisoned")
            .push(speaking);
    }

    fn on_error(&self, message: &str) {
        self.errors
            .lock()
            .expect("observer mutex poisoned")
            .push(message.to_string());
    }
}
