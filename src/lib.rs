//! Orik - sarcastic AI co-host for live presentations
//!
//! This library provides the core co-host pipeline:
//! - `[Orik]` tag extraction from speaker notes
//! - Response policy (tagged replies, random digs, contextual fillers)
//! - Slide change detection by polling a notes source
//! - Serialized speech synthesis and playback with a disk cache
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Presentation host                       │
//! │        (slide deck + speaker notes)                  │
//! └────────────────────┬────────────────────────────────┘
//!                      │ poll
//! ┌────────────────────▼────────────────────────────────┐
//! │                Orik co-host                          │
//! │  Watcher │ Tag extract │ Policy │ Digs │ Status     │
//! └────────────────────┬────────────────────────────────┘
//!                      │ enqueue
//! ┌────────────────────▼────────────────────────────────┐
//! │             Audio dispatcher                         │
//! │      Cache  │  TTS synthesis  │  Speakers           │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod config;
pub mod connector;
pub mod digs;
pub mod error;
pub mod notes;
pub mod orchestrator;
pub mod policy;
pub mod speech;
pub mod status;
pub mod watcher;

pub use audio::{AudioCache, AudioDispatcher, AudioSink, PlaybackStatus, SpeakerSink};
pub use config::Config;
pub use connector::{RetryPolicy, Tool, ToolConnector};
pub use digs::{DigLibrary, DigLineSource};
pub use error::{Error, Result};
pub use notes::{DeckFileSource, NotesSource, SlideInfo, SlideSnapshot};
pub use orchestrator::{Cohost, CohostBuilder};
pub use policy::{PersonalityConfig, ResponseKind, ResponsePolicy, ResponseRecord, Speech};
pub use speech::{HttpSpeechSource, SpeechSource, VoiceProfile};
pub use status::{StatusObserver, SystemStatus};
pub use watcher::{SlideEvent, SlideWatcher};
