//! Audio pipeline: cache, output sink, and the serialized dispatcher

pub mod cache;
pub mod dispatcher;
pub mod playback;

pub use cache::{AudioCache, CacheStats};
pub use dispatcher::{AudioDispatcher, PlaybackStatus};
pub use playback::{AudioSink, SpeakerSink};
