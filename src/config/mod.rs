//! Configuration management for the Orik co-host

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use crate::audio::cache::DEFAULT_MAX_BYTES;
use crate::policy::PersonalityConfig;
use crate::speech::VoiceProfile;
use crate::watcher::DEFAULT_POLL_INTERVAL;
use crate::{Error, Result};

/// Co-host configuration, resolved from env > config file > defaults
#[derive(Debug, Clone)]
pub struct Config {
    /// Deck description file for the bundled notes source
    pub deck_path: Option<PathBuf>,

    /// Slide poll cadence
    pub poll_interval: Duration,

    /// Personality in effect at startup
    pub personality: PersonalityConfig,

    /// Voice delivery profile
    pub voice: VoiceProfile,

    /// Audio cache directory
    pub cache_dir: PathBuf,

    /// Audio cache size bound in bytes
    pub cache_max_bytes: u64,

    /// API keys for hosted TTS providers
    pub api_keys: ApiKeys,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

impl ApiKeys {
    /// Whether any synthesis provider is usable
    #[must_use]
    pub const fn any(&self) -> bool {
        self.openai.is_some() || self.elevenlabs.is_some()
    }
}

/// Default audio cache directory: `~/.cache/orik/audio/`
fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cache/orik/audio"),
        |d| d.cache_dir().join("orik").join("audio"),
    )
}

impl Config {
    /// Load configuration (env > config file > defaults).
    ///
    /// # Errors
    ///
    /// Returns error if an override produces an out-of-range personality
    /// or voice value.
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();

        let mut personality = PersonalityConfig::default();
        if let Some(v) = fc.personality.sarcasm_level {
            personality.sarcasm_level = v;
        }
        if let Some(v) = fc.personality.interruption_frequency {
            personality.interruption_frequency = v;
        }
        if let Some(v) = fc.personality.dig_probability {
            personality.dig_probability = v;
        }
        // Re-validate after the overlay
        let personality = PersonalityConfig::new(
            personality.sarcasm_level,
            personality.interruption_frequency,
            personality.dig_probability,
            personality.response_templates,
            personality.forbidden_topics,
        )?;

        let mut voice = VoiceProfile::default();
        if let Some(v) = fc.voice.voice_id {
            voice.voice_id = v;
        }
        if let Some(v) = fc.voice.speed {
            voice.speed = v;
        }
        if let Some(v) = fc.voice.pitch {
            voice.pitch = v;
        }
        if let Some(v) = fc.voice.volume {
            voice.volume = v;
        }
        voice.validate()?;

        let env_secs = match std::env::var("ORIK_POLL_INTERVAL")
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()
        {
            Ok(secs) => secs,
            Err(e) => {
                return Err(Error::Config(format!("ORIK_POLL_INTERVAL invalid: {e}")));
            }
        };

        let poll_interval = match env_secs.or(fc.poll_interval_secs) {
            None => DEFAULT_POLL_INTERVAL,
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
            Some(secs) => {
                return Err(Error::Config(format!(
                    "poll interval must be a positive number of seconds, got {secs}"
                )));
            }
        };

        let api_keys = ApiKeys {
            openai: std::env::var("OPENAI_API_KEY").ok().or(fc.api_keys.openai),
            elevenlabs: std::env::var("ELEVENLABS_API_KEY")
                .ok()
                .or(fc.api_keys.elevenlabs),
        };

        let deck_path = std::env::var("ORIK_DECK_PATH")
            .ok()
            .map(PathBuf::from)
            .or(fc.deck_path);

        Ok(Self {
            deck_path,
            poll_interval,
            personality,
            voice,
            cache_dir: fc.cache.dir.unwrap_or_else(default_cache_dir),
            cache_max_bytes: fc.cache.max_bytes.unwrap_or(DEFAULT_MAX_BYTES),
            api_keys,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deck_path: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            personality: PersonalityConfig::default(),
            voice: VoiceProfile::default(),
            cache_dir: default_cache_dir(),
            cache_max_bytes: DEFAULT_MAX_BYTES,
            api_keys: ApiKeys::default(),
        }
    }
}
