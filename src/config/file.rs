//! TOML configuration file loading
//!
//! Supports `~/.config/orik/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of defaults.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct CohostConfigFile {
    /// Deck description file the bundled notes source reads
    #[serde(default)]
    pub deck_path: Option<PathBuf>,

    /// Slide poll interval in seconds
    #[serde(default)]
    pub poll_interval_secs: Option<f64>,

    /// Personality overrides
    #[serde(default)]
    pub personality: PersonalityFileConfig,

    /// Voice delivery overrides
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Audio cache settings
    #[serde(default)]
    pub cache: CacheFileConfig,

    /// API keys for hosted TTS providers
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Personality-related configuration
#[derive(Debug, Default, Deserialize)]
pub struct PersonalityFileConfig {
    pub sarcasm_level: Option<f64>,
    pub interruption_frequency: Option<f64>,
    pub dig_probability: Option<f64>,
}

/// Voice delivery configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Voice identifier (e.g. "Matthew")
    pub voice_id: Option<String>,

    /// Speaking rate multiplier
    pub speed: Option<f32>,

    /// Pitch adjustment (e.g. "-10%")
    pub pitch: Option<String>,

    /// Output gain
    pub volume: Option<f32>,
}

/// Audio cache configuration
#[derive(Debug, Default, Deserialize)]
pub struct CacheFileConfig {
    /// Cache directory override
    pub dir: Option<PathBuf>,

    /// Size bound in bytes
    pub max_bytes: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the config file, falling back to defaults on any problem
pub fn load_config_file() -> CohostConfigFile {
    let Some(path) = config_file_path() else {
        return CohostConfigFile::default();
    };

    if !path.exists() {
        return CohostConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                CohostConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            CohostConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/orik/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("orik").join("config.toml"))
}
