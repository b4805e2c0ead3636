//! Error types for the Orik co-host

use thiserror::Error;

/// Result type alias for co-host operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the co-host pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Notes source error (host probe, slide lookup)
    #[error("notes error: {0}")]
    Notes(String),

    /// Speech synthesis error
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Audio decode/device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Audio playback error
    #[error("playback error: {0}")]
    Playback(String),

    /// Tool connector error
    #[error("connector error: {0}")]
    Connector(String),

    /// Audio cache error
    #[error("cache error: {0}")]
    Cache(String),

    /// Invalid data model value
    #[error("invalid value: {0}")]
    Invalid(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
