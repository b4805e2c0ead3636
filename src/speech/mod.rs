//! Speech synthesis
//!
//! Voice profiles, the [`SpeechSource`] seam the dispatcher synthesizes
//! through, and an HTTP-backed source for hosted TTS providers.

pub mod markup;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Synthesis engine tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Standard,
    Neural,
}

impl Engine {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Neural => "neural",
        }
    }
}

/// Voice delivery parameters.
///
/// Part of the cache fingerprint, so two profiles that differ in any field
/// never share cached audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub voice_id: String,
    /// Speaking rate multiplier, `0.5..=2.0`
    pub speed: f32,
    /// Pitch adjustment, provider syntax (e.g. `-10%`)
    pub pitch: String,
    /// Output gain, `0.0..=1.0`
    pub volume: f32,
    pub engine: Engine,
}

impl Default for VoiceProfile {
    fn default() -> Self {
        Self {
            voice_id: "Matthew".to_string(),
            speed: 1.1,
            pitch: "-10%".to_string(),
            volume: 1.0,
            engine: Engine::Standard,
        }
    }
}

impl VoiceProfile {
    /// Validate field ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] for an empty voice id or out-of-range
    /// speed or volume.
    pub fn validate(&self) -> Result<()> {
        if self.voice_id.is_empty() {
            return Err(Error::Invalid("voice_id cannot be empty".to_string()));
        }
        if !(0.5..=2.0).contains(&self.speed) {
            return Err(Error::Invalid(format!(
                "speed must be between 0.5 and 2.0, got {}",
                self.speed
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(Error::Invalid(format!(
                "volume must be between 0.0 and 1.0, got {}",
                self.volume
            )));
        }
        Ok(())
    }
}

/// Audio container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
        }
    }
}

/// One synthesized utterance
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    /// Estimated duration; zero when the provider doesn't report one
    pub duration_ms: u64,
    pub voice: VoiceProfile,
    pub source_text: String,
}

impl AudioClip {
    /// Create a clip, rejecting empty audio payloads.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Invalid`] when `bytes` is empty.
    pub fn new(
        bytes: Vec<u8>,
        format: AudioFormat,
        duration_ms: u64,
        voice: VoiceProfile,
        source_text: impl Into<String>,
    ) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::Invalid("audio clip cannot be empty".to_string()));
        }
        Ok(Self {
            bytes,
            format,
            duration_ms,
            voice,
            source_text: source_text.into(),
        })
    }
}

/// Converts text to audio bytes
#[async_trait::async_trait]
pub trait SpeechSource: Send + Sync {
    /// Synthesize `text` with the given voice, returning MP3 bytes
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>>;
}

/// Hosted TTS provider backend
#[derive(Clone, Copy, Debug)]
pub enum SpeechProvider {
    OpenAI,
    ElevenLabs,
}

/// [`SpeechSource`] backed by a hosted HTTP TTS API
pub struct HttpSpeechSource {
    client: reqwest::Client,
    api_key: String,
    model: String,
    provider: SpeechProvider,
}

impl HttpSpeechSource {
    /// Create an `OpenAI`-backed source
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new_openai(api_key: String) -> Result<Self> {
        Self::new(api_key, "tts-1".to_string(), SpeechProvider::OpenAI)
    }

    /// Create an ElevenLabs-backed source
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new_elevenlabs(api_key: String) -> Result<Self> {
        Self::new(
            api_key,
            "eleven_monolingual_v1".to_string(),
            SpeechProvider::ElevenLabs,
        )
    }

    fn new(api_key: String, model: String, provider: SpeechProvider) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key required for speech synthesis".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            provider,
        })
    }

    async fn synthesize_openai(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = SpeechRequest {
            model: &self.model,
            input: text,
            voice: &voice.voice_id,
            speed: voice.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("OpenAI TTS error {status}: {body}")));
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn synthesize_elevenlabs(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            voice.voice_id
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!(
                "ElevenLabs TTS error {status}: {body}"
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait::async_trait]
impl SpeechSource for HttpSpeechSource {
    async fn synthesize(&self, text: &str, voice: &VoiceProfile) -> Result<Vec<u8>> {
        voice.validate()?;
        let shaped = markup::shape_delivery(text);
        match self.provider {
            SpeechProvider::OpenAI => self.synthesize_openai(&shaped, voice).await,
            SpeechProvider::ElevenLabs => self.synthesize_elevenlabs(&shaped, voice).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_voice_profile_is_valid() {
        let voice = VoiceProfile::default();
        assert_eq!(voice.voice_id, "Matthew");
        assert!((voice.speed - 1.1).abs() < f32::EPSILON);
        assert_eq!(voice.pitch, "-10%");
        voice.validate().unwrap();
    }

    #[test]
    fn voice_profile_rejects_bad_values() {
        let too_fast = VoiceProfile {
            speed: 3.0,
            ..VoiceProfile::default()
        };
        assert!(too_fast.validate().is_err());

        let no_id = VoiceProfile {
            voice_id: String::new(),
            ..VoiceProfile::default()
        };
        assert!(no_id.validate().is_err());

        let too_loud = VoiceProfile {
            volume: 1.5,
            ..VoiceProfile::default()
        };
        assert!(too_loud.validate().is_err());
    }

    #[test]
    fn audio_clip_rejects_empty_bytes() {
        let result = AudioClip::new(vec![], AudioFormat::Mp3, 0, VoiceProfile::default(), "hi");
        assert!(matches!(result, Err(Error::Invalid(_))));
    }

    #[test]
    fn http_source_requires_api_key() {
        assert!(HttpSpeechSource::new_openai(String::new()).is_err());
        assert!(HttpSpeechSource::new_elevenlabs(String::new()).is_err());
        assert!(HttpSpeechSource::new_openai("sk-test".to_string()).is_ok());
    }
}
