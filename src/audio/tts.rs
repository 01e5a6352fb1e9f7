//! Text-to-speech collaborator.
//!
//! [`TtsClient`] is the seam the playback actions call; [`LingvaTts`] talks to
//! a Lingva Translate instance, whose audio endpoint answers with
//! `{"audio": [..byte values..]}`.

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioPayload;
use crate::config::TtsConfig;

/// Errors from a TTS fetch.
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("TTS request failed: {0}")]
    Request(String),

    #[error("TTS request timed out")]
    Timeout,

    #[error("invalid TTS URL: {0}")]
    Url(String),

    #[error("failed to parse TTS response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::Request(e.to_string())
        }
    }
}

/// Fetches spoken audio for `text` in `lang`.
///
/// `Ok(None)` means the service answered but carried no audio.
#[async_trait]
pub trait TtsClient: Send + Sync {
    async fn fetch(&self, text: &str, lang: &str) -> Result<Option<AudioPayload>, TtsError>;
}

/// Lingva Translate audio endpoint client.
pub struct LingvaTts {
    client: reqwest::Client,
    base_url: String,
}

impl LingvaTts {
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    /// `{base_url}/api/v1/audio/{lang}/{text}` with each segment escaped.
    fn audio_url(&self, text: &str, lang: &str) -> Result<reqwest::Url, TtsError> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| TtsError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| TtsError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1", "audio", lang, text]);
        Ok(url)
    }
}

#[async_trait]
impl TtsClient for LingvaTts {
    async fn fetch(&self, text: &str, lang: &str) -> Result<Option<AudioPayload>, TtsError> {
        let url = self.audio_url(text, lang)?;
        log::debug!("tts: GET {url}");

        let response = self.client.get(url).send().await?.error_for_status()?;
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TtsError::Parse(e.to_string()))?;

        Ok(AudioPayload::from_json(&json["audio"]))
    }
}
