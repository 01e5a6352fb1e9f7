//! Pronunciation playback actions.
//!
//! Each action fetches audio through a [`TtsClient`], normalises it with
//! [`decode`](crate::audio::decode) and hands the bytes to an [`AudioSink`].
//! A per-target "playing" flag is raised for the duration and cleared a fixed
//! delay after the attempt finishes, whatever the outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::{decode, DecodeError, TtsClient, TtsError};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Errors surfaced by a playback attempt.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio data received, check the network connection")]
    NoAudio,

    #[error(transparent)]
    Tts(#[from] TtsError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("audio output failed: {0}")]
    Output(String),
}

/// Plays a decoded clip, or stops the clip that is currently playing.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play_or_stop(&self, bytes: Vec<u8>) -> Result<(), PlaybackError>;
}

/// Shows a blocking notice to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

// ---------------------------------------------------------------------------
// PlaybackTarget
// ---------------------------------------------------------------------------

/// Which button started the playback; each has its own busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTarget {
    /// Result text, language guessed from its script.
    Result,
    /// The queried English word.
    English,
    /// The Chinese translation.
    Chinese,
}

#[derive(Debug, Default)]
struct PlayingFlags {
    result: AtomicBool,
    english: AtomicBool,
    chinese: AtomicBool,
}

impl PlayingFlags {
    fn flag(&self, target: PlaybackTarget) -> &AtomicBool {
        match target {
            PlaybackTarget::Result => &self.result,
            PlaybackTarget::English => &self.english,
            PlaybackTarget::Chinese => &self.chinese,
        }
    }
}

/// Returns `"zh"` if `text` contains a CJK unified ideograph, else `"en"`.
pub fn guess_lang(text: &str) -> &'static str {
    if text.chars().any(|c| ('\u{4e00}'..='\u{9fa5}').contains(&c)) {
        "zh"
    } else {
        "en"
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// Drives the speak buttons.
pub struct PlaybackController {
    tts: Arc<dyn TtsClient>,
    sink: Arc<dyn AudioSink>,
    notifier: Arc<dyn Notifier>,
    flags: Arc<PlayingFlags>,
    reset_delay: Duration,
}

impl PlaybackController {
    pub fn new(
        tts: Arc<dyn TtsClient>,
        sink: Arc<dyn AudioSink>,
        notifier: Arc<dyn Notifier>,
        reset_delay: Duration,
    ) -> Self {
        Self {
            tts,
            sink,
            notifier,
            flags: Arc::new(PlayingFlags::default()),
            reset_delay,
        }
    }

    /// Whether the given button is currently showing its busy state.
    pub fn is_playing(&self, target: PlaybackTarget) -> bool {
        self.flags.flag(target).load(Ordering::SeqCst)
    }

    /// Pronounce the queried word in English.
    pub async fn speak_query(&self, query: &str) -> Result<(), PlaybackError> {
        self.speak_as(PlaybackTarget::English, query, "en").await
    }

    /// Pronounce the translation in Chinese.
    pub async fn speak_result(&self, result: &str) -> Result<(), PlaybackError> {
        self.speak_as(PlaybackTarget::Chinese, result, "zh").await
    }

    /// Pronounce `text` in the language guessed from its script.
    pub async fn speak(&self, text: &str) -> Result<(), PlaybackError> {
        self.speak_as(PlaybackTarget::Result, text, guess_lang(text))
            .await
    }

    /// Pronounce a dictionary example sentence.  Failures are only logged.
    pub async fn speak_example(&self, example: &str) {
        if example.is_empty() {
            return;
        }
        if let Err(e) = self.fetch_and_play(example, "en").await {
            log::error!("playback: example failed: {e}");
        }
    }

    async fn speak_as(
        &self,
        target: PlaybackTarget,
        text: &str,
        lang: &str,
    ) -> Result<(), PlaybackError> {
        if text.is_empty() {
            log::debug!("playback: nothing to speak for {target:?}");
            return Ok(());
        }

        self.flags.flag(target).store(true, Ordering::SeqCst);
        log::debug!("playback: {target:?} lang={lang} len={}", text.len());

        let outcome = self.fetch_and_play(text, lang).await;
        self.schedule_reset(target);

        if let Err(e) = &outcome {
            log::error!("playback: {target:?} failed: {e}");
            self.notifier.notify(&format!("Playback failed: {e}"));
        }
        outcome
    }

    async fn fetch_and_play(&self, text: &str, lang: &str) -> Result<(), PlaybackError> {
        let payload = self
            .tts
            .fetch(text, lang)
            .await?
            .ok_or(PlaybackError::NoAudio)?;
        let bytes = decode(Some(&payload))?;
        self.sink.play_or_stop(bytes).await
    }

    fn schedule_reset(&self, target: PlaybackTarget) {
        let flags = Arc::clone(&self.flags);
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flags.flag(target).store(false, Ordering::SeqCst);
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
