//! Audio module: TTS payload decoding and pronunciation playback.
//!
//! # Flow
//!
//! ```text
//! speak button ─▶ TtsClient::fetch ─▶ AudioPayload
//!                                      │
//!                                      ▼
//!                               decode() ─▶ Vec<u8> ─▶ AudioSink::play_or_stop
//!                                                        (RodioSink: audio thread)
//! ```

pub mod decoder;
pub mod output;
pub mod playback;
pub mod tts;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use decoder::{decode, AudioPayload, DecodeError};
pub use output::{Clip, ClipSlot, RodioSink, Toggle};
pub use playback::{guess_lang, AudioSink, Notifier, PlaybackController, PlaybackError, PlaybackTarget};
pub use tts::{LingvaTts, TtsClient, TtsError};
