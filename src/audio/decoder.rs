//! Normalises heterogeneous TTS audio payloads into playable bytes.
//!
//! TTS backends are inconsistent about how they ship audio: some return raw
//! bytes, some a JSON array of byte values, and some a Base64 string that may
//! be wrapped in a `data:` URI, broken across lines, or missing its padding.
//! [`decode`] accepts all of these.
//!
//! Precedence:
//!
//! 1. [`AudioPayload::Bytes`] is returned unchanged.
//! 2. [`AudioPayload::Array`] is converted element-wise (values wrap modulo
//!    256, like a `Uint8Array` view).
//! 3. [`AudioPayload::Text`] is treated as Base64 and normalised before
//!    decoding.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use thiserror::Error;

/// Standard alphabet, canonical padding, and lenient about non-zero trailing
/// bits in the final quantum.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

const DATA_URI_MARKER: &str = "base64,";

// ---------------------------------------------------------------------------
// AudioPayload
// ---------------------------------------------------------------------------

/// An audio payload as returned by a TTS collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioPayload {
    /// Already-decoded bytes.
    Bytes(Vec<u8>),
    /// An array of numeric byte values (e.g. a JSON `[73, 68, 51, ...]`).
    Array(Vec<i64>),
    /// Base64 text, possibly with a data-URI prefix or stray characters.
    Text(String),
}

impl AudioPayload {
    /// Interpret a JSON value as a payload.
    ///
    /// Strings become [`AudioPayload::Text`], arrays of numbers become
    /// [`AudioPayload::Array`].  `null` and every other shape yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Array(items) => Some(Self::Array(
                items
                    .iter()
                    .map(|v| {
                        v.as_i64()
                            .or_else(|| v.as_f64().map(|f| f as i64))
                            .unwrap_or(0)
                    })
                    .collect(),
            )),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// DecodeError
// ---------------------------------------------------------------------------

/// Failures from [`decode`].
#[derive(Debug, Error)]
pub enum DecodeError {
    /// No payload at all, or an empty Base64 string.
    #[error("audio payload is empty")]
    Empty,

    /// The text was not valid Base64 even after normalisation.
    #[error("Base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
}

// ---------------------------------------------------------------------------
// decode
// ---------------------------------------------------------------------------

/// Decode a TTS payload into raw audio bytes.
///
/// # Errors
///
/// * [`DecodeError::Empty`] when `payload` is `None` or an empty string.
/// * [`DecodeError::Base64`] when the normalised text still fails to decode.
///
/// ```
/// use translate_toolbar::audio::{decode, AudioPayload};
///
/// let payload = AudioPayload::Text("data:audio/mpeg;base64,SGVsbG8".into());
/// assert_eq!(decode(Some(&payload)).unwrap(), b"Hello");
/// assert!(decode(None).is_err());
/// ```
pub fn decode(payload: Option<&AudioPayload>) -> Result<Vec<u8>, DecodeError> {
    let payload = payload.ok_or(DecodeError::Empty)?;

    match payload {
        AudioPayload::Bytes(bytes) => {
            log::debug!("audio: payload is raw bytes ({} bytes)", bytes.len());
            Ok(bytes.clone())
        }
        AudioPayload::Array(values) => {
            log::debug!("audio: payload is a byte array ({} items)", values.len());
            Ok(values.iter().map(|&v| v as u8).collect())
        }
        AudioPayload::Text(text) => {
            if text.is_empty() {
                return Err(DecodeError::Empty);
            }
            let cleaned = normalize_base64(text);
            let bytes = LENIENT_STANDARD.decode(cleaned.as_bytes()).map_err(|e| {
                log::error!(
                    "audio: Base64 decode failed ({e}); input length {}",
                    text.len()
                );
                DecodeError::from(e)
            })?;
            log::debug!("audio: decoded {} bytes", bytes.len());
            Ok(bytes)
        }
    }
}

/// Best-effort cleanup of a Base64 string before decoding.
///
/// Strips whitespace, everything up to the last `base64,` marker, every
/// character outside `[A-Za-z0-9+/=]`, and pads with `=` to a multiple of 4.
fn normalize_base64(text: &str) -> String {
    let mut cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();

    if let Some(idx) = cleaned.rfind(DATA_URI_MARKER) {
        cleaned = cleaned[idx + DATA_URI_MARKER.len()..].to_string();
        log::debug!("audio: stripped data URI prefix, {} chars left", cleaned.len());
    }

    if !cleaned.chars().all(is_base64_char) {
        cleaned.retain(is_base64_char);
        log::debug!("audio: removed illegal characters, {} chars left", cleaned.len());
    }

    let remainder = cleaned.len() % 4;
    if remainder != 0 {
        let padding = 4 - remainder;
        cleaned.extend(std::iter::repeat('=').take(padding));
        log::debug!("audio: added {padding} padding characters");
    }

    cleaned
}

fn is_base64_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
