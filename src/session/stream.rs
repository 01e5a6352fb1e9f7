//! Chunk accumulation for the two stream channels.
//!
//! Chunks are appended in delivery order with no deduplication or
//! reordering.  The two channels are independent; nothing orders one
//! against the other.

use crate::session::Channel;

/// Append-only text buffers for [`Channel::Primary`] and
/// [`Channel::Meanings`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAggregator {
    primary: String,
    meanings: String,
    /// Set by the first non-empty chunk on either channel since the last
    /// reset.
    started: bool,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` to `channel`.
    ///
    /// Returns `true` when this is the first non-empty chunk since the last
    /// [`reset`](Self::reset).
    pub fn append(&mut self, channel: Channel, chunk: &str) -> bool {
        match channel {
            Channel::Primary => self.primary.push_str(chunk),
            Channel::Meanings => self.meanings.push_str(chunk),
        }
        let first = !self.started && !chunk.is_empty();
        if first {
            self.started = true;
        }
        first
    }

    /// Empty both buffers.
    pub fn reset(&mut self) {
        self.primary.clear();
        self.meanings.clear();
        self.started = false;
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn meanings(&self) -> &str {
        &self.meanings
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.meanings.is_empty()
    }
}
