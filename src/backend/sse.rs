//! Incremental parser for OpenAI-style server-sent event streams.
//!
//! Bytes are buffered until a full line is available, so chunk boundaries
//! may fall anywhere (including inside a multi-byte UTF-8 character).  Only
//! `data:` lines are interpreted; `[DONE]` ends the stream and every other
//! payload is read as a chat-completion chunk whose
//! `choices[0].delta.content` is the next piece of text.

/// One interpreted `data:` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Non-empty content delta.
    Delta(String),
    /// `data: [DONE]`.
    Done,
}

#[derive(Debug, Default)]
pub struct SseParser {
    buf: Vec<u8>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and return the events completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            if let Some(event) = parse_line(&String::from_utf8_lossy(&line)) {
                events.push(event);
            }
        }
        events
    }

    /// Interpret whatever is left once the body has ended without a final
    /// newline.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        parse_line(&String::from_utf8_lossy(&rest))
    }
}

fn parse_line(line: &str) -> Option<SseEvent> {
    let line = line.trim_end_matches(['\r', '\n']);
    let payload = line.strip_prefix("data:")?.trim();

    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }
    if payload.is_empty() {
        return None;
    }

    let json: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("sse: skipping unparsable payload ({e}): {payload}");
            return None;
        }
    };

    json["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| SseEvent::Delta(s.to_string()))
}
