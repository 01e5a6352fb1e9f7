//! Typed messages consumed by the session controller.
//!
//! Backend events (`query`, `result`, `result_stream`,
//! `result_meanings_stream`, `result_stream_done`), user actions, and the
//! completions of the controller's own background tasks all travel through
//! one bounded `tokio::sync::mpsc` channel as [`SessionEvent`]s.
//! [`SessionHandle`] is the cloneable sending side.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::backend::ExplainTemplates;
use crate::dictionary::WordDetails;
use crate::session::{Mode, TurnClock, TurnId};

// ---------------------------------------------------------------------------
// Channel / EnrichmentKind
// ---------------------------------------------------------------------------

/// The two independent streaming feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// `result_stream`: the translation or explanation itself.
    Primary,
    /// `result_meanings_stream`: the secondary "meanings" feed.
    Meanings,
}

/// Which map a per-item dictionary translation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentKind {
    Definition,
    Example,
}

// ---------------------------------------------------------------------------
// SessionEvent
// ---------------------------------------------------------------------------

/// Everything the controller reacts to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// New input text; starts a new turn.
    Query { turn: TurnId, text: String },
    /// Full non-streamed result.
    Result { turn: TurnId, text: String },
    /// Next chunk on one of the stream channels.
    StreamChunk {
        turn: TurnId,
        channel: Channel,
        chunk: String,
    },
    /// Terminal marker for the turn's stream.
    StreamDone { turn: TurnId },
    /// User switched between translate and explain.
    ModeChange(Mode),
    /// User picked an explain template.
    TemplateChange(String),
    /// Explain templates fetched at startup.
    TemplatesLoaded(ExplainTemplates),
    /// Dictionary lookup started by `turn` finished.
    WordDetailsReady {
        turn: TurnId,
        details: Option<WordDetails>,
    },
    /// One definition or example translation finished.
    EnrichmentReady {
        turn: TurnId,
        key: String,
        kind: EnrichmentKind,
        text: String,
    },
}

impl SessionEvent {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Query { .. } => "query",
            SessionEvent::Result { .. } => "result",
            SessionEvent::StreamChunk {
                channel: Channel::Primary,
                ..
            } => "result_stream",
            SessionEvent::StreamChunk {
                channel: Channel::Meanings,
                ..
            } => "result_meanings_stream",
            SessionEvent::StreamDone { .. } => "result_stream_done",
            SessionEvent::ModeChange(_) => "mode_change",
            SessionEvent::TemplateChange(_) => "template_change",
            SessionEvent::TemplatesLoaded(_) => "templates_loaded",
            SessionEvent::WordDetailsReady { .. } => "word_details",
            SessionEvent::EnrichmentReady { .. } => "enrichment",
        }
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// The controller has shut down and no longer accepts events.
#[derive(Debug, Error)]
#[error("session controller is no longer running")]
pub struct SessionClosed;

/// Cloneable sender for [`SessionEvent`]s, bundled with the shared
/// [`TurnClock`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionEvent>,
    clock: TurnClock,
}

/// A [`SessionHandle`] that does not keep the controller's inbox open.
#[derive(Debug, Clone)]
pub struct WeakSessionHandle {
    tx: mpsc::WeakSender<SessionEvent>,
    clock: TurnClock,
}

/// Receiving side, owned by the controller.
#[derive(Debug)]
pub struct SessionInbox(pub(crate) mpsc::Receiver<SessionEvent>);

/// Create a connected handle / inbox pair with room for `capacity` queued
/// events.
pub fn channel(capacity: usize) -> (SessionHandle, SessionInbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        SessionHandle {
            tx,
            clock: TurnClock::new(),
        },
        SessionInbox(rx),
    )
}

impl SessionHandle {
    /// Shared turn allocator.
    pub fn clock(&self) -> &TurnClock {
        &self.clock
    }

    pub fn downgrade(&self) -> WeakSessionHandle {
        WeakSessionHandle {
            tx: self.tx.downgrade(),
            clock: self.clock.clone(),
        }
    }

    pub async fn send(&self, event: SessionEvent) -> Result<(), SessionClosed> {
        self.tx.send(event).await.map_err(|_| SessionClosed)
    }

    /// Start a new turn for `text`: allocate a [`TurnId`] and post the
    /// `query` event.  The controller issues the request for the mode that
    /// is active when it reaches the query.
    pub async fn submit(&self, text: impl Into<String>) -> Result<TurnId, SessionClosed> {
        let turn = self.clock.advance();
        self.query(turn, text).await?;
        log::debug!("session: submitted turn {turn}");
        Ok(turn)
    }

    pub async fn query(&self, turn: TurnId, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionEvent::Query {
            turn,
            text: text.into(),
        })
        .await
    }

    pub async fn result(&self, turn: TurnId, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionEvent::Result {
            turn,
            text: text.into(),
        })
        .await
    }

    pub async fn chunk(
        &self,
        turn: TurnId,
        channel: Channel,
        chunk: impl Into<String>,
    ) -> Result<(), SessionClosed> {
        self.send(SessionEvent::StreamChunk {
            turn,
            channel,
            chunk: chunk.into(),
        })
        .await
    }

    pub async fn done(&self, turn: TurnId) -> Result<(), SessionClosed> {
        self.send(SessionEvent::StreamDone { turn }).await
    }

    pub async fn set_mode(&self, mode: Mode) -> Result<(), SessionClosed> {
        self.send(SessionEvent::ModeChange(mode)).await
    }

    pub async fn set_template(&self, id: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(SessionEvent::TemplateChange(id.into())).await
    }
}

impl WeakSessionHandle {
    /// Returns `None` once every strong handle is gone.
    pub fn upgrade(&self) -> Option<SessionHandle> {
        self.tx.upgrade().map(|tx| SessionHandle {
            tx,
            clock: self.clock.clone(),
        })
    }

    pub fn clock(&self) -> &TurnClock {
        &self.clock
    }
}

impl SessionInbox {
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.0.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handle_delivers_in_send_order() {
        let (handle, mut inbox) = channel(8);
        let turn = handle.clock().advance();

        handle.query(turn, "hi").await.unwrap();
        handle.chunk(turn, Channel::Meanings, "m").await.unwrap();
        handle.done(turn).await.unwrap();

        assert_eq!(inbox.recv().await.unwrap().name(), "query");
        assert_eq!(inbox.recv().await.unwrap().name(), "result_meanings_stream");
        assert_eq!(inbox.recv().await.unwrap().name(), "result_stream_done");
    }

    #[tokio::test]
    async fn submit_allocates_increasing_turns() {
        let (handle, mut inbox) = channel(8);

        let a = handle.submit("one").await.unwrap();
        let b = handle.submit("two").await.unwrap();
        assert!(b > a);
        assert_eq!(handle.clock().current(), b);

        match inbox.recv().await.unwrap() {
            SessionEvent::Query { turn, text } => {
                assert_eq!(turn, a);
                assert_eq!(text, "one");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn submit_fails_once_session_is_gone() {
        let (handle, inbox) = channel(1);
        drop(inbox);
        assert!(handle.submit("x").await.is_err());
    }

    #[tokio::test]
    async fn weak_handle_does_not_keep_inbox_open() {
        let (handle, mut inbox) = channel(1);
        let weak = handle.downgrade();
        assert!(weak.upgrade().is_some());

        drop(handle);
        assert!(weak.upgrade().is_none());
        assert!(inbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_inbox_drop_fails() {
        let (handle, inbox) = channel(1);
        drop(inbox);
        assert!(handle.set_mode(Mode::Explain).await.is_err());
    }

    #[test]
    fn weak_and_strong_share_clock() {
        let (handle, _inbox) = channel(1);
        let weak = handle.downgrade();
        let t = handle.clock().advance();
        assert_eq!(weak.clock().current(), t);
    }
}
