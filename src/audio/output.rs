//! Speaker output for decoded clips.
//!
//! rodio's `OutputStream` is not `Send`, so [`RodioSink`] runs a dedicated
//! audio thread that owns it and receives clips over a bounded channel.
//! The thread keeps the clip that is currently playing in a [`ClipSlot`]: a
//! request while that clip is still audible stops it instead of starting
//! another one.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::audio::{AudioSink, PlaybackError};

/// Pending clip requests before callers are told the output is busy.
const REQUEST_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// ClipSlot
// ---------------------------------------------------------------------------

/// A clip that can be stopped while it plays.
pub trait Clip {
    fn is_finished(&self) -> bool;
    fn stop(&self);
}

impl Clip for rodio::Sink {
    fn is_finished(&self) -> bool {
        self.empty()
    }

    fn stop(&self) {
        rodio::Sink::stop(self);
    }
}

/// Outcome of [`ClipSlot::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Started,
    Stopped,
}

/// Holds at most one clip.
#[derive(Debug)]
pub struct ClipSlot<C> {
    current: Option<C>,
}

impl<C> Default for ClipSlot<C> {
    fn default() -> Self {
        Self { current: None }
    }
}

impl<C: Clip> ClipSlot<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(|clip| !clip.is_finished())
    }

    /// Stop the current clip if it is still playing; otherwise start a new
    /// one with `start`.
    pub fn toggle<F>(&mut self, start: F) -> Result<Toggle, PlaybackError>
    where
        F: FnOnce() -> Result<C, PlaybackError>,
    {
        if let Some(clip) = self.current.take() {
            if !clip.is_finished() {
                clip.stop();
                return Ok(Toggle::Stopped);
            }
        }
        self.current = Some(start()?);
        Ok(Toggle::Started)
    }
}

// ---------------------------------------------------------------------------
// RodioSink
// ---------------------------------------------------------------------------

struct ClipRequest {
    bytes: Vec<u8>,
    reply: oneshot::Sender<Result<Toggle, PlaybackError>>,
}

/// Plays clips on the default output device.
pub struct RodioSink {
    tx: mpsc::SyncSender<ClipRequest>,
}

impl RodioSink {
    /// Start the audio thread.  A missing output device is not an error
    /// here; each request then fails with [`PlaybackError::Output`].
    pub fn spawn() -> Result<Self, PlaybackError> {
        let (tx, rx) = mpsc::sync_channel(REQUEST_CAPACITY);
        thread::Builder::new()
            .name("toolbar-audio".to_string())
            .spawn(move || audio_thread(rx))
            .map_err(|e| PlaybackError::Output(format!("cannot start audio thread: {e}")))?;
        Ok(Self { tx })
    }
}

fn audio_thread(rx: mpsc::Receiver<ClipRequest>) {
    let output = match rodio::OutputStream::try_default() {
        Ok(output) => Some(output),
        Err(e) => {
            log::warn!("audio: no output device: {e}");
            None
        }
    };
    let mut slot = ClipSlot::<rodio::Sink>::new();

    while let Ok(ClipRequest { bytes, reply }) = rx.recv() {
        let outcome = match &output {
            Some((_stream, handle)) => slot.toggle(|| start_clip(handle, bytes)),
            None => Err(PlaybackError::Output("no audio output device".into())),
        };
        let _ = reply.send(outcome);
    }

    log::debug!("audio: output thread exiting");
}

fn start_clip(
    handle: &rodio::OutputStreamHandle,
    bytes: Vec<u8>,
) -> Result<rodio::Sink, PlaybackError> {
    let source = rodio::Decoder::new(Cursor::new(bytes))
        .map_err(|e| PlaybackError::Output(format!("unsupported audio: {e}")))?;
    let sink = rodio::Sink::try_new(handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
    sink.append(source);
    Ok(sink)
}

#[async_trait]
impl AudioSink for RodioSink {
    async fn play_or_stop(&self, bytes: Vec<u8>) -> Result<(), PlaybackError> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .try_send(ClipRequest { bytes, reply })
            .map_err(|e| match e {
                mpsc::TrySendError::Full(_) => PlaybackError::Output("audio output is busy".into()),
                mpsc::TrySendError::Disconnected(_) => {
                    PlaybackError::Output("audio thread has stopped".into())
                }
            })?;

        let toggle = outcome
            .await
            .map_err(|_| PlaybackError::Output("audio thread has stopped".into()))??;
        log::debug!("audio: {toggle:?}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
