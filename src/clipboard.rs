//! Copy-to-clipboard action for the toolbar result.
//!
//! [`SystemClipboard`] creates a short-lived [`arboard::Clipboard`] handle per
//! call rather than sharing one, because `arboard::Clipboard` is not `Send`
//! on all platforms and the handle is cheap to create.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arboard::Clipboard;
use thiserror::Error;

use crate::session::SharedSession;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("cannot open clipboard: {0}")]
    Access(String),

    #[error("cannot write clipboard: {0}")]
    Set(String),

    #[error("clipboard task failed: {0}")]
    Internal(String),
}

/// Blocking clipboard writer.
pub trait ClipboardWriter: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard.
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = Clipboard::new().map_err(|e| ClipboardError::Access(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Set(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// CopyAction
// ---------------------------------------------------------------------------

/// Copies the visible result and raises a short-lived "copied" flag.
pub struct CopyAction {
    clipboard: Arc<dyn ClipboardWriter>,
    copied: Arc<AtomicBool>,
    reset_delay: Duration,
}

impl CopyAction {
    pub fn new(clipboard: Arc<dyn ClipboardWriter>, reset_delay: Duration) -> Self {
        Self {
            clipboard,
            copied: Arc::new(AtomicBool::new(false)),
            reset_delay,
        }
    }

    pub fn is_copied(&self) -> bool {
        self.copied.load(Ordering::SeqCst)
    }

    /// Copy `final_result + primary stream` to the clipboard.
    ///
    /// Returns `Ok(false)` without touching the clipboard when nothing is
    /// displayed.
    pub async fn copy(&self, session: &SharedSession) -> Result<bool, ClipboardError> {
        let text = {
            let st = session.lock().unwrap();
            if st.final_result.is_empty() && st.stream.is_empty() {
                return Ok(false);
            }
            format!("{}{}", st.final_result, st.stream.primary())
        };

        let clipboard = Arc::clone(&self.clipboard);
        tokio::task::spawn_blocking(move || clipboard.set_text(&text))
            .await
            .map_err(|e| ClipboardError::Internal(e.to_string()))??;

        self.copied.store(true, Ordering::SeqCst);
        let copied = Arc::clone(&self.copied);
        let delay = self.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            copied.store(false, Ordering::SeqCst);
        });

        Ok(true)
    }
}
