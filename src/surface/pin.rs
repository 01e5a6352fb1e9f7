//! Persisted "pin" (always on top) state of the toolbar surface.
//!
//! [`PinState::toggle`] applies the new value to the host first, then
//! persists it.  When persisting fails the host is switched back to the
//! previous value and the local flag is left unchanged.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AppConfig, AppPaths};
use crate::surface::{HostError, SurfaceHost};

#[derive(Debug, Error)]
pub enum PinError {
    #[error("failed to read pin state: {0}")]
    Load(String),

    #[error("failed to persist pin state: {0}")]
    Persist(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Storage for the pinned flag.
#[async_trait]
pub trait PinStore: Send + Sync {
    async fn load(&self) -> Result<bool, PinError>;
    async fn save(&self, pinned: bool) -> Result<(), PinError>;
}

// ---------------------------------------------------------------------------
// ConfigPinStore
// ---------------------------------------------------------------------------

/// Keeps the flag in `[toolbar] pinned` of `settings.toml`.
///
/// File I/O runs on the blocking thread pool.
pub struct ConfigPinStore {
    path: PathBuf,
}

impl ConfigPinStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The platform settings file.
    pub fn default_location() -> Self {
        Self::new(AppPaths::new().settings_file)
    }
}

#[async_trait]
impl PinStore for ConfigPinStore {
    async fn load(&self) -> Result<bool, PinError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || AppConfig::load_from(&path))
            .await
            .map_err(|e| PinError::Load(e.to_string()))?
            .map(|config| config.toolbar.pinned)
            .map_err(|e| PinError::Load(e.to_string()))
    }

    async fn save(&self, pinned: bool) -> Result<(), PinError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let mut config = AppConfig::load_from(&path)?;
            config.toolbar.pinned = pinned;
            config.save_to(&path)
        })
        .await
        .map_err(|e| PinError::Persist(e.to_string()))?
        .map_err(|e| PinError::Persist(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// PinState
// ---------------------------------------------------------------------------

pub struct PinState {
    pinned: bool,
    host: Arc<dyn SurfaceHost>,
    store: Arc<dyn PinStore>,
}

impl PinState {
    /// Read the stored flag and apply it to the host.  A failed read is
    /// logged and treated as "not pinned".
    pub async fn load(host: Arc<dyn SurfaceHost>, store: Arc<dyn PinStore>) -> Self {
        let pinned = match store.load().await {
            Ok(p) => p,
            Err(e) => {
                log::warn!("pin: {e}; starting unpinned");
                false
            }
        };

        if pinned {
            if let Err(e) = host.set_always_on_top(true).await {
                log::warn!("pin: could not restore always-on-top: {e}");
            }
        }

        Self {
            pinned,
            host,
            store,
        }
    }

    pub fn get(&self) -> bool {
        self.pinned
    }

    /// Flip the flag.  Returns the new value.
    pub async fn toggle(&mut self) -> Result<bool, PinError> {
        let previous = self.pinned;
        let next = !previous;

        self.host.set_always_on_top(next).await?;

        if let Err(e) = self.store.save(next).await {
            log::error!("pin: {e}; reverting always-on-top to {previous}");
            if let Err(host_err) = self.host.set_always_on_top(previous).await {
                log::warn!("pin: rollback failed: {host_err}");
            }
            return Err(e);
        }

        self.pinned = next;
        log::info!("pin: pinned = {next}");
        Ok(next)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
