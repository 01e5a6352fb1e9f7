//! Surface module: the host-managed toolbar window.
//!
//! * [`SurfaceHost`] — show / hide / always-on-top plus the render and
//!   layout synchronisation the size planner needs.
//! * [`WindowSizePlanner`] — turns [`LayoutSignal`](crate::session::LayoutSignal)
//!   updates into debounced show / resize / hide requests.
//! * [`PinState`] — persisted "always on top" toggle with rollback.

use async_trait::async_trait;
use thiserror::Error;

pub mod pin;
pub mod planner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use pin::{ConfigPinStore, PinError, PinState, PinStore};
pub use planner::{Plan, WindowSizePlanner};

// ---------------------------------------------------------------------------
// HostError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HostError {
    /// The surface has not been created yet (or is already gone).
    #[error("surface is not available: {0}")]
    Unavailable(String),

    #[error("surface operation failed: {0}")]
    Operation(String),
}

// ---------------------------------------------------------------------------
// SurfaceHost trait
// ---------------------------------------------------------------------------

/// The window shell hosting the toolbar.
#[async_trait]
pub trait SurfaceHost: Send + Sync {
    /// Show the surface at `height` pixels, resizing it if already visible.
    async fn show(&self, height: u32) -> Result<(), HostError>;

    async fn hide(&self) -> Result<(), HostError>;

    async fn set_always_on_top(&self, on_top: bool) -> Result<(), HostError>;

    /// Resolves once the consumer has rendered the latest session state.
    async fn wait_for_render(&self);

    /// Resolves after the host's next layout pass.
    async fn wait_for_layout(&self);

    /// Natural height of the rendered content, in pixels.
    async fn content_height(&self) -> Result<u32, HostError>;
}
