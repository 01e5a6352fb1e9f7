//! Turn identifiers.
//!
//! Every outbound request is tagged with the [`TurnId`] of the turn that
//! issued it, and every inbound event carries that id back.  The controller
//! drops events whose id no longer matches, so a slow response to a
//! superseded request can never land in the current turn's buffers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Monotonically increasing turn identifier.  `TurnId::default()` (zero) is
/// the "no turn yet" value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnId(u64);

impl TurnId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared allocator for [`TurnId`]s.
///
/// Cloning shares the counter, so `SessionHandle::submit` and the controller
/// never hand out the same id twice.
#[derive(Debug, Clone, Default)]
pub struct TurnClock(Arc<AtomicU64>);

impl TurnClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id.
    pub fn advance(&self) -> TurnId {
        TurnId(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// The most recently allocated id.
    pub fn current(&self) -> TurnId {
        TurnId(self.0.load(Ordering::SeqCst))
    }
}
