//! Session module: the streaming translate / explain state machine.
//!
//! * [`Session`] / [`SharedSession`] — state of the live toolbar session.
//! * [`StreamAggregator`] — the two append-only stream buffers.
//! * [`SessionEvent`] / [`SessionHandle`] — typed inbox messages and their
//!   sender.
//! * [`TurnId`] / [`TurnClock`] — request identity used to drop stale events.
//! * [`SessionController`] — the reducer loop.

pub mod controller;
pub mod event;
pub mod state;
pub mod stream;
pub mod turn;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::SessionController;
pub use event::{
    channel, Channel, EnrichmentKind, SessionClosed, SessionEvent, SessionHandle, SessionInbox,
    WeakSessionHandle,
};
pub use state::{is_word, new_shared_session, LayoutSignal, Mode, Session, SharedSession, WORD_MAX_LEN};
pub use stream::StreamAggregator;
pub use turn::{TurnClock, TurnId};
