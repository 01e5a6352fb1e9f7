//! Translate toolbar core.
//!
//! Turns asynchronous backend events (query start, streamed chunks on two
//! channels, final result, completion marker) into a coherent, displayable
//! session, while driving dictionary enrichment, TTS payload decoding and
//! adaptive sizing of the hosting surface.
//!
//! * [`session`] — session state, turn identity and the controller loop.
//! * [`backend`] — translate / explain / meanings requests.
//! * [`dictionary`] — word lookup and parallel enrichment.
//! * [`audio`] — TTS fetching, payload decoding and playback actions.
//! * [`surface`] — window size planner and pin state.
//! * [`clipboard`] — copy action.
//! * [`history`] — per-day translate / explain history files.
//! * [`config`] — TOML settings.

pub mod audio;
pub mod backend;
pub mod clipboard;
pub mod config;
pub mod dictionary;
pub mod history;
pub mod session;
pub mod surface;
