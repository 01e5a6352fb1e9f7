//! Dictionary module: word lookup and enrichment.
//!
//! * [`WordDetails`] / [`Meaning`] / [`Definition`] — entry types.
//! * [`DictionaryClient`] — lookup seam; [`FreeDictionaryClient`] is the
//!   HTTP implementation.
//! * [`DictionaryEnrichment`] — fetch plus parallel per-item translation.

pub mod client;
pub mod enrichment;
pub mod types;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{DictionaryClient, DictionaryError, FreeDictionaryClient};
pub use enrichment::{plan_translations, DictionaryEnrichment, TranslationTask};
pub use types::{entry_key, Definition, Meaning, WordDetails};
