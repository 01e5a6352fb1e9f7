//! Session state for the toolbar surface.
//!
//! [`Session`] is the single source of truth for everything the surface
//! displays for the current turn.  All transitions are plain methods so the
//! reducer in [`controller`](crate::session::controller) stays small and the
//! rules can be tested without a runtime.
//!
//! [`SharedSession`] is a type alias for `Arc<Mutex<Session>>`, cheap to
//! clone and safe to share across tasks.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::backend::ExplainTemplates;
use crate::dictionary::WordDetails;
use crate::session::{Channel, EnrichmentKind, StreamAggregator, TurnId};

/// Longest input still treated as a single dictionary word.
pub const WORD_MAX_LEN: usize = 20;

/// `true` iff `text`, trimmed, is 1–20 ASCII letters.
///
/// ```
/// use translate_toolbar::session::is_word;
///
/// assert!(is_word("  resume \n"));
/// assert!(!is_word("two words"));
/// assert!(!is_word("don't"));
/// assert!(!is_word(""));
/// ```
pub fn is_word(text: &str) -> bool {
    let trimmed = text.trim();
    (1..=WORD_MAX_LEN).contains(&trimmed.len()) && trimmed.bytes().all(|b| b.is_ascii_alphabetic())
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Active processing mode of the toolbar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Translate,
    Explain,
}

impl Mode {
    /// Wire name broadcast with the `toolbarMode` event.
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Translate => "translate",
            Mode::Explain => "explain",
        }
    }
}

// ---------------------------------------------------------------------------
// LayoutSignal
// ---------------------------------------------------------------------------

/// The slice of session state the window size planner reacts to.
///
/// `revision` changes whenever displayed content changes, so a new value is
/// published even when `has_content` / `is_loading` stay the same.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutSignal {
    pub has_content: bool,
    pub is_loading: bool,
    pub revision: u64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// State of the single live session on the toolbar surface.
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// Raw input text of the current turn.
    pub query_text: String,
    pub mode: Mode,
    /// Derived from `query_text` via [`is_word`].
    pub is_word: bool,
    /// Dictionary entry, only held in translate mode for single words.
    pub word_details: Option<WordDetails>,
    /// Translated definitions keyed by `"{meaning}-{definition}"`.
    pub translated_definitions: BTreeMap<String, String>,
    /// Translated examples keyed by `"{meaning}-{definition}"`.
    pub translated_examples: BTreeMap<String, String>,
    /// Non-streamed completed result.
    pub final_result: String,
    pub stream: StreamAggregator,
    /// True until the turn's first terminal signal.
    pub is_loading: bool,
    pub selected_template_id: String,
    pub default_template_id: String,
    /// Templates available to the picker.
    pub templates: ExplainTemplates,
    /// Turn whose events are currently accepted.
    pub turn: TurnId,
    /// Turn that started the dictionary lookup owning `word_details`.
    pub word_turn: Option<TurnId>,
    /// Set once the turn's output has been handed to history.
    completed: bool,
    revision: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new turn for `text`.
    ///
    /// Clears the result, both stream buffers, the dictionary entry and both
    /// translation maps, and enters the loading state.
    pub fn begin_turn(&mut self, turn: TurnId, text: &str) {
        self.turn = turn;
        self.query_text = text.to_string();
        self.is_word = is_word(text);
        self.clear_word_details();
        self.restart_output();
    }

    /// Reset displayed output for a re-issued request under `turn`, keeping
    /// the query and the dictionary entry.
    pub fn restart(&mut self, turn: TurnId) {
        self.turn = turn;
        self.restart_output();
    }

    fn restart_output(&mut self) {
        self.final_result.clear();
        self.stream.reset();
        self.is_loading = true;
        self.completed = false;
        self.touch();
    }

    /// Mark the turn's output as complete.
    ///
    /// Returns `true` the first time it is called for a turn with something
    /// to show; a terminal signal on an empty output does not count.
    pub fn mark_completed(&mut self) -> bool {
        if self.completed || self.display_text().is_empty() {
            return false;
        }
        self.completed = true;
        true
    }

    /// Drop the dictionary entry together with everything derived from it.
    pub fn clear_word_details(&mut self) {
        self.word_details = None;
        self.word_turn = None;
        self.translated_definitions.clear();
        self.translated_examples.clear();
        self.touch();
    }

    /// Apply a non-streamed result.  Any buffered stream content is
    /// discarded unconditionally.
    pub fn apply_result(&mut self, text: &str) {
        self.final_result = text.to_string();
        self.stream.reset();
        self.is_loading = false;
        self.touch();
    }

    /// Append a stream chunk; the first non-empty chunk ends loading.
    pub fn apply_chunk(&mut self, channel: Channel, chunk: &str) {
        if self.stream.append(channel, chunk) {
            self.is_loading = false;
        }
        self.touch();
    }

    /// Terminal stream marker.  Idempotent.
    pub fn apply_done(&mut self) {
        self.is_loading = false;
        self.touch();
    }

    pub fn set_word_details(&mut self, details: Option<WordDetails>) {
        self.word_details = details;
        self.touch();
    }

    /// Merge one per-item translation.
    ///
    /// Keys not derivable from the held entry are ignored; returns whether
    /// the entry was stored.
    pub fn upsert_translation(&mut self, kind: EnrichmentKind, key: &str, text: &str) -> bool {
        if !self.owns_key(key) {
            log::debug!("session: ignoring translation for unknown key {key}");
            return false;
        }
        let map = match kind {
            EnrichmentKind::Definition => &mut self.translated_definitions,
            EnrichmentKind::Example => &mut self.translated_examples,
        };
        map.insert(key.to_string(), text.to_string());
        self.touch();
        true
    }

    fn owns_key(&self, key: &str) -> bool {
        self.word_details
            .as_ref()
            .is_some_and(|details| details.keys().iter().any(|k| k == key))
    }

    /// Install the picker templates and resolve the default id (falls back
    /// to the first template).  An empty selection adopts the default.
    pub fn set_templates(&mut self, templates: ExplainTemplates) {
        let default_id = if templates.default_template_id.is_empty() {
            templates.templates.keys().next().cloned().unwrap_or_default()
        } else {
            templates.default_template_id.clone()
        };
        self.default_template_id = default_id;
        if self.selected_template_id.is_empty() {
            self.selected_template_id = self.default_template_id.clone();
        }
        self.templates = templates;
    }

    /// Selected template, else the default, else `""`.
    pub fn resolved_template(&self) -> &str {
        if !self.selected_template_id.is_empty() {
            &self.selected_template_id
        } else {
            &self.default_template_id
        }
    }

    /// Text that is authoritative for display: the final result when
    /// present, otherwise the primary stream buffer.
    pub fn display_text(&self) -> &str {
        if self.final_result.is_empty() {
            self.stream.primary()
        } else {
            &self.final_result
        }
    }

    /// Anything to show, including the loading placeholder.
    pub fn has_content(&self) -> bool {
        !self.final_result.is_empty()
            || !self.stream.is_empty()
            || self.word_details.is_some()
            || self.is_loading
    }

    pub fn layout_signal(&self) -> LayoutSignal {
        LayoutSignal {
            has_content: self.has_content(),
            is_loading: self.is_loading,
            revision: self.revision,
        }
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

// ---------------------------------------------------------------------------
// SharedSession
// ---------------------------------------------------------------------------

/// Thread-safe handle to [`Session`].
///
/// Lock for a short critical section; do **not** hold the lock across
/// `.await` points.
pub type SharedSession = Arc<Mutex<Session>>;

pub fn new_shared_session() -> SharedSession {
    Arc::new(Mutex::new(Session::new()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TemplateInfo;
    use crate::dictionary::{Definition, Meaning};

    fn details(defs_per_meaning: &[usize]) -> WordDetails {
        WordDetails {
            phonetic: Some("/rɪˈzjuːm/".into()),
            meanings: defs_per_meaning
                .iter()
                .map(|&n| Meaning {
                    part_of_speech: "verb".into(),
                    definitions: (0..n)
                        .map(|i| Definition {
                            definition: format!("definition {i}"),
                            example: None,
                            word: None,
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    // ---- is_word ---

    #[test]
    fn is_word_accepts_letters_only() {
        assert!(is_word("resume"));
        assert!(is_word("A"));
        assert!(is_word("\tHello\n"));
        assert!(is_word(&"a".repeat(20)));
    }

    #[test]
    fn is_word_rejects_other_inputs() {
        assert!(!is_word(""));
        assert!(!is_word("   "));
        assert!(!is_word(&"a".repeat(21)));
        assert!(!is_word("hello!"));
        assert!(!is_word("two words"));
        assert!(!is_word("café"));
        assert!(!is_word("abc123"));
        assert!(!is_word("你好"));
    }

    // ---- turn lifecycle ---

    #[test]
    fn begin_turn_resets_everything() {
        let mut s = Session::new();
        s.final_result = "old".into();
        s.apply_chunk(Channel::Primary, "stream");
        s.word_details = Some(details(&[1]));
        s.translated_definitions.insert("0-0".into(), "x".into());

        s.begin_turn(TurnId::new(2), "resume");

        assert_eq!(s.turn, TurnId::new(2));
        assert_eq!(s.query_text, "resume");
        assert!(s.is_word);
        assert!(s.is_loading);
        assert!(s.final_result.is_empty());
        assert!(s.stream.is_empty());
        assert!(s.word_details.is_none());
        assert!(s.translated_definitions.is_empty());
        assert!(s.translated_examples.is_empty());
    }

    #[test]
    fn result_always_empties_stream_buffers() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "text");
        s.apply_chunk(Channel::Primary, "partial");
        s.apply_chunk(Channel::Meanings, "meanings");

        s.apply_result("final");

        assert!(s.stream.is_empty());
        assert_eq!(s.final_result, "final");
        assert_eq!(s.display_text(), "final");
        assert!(!s.is_loading);
    }

    #[test]
    fn first_chunk_ends_loading() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "hello world");
        assert!(s.is_loading);

        s.apply_chunk(Channel::Primary, "Hello ");
        assert!(!s.is_loading);
        s.apply_chunk(Channel::Primary, "world");

        assert_eq!(s.stream.primary(), "Hello world");
        assert_eq!(s.display_text(), "Hello world");
    }

    #[test]
    fn empty_first_chunk_keeps_loading() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "x y");
        s.apply_chunk(Channel::Primary, "");
        assert!(s.is_loading);
    }

    #[test]
    fn chunk_does_not_resurrect_loading() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "x y");
        s.apply_done();
        s.apply_chunk(Channel::Primary, "late");
        assert!(!s.is_loading);
    }

    #[test]
    fn done_is_idempotent() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "x y");
        s.apply_done();
        s.apply_done();
        assert!(!s.is_loading);
    }

    #[test]
    fn restart_keeps_query_and_dictionary_entry() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "resume");
        s.set_word_details(Some(details(&[1])));
        s.apply_result("done");

        s.restart(TurnId::new(2));

        assert_eq!(s.query_text, "resume");
        assert!(s.word_details.is_some());
        assert!(s.final_result.is_empty());
        assert!(s.is_loading);
        assert_eq!(s.turn, TurnId::new(2));
    }

    #[test]
    fn completion_is_marked_once_per_turn() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "hello world");
        s.apply_done();
        assert!(!s.mark_completed(), "nothing to record yet");

        s.apply_chunk(Channel::Primary, "你好世界");
        assert!(s.mark_completed());
        assert!(!s.mark_completed());

        s.restart(TurnId::new(2));
        s.apply_result("你好，世界");
        assert!(s.mark_completed());
    }

    #[test]
    fn meanings_alone_do_not_complete_a_turn() {
        let mut s = Session::new();
        s.begin_turn(TurnId::new(1), "x y");
        s.apply_chunk(Channel::Meanings, "m");
        assert!(!s.mark_completed());
    }

    // ---- enrichment maps ---

    #[test]
    fn upsert_rejects_keys_outside_entry() {
        let mut s = Session::new();
        assert!(!s.upsert_translation(EnrichmentKind::Definition, "0-0", "x"));

        s.set_word_details(Some(details(&[1, 2])));
        assert!(s.upsert_translation(EnrichmentKind::Definition, "1-1", "y"));
        assert!(!s.upsert_translation(EnrichmentKind::Example, "0-1", "z"));
        assert!(!s.upsert_translation(EnrichmentKind::Example, "2-0", "z"));
        assert_eq!(s.translated_definitions.len(), 1);
        assert!(s.translated_examples.is_empty());
    }

    #[test]
    fn enrichment_merges_are_order_independent() {
        let updates = [
            (EnrichmentKind::Definition, "0-0", "d00"),
            (EnrichmentKind::Example, "0-0", "e00"),
            (EnrichmentKind::Definition, "0-1", "d01"),
            (EnrichmentKind::Definition, "1-0", "d10"),
            (EnrichmentKind::Example, "1-0", "e10"),
        ];

        let apply = |order: &[usize]| {
            let mut s = Session::new();
            s.set_word_details(Some(details(&[2, 1])));
            for &i in order {
                let (kind, key, text) = updates[i];
                s.upsert_translation(kind, key, text);
            }
            (s.translated_definitions, s.translated_examples)
        };

        let forward = apply(&[0, 1, 2, 3, 4]);
        assert_eq!(forward, apply(&[4, 3, 2, 1, 0]));
        assert_eq!(forward, apply(&[2, 0, 4, 1, 3]));
        assert_eq!(forward.0.len(), 3);
        assert_eq!(forward.1.len(), 2);
    }

    // ---- templates ---

    fn templates(default: &str, ids: &[&str]) -> ExplainTemplates {
        ExplainTemplates {
            templates: ids
                .iter()
                .map(|id| {
                    (
                        id.to_string(),
                        TemplateInfo {
                            name: id.to_uppercase(),
                            description: String::new(),
                        },
                    )
                })
                .collect(),
            default_template_id: default.into(),
        }
    }

    #[test]
    fn templates_default_falls_back_to_first() {
        let mut s = Session::new();
        s.set_templates(templates("", &["beta", "alpha"]));
        assert_eq!(s.default_template_id, "alpha");
        assert_eq!(s.selected_template_id, "alpha");
    }

    #[test]
    fn resolved_template_precedence() {
        let mut s = Session::new();
        assert_eq!(s.resolved_template(), "");

        s.set_templates(templates("general", &["general", "programmer"]));
        assert_eq!(s.resolved_template(), "general");

        s.selected_template_id = "programmer".into();
        assert_eq!(s.resolved_template(), "programmer");

        s.selected_template_id.clear();
        assert_eq!(s.resolved_template(), "general");
    }

    #[test]
    fn loaded_templates_keep_existing_selection() {
        let mut s = Session::new();
        s.selected_template_id = "programmer".into();
        s.set_templates(templates("general", &["general", "programmer"]));
        assert_eq!(s.selected_template_id, "programmer");
    }

    // ---- layout signal ---

    #[test]
    fn layout_signal_tracks_content() {
        let mut s = Session::new();
        assert!(!s.layout_signal().has_content);

        s.begin_turn(TurnId::new(1), "x y");
        let loading = s.layout_signal();
        assert!(loading.has_content && loading.is_loading);

        s.apply_chunk(Channel::Primary, "a");
        let first = s.layout_signal();
        s.apply_chunk(Channel::Primary, "b");
        let second = s.layout_signal();
        assert!(!second.is_loading);
        assert_ne!(first.revision, second.revision);

        s.apply_done();
        s.stream.reset();
        s.final_result.clear();
        assert!(!s.layout_signal().has_content);
    }

    #[test]
    fn shared_session_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SharedSession>();
    }

    #[test]
    fn mode_wire_names() {
        assert_eq!(Mode::Translate.as_str(), "translate");
        assert_eq!(Mode::Explain.as_str(), "explain");
        assert_eq!(Mode::default(), Mode::Translate);
    }
}
