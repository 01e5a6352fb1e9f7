//! Session controller: drives the toolbar session from its event inbox.
//!
//! [`SessionController`] owns the [`SharedSession`] and consumes
//! [`SessionEvent`]s from a bounded `tokio::sync::mpsc` inbox.
//!
//! # Event flow
//!
//! ```text
//! Query(turn)
//!   └─▶ begin turn, isLoading = true
//!         ├─ translate     → spawn translate_stream(from, to)
//!         │   └─ single word → spawn dictionary lookup ─▶ WordDetailsReady
//!         │                       └─▶ enrich_all ─▶ EnrichmentReady × N
//!         └─ explain       → spawn explain_stream(resolved template)
//!
//! Result / StreamChunk / StreamDone(turn)
//!   └─▶ applied only when turn == current turn
//!         └─ first terminal event with output → history record
//!
//! ModeChange / TemplateChange (explain mode only)
//!   └─▶ fresh turn, reset output, re-issue request for the current query
//! ```
//!
//! The mode lives only in [`Session`]; the request for a query is chosen
//! when the controller reaches that query in the inbox, so a mode switch
//! posted just before it always applies.
//!
//! [`handle`](SessionController::handle) is a synchronous reducer: it
//! mutates state under a short lock, then spawns the resulting background
//! work.  Every background task reports back through the same inbox, so all
//! state mutation stays on the controller's task.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::backend::TranslateBackend;
use crate::config::AppConfig;
use crate::dictionary::{DictionaryEnrichment, WordDetails};
use crate::history::{HistoryRecord, HistoryStore};
use crate::session::{
    new_shared_session, LayoutSignal, Mode, Session, SessionEvent, SessionHandle, SessionInbox,
    SharedSession, TurnId, WeakSessionHandle,
};

/// Capacity of the `toolbarMode` broadcast.
const MODE_CHANNEL_CAPACITY: usize = 16;

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

/// Background work requested by the reducer.
#[derive(Debug, Clone, PartialEq)]
enum Effect {
    Translate { text: String, turn: TurnId },
    Explain { text: String, template: String, turn: TurnId },
    LookupWord { word: String, turn: TurnId },
    Enrich { details: WordDetails, turn: TurnId },
    BroadcastMode(Mode),
    Record(HistoryRecord),
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Create with [`SessionController::new`], then spawn [`run`](Self::run).
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use translate_toolbar::backend::{LlmBackend, TranslateBackend};
/// use translate_toolbar::config::AppConfig;
/// use translate_toolbar::dictionary::{DictionaryEnrichment, FreeDictionaryClient};
/// use translate_toolbar::session::{self, SessionController};
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let (handle, inbox) = session::channel(config.toolbar.event_capacity);
///
/// let backend: Arc<dyn TranslateBackend> = Arc::new(LlmBackend::from_config(&config, &handle));
/// let dictionary = Arc::new(FreeDictionaryClient::from_config(&config.dictionary));
/// let enrichment = Arc::new(DictionaryEnrichment::new(dictionary, backend.clone(), &config.translate));
///
/// let controller = SessionController::new(&config, backend, enrichment, &handle, inbox);
/// tokio::spawn(controller.run());
/// # }
/// ```
pub struct SessionController {
    state: SharedSession,
    backend: Arc<dyn TranslateBackend>,
    enrichment: Arc<DictionaryEnrichment>,
    events: WeakSessionHandle,
    inbox: SessionInbox,
    layout_tx: watch::Sender<LayoutSignal>,
    mode_tx: broadcast::Sender<Mode>,
    history: Arc<HistoryStore>,
    from_lang: String,
    to_lang: String,
}

impl SessionController {
    /// Create a new controller.
    ///
    /// # Arguments
    ///
    /// * `backend`    — translate / explain stream requests.
    /// * `enrichment` — dictionary lookup and per-item translation.
    /// * `handle`     — sender paired with `inbox`; only a weak reference is
    ///                  kept so [`run`](Self::run) ends once every strong
    ///                  handle is dropped.
    pub fn new(
        config: &AppConfig,
        backend: Arc<dyn TranslateBackend>,
        enrichment: Arc<DictionaryEnrichment>,
        handle: &SessionHandle,
        inbox: SessionInbox,
    ) -> Self {
        let (layout_tx, _) = watch::channel(LayoutSignal::default());
        let (mode_tx, _) = broadcast::channel(MODE_CHANNEL_CAPACITY);

        Self {
            state: new_shared_session(),
            backend,
            enrichment,
            events: handle.downgrade(),
            inbox,
            layout_tx,
            mode_tx,
            history: Arc::new(HistoryStore::from_config(&config.history)),
            from_lang: config.translate.from_lang.clone(),
            to_lang: config.translate.to_lang.clone(),
        }
    }

    /// Replace the history store built from the config.
    pub fn with_history(mut self, history: Arc<HistoryStore>) -> Self {
        self.history = history;
        self
    }

    /// Shared session state, for rendering.
    pub fn state(&self) -> SharedSession {
        Arc::clone(&self.state)
    }

    /// Layout-relevant state, updated after every event that changes it.
    pub fn subscribe_layout(&self) -> watch::Receiver<LayoutSignal> {
        self.layout_tx.subscribe()
    }

    /// `toolbarMode` broadcast.
    pub fn subscribe_mode(&self) -> broadcast::Receiver<Mode> {
        self.mode_tx.subscribe()
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Load explain templates, then process events until every strong
    /// [`SessionHandle`] is gone.
    pub async fn run(mut self) {
        self.spawn_template_load();

        while let Some(event) = self.inbox.recv().await {
            self.handle(event);
        }

        log::info!("session: inbox closed, controller shutting down");
    }

    fn spawn_template_load(&self) {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            match backend.get_explain_templates().await {
                Ok(templates) => {
                    let _ = events.send(SessionEvent::TemplatesLoaded(templates)).await;
                }
                Err(e) => log::warn!("session: failed to load explain templates: {e}"),
            }
        });
    }

    // -----------------------------------------------------------------------
    // Reducer
    // -----------------------------------------------------------------------

    /// Apply one event and start any background work it implies.
    pub fn handle(&mut self, event: SessionEvent) {
        log::trace!("session: {}", event.name());

        let effects = self.reduce(event);
        self.publish_layout();
        for effect in effects {
            self.perform(effect);
        }
    }

    fn reduce(&self, event: SessionEvent) -> Vec<Effect> {
        let mut st = self.state.lock().unwrap();
        let mut effects = Vec::new();

        match event {
            SessionEvent::Query { turn, text } => {
                if turn < st.turn {
                    log::debug!("session: dropping query for superseded turn {turn}");
                    return effects;
                }
                st.begin_turn(turn, &text);

                let mode = st.mode;
                match mode {
                    Mode::Translate => {
                        if st.is_word {
                            st.word_turn = Some(turn);
                            effects.push(Effect::LookupWord {
                                word: text.trim().to_string(),
                                turn,
                            });
                        }
                        effects.push(Effect::Translate { text, turn });
                    }
                    Mode::Explain => effects.push(Effect::Explain {
                        text,
                        template: st.resolved_template().to_string(),
                        turn,
                    }),
                }
            }

            SessionEvent::Result { turn, text } => {
                if is_current(&st, turn, "result") {
                    st.apply_result(&text);
                    effects.extend(self.completion(&mut st));
                }
            }

            SessionEvent::StreamChunk {
                turn,
                channel,
                chunk,
            } => {
                if is_current(&st, turn, "chunk") {
                    st.apply_chunk(channel, &chunk);
                }
            }

            SessionEvent::StreamDone { turn } => {
                if is_current(&st, turn, "done") {
                    st.apply_done();
                    effects.extend(self.completion(&mut st));
                }
            }

            SessionEvent::ModeChange(mode) => {
                if st.mode == mode {
                    return effects;
                }
                st.mode = mode;
                effects.push(Effect::BroadcastMode(mode));

                if mode == Mode::Explain {
                    st.clear_word_details();
                }
                if !st.query_text.is_empty() {
                    let turn = self.events.clock().advance();
                    st.restart(turn);
                    let text = st.query_text.clone();
                    effects.push(match mode {
                        Mode::Translate => Effect::Translate { text, turn },
                        Mode::Explain => Effect::Explain {
                            text,
                            template: st.resolved_template().to_string(),
                            turn,
                        },
                    });
                }
            }

            SessionEvent::TemplateChange(id) => {
                st.selected_template_id = id;
                if st.mode == Mode::Explain && !st.query_text.is_empty() {
                    let turn = self.events.clock().advance();
                    st.restart(turn);
                    effects.push(Effect::Explain {
                        text: st.query_text.clone(),
                        template: st.resolved_template().to_string(),
                        turn,
                    });
                }
            }

            SessionEvent::TemplatesLoaded(templates) => {
                log::debug!("session: {} explain templates loaded", templates.templates.len());
                st.set_templates(templates);
            }

            SessionEvent::WordDetailsReady { turn, details } => {
                if st.word_turn != Some(turn) {
                    log::debug!("session: dropping dictionary entry for turn {turn}");
                    return effects;
                }
                st.set_word_details(details.clone());
                if let Some(details) = details {
                    effects.push(Effect::Enrich { details, turn });
                }
            }

            SessionEvent::EnrichmentReady {
                turn,
                key,
                kind,
                text,
            } => {
                if st.word_turn != Some(turn) {
                    log::debug!("session: dropping {kind:?} {key} for turn {turn}");
                    return effects;
                }
                st.upsert_translation(kind, &key, &text);
            }
        }

        effects
    }

    /// History record for the turn's output, once per turn.
    fn completion(&self, st: &mut Session) -> Option<Effect> {
        if !st.mark_completed() {
            return None;
        }
        let result = st.display_text().to_string();
        let record = match st.mode {
            Mode::Translate => {
                HistoryRecord::translate(&st.query_text, result, &self.from_lang, &self.to_lang)
            }
            Mode::Explain => {
                HistoryRecord::explain(&st.query_text, result, st.resolved_template())
            }
        };
        Some(Effect::Record(record))
    }

    fn publish_layout(&self) {
        let signal = self.state.lock().unwrap().layout_signal();
        self.layout_tx.send_if_modified(|current| {
            if *current == signal {
                return false;
            }
            *current = signal;
            true
        });
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    fn perform(&self, effect: Effect) {
        match effect {
            Effect::Translate { text, turn } => {
                let backend = Arc::clone(&self.backend);
                let from = self.from_lang.clone();
                let to = self.to_lang.clone();
                tokio::spawn(async move {
                    if let Err(e) = backend.translate_stream(&text, &from, &to, turn).await {
                        log::warn!("session: translate request for turn {turn} failed: {e}");
                    }
                });
            }

            Effect::Explain {
                text,
                template,
                turn,
            } => {
                let backend = Arc::clone(&self.backend);
                tokio::spawn(async move {
                    if let Err(e) = backend.explain_stream(&text, &template, turn).await {
                        log::warn!("session: explain request for turn {turn} failed: {e}");
                    }
                });
            }

            Effect::LookupWord { word, turn } => {
                let Some(events) = self.events.upgrade() else {
                    return;
                };
                let enrichment = Arc::clone(&self.enrichment);
                tokio::spawn(async move {
                    let details = enrichment.fetch(&word).await;
                    let _ = events
                        .send(SessionEvent::WordDetailsReady { turn, details })
                        .await;
                });
            }

            Effect::Enrich { details, turn } => {
                if let Some(events) = self.events.upgrade() {
                    self.enrichment.enrich_all(&details, turn, events);
                }
            }

            Effect::BroadcastMode(mode) => {
                // Err only means nobody is subscribed.
                let _ = self.mode_tx.send(mode);
                log::info!("session: mode -> {}", mode.as_str());
            }

            Effect::Record(record) => {
                if !self.history.is_enabled() {
                    return;
                }
                let history = Arc::clone(&self.history);
                tokio::task::spawn_blocking(move || {
                    if let Err(e) = history.append(&record) {
                        log::warn!("session: history not saved: {e}");
                    }
                });
            }
        }
    }
}

fn is_current(st: &Session, turn: TurnId, what: &str) -> bool {
    if turn == st.turn {
        return true;
    }
    log::debug!("session: dropping {what} for turn {turn} (current {})", st.turn);
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
