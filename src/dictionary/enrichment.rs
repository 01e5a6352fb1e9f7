//! Dictionary enrichment: lookup plus parallel per-item translation.
//!
//! [`DictionaryEnrichment::enrich_all`] issues one independent translation
//! request per definition and per example, all at once.  Each completion is
//! posted back to the session as an
//! [`EnrichmentReady`](crate::session::SessionEvent::EnrichmentReady) event
//! tagged with the turn that owns the entry, and the controller merges it
//! into the matching map.  Failed items are logged and simply never arrive.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::backend::TranslateBackend;
use crate::config::TranslateConfig;
use crate::dictionary::{entry_key, DictionaryClient, WordDetails};
use crate::session::{EnrichmentKind, SessionEvent, SessionHandle, TurnId};

/// One text item to translate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationTask {
    pub key: String,
    pub kind: EnrichmentKind,
    pub text: String,
}

/// Collect every non-empty definition and example in `details`.
pub fn plan_translations(details: &WordDetails) -> Vec<TranslationTask> {
    let mut tasks = Vec::new();
    for (mi, meaning) in details.meanings.iter().enumerate() {
        for (di, def) in meaning.definitions.iter().enumerate() {
            let key = entry_key(mi, di);
            if !def.definition.is_empty() {
                tasks.push(TranslationTask {
                    key: key.clone(),
                    kind: EnrichmentKind::Definition,
                    text: def.definition.clone(),
                });
            }
            if let Some(example) = def.example.as_deref().filter(|e| !e.is_empty()) {
                tasks.push(TranslationTask {
                    key,
                    kind: EnrichmentKind::Example,
                    text: example.to_string(),
                });
            }
        }
    }
    tasks
}

/// Fetches dictionary entries and translates their contents.
pub struct DictionaryEnrichment {
    dictionary: Arc<dyn DictionaryClient>,
    translator: Arc<dyn TranslateBackend>,
    from_lang: String,
    to_lang: String,
}

impl DictionaryEnrichment {
    pub fn new(
        dictionary: Arc<dyn DictionaryClient>,
        translator: Arc<dyn TranslateBackend>,
        config: &TranslateConfig,
    ) -> Self {
        Self {
            dictionary,
            translator,
            from_lang: config.meanings_from.clone(),
            to_lang: config.meanings_to.clone(),
        }
    }

    /// Look `word` up.  Failures are logged and reported as `None`.
    pub async fn fetch(&self, word: &str) -> Option<WordDetails> {
        match self.dictionary.lookup(word).await {
            Ok(details) => details,
            Err(e) => {
                log::warn!("enrich: dictionary lookup for {word:?} failed: {e}");
                None
            }
        }
    }

    /// Spawn one translation task per item of `details`.
    ///
    /// Fire-and-forget: the returned handles are only useful to tests.
    pub fn enrich_all(
        &self,
        details: &WordDetails,
        turn: TurnId,
        events: SessionHandle,
    ) -> Vec<JoinHandle<()>> {
        let tasks = plan_translations(details);
        log::debug!("enrich: {} translation requests for turn {turn}", tasks.len());

        tasks
            .into_iter()
            .map(|task| {
                let translator = Arc::clone(&self.translator);
                let events = events.clone();
                let from = self.from_lang.clone();
                let to = self.to_lang.clone();

                tokio::spawn(async move {
                    match translator.translate_meanings(&task.text, &from, &to).await {
                        Ok(text) => {
                            let event = SessionEvent::EnrichmentReady {
                                turn,
                                key: task.key,
                                kind: task.kind,
                                text,
                            };
                            if events.send(event).await.is_err() {
                                log::debug!("enrich: session closed before result arrived");
                            }
                        }
                        Err(e) => {
                            log::warn!("enrich: {:?} {} failed: {e}", task.kind, task.key);
                        }
                    }
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
