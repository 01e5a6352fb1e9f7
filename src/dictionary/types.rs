//! Dictionary entry types, as returned by the Free Dictionary API.
//!
//! Only the fields the toolbar renders are modelled; everything else in the
//! upstream JSON (phonetics audio, synonyms, licence, ...) is ignored.

use serde::{Deserialize, Serialize};

/// One dictionary entry for a word.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordDetails {
    #[serde(default)]
    pub phonetic: Option<String>,
    #[serde(default)]
    pub meanings: Vec<Meaning>,
}

/// All definitions for one part of speech.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meaning {
    #[serde(default)]
    pub part_of_speech: String,
    #[serde(default)]
    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definition {
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub example: Option<String>,
    /// Present on "tail" translation blocks.
    #[serde(default)]
    pub word: Option<String>,
}

/// Key of a definition in the translation maps: `"{meaning}-{definition}"`.
pub fn entry_key(meaning_index: usize, definition_index: usize) -> String {
    format!("{meaning_index}-{definition_index}")
}

impl WordDetails {
    /// Every key derivable from this entry, in document order.
    pub fn keys(&self) -> Vec<String> {
        self.meanings
            .iter()
            .enumerate()
            .flat_map(|(mi, meaning)| (0..meaning.definitions.len()).map(move |di| entry_key(mi, di)))
            .collect()
    }

    /// The definition addressed by an [`entry_key`].
    pub fn definition(&self, key: &str) -> Option<&Definition> {
        let (mi, di) = key.split_once('-')?;
        let (mi, di): (usize, usize) = (mi.parse().ok()?, di.parse().ok()?);
        self.meanings.get(mi)?.definitions.get(di)
    }
}
