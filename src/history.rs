//! Translate / explain history.
//!
//! Each completed turn becomes one [`HistoryRecord`], appended to a JSON
//! array in `{root}/history/{translate|explain}/{YYYY-MM-DD}.json`.  Nothing
//! is written unless `[history] enabled = true`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{AppPaths, HistoryConfig};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("history file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// HistoryRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Translate,
    Explain,
}

impl RecordKind {
    fn dir_name(self) -> &'static str {
        match self {
            RecordKind::Translate => "translate",
            RecordKind::Explain => "explain",
        }
    }
}

/// One finished translate or explain turn.
///
/// Language fields are only filled for translations, `template_id` only for
/// explanations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub source_text: String,
    pub result: String,
    #[serde(default)]
    pub from_lang: String,
    #[serde(default)]
    pub to_lang: String,
    #[serde(default)]
    pub template_id: String,
    pub timestamp: DateTime<Local>,
}

impl HistoryRecord {
    pub fn translate(
        source_text: impl Into<String>,
        result: impl Into<String>,
        from_lang: impl Into<String>,
        to_lang: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: RecordKind::Translate,
            source_text: source_text.into(),
            result: result.into(),
            from_lang: from_lang.into(),
            to_lang: to_lang.into(),
            template_id: String::new(),
            timestamp: Local::now(),
        }
    }

    pub fn explain(
        source_text: impl Into<String>,
        result: impl Into<String>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: RecordKind::Explain,
            source_text: source_text.into(),
            result: result.into(),
            from_lang: String::new(),
            to_lang: String::new(),
            template_id: template_id.into(),
            timestamp: Local::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Day-file history storage.  Blocking; call from `spawn_blocking`.
#[derive(Debug)]
pub struct HistoryStore {
    enabled: bool,
    root: PathBuf,
    // Serialises read-modify-write of the day files.
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(root: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            enabled,
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Storage under `storage_path`, or the platform data directory.
    pub fn from_config(config: &HistoryConfig) -> Self {
        let root = config
            .storage_path
            .clone()
            .unwrap_or_else(|| AppPaths::new().data_dir);
        Self::new(root, config.enabled)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Day file for `kind` on `date`.
    pub fn day_file(&self, kind: RecordKind, date: NaiveDate) -> PathBuf {
        self.root
            .join("history")
            .join(kind.dir_name())
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Append `record` to its day file.
    ///
    /// Returns the file written, or `None` when history is disabled.  An
    /// existing file that does not parse is left untouched and reported.
    pub fn append(&self, record: &HistoryRecord) -> Result<Option<PathBuf>, HistoryError> {
        if !self.enabled {
            return Ok(None);
        }

        let path = self.day_file(record.kind, record.timestamp.date_naive());
        let _guard = self.write_lock.lock().unwrap();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut records = read_records(&path)?;
        records.push(record.clone());
        fs::write(&path, serde_json::to_string_pretty(&records)?)?;

        log::debug!(
            "history: saved {} record {} to {}",
            record.kind.dir_name(),
            record.id,
            path.display()
        );
        Ok(Some(path))
    }

    /// All records of `kind` saved on `date`, oldest first.
    pub fn load_day(&self, kind: RecordKind, date: NaiveDate) -> Result<Vec<HistoryRecord>, HistoryError> {
        read_records(&self.day_file(kind, date))
    }
}

fn read_records(path: &Path) -> Result<Vec<HistoryRecord>, HistoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&content)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[test]
    fn translate_record_goes_to_todays_translate_file() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path(), true);

        let record = HistoryRecord::translate("Hello world", "你好世界", "en", "zh");
        let path = store.append(&record).unwrap().expect("enabled store writes");

        assert!(path.starts_with(dir.path().join("history").join("translate")));
        assert!(path.exists());
        let saved = store.load_day(RecordKind::Translate, record.timestamp.date_naive()).unwrap();
        assert_eq!(saved, vec![record]);
    }

    #[test]
    fn explain_record_keeps_template_and_result() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path(), true);

        let record = HistoryRecord::explain("machine learning", "A branch of AI.", "general");
        store.append(&record).unwrap();

        let saved = store.load_day(RecordKind::Explain, record.timestamp.date_naive()).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].template_id, "general");
        assert_eq!(saved[0].result, "A branch of AI.");
        assert!(saved[0].from_lang.is_empty());
        assert!(store
            .load_day(RecordKind::Translate, today())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn records_accumulate_in_order() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path(), true);

        let first = HistoryRecord::translate("one", "一", "auto", "zh");
        let second = HistoryRecord::translate("two", "二", "auto", "zh");
        store.append(&first).unwrap();
        store.append(&second).unwrap();

        let saved = store.load_day(RecordKind::Translate, first.timestamp.date_naive()).unwrap();
        let sources: Vec<_> = saved.iter().map(|r| r.source_text.as_str()).collect();
        assert_eq!(sources, vec!["one", "two"]);
        assert_ne!(saved[0].id, saved[1].id);
    }

    #[test]
    fn disabled_store_writes_nothing() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path(), false);

        let written = store
            .append(&HistoryRecord::translate("Hello", "你好", "en", "zh"))
            .unwrap();

        assert!(written.is_none());
        assert!(!dir.path().join("history").exists());
    }

    #[test]
    fn corrupt_day_file_is_reported_and_kept() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path(), true);
        let record = HistoryRecord::translate("Hello", "你好", "en", "zh");

        let path = store.day_file(RecordKind::Translate, record.timestamp.date_naive());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "[{not json").unwrap();

        assert!(matches!(store.append(&record), Err(HistoryError::Json(_))));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[{not json");
    }

    #[test]
    fn file_uses_snake_case_fields_and_type_tag() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::new(dir.path(), true);
        let path = store
            .append(&HistoryRecord::explain("raft", "Consensus.", "programmer"))
            .unwrap()
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json[0]["type"], "explain");
        assert_eq!(json[0]["source_text"], "raft");
        assert_eq!(json[0]["template_id"], "programmer");
        assert!(json[0]["timestamp"].is_string());
    }

    #[test]
    fn from_config_uses_storage_path() {
        let dir = tempdir().expect("temp dir");
        let store = HistoryStore::from_config(&HistoryConfig {
            enabled: true,
            storage_path: Some(dir.path().to_path_buf()),
        });

        assert!(store.is_enabled());
        assert!(store
            .day_file(RecordKind::Explain, today())
            .starts_with(dir.path()));
    }
}
