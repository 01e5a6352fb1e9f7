//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// LlmConfig
// ---------------------------------------------------------------------------

/// Connection settings for the OpenAI-compatible translation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the API endpoint (without the `/chat/completions` path).
    ///
    /// - DeepSeek default: `https://api.deepseek.com`
    /// - OpenAI: `https://api.openai.com/v1`
    pub base_url: String,
    /// API key — `None` for local providers such as Ollama.
    pub api_key: Option<String>,
    /// Model identifier sent to the API (e.g. `"deepseek-chat"`).
    pub model: String,
    /// Sampling temperature (0.0 – 1.0).
    pub temperature: f32,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".into(),
            api_key: None,
            model: "deepseek-chat".into(),
            temperature: 0.3,
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// TranslateConfig
// ---------------------------------------------------------------------------

/// Language pairs used by the translate requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Source language of streamed translations (`"auto"` = detect).
    pub from_lang: String,
    /// Target language of streamed translations.
    pub to_lang: String,
    /// Source language of dictionary definitions / examples.
    pub meanings_from: String,
    /// Target language of dictionary definitions / examples.
    pub meanings_to: String,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            from_lang: "auto".into(),
            to_lang: "zh".into(),
            meanings_from: "en".into(),
            meanings_to: "zh".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExplainConfig
// ---------------------------------------------------------------------------

/// A single explain-mode prompt template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Display name shown in the template picker.
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Prompt body; `{text}` is replaced with the query text.
    pub prompt: String,
}

/// Explain-mode templates keyed by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainConfig {
    pub templates: BTreeMap<String, TemplateConfig>,
    /// Id of the template used when none is selected.  Empty means "first".
    pub default_template: String,
}

impl Default for ExplainConfig {
    fn default() -> Self {
        let mut templates = BTreeMap::new();
        templates.insert(
            "programmer".to_string(),
            TemplateConfig {
                name: "Programmer".into(),
                description: "Explain a technical term from a programmer's point of view".into(),
                prompt: "You are a senior engineer with deep knowledge of systems, networking, \
                         programming languages and engineering practice.\n\
                         Explain the following technical term concisely for a programmer:\n\
                         1. What it is and its core mechanism\n\
                         2. Where it is commonly used in practice\n\
                         3. Keep it to 3-5 sentences.\n\
                         Term: {text}"
                    .into(),
            },
        );
        templates.insert(
            "general".to_string(),
            TemplateConfig {
                name: "General".into(),
                description: "Plain-language explanation".into(),
                prompt: "Explain the following term in clear, simple language in 3-5 sentences:\n\
                         1. What it is\n\
                         2. What it is used for\n\
                         Term: {text}"
                    .into(),
            },
        );
        Self {
            templates,
            default_template: "programmer".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// DictionaryConfig / TtsConfig
// ---------------------------------------------------------------------------

/// Free Dictionary API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Entry endpoint; the word is appended as the last path segment.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.dictionaryapi.dev/api/v2/entries/en".into(),
            timeout_secs: 10,
        }
    }
}

/// Lingva text-to-speech settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lingva.ml".into(),
            timeout_secs: 15,
        }
    }
}

// ---------------------------------------------------------------------------
// ToolbarConfig
// ---------------------------------------------------------------------------

/// Toolbar surface behaviour and timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolbarConfig {
    /// Persisted "always on top" flag.
    pub pinned: bool,
    /// Fixed surface height while a request is loading, in pixels.
    pub loading_height: u32,
    /// Upper bound for the measured content height, in pixels.
    pub max_content_height: u32,
    /// Debounce before re-measuring content after a state change.
    pub debounce_ms: u64,
    /// Delay before hiding an empty surface.
    pub hide_delay_ms: u64,
    /// How long the "copied" indicator stays on.
    pub copy_reset_ms: u64,
    /// How long playback flags stay on after a playback attempt.
    pub playing_reset_ms: u64,
    /// Capacity of the session event inbox.
    pub event_capacity: usize,
}

impl Default for ToolbarConfig {
    fn default() -> Self {
        Self {
            pinned: false,
            loading_height: 50,
            max_content_height: 500,
            debounce_ms: 50,
            hide_delay_ms: 100,
            copy_reset_ms: 2_000,
            playing_reset_ms: 1_000,
            event_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryConfig
// ---------------------------------------------------------------------------

/// Translate / explain history written after each completed turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Off unless explicitly enabled.
    pub enabled: bool,
    /// Root directory for the `history/` tree.  `None` uses the platform
    /// data directory.
    pub storage_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use translate_toolbar::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub translate: TranslateConfig,
    pub explain: ExplainConfig,
    pub dictionary: DictionaryConfig,
    pub tts: TtsConfig,
    pub toolbar: ToolbarConfig,
    pub history: HistoryConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
