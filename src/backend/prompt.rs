//! Prompt builder for translate, explain and meanings requests.
//!
//! Every builder method returns a `(system_msg, user_msg)` pair for an
//! OpenAI-compatible `/chat/completions` endpoint.  Explain prompts come from
//! the configured templates; `{text}` in a template body is replaced with the
//! query text.  Unknown or empty template ids fall back to the built-in
//! programmer-oriented explanation.

use std::collections::BTreeMap;

use crate::config::{ExplainConfig, TemplateConfig};

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const TRANSLATE_INSTRUCTION: &str = "\
You are a professional translator.
Please translate the following text accurately and naturally.
Keep the original meaning, tone, and formatting.
Do not explain or add anything else.";

/// Appended when the source language is `auto`.
const AUTO_DIRECTION: &str = "\
If the text is Chinese, translate to English.
If the text is English, translate to Chinese.";

const EXPLAIN_INSTRUCTION: &str = "\
You explain terms concisely and accurately. Reply with the explanation only.";

const BUILTIN_EXPLAIN: &str = "\
You are a senior programmer with a deep understanding of computer systems, networking, \
programming languages and engineering practice.
Explain the following technical term in a concise, professional way a programmer can grasp quickly:
1. From a programmer's point of view, what it is and its core mechanism
2. Where it is commonly used in real development or systems
3. Keep it to 3-5 sentences, straight to the point
Term: {text}";

const MEANINGS_INSTRUCTION: &str = "\
You are a dictionary translator. Reply with ONLY the translation, \
no quotes, notes or explanation.";

// ---------------------------------------------------------------------------
// Language names
// ---------------------------------------------------------------------------

fn language_name(code: &str) -> &str {
    match code {
        "zh" => "Chinese",
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "fr" => "French",
        "de" => "German",
        "es" => "Spanish",
        "ru" => "Russian",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds chat prompts for every backend request kind.
///
/// # Example
/// ```rust
/// use translate_toolbar::backend::PromptBuilder;
/// use translate_toolbar::config::ExplainConfig;
///
/// let builder = PromptBuilder::new(&ExplainConfig::default());
/// let (_, user) = builder.explain("mutex", "general");
/// assert!(user.contains("mutex"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    templates: BTreeMap<String, TemplateConfig>,
}

impl PromptBuilder {
    pub fn new(explain: &ExplainConfig) -> Self {
        Self {
            templates: explain.templates.clone(),
        }
    }

    /// Streamed translation prompt.  `from == "auto"` lets the model pick
    /// the direction between Chinese and English.
    pub fn translate(&self, text: &str, from: &str, to: &str) -> (String, String) {
        let mut system = String::from(TRANSLATE_INSTRUCTION);
        system.push_str("\n\n");
        if from == "auto" || from.is_empty() {
            system.push_str(AUTO_DIRECTION);
        } else {
            system.push_str(&format!(
                "Translate from {} to {}.",
                language_name(from),
                language_name(to)
            ));
        }

        (system, format!("Text:\n{text}"))
    }

    /// Explain prompt for `template_id`.
    pub fn explain(&self, text: &str, template_id: &str) -> (String, String) {
        let body = match self.templates.get(template_id) {
            Some(t) if !t.prompt.trim().is_empty() => t.prompt.as_str(),
            _ => {
                if !template_id.is_empty() {
                    log::debug!("prompt: unknown template {template_id:?}, using built-in");
                }
                BUILTIN_EXPLAIN
            }
        };

        let user = if body.contains("{text}") {
            body.replace("{text}", text)
        } else {
            format!("{body}\n{text}")
        };

        (EXPLAIN_INSTRUCTION.to_string(), user)
    }

    /// One-shot translation of a dictionary definition or example.
    pub fn meanings(&self, text: &str, from: &str, to: &str) -> (String, String) {
        let user = format!(
            "Translate from {} to {}:\n{text}",
            language_name(from),
            language_name(to)
        );
        (MEANINGS_INSTRUCTION.to_string(), user)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
