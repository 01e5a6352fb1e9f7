//! Translation backend: the outbound capability calls of the toolbar.
//!
//! This module provides:
//! * [`TranslateBackend`] — async trait for streamed translate / explain
//!   requests, one-shot meaning translations and template discovery.
//! * [`LlmBackend`] — OpenAI-compatible `/chat/completions` implementation.
//! * [`PromptBuilder`] — translate, explain and meanings prompts.
//! * [`SseParser`] — incremental `data:` line parser for streamed replies.
//! * [`BackendError`] — error variants for backend calls.
//!
//! Streamed results are not returned from the trait methods; they are posted
//! to the session inbox as `StreamChunk` / `StreamDone` events tagged with
//! the request's turn.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ExplainConfig;
use crate::session::{SessionClosed, TurnId};

pub mod llm;
pub mod prompt;
pub mod sse;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use llm::LlmBackend;
pub use prompt::PromptBuilder;
pub use sse::{SseEvent, SseParser};

// ---------------------------------------------------------------------------
// BackendError
// ---------------------------------------------------------------------------

/// Errors that can occur during a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("backend request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status.
    #[error("backend returned HTTP {0}")]
    Status(u16),

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse backend response: {0}")]
    Parse(String),

    /// The backend returned a response with no usable text content.
    #[error("backend returned an empty response")]
    EmptyResponse,

    /// The session stopped accepting events mid-request.
    #[error("session closed")]
    Closed,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Request(e.to_string())
        }
    }
}

impl From<SessionClosed> for BackendError {
    fn from(_: SessionClosed) -> Self {
        BackendError::Closed
    }
}

// ---------------------------------------------------------------------------
// Explain templates
// ---------------------------------------------------------------------------

/// Picker entry for one explain template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Result of `get_explain_templates`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainTemplates {
    pub templates: BTreeMap<String, TemplateInfo>,
    #[serde(rename = "default_template", default)]
    pub default_template_id: String,
}

impl From<&ExplainConfig> for ExplainTemplates {
    fn from(config: &ExplainConfig) -> Self {
        Self {
            templates: config
                .templates
                .iter()
                .map(|(id, t)| {
                    (
                        id.clone(),
                        TemplateInfo {
                            name: t.name.clone(),
                            description: t.description.clone(),
                        },
                    )
                })
                .collect(),
            default_template_id: config.default_template.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// TranslateBackend trait
// ---------------------------------------------------------------------------

/// Outbound calls the session makes.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn TranslateBackend>`).
#[async_trait]
pub trait TranslateBackend: Send + Sync {
    /// Stream a translation of `text`; chunks arrive as session events for
    /// `turn`.
    async fn translate_stream(
        &self,
        text: &str,
        from: &str,
        to: &str,
        turn: TurnId,
    ) -> Result<(), BackendError>;

    /// Stream an explanation of `text` using `template_id` (`""` = built-in).
    async fn explain_stream(
        &self,
        text: &str,
        template_id: &str,
        turn: TurnId,
    ) -> Result<(), BackendError>;

    /// Translate one short text item and return the whole result.
    async fn translate_meanings(&self, text: &str, from: &str, to: &str)
        -> Result<String, BackendError>;

    async fn get_explain_templates(&self) -> Result<ExplainTemplates, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_from_config_drop_prompts() {
        let templates = ExplainTemplates::from(&ExplainConfig::default());

        assert_eq!(templates.default_template_id, "programmer");
        assert_eq!(templates.templates.len(), 2);
        assert_eq!(templates.templates["general"].name, "General");
    }

    #[test]
    fn templates_wire_format() {
        let json = r#"{
            "templates": {"programmer": {"name": "Programmer", "description": "d"}},
            "default_template": "programmer"
        }"#;
        let parsed: ExplainTemplates = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.default_template_id, "programmer");
        assert_eq!(parsed.templates["programmer"].description, "d");
    }

    #[test]
    fn timeout_maps_to_dedicated_variant() {
        assert_eq!(BackendError::Timeout.to_string(), "backend request timed out");
        assert_eq!(BackendError::Status(429).to_string(), "backend returned HTTP 429");
    }
}
