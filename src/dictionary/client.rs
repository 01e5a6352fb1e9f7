//! Dictionary lookup collaborator.
//!
//! [`FreeDictionaryClient`] queries `api.dictionaryapi.dev`.  Any non-success
//! status (including the 404 the API returns for unknown words) is treated as
//! "no entry" rather than an error.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::DictionaryConfig;
use crate::dictionary::WordDetails;

/// Errors from a dictionary lookup.
#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("dictionary request failed: {0}")]
    Request(String),

    #[error("dictionary request timed out")]
    Timeout,

    #[error("invalid dictionary URL: {0}")]
    Url(String),

    #[error("failed to parse dictionary response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DictionaryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DictionaryError::Timeout
        } else {
            DictionaryError::Request(e.to_string())
        }
    }
}

/// Looks a single word up.  `Ok(None)` means the dictionary has no entry.
#[async_trait]
pub trait DictionaryClient: Send + Sync {
    async fn lookup(&self, word: &str) -> Result<Option<WordDetails>, DictionaryError>;
}

/// Free Dictionary API client.
pub struct FreeDictionaryClient {
    client: reqwest::Client,
    base_url: String,
}

impl FreeDictionaryClient {
    pub fn from_config(config: &DictionaryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    fn entry_url(&self, word: &str) -> Result<reqwest::Url, DictionaryError> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| DictionaryError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| DictionaryError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push(word);
        Ok(url)
    }
}

#[async_trait]
impl DictionaryClient for FreeDictionaryClient {
    async fn lookup(&self, word: &str) -> Result<Option<WordDetails>, DictionaryError> {
        let url = self.entry_url(word)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            log::debug!("dictionary: {word} -> HTTP {}", response.status());
            return Ok(None);
        }

        let entries: Vec<WordDetails> = response
            .json()
            .await
            .map_err(|e| DictionaryError::Parse(e.to_string()))?;

        Ok(entries.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> FreeDictionaryClient {
        FreeDictionaryClient::from_config(&DictionaryConfig {
            base_url: base.into(),
            timeout_secs: 5,
        })
    }

    #[test]
    fn entry_url_appends_word() {
        let url = client("https://api.dictionaryapi.dev/api/v2/entries/en")
            .entry_url("resume")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.dictionaryapi.dev/api/v2/entries/en/resume"
        );
    }

    #[test]
    fn entry_url_tolerates_trailing_slash() {
        let url = client("https://example.test/entries/en/").entry_url("word").unwrap();
        assert_eq!(url.as_str(), "https://example.test/entries/en/word");
    }

    #[test]
    fn client_is_object_safe() {
        let _: Box<dyn DictionaryClient> = Box::new(client("https://example.test"));
    }
}
