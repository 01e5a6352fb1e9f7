//! `LlmBackend`: [`TranslateBackend`] over an OpenAI-compatible API.
//!
//! Works with DeepSeek (the default), OpenAI, Ollama (OpenAI mode), Groq,
//! LM Studio, vLLM, ... any provider that speaks the chat-completions wire
//! format.  All connection details come from [`LlmConfig`].
//!
//! Streamed requests forward each content delta to the session as a
//! primary-channel chunk for the request's turn and always finish with a
//! `StreamDone`, also when the request fails after it was sent.

use async_trait::async_trait;
use futures::StreamExt;

use crate::backend::{
    BackendError, ExplainTemplates, PromptBuilder, SseEvent, SseParser, TranslateBackend,
};
use crate::config::{AppConfig, LlmConfig};
use crate::session::{Channel, SessionHandle, TurnId, WeakSessionHandle};

/// Upper bound for one-shot meaning translations.
const MEANINGS_MAX_TOKENS: u32 = 256;

pub struct LlmBackend {
    client: reqwest::Client,
    config: LlmConfig,
    prompts: PromptBuilder,
    templates: ExplainTemplates,
    /// Weak so that the backend never keeps the session inbox open.
    events: WeakSessionHandle,
}

impl LlmBackend {
    /// Build an `LlmBackend` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.llm.timeout_secs`.  A default client is used as a last-resort
    /// fallback if the builder fails.
    pub fn from_config(config: &AppConfig, events: &SessionHandle) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.llm.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self::with_client(client, config, events)
    }

    pub fn with_client(client: reqwest::Client, config: &AppConfig, events: &SessionHandle) -> Self {
        Self {
            client,
            config: config.llm.clone(),
            prompts: PromptBuilder::new(&config.explain),
            templates: ExplainTemplates::from(&config.explain),
            events: events.downgrade(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Build a chat request.  The `Authorization: Bearer …` header is
    /// attached only when `api_key` is a non-empty string.
    fn request(&self, system: &str, user: &str, stream: bool) -> reqwest::RequestBuilder {
        let mut body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user",   "content": user   }
            ],
            "stream":      stream,
            "temperature": self.config.temperature,
        });
        if !stream {
            body["max_tokens"] = MEANINGS_MAX_TOKENS.into();
        }

        let mut req = self.client.post(self.endpoint()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Run one streamed request for `turn` and terminate it with
    /// `StreamDone` whatever the outcome.
    async fn stream_chat(&self, turn: TurnId, system: String, user: String) -> Result<(), BackendError> {
        let events = self.events.upgrade().ok_or(BackendError::Closed)?;

        let result = self.forward_stream(&events, turn, &system, &user).await;
        if let Err(e) = &result {
            log::warn!("llm: stream for turn {turn} failed: {e}");
        }

        if events.done(turn).await.is_err() {
            log::debug!("llm: session closed before turn {turn} finished");
        }
        result
    }

    async fn forward_stream(
        &self,
        events: &SessionHandle,
        turn: TurnId,
        system: &str,
        user: &str,
    ) -> Result<(), BackendError> {
        let response = self.request(system, user, true).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let mut parser = SseParser::new();
        let mut body = response.bytes_stream();
        let mut forwarded = 0usize;

        'read: while let Some(bytes) = body.next().await {
            for event in parser.push(&bytes?) {
                match event {
                    SseEvent::Delta(text) => {
                        events.chunk(turn, Channel::Primary, text).await?;
                        forwarded += 1;
                    }
                    SseEvent::Done => break 'read,
                }
            }
        }
        if let Some(SseEvent::Delta(text)) = parser.finish() {
            events.chunk(turn, Channel::Primary, text).await?;
            forwarded += 1;
        }

        log::debug!("llm: turn {turn} streamed {forwarded} chunks");
        if forwarded == 0 {
            return Err(BackendError::EmptyResponse);
        }
        Ok(())
    }
}

#[async_trait]
impl TranslateBackend for LlmBackend {
    async fn translate_stream(
        &self,
        text: &str,
        from: &str,
        to: &str,
        turn: TurnId,
    ) -> Result<(), BackendError> {
        let (system, user) = self.prompts.translate(text, from, to);
        self.stream_chat(turn, system, user).await
    }

    async fn explain_stream(
        &self,
        text: &str,
        template_id: &str,
        turn: TurnId,
    ) -> Result<(), BackendError> {
        let (system, user) = self.prompts.explain(text, template_id);
        self.stream_chat(turn, system, user).await
    }

    async fn translate_meanings(
        &self,
        text: &str,
        from: &str,
        to: &str,
    ) -> Result<String, BackendError> {
        let (system, user) = self.prompts.meanings(text, from, to);
        let response = self.request(&system, &user, false).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BackendError::Parse(e.to_string()))?;

        let translated = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(BackendError::EmptyResponse)?
            .trim()
            .to_string();

        if translated.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(translated)
    }

    async fn get_explain_templates(&self) -> Result<ExplainTemplates, BackendError> {
        Ok(self.templates.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{self, SessionEvent, SessionInbox};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response on a loopback port and hand back the
    /// raw request text.
    async fn serve_once(status: &str, content_type: &str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let head = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(body.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });

        (format!("http://{addr}"), server)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    fn backend(base_url: &str, api_key: Option<&str>) -> (LlmBackend, SessionHandle, SessionInbox) {
        let mut config = AppConfig::default();
        config.llm.base_url = base_url.into();
        config.llm.api_key = api_key.map(Into::into);

        let (handle, inbox) = session::channel(16);
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        (LlmBackend::with_client(client, &config, &handle), handle, inbox)
    }

    fn sse_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        for d in deltas {
            body.push_str(&format!(
                "data: {}\n\n",
                serde_json::json!({"choices": [{"delta": {"content": d}}]})
            ));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    fn drain(inbox: &mut SessionInbox) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = inbox.0.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn backend_is_object_safe() {
        let (handle, _inbox) = session::channel(1);
        let _: Box<dyn TranslateBackend> =
            Box::new(LlmBackend::from_config(&AppConfig::default(), &handle));
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let (b, _h, _i) = backend("https://api.deepseek.com/", None);
        assert_eq!(b.endpoint(), "https://api.deepseek.com/chat/completions");
    }

    #[tokio::test]
    async fn translate_stream_forwards_chunks_then_done() {
        let (url, server) =
            serve_once("200 OK", "text/event-stream", sse_body(&["Hello ", "world"])).await;
        let (b, _handle, mut inbox) = backend(&url, Some("sk-test"));
        let turn = TurnId::new(4);

        b.translate_stream("你好世界", "auto", "zh", turn).await.unwrap();

        let events = drain(&mut inbox);
        let chunks: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::StreamChunk {
                    turn: t,
                    channel: Channel::Primary,
                    chunk,
                } if *t == turn => Some(chunk.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, vec!["Hello ", "world"]);
        assert!(matches!(events.last(), Some(SessionEvent::StreamDone { turn: t }) if *t == turn));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /chat/completions"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains("\"stream\":true"));
        assert!(request.contains("你好世界"));
    }

    #[tokio::test]
    async fn failed_stream_still_sends_done() {
        let (url, _server) = serve_once("500 Internal Server Error", "text/plain", "boom".into()).await;
        let (b, _handle, mut inbox) = backend(&url, None);
        let turn = TurnId::new(9);

        let err = b.explain_stream("epoll", "programmer", turn).await.unwrap_err();
        assert!(matches!(err, BackendError::Status(500)));

        let events = drain(&mut inbox);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SessionEvent::StreamDone { turn: t } if t == turn));
    }

    #[tokio::test]
    async fn no_auth_header_without_key() {
        let (url, server) = serve_once("200 OK", "text/event-stream", sse_body(&["x"])).await;
        let (b, _handle, _inbox) = backend(&url, Some(""));

        b.translate_stream("hi", "auto", "zh", TurnId::new(1)).await.unwrap();

        let request = server.await.unwrap();
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[tokio::test]
    async fn translate_meanings_returns_trimmed_content() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  暂停后重新开始。\n"}}]
        })
        .to_string();
        let (url, server) = serve_once("200 OK", "application/json", body).await;
        let (b, _handle, _inbox) = backend(&url, None);

        let text = b
            .translate_meanings("To start again after a pause.", "en", "zh")
            .await
            .unwrap();
        assert_eq!(text, "暂停后重新开始。");

        let request = server.await.unwrap();
        assert!(request.contains("\"stream\":false"));
        assert!(request.contains("\"max_tokens\":256"));
    }

    #[tokio::test]
    async fn translate_meanings_rejects_empty_content() {
        let body = serde_json::json!({"choices": [{"message": {"content": "   "}}]}).to_string();
        let (url, _server) = serve_once("200 OK", "application/json", body).await;
        let (b, _handle, _inbox) = backend(&url, None);

        let err = b.translate_meanings("x", "en", "zh").await.unwrap_err();
        assert!(matches!(err, BackendError::EmptyResponse));
    }

    #[tokio::test]
    async fn stream_without_session_is_closed() {
        let (b, handle, inbox) = backend("http://127.0.0.1:9", None);
        drop(handle);
        drop(inbox);

        let err = b.translate_stream("x", "auto", "zh", TurnId::new(1)).await.unwrap_err();
        assert!(matches!(err, BackendError::Closed));
    }

    #[tokio::test]
    async fn templates_come_from_config() {
        let (b, _h, _i) = backend("http://127.0.0.1:9", None);
        let templates = b.get_explain_templates().await.unwrap();
        assert_eq!(templates.default_template_id, "programmer");
        assert!(templates.templates.contains_key("general"));
    }
}
