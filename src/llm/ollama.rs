//! Local provider speaking Ollama's chat endpoint.
//!
//! Request: `POST {api_url}` with `{"model", "messages", "stream": false}`;
//! the reply text is in `message.content`.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

use super::{Message, Summarize, messages};
use crate::error::{ReportError, Result};
use crate::utils::truncate_for_log;

const PROVIDER: &str = "ollama";

#[derive(Debug)]
pub struct OllamaProvider {
    http: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

impl OllamaProvider {
    pub fn new(http: reqwest::Client, api_url: &str, model: &str) -> Self {
        Self {
            http,
            api_url: api_url.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Summarize for OllamaProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(model = %self.model, api_url = %self.api_url))]
    async fn generate(&self, system_prompt: &str, document: &str) -> Result<String> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: messages(system_prompt, document),
            stream: false,
        };

        let response = self
            .http
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReportError::generation(PROVIDER, format!("request failed: {e}")))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| ReportError::generation(PROVIDER, format!("reading body failed: {e}")))?;

        if !status.is_success() {
            warn!(status = status.as_u16(), body = %truncate_for_log(&raw, 300), "Ollama rejected request");
            return Err(ReportError::generation(
                PROVIDER,
                format!("status {}: {}", status.as_u16(), truncate_for_log(&raw, 300)),
            ));
        }

        let parsed: ChatResponse = serde_json::from_str(&raw).map_err(|e| {
            ReportError::generation(
                PROVIDER,
                format!("malformed response ({e}): {}", truncate_for_log(&raw, 300)),
            )
        })?;

        match parsed.message {
            Some(m) if !m.content.trim().is_empty() => {
                info!(
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    bytes = m.content.len(),
                    "Ollama chat succeeded"
                );
                Ok(m.content)
            }
            _ => Err(ReportError::generation(
                PROVIDER,
                "response contained no message content",
            )),
        }
    }
}
