//! Cloud provider speaking the OpenAI chat-completions API.
//!
//! Request: `POST {base_url}/chat/completions` with a bearer token and
//! `{"model": …, "messages": [{"role", "content"}, …]}`.
//! Response text lives in `choices[0].message.content`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{info, instrument, warn};

use super::{Message, Summarize, messages};
use crate::error::{ReportError, Result};
use crate::utils::truncate_for_log;

const PROVIDER: &str = "openai";

pub struct OpenAiProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: String, model: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Summarize for OpenAiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn generate(&self, system_prompt: &str, document: &str) -> Result<String> {
        let t0 = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: messages(system_prompt, document),
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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
            warn!(status = status.as_u16(), body = %truncate_for_log(&raw, 300), "Chat completion rejected");
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

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ReportError::generation(PROVIDER, "response contained no message content"))?;

        info!(
            elapsed_ms = t0.elapsed().as_millis() as u64,
            bytes = text.len(),
            "Chat completion succeeded"
        );
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(
            reqwest::Client::new(),
            &format!("{}/v1/", server.uri()),
            "sk-test".to_string(),
            "gpt-4o-mini",
        )
    }

    #[tokio::test]
    async fn test_generate_sends_chat_payload_and_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {"role": "system", "content": "Summarize: "},
                    {"role": "user", "content": "## Issues Closed Today\n- Fix bug #123"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "SUMMARY"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(&server)
            .generate("Summarize: ", "## Issues Closed Today\n- Fix bug #123")
            .await
            .unwrap();
        assert_eq!(text, "SUMMARY");
    }

    #[tokio::test]
    async fn test_http_error_carries_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let err = provider(&server).generate("p", "d").await.unwrap_err();
        match err {
            ReportError::Generation { provider, detail } => {
                assert_eq!(provider, "openai");
                assert!(detail.contains("429"), "{detail}");
                assert!(detail.contains("rate limited"), "{detail}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = provider(&server).generate("p", "d").await.unwrap_err();
        assert!(matches!(err, ReportError::Generation { ref detail, .. } if detail.contains("malformed")));
    }

    #[tokio::test]
    async fn test_empty_choices_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server).generate("p", "d").await.unwrap_err();
        assert!(matches!(err, ReportError::Generation { .. }));
    }
}
