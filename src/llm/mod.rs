//! Summarization backends.
//!
//! The pipeline talks to one [`Summarize`] implementation per generator. In
//! production that is a [`Backend`], a closed set of providers chosen once from
//! `llm.model_type`:
//!
//! | `model_type` | Variant | Transport |
//! |--------------|---------|-----------|
//! | `openai` | [`Backend::OpenAi`] | HTTPS chat-completions API |
//! | `ollama` | [`Backend::Ollama`] | Local Ollama `/api/chat` |
//!
//! With `llm.dry_run` set, the selected provider is replaced by
//! [`Backend::DryRun`], which writes the request messages to disk and returns
//! [`dry_run::DRY_RUN_SENTINEL`] without any network traffic.
//!
//! Providers never retry; a failed call surfaces as
//! [`ReportError::Generation`] to the caller.

pub mod dry_run;
pub mod ollama;
pub mod openai;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{ReportError, Result};

pub use dry_run::DryRunBackend;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Something that turns a system prompt and a document into generated text.
pub trait Summarize {
    /// Provider name used in logs and error messages.
    fn name(&self) -> &str;

    async fn generate(&self, system_prompt: &str, document: &str) -> Result<String>;
}

/// Supported provider identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenAi,
    Ollama,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Ollama => "ollama",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAi),
            "ollama" => Ok(BackendKind::Ollama),
            _ => Err(ReportError::UnsupportedBackend(s.to_string())),
        }
    }
}

/// A chat message in the shape both providers accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

pub fn messages<'a>(system_prompt: &'a str, document: &'a str) -> [Message<'a>; 2] {
    [
        Message {
            role: "system",
            content: system_prompt,
        },
        Message {
            role: "user",
            content: document,
        },
    ]
}

/// The provider selected for this process.
#[derive(Debug)]
pub enum Backend {
    OpenAi(OpenAiProvider),
    Ollama(OllamaProvider),
    DryRun(DryRunBackend),
}

impl Backend {
    /// Resolve `config.model_type` into a concrete provider.
    ///
    /// An unknown `model_type` fails here with
    /// [`ReportError::UnsupportedBackend`], before any document is read.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let kind: BackendKind = config.model_type.parse()?;

        if config.dry_run {
            return Ok(Backend::DryRun(DryRunBackend::new(
                kind,
                config.dry_run_path.clone(),
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReportError::Config(format!("cannot build http client: {e}")))?;

        match kind {
            BackendKind::OpenAi => {
                let api_key = config.openai_api_key.clone().ok_or_else(|| {
                    ReportError::Config("OPENAI_API_KEY is required for the openai backend".into())
                })?;
                Ok(Backend::OpenAi(OpenAiProvider::new(
                    http,
                    &config.openai_base_url,
                    api_key,
                    &config.openai_model_name,
                )))
            }
            BackendKind::Ollama => Ok(Backend::Ollama(OllamaProvider::new(
                http,
                &config.ollama_api_url,
                &config.ollama_model_name,
            ))),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::OpenAi(_) => BackendKind::OpenAi,
            Backend::Ollama(_) => BackendKind::Ollama,
            Backend::DryRun(d) => d.kind(),
        }
    }

    /// Model that will be asked; `None` in dry-run mode.
    pub fn model(&self) -> Option<&str> {
        match self {
            Backend::OpenAi(p) => Some(p.model()),
            Backend::Ollama(p) => Some(p.model()),
            Backend::DryRun(_) => None,
        }
    }
}

impl Summarize for Backend {
    fn name(&self) -> &str {
        match self {
            Backend::OpenAi(p) => p.name(),
            Backend::Ollama(p) => p.name(),
            Backend::DryRun(p) => p.name(),
        }
    }

    async fn generate(&self, system_prompt: &str, document: &str) -> Result<String> {
        match self {
            Backend::OpenAi(p) => p.generate(system_prompt, document).await,
            Backend::Ollama(p) => p.generate(system_prompt, document).await,
            Backend::DryRun(p) => p.generate(system_prompt, document).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("openai".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!(" Ollama ".parse::<BackendKind>().unwrap(), BackendKind::Ollama);
        assert!(matches!(
            "gemini".parse::<BackendKind>(),
            Err(ReportError::UnsupportedBackend(s)) if s == "gemini"
        ));
    }

    #[test]
    fn test_unknown_backend_fails_at_construction() {
        let config = LlmConfig {
            model_type: "anthropic".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            Backend::from_config(&config),
            Err(ReportError::UnsupportedBackend(_))
        ));
    }

    #[test]
    fn test_unknown_backend_fails_even_in_dry_run() {
        let config = LlmConfig {
            model_type: "nope".into(),
            dry_run: true,
            ..LlmConfig::default()
        };
        assert!(matches!(
            Backend::from_config(&config),
            Err(ReportError::UnsupportedBackend(_))
        ));
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = LlmConfig {
            openai_api_key: None,
            ..LlmConfig::default()
        };
        assert!(matches!(Backend::from_config(&config), Err(ReportError::Config(_))));
    }

    #[test]
    fn test_from_config_selects_variant() {
        let ollama = Backend::from_config(&LlmConfig {
            model_type: "ollama".into(),
            ..LlmConfig::default()
        })
        .unwrap();
        assert_eq!(ollama.kind(), BackendKind::Ollama);
        assert_eq!(ollama.name(), "ollama");

        let openai = Backend::from_config(&LlmConfig {
            openai_api_key: Some("sk-test".into()),
            ..LlmConfig::default()
        })
        .unwrap();
        assert_eq!(openai.kind(), BackendKind::OpenAi);
        assert_eq!(openai.model(), Some("gpt-4o-mini"));

        let dry = Backend::from_config(&LlmConfig {
            model_type: "ollama".into(),
            dry_run: true,
            ..LlmConfig::default()
        })
        .unwrap();
        assert!(matches!(dry, Backend::DryRun(_)));
        assert_eq!(dry.model(), None);
        assert_eq!(dry.kind(), BackendKind::Ollama);
    }

    #[test]
    fn test_messages_shape() {
        let json = serde_json::to_value(messages("sys", "doc")).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "doc"}
            ])
        );
    }
}
