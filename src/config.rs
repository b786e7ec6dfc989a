//! `config.yaml` loading.
//!
//! The configuration is read once at startup into a [`Config`] value which is
//! then handed to each component's constructor. Secrets may be supplied
//! through the environment instead of the file.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::{ReportError, Result};
use crate::llm::BackendKind;
use crate::models::ReportKind;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub report_types: Vec<ReportKind>,
    pub prompts_dir: PathBuf,
    /// Root of the `daily_progress/`, `hacker_news/` and `bid_info/` trees.
    pub reports_root: PathBuf,
    pub github: GithubConfig,
    pub hacker_news: HackerNewsConfig,
    pub bidder: BidderConfig,
    pub notifier: NotifierConfig,
    /// Retries for transient connector failures (network, 429, 5xx).
    pub connector_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            report_types: ReportKind::ALL.to_vec(),
            prompts_dir: PathBuf::from("prompts"),
            reports_root: PathBuf::from("."),
            github: GithubConfig::default(),
            hacker_news: HackerNewsConfig::default(),
            bidder: BidderConfig::default(),
            notifier: NotifierConfig::default(),
            connector_retries: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// `openai` or `ollama`; validated when the backend is built.
    pub model_type: String,
    pub openai_model_name: String,
    pub openai_base_url: String,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    pub ollama_model_name: String,
    pub ollama_api_url: String,
    pub timeout_secs: u64,
    pub dry_run: bool,
    pub dry_run_path: PathBuf,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_type: "openai".to_string(),
            openai_model_name: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_api_key: None,
            ollama_model_name: "llama3".to_string(),
            ollama_api_url: "http://localhost:11434/api/chat".to_string(),
            timeout_secs: 300,
            dry_run: false,
            dry_run_path: PathBuf::from("daily_progress/prompt.txt"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub token: Option<String>,
    pub api_base_url: String,
    pub subscriptions_file: PathBuf,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base_url: "https://api.github.com".to_string(),
            subscriptions_file: PathBuf::from("subscriptions.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HackerNewsConfig {
    pub base_url: String,
    pub limit: usize,
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://news.ycombinator.com/".to_string(),
            limit: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BidderConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub page_size: u32,
}

impl Default for BidderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://eolink.o.apispace.com/project-info/api/v1/".to_string(),
            page_size: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist,
    /// then apply environment overrides.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                ReportError::Config(format!("cannot read {}: {e}", path.display()))
            })?;
            Self::from_yaml(&raw)?
        } else {
            info!("Config file not found; using defaults");
            Config::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        debug!(model_type = %config.llm.model_type, report_types = ?config.report_types, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw).map_err(|e| ReportError::Config(e.to_string()))
    }

    /// Environment values win over the file for secrets and the webhook.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(key) = lookup("BID_TOKEN") {
            self.bidder.api_key = Some(key);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
        if let Some(url) = lookup("WEBHOOK_URL") {
            self.notifier.webhook_url = Some(url);
        }
    }

    /// Switch backend and model for a single invocation.
    pub fn with_model(mut self, model_type: Option<&str>, model_name: Option<&str>) -> Self {
        if let Some(model_type) = model_type {
            self.llm.model_type = model_type.to_string();
        }
        if let Some(name) = model_name {
            match self.llm.model_type.parse() {
                Ok(BackendKind::Ollama) => self.llm.ollama_model_name = name.to_string(),
                _ => self.llm.openai_model_name = name.to_string(),
            }
        }
        self
    }
}
