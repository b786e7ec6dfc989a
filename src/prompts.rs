//! Prompt template registry.
//!
//! Templates are read once, when the registry is built, so request handling
//! never touches the filesystem for prompts. A kind whose template is missing
//! or unreadable is remembered as unavailable and reported on lookup; it does
//! not prevent the other kinds from loading.
//!
//! Lookup order for a kind under backend `b`:
//!
//! 1. `<prompts_dir>/<kind>_<b>_prompt.txt`
//! 2. `<prompts_dir>/<kind>_prompt.txt`

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

use crate::error::{ReportError, Result};
use crate::llm::BackendKind;
use crate::models::ReportKind;

#[derive(Debug, Clone)]
enum PromptEntry {
    Loaded(String),
    Missing,
    Unreadable { path: PathBuf, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct PromptRegistry {
    prompts: HashMap<ReportKind, PromptEntry>,
}

impl PromptRegistry {
    /// Eagerly load the templates for `kinds` from `dir`.
    #[instrument(level = "info", skip_all, fields(dir = %dir.display(), backend = %backend))]
    pub fn load(dir: &Path, kinds: &[ReportKind], backend: BackendKind) -> Self {
        let mut prompts = HashMap::with_capacity(kinds.len());
        for &kind in kinds {
            let entry = Self::load_one(dir, kind, backend);
            prompts.insert(kind, entry);
        }
        let registry = Self { prompts };
        let available = kinds.iter().filter(|k| registry.is_available(**k)).count();
        info!(available, configured = kinds.len(), "Preloaded prompt templates");
        registry
    }

    fn load_one(dir: &Path, kind: ReportKind, backend: BackendKind) -> PromptEntry {
        let candidates = [
            dir.join(format!("{kind}_{backend}_prompt.txt")),
            dir.join(format!("{kind}_prompt.txt")),
        ];
        for path in candidates {
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    info!(%kind, path = %path.display(), "Loaded prompt");
                    return PromptEntry::Loaded(text);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    error!(%kind, path = %path.display(), error = %e, "Prompt file unreadable");
                    return PromptEntry::Unreadable {
                        path,
                        reason: e.to_string(),
                    };
                }
            }
        }
        warn!(%kind, dir = %dir.display(), "No prompt file found; kind marked unavailable");
        PromptEntry::Missing
    }

    /// Build a registry from in-memory templates.
    #[cfg(test)]
    pub fn from_templates<I, S>(templates: I) -> Self
    where
        I: IntoIterator<Item = (ReportKind, S)>,
        S: Into<String>,
    {
        Self {
            prompts: templates
                .into_iter()
                .map(|(kind, text)| (kind, PromptEntry::Loaded(text.into())))
                .collect(),
        }
    }

    pub fn get_prompt(&self, kind: ReportKind) -> Result<&str> {
        match self.prompts.get(&kind) {
            Some(PromptEntry::Loaded(text)) => Ok(text),
            Some(PromptEntry::Unreadable { path, reason }) => Err(ReportError::PromptLoad {
                path: path.clone(),
                reason: reason.clone(),
            }),
            Some(PromptEntry::Missing) | None => Err(ReportError::PromptNotFound(kind)),
        }
    }

    pub fn is_available(&self, kind: ReportKind) -> bool {
        matches!(self.prompts.get(&kind), Some(PromptEntry::Loaded(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_prefers_backend_specific_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("github_prompt.txt"), "generic").unwrap();
        fs::write(dir.path().join("github_ollama_prompt.txt"), "ollama flavoured").unwrap();

        let openai = PromptRegistry::load(dir.path(), &[ReportKind::GithubProgress], BackendKind::OpenAi);
        let ollama = PromptRegistry::load(dir.path(), &[ReportKind::GithubProgress], BackendKind::Ollama);

        assert_eq!(openai.get_prompt(ReportKind::GithubProgress).unwrap(), "generic");
        assert_eq!(ollama.get_prompt(ReportKind::GithubProgress).unwrap(), "ollama flavoured");
    }

    #[test]
    fn test_missing_template_marks_only_that_kind_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hacker_news_hours_topic_prompt.txt"), "topics").unwrap();

        let registry = PromptRegistry::load(
            dir.path(),
            &[ReportKind::GithubProgress, ReportKind::HackerNewsHoursTopic],
            BackendKind::OpenAi,
        );

        assert!(registry.is_available(ReportKind::HackerNewsHoursTopic));
        assert!(!registry.is_available(ReportKind::GithubProgress));
        assert!(matches!(
            registry.get_prompt(ReportKind::GithubProgress),
            Err(ReportError::PromptNotFound(ReportKind::GithubProgress))
        ));
    }

    #[test]
    fn test_unconfigured_kind_is_not_found() {
        let registry = PromptRegistry::from_templates([(ReportKind::GithubProgress, "p")]);
        assert!(matches!(
            registry.get_prompt(ReportKind::BidderListReport),
            Err(ReportError::PromptNotFound(ReportKind::BidderListReport))
        ));
    }

    #[test]
    fn test_unreadable_template_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where a file is expected cannot be read as text.
        fs::create_dir(dir.path().join("bidder_list_report_prompt.txt")).unwrap();

        let registry = PromptRegistry::load(dir.path(), &[ReportKind::BidderListReport], BackendKind::OpenAi);

        assert!(matches!(
            registry.get_prompt(ReportKind::BidderListReport),
            Err(ReportError::PromptLoad { .. })
        ));
    }

    #[test]
    fn test_cache_survives_file_removal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_prompt.txt");
        fs::write(&path, "cached").unwrap();

        let registry = PromptRegistry::load(dir.path(), &[ReportKind::GithubProgress], BackendKind::OpenAi);
        fs::remove_file(&path).unwrap();

        assert_eq!(registry.get_prompt(ReportKind::GithubProgress).unwrap(), "cached");
    }
}
