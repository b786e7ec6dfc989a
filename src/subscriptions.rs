//! Repository subscriptions, kept as a JSON array of `owner/name` strings.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::error::{ReportError, Result};
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct SubscriptionManager {
    path: PathBuf,
    store: DocumentStore,
    subscriptions: Vec<String>,
}

impl SubscriptionManager {
    /// Load the subscription file; a missing file is an empty list.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub async fn load(store: DocumentStore, path: &Path) -> Result<Self> {
        let subscriptions = match fs::read_to_string(path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                ReportError::Config(format!("{} is not a JSON list of repos: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(source) => {
                return Err(ReportError::Storage {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        info!(count = subscriptions.len(), "Loaded subscriptions");
        Ok(Self {
            path: path.to_path_buf(),
            store,
            subscriptions,
        })
    }

    pub fn list(&self) -> &[String] {
        &self.subscriptions
    }

    /// Returns `false` when `repo` was already subscribed.
    pub async fn add(&mut self, repo: &str) -> Result<bool> {
        let repo = repo.trim();
        if repo.is_empty() {
            return Err(ReportError::Config("repository name is empty".into()));
        }
        if self.subscriptions.iter().any(|r| r == repo) {
            return Ok(false);
        }
        self.subscriptions.push(repo.to_string());
        self.save().await?;
        info!(%repo, "Subscribed");
        Ok(true)
    }

    /// Returns `false` when `repo` was not subscribed.
    pub async fn remove(&mut self, repo: &str) -> Result<bool> {
        let repo = repo.trim();
        let before = self.subscriptions.len();
        self.subscriptions.retain(|r| r != repo);
        if self.subscriptions.len() == before {
            return Ok(false);
        }
        self.save().await?;
        info!(%repo, "Unsubscribed");
        Ok(true)
    }

    async fn save(&self) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.subscriptions)
            .map_err(|e| ReportError::Config(format!("cannot serialize subscriptions: {e}")))?;
        self.store.write(&self.path, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn manager(dir: &Path) -> SubscriptionManager {
        SubscriptionManager::load(DocumentStore::new(dir), &dir.join("subscriptions.json"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(manager(dir.path()).await.list().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_remove_persist_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let mut subs = manager(dir.path()).await;

        assert!(subs.add("langchain-ai/langchain").await.unwrap());
        assert!(subs.add("ollama/ollama").await.unwrap());
        assert!(!subs.add("ollama/ollama").await.unwrap());

        let reloaded = manager(dir.path()).await;
        assert_eq!(reloaded.list(), ["langchain-ai/langchain", "ollama/ollama"]);

        assert!(subs.remove("langchain-ai/langchain").await.unwrap());
        assert!(!subs.remove("nobody/nothing").await.unwrap());
        assert_eq!(manager(dir.path()).await.list(), ["ollama/ollama"]);
    }

    #[tokio::test]
    async fn test_invalid_json_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.json");
        std::fs::write(&path, "{\"not\": \"a list\"}").unwrap();

        let err = SubscriptionManager::load(DocumentStore::new(dir.path()), &path)
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Config(_)));
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut subs = manager(dir.path()).await;
        assert!(subs.add("  ").await.is_err());
    }
}
