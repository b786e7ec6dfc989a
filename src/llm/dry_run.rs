//! Dry-run backend: records the request instead of sending it.

use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

use super::{BackendKind, Summarize, messages};
use crate::error::{ReportError, Result};

/// Returned in place of generated text.
pub const DRY_RUN_SENTINEL: &str = "DRY RUN";

#[derive(Debug)]
pub struct DryRunBackend {
    kind: BackendKind,
    path: PathBuf,
}

impl DryRunBackend {
    pub fn new(kind: BackendKind, path: PathBuf) -> Self {
        Self { kind, path }
    }

    /// The provider that would have been called.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

impl Summarize for DryRunBackend {
    fn name(&self) -> &str {
        "dry-run"
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), provider = %self.kind))]
    async fn generate(&self, system_prompt: &str, document: &str) -> Result<String> {
        let storage = |source| ReportError::Storage {
            path: self.path.clone(),
            source,
        };
        let payload = serde_json::to_string_pretty(&messages(system_prompt, document))
            .map_err(|e| ReportError::generation("dry-run", e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(storage)?;
        }
        fs::write(&self.path, payload).await.map_err(storage)?;

        info!("Dry run enabled; request saved instead of sent");
        Ok(DRY_RUN_SENTINEL.to_string())
    }
}
