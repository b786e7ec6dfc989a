//! Report generation: document in, summary out, summary persisted.
//!
//! [`ReportGenerator`] wires the four core pieces together:
//!
//! 1. [`DocumentStore`] reads the source document
//! 2. [`PromptRegistry`] selects the template for the report kind
//! 3. a [`Summarize`] backend produces the text
//! 4. the store writes the report next to its source
//!
//! Digests go through the [`Aggregator`] first; the concatenated unit
//! reports become the document and are never written to disk themselves.

use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::aggregate::{Aggregator, UnitPattern};
use crate::config::Config;
use crate::error::{ReportError, Result};
use crate::llm::{Backend, Summarize};
use crate::models::{Report, ReportKind, ReportSource};
use crate::prompts::PromptRegistry;
use crate::store::{DocumentStore, digest_path, report_path};

/// Orchestrates one summarization backend over the configured report kinds.
///
/// The backend is fixed for the lifetime of the generator; switching
/// provider means building a new generator.
#[derive(Debug)]
pub struct ReportGenerator<B> {
    backend: B,
    prompts: PromptRegistry,
    store: DocumentStore,
    aggregator: Aggregator,
}

impl ReportGenerator<Backend> {
    /// Build the production generator from configuration.
    ///
    /// Fails with [`ReportError::UnsupportedBackend`] before any prompt or
    /// document is touched when `llm.model_type` is unknown.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = Backend::from_config(&config.llm)?;
        info!(
            provider = backend.name(),
            backend = %backend.kind(),
            model = backend.model().unwrap_or("-"),
            "Summarization backend ready"
        );
        let prompts = PromptRegistry::load(&config.prompts_dir, &config.report_types, backend.kind());
        Ok(Self::new(
            backend,
            prompts,
            DocumentStore::new(&config.reports_root),
        ))
    }
}

impl<B: Summarize> ReportGenerator<B> {
    pub fn new(backend: B, prompts: PromptRegistry, store: DocumentStore) -> Self {
        let aggregator = Aggregator::new(store.clone());
        Self {
            backend,
            prompts,
            store,
            aggregator,
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Summarize the document at `document_path` as a `kind` report.
    ///
    /// The report lands beside the document: same stem, kind-specific suffix.
    /// Nothing is written unless the backend returns text.
    ///
    /// # Arguments
    ///
    /// * `kind` - Selects the prompt template and the report file suffix
    /// * `document_path` - Markdown document produced by a connector
    ///
    /// # Returns
    ///
    /// The generated [`Report`] with the path it was persisted to.
    ///
    /// # Errors
    ///
    /// * [`ReportError::DocumentNotFound`] if the document cannot be read
    /// * [`ReportError::PromptNotFound`] if no template was loaded for `kind`
    /// * [`ReportError::Backend`] if the model call fails
    /// * [`ReportError::Storage`] if the report cannot be written
    #[instrument(level = "info", skip_all, fields(kind = %kind, document = %document_path.display()))]
    pub async fn generate(&self, kind: ReportKind, document_path: &Path) -> Result<Report> {
        let document = self.store.read(document_path).await?;
        let prompt = self.prompts.get_prompt(kind)?;

        let text = self.summarize(kind, prompt, &document).await?;
        let path = report_path(document_path, kind);
        self.store.write(&path, &text).await?;

        info!(report = %path.display(), bytes = text.len(), "Report written");
        Ok(Report {
            kind,
            text,
            source: ReportSource::Document(document_path.to_path_buf()),
            path,
        })
    }

    /// Summarize every per-unit report under `directory` as one `kind` digest.
    ///
    /// `kind` must be a digest kind (see [`ReportKind::digest_unit`]). The
    /// digest is written to `<parent>/tech_trends/<directory name><suffix>`.
    #[instrument(level = "info", skip_all, fields(kind = %kind, directory = %directory.display()))]
    pub async fn generate_digest(&self, kind: ReportKind, directory: &Path) -> Result<Report> {
        let pattern = UnitPattern::for_digest(kind)?;
        self.generate_digest_with(kind, directory, &pattern).await
    }

    /// [`generate_digest`](Self::generate_digest) with an explicit unit pattern.
    pub async fn generate_digest_with(
        &self,
        kind: ReportKind,
        directory: &Path,
        pattern: &UnitPattern,
    ) -> Result<Report> {
        let prompt = self.prompts.get_prompt(kind)?;
        let aggregate = self.aggregator.aggregate(directory, pattern).await?;

        let text = self.summarize(kind, prompt, &aggregate.text).await?;
        let path = digest_path(directory, kind);
        self.store.write(&path, &text).await?;

        info!(report = %path.display(), units = aggregate.units.len(), "Digest written");
        Ok(Report {
            kind,
            text,
            source: ReportSource::Aggregate {
                directory: directory.to_path_buf(),
                units: aggregate.units.len(),
            },
            path,
        })
    }

    async fn summarize(&self, kind: ReportKind, prompt: &str, document: &str) -> Result<String> {
        let t0 = Instant::now();
        match self.backend.generate(prompt, document).await {
            Ok(text) => {
                info!(
                    %kind,
                    provider = self.backend.name(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Backend returned summary"
                );
                Ok(text)
            }
            Err(e) => {
                warn!(%kind, provider = self.backend.name(), error = %e, "Backend failed");
                Err(e)
            }
        }
    }
}
