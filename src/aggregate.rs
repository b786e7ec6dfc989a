//! Rollup of per-unit reports into one digest document.
//!
//! Per-unit reports carry their ordering key in the file name (the hour for
//! Hacker News topic reports: `09_topic.md`). The key is parsed out of the
//! name with the `key` capture group of a [`UnitPattern`] and units are
//! ordered numerically by it, so the result does not depend on the order in
//! which the filesystem lists entries.
//!
//! The combined document looks like:
//!
//! ```text
//! # 00_topic.md
//!
//! <content of 00_topic.md>
//!
//! ---
//!
//! # 01_topic.md
//!
//! <content of 01_topic.md>
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::{ReportError, Result};
use crate::models::ReportKind;
use crate::store::DocumentStore;

/// Separator placed between unit sections.
pub const SECTION_SEPARATOR: &str = "\n---\n\n";

static HOURLY_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<key>\d{2})_topic\.md$").expect("static regex")
});

/// Which file names count as per-unit reports, and where their key is.
#[derive(Debug, Clone)]
pub struct UnitPattern {
    regex: Regex,
}

impl UnitPattern {
    /// `regex` must contain a `key` capture group matching an unsigned integer.
    pub fn new(regex: &str) -> Result<Self> {
        let regex = Regex::new(regex)
            .map_err(|e| ReportError::Config(format!("invalid unit pattern: {e}")))?;
        if !regex.capture_names().any(|n| n == Some("key")) {
            return Err(ReportError::Config(format!(
                "unit pattern `{regex}` has no `key` capture group"
            )));
        }
        Ok(Self { regex })
    }

    /// Pattern for the per-unit reports rolled up by a digest kind.
    pub fn for_digest(kind: ReportKind) -> Result<Self> {
        match kind.digest_unit() {
            Some(ReportKind::HackerNewsHoursTopic) => Ok(Self {
                regex: HOURLY_TOPIC.clone(),
            }),
            Some(unit) => Self::new(&format!(
                r"^(?P<key>\d+){}$",
                regex::escape(unit.report_suffix())
            )),
            None => Err(ReportError::NotADigest(kind)),
        }
    }

    /// The ordering key of `file_name`, or `None` when it is not a unit report.
    pub fn key(&self, file_name: &str) -> Option<u64> {
        self.regex
            .captures(file_name)
            .and_then(|c| c.name("key"))
            .and_then(|m| m.as_str().parse().ok())
    }
}

/// A per-unit report found during a directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub key: u64,
    pub file_name: String,
    pub path: PathBuf,
}

/// The combined document and the units it was built from, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub text: String,
    pub units: Vec<UnitReport>,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    store: DocumentStore,
}

impl Aggregator {
    pub fn new(store: DocumentStore) -> Self {
        Self { store }
    }

    /// Concatenate every matching unit report in `directory`, in key order.
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory holding the per-unit reports
    /// * `pattern` - Which file names are units and where their key is
    ///
    /// # Returns
    ///
    /// The combined text and the units it was built from, in the same order.
    ///
    /// # Errors
    ///
    /// * [`ReportError::NoReportsFound`] if the directory is missing or holds
    ///   no matching file
    /// * [`ReportError::Storage`] if the directory exists but cannot be listed
    /// * [`ReportError::DocumentNotFound`] if a unit vanishes before it is read
    pub async fn aggregate(&self, directory: &Path, pattern: &UnitPattern) -> Result<Aggregate> {
        let units = self.collect_units(directory, pattern).await?;
        let text = self.concatenate(&units).await?;
        Ok(Aggregate { text, units })
    }

    /// Matching unit reports in `directory`, sorted by key then name.
    ///
    /// Entries that are not files or do not match the pattern are skipped.
    /// Fails with [`ReportError::NoReportsFound`] if nothing matches or the
    /// directory does not exist, and with [`ReportError::Storage`] on any
    /// other listing failure.
    #[instrument(level = "info", skip_all, fields(directory = %directory.display()))]
    pub async fn collect_units(
        &self,
        directory: &Path,
        pattern: &UnitPattern,
    ) -> Result<Vec<UnitReport>> {
        let not_found = || ReportError::NoReportsFound(directory.to_path_buf());
        let listing = |source: std::io::Error| match source.kind() {
            ErrorKind::NotFound => not_found(),
            _ => ReportError::Storage {
                path: directory.to_path_buf(),
                source,
            },
        };

        let mut entries = fs::read_dir(directory).await.map_err(listing)?;
        let mut units = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(listing)? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            match pattern.key(&file_name) {
                Some(key) if is_file => units.push(UnitReport {
                    key,
                    file_name,
                    path: entry.path(),
                }),
                _ => debug!(%file_name, "Skipping entry that is not a unit report"),
            }
        }

        if units.is_empty() {
            return Err(not_found());
        }
        units.sort_by(|a, b| a.key.cmp(&b.key).then_with(|| a.file_name.cmp(&b.file_name)));
        info!(units = units.len(), "Collected unit reports");
        Ok(units)
    }

    /// Read and join `units` in the given order.
    pub async fn concatenate(&self, units: &[UnitReport]) -> Result<String> {
        let mut sections = Vec::with_capacity(units.len());
        for unit in units {
            let content = self.store.read(&unit.path).await?;
            sections.push(format!("# {}\n\n{}\n", unit.file_name, content.trim_end()));
        }
        Ok(sections.join(SECTION_SEPARATOR))
    }
}
