//! Markdown document and report persistence.
//!
//! Every path the pipeline touches is a deterministic function of the source
//! kind, an identifying key and a date window, so re-running a unit of work
//! overwrites the previous artifact instead of duplicating it.
//!
//! # Layout
//!
//! ```text
//! reports_root/
//! ├── daily_progress/
//! │   └── owner_repo/
//! │       ├── 2024-08-23_to_2024-08-24.md
//! │       └── 2024-08-23_to_2024-08-24_report.md
//! ├── hacker_news/
//! │   ├── 2024-08-24/
//! │   │   ├── 09.md
//! │   │   └── 09_topic.md
//! │   └── tech_trends/
//! │       └── 2024-08-24_trends.md
//! └── bid_info/
//!     ├── bidder_list_2024-08-01_to_2024-09-01_20240901.md
//!     └── bidder_list_2024-08-01_to_2024-09-01_20240901_list_report.md
//! ```
//!
//! Concurrent writers to the same path are not coordinated; the last rename
//! wins. Writes go through a temp file in the same directory so a reader never
//! sees a half-written file.

use chrono::NaiveDate;
use rand::{Rng, rng};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::{ReportError, Result};
use crate::models::{DateWindow, ReportKind};

#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Write `content` to `path`, creating parent directories and replacing
    /// any existing file.
    ///
    /// # Arguments
    ///
    /// * `path` - Destination file, usually one of the path helpers below
    /// * `content` - Full file contents
    ///
    /// # Errors
    ///
    /// [`ReportError::Storage`] if a directory, the temp file or the final
    /// rename cannot be created. The temp file is removed when the rename
    /// fails.
    #[instrument(level = "debug", skip_all, fields(path = %path.display(), bytes = content.len()))]
    pub async fn write(&self, path: &Path, content: &str) -> Result<()> {
        let storage = |source| ReportError::Storage {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(storage)?;
        }

        let suffix: u32 = rng().random();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.{suffix:08x}.tmp"));

        fs::write(&tmp, content).await.map_err(storage)?;
        if let Err(e) = fs::rename(&tmp, path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(storage(e));
        }
        debug!("Wrote document");
        Ok(())
    }

    /// Read the document at `path`; any failure to open it is `DocumentNotFound`.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn read(&self, path: &Path) -> Result<String> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(content),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    info!(error = %e, "Document exists but could not be read");
                }
                Err(ReportError::DocumentNotFound(path.to_path_buf()))
            }
        }
    }

    /// `daily_progress/<owner_repo>/<since>_to_<until>.md`
    pub fn github_progress_path(&self, repo: &str, window: &DateWindow) -> PathBuf {
        self.root
            .join("daily_progress")
            .join(repo.replace('/', "_"))
            .join(format!("{}.md", window.file_stem()))
    }

    /// `hacker_news/<date>/` holds one document and one topic report per hour.
    pub fn hacker_news_day_dir(&self, date: NaiveDate) -> PathBuf {
        self.root.join("hacker_news").join(date.to_string())
    }

    /// `hacker_news/<date>/<HH>.md`
    pub fn hacker_news_stories_path(&self, date: NaiveDate, hour: u32) -> PathBuf {
        self.hacker_news_day_dir(date).join(format!("{hour:02}.md"))
    }

    /// `bid_info/<file_name>`
    pub fn bid_info_path(&self, file_name: &str) -> PathBuf {
        self.root.join("bid_info").join(file_name)
    }
}

/// Report path for a per-document report: same directory and stem as the
/// source, with the kind's suffix.
pub fn report_path(document: &Path, kind: ReportKind) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    document.with_file_name(format!("{stem}{}", kind.report_suffix()))
}

/// Digest path for a directory of per-unit reports:
/// `<parent>/tech_trends/<directory name><suffix>`, e.g.
/// `hacker_news/tech_trends/2024-08-24_trends.md`.
pub fn digest_path(directory: &Path, kind: ReportKind) -> PathBuf {
    let date = directory
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = directory.parent().unwrap_or_else(|| Path::new(""));
    parent
        .join("tech_trends")
        .join(format!("{date}{}", kind.report_suffix()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let path = dir.path().join("nested/deeper/doc.md");

        store.write(&path, "# Title\n\n- item\n").await.unwrap();
        assert_eq!(store.read(&path).await.unwrap(), "# Title\n\n- item\n");
    }

    #[tokio::test]
    async fn test_write_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let path = dir.path().join("doc.md");

        store.write(&path, "first").await.unwrap();
        store.write(&path, "second").await.unwrap();

        assert_eq!(store.read(&path).await.unwrap(), "second");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_read_missing_is_document_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path());
        let missing = dir.path().join("missing.md");

        match store.read(&missing).await {
            Err(ReportError::DocumentNotFound(p)) => assert_eq!(p, missing),
            other => panic!("expected DocumentNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_report_path_keeps_directory_and_stem() {
        let doc = Path::new("daily_progress/a_b/2024-08-23_to_2024-08-24.md");
        assert_eq!(
            report_path(doc, ReportKind::GithubProgress),
            PathBuf::from("daily_progress/a_b/2024-08-23_to_2024-08-24_report.md")
        );
        assert_eq!(
            report_path(Path::new("hacker_news/2024-08-24/09.md"), ReportKind::HackerNewsHoursTopic),
            PathBuf::from("hacker_news/2024-08-24/09_topic.md")
        );
    }

    #[test]
    fn test_report_paths_never_collide_across_kinds() {
        let doc = Path::new("bid_info/doc.md");
        let mut paths: Vec<_> = ReportKind::ALL.iter().map(|k| report_path(doc, *k)).collect();
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), ReportKind::ALL.len());
    }

    #[test]
    fn test_digest_path() {
        assert_eq!(
            digest_path(Path::new("out/hacker_news/2024-08-24"), ReportKind::HackerNewsDailyReport),
            PathBuf::from("out/hacker_news/tech_trends/2024-08-24_trends.md")
        );
    }

    #[test]
    fn test_connector_paths_are_deterministic() {
        let store = DocumentStore::new("root");
        let date = NaiveDate::from_ymd_opt(2024, 8, 24).unwrap();
        let window = DateWindow::ending_at(date, 1);

        assert_eq!(
            store.github_progress_path("DjangoPeng/openai-quickstart", &window),
            PathBuf::from("root/daily_progress/DjangoPeng_openai-quickstart/2024-08-23_to_2024-08-24.md")
        );
        assert_eq!(
            store.hacker_news_stories_path(date, 7),
            PathBuf::from("root/hacker_news/2024-08-24/07.md")
        );
    }
}
