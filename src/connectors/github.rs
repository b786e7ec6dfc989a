//! GitHub REST connector.
//!
//! Fetches a repository's commits, closed issues and closed pull requests for
//! a [`DateWindow`] and exports them as a progress document:
//!
//! ```text
//! # Progress for owner/repo (2024-08-23 to 2024-08-24)
//!
//! ## Commits
//! - Bump version (a1b2c3d)
//!
//! ## Issues Closed in the Last 1 Days
//! - Fix bug #123
//!
//! ## Pull Requests Merged in the Last 1 Days
//! - Add feature #124
//! ```

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{info, instrument};

use super::{Backoff, send_for_text};
use crate::config::GithubConfig;
use crate::error::ConnectorError;
use crate::models::DateWindow;
use crate::store::DocumentStore;

const PER_PAGE: &str = "100";

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub message: String,
}

/// An entry from the issues endpoint; pull requests show up here too and
/// carry a `pull_request` object.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Everything that happened in a repository during a window.
#[derive(Debug, Clone, Default)]
pub struct RepoUpdates {
    pub commits: Vec<Commit>,
    pub issues: Vec<Issue>,
    pub pull_requests: Vec<PullRequest>,
}

#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base_url: String,
    token: Option<String>,
    store: DocumentStore,
    backoff: Backoff,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, config: &GithubConfig, store: DocumentStore) -> Self {
        Self {
            http,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            store,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    fn repo_url(&self, repo: &str, resource: &str) -> Result<String, ConnectorError> {
        let (owner, name) = repo
            .split_once('/')
            .filter(|(o, n)| !o.is_empty() && !n.is_empty() && !n.contains('/'))
            .ok_or_else(|| ConnectorError::Parse(format!("`{repo}` is not in owner/name form")))?;
        Ok(format!(
            "{}/repos/{}/{}/{resource}",
            self.api_base_url,
            urlencoding::encode(owner),
            urlencoding::encode(name)
        ))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ConnectorError> {
        let body = self
            .backoff
            .run(url, || {
                let mut request = self
                    .http
                    .get(url)
                    .header("Accept", "application/vnd.github+json")
                    .query(query);
                if let Some(token) = &self.token {
                    request = request.header("Authorization", format!("token {token}"));
                }
                send_for_text(url, request)
            })
            .await?;
        serde_json::from_str(&body).map_err(|e| ConnectorError::Parse(format!("{url}: {e}")))
    }

    #[instrument(level = "info", skip_all, fields(%repo, %window))]
    pub async fn fetch_commits(
        &self,
        repo: &str,
        window: &DateWindow,
    ) -> Result<Vec<Commit>, ConnectorError> {
        let url = self.repo_url(repo, "commits")?;
        let (since, until) = window_bounds(window);
        let commits: Vec<Commit> = self
            .get_json(
                &url,
                &[
                    ("since", since),
                    ("until", until),
                    ("per_page", PER_PAGE.to_string()),
                ],
            )
            .await?;
        Ok(commits.into_iter().unique_by(|c| c.sha.clone()).collect())
    }

    /// Issues closed inside the window; pull requests are excluded.
    #[instrument(level = "info", skip_all, fields(%repo, %window))]
    pub async fn fetch_closed_issues(
        &self,
        repo: &str,
        window: &DateWindow,
    ) -> Result<Vec<Issue>, ConnectorError> {
        let url = self.repo_url(repo, "issues")?;
        let (since, _) = window_bounds(window);
        let issues: Vec<Issue> = self
            .get_json(
                &url,
                &[
                    ("state", "closed".to_string()),
                    ("since", since),
                    ("per_page", PER_PAGE.to_string()),
                ],
            )
            .await?;
        Ok(issues
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .filter(|i| closed_within(i.closed_at, window))
            .unique_by(|i| i.number)
            .collect())
    }

    /// Pull requests whose `closed_at` falls inside the window.
    #[instrument(level = "info", skip_all, fields(%repo, %window))]
    pub async fn fetch_closed_pull_requests(
        &self,
        repo: &str,
        window: &DateWindow,
    ) -> Result<Vec<PullRequest>, ConnectorError> {
        let url = self.repo_url(repo, "pulls")?;
        let pulls: Vec<PullRequest> = self
            .get_json(
                &url,
                &[
                    ("state", "closed".to_string()),
                    ("sort", "updated".to_string()),
                    ("direction", "desc".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                ],
            )
            .await?;
        Ok(pulls
            .into_iter()
            .filter(|p| closed_within(p.closed_at, window))
            .unique_by(|p| p.number)
            .collect())
    }

    pub async fn fetch_updates(
        &self,
        repo: &str,
        window: &DateWindow,
    ) -> Result<RepoUpdates, ConnectorError> {
        Ok(RepoUpdates {
            commits: self.fetch_commits(repo, window).await?,
            issues: self.fetch_closed_issues(repo, window).await?,
            pull_requests: self.fetch_closed_pull_requests(repo, window).await?,
        })
    }

    /// Fetch and persist the progress document for `repo` over `window`.
    #[instrument(level = "info", skip_all, fields(%repo, %window))]
    pub async fn export_progress(
        &self,
        repo: &str,
        window: &DateWindow,
    ) -> Result<PathBuf, ConnectorError> {
        let updates = self.fetch_updates(repo, window).await?;
        let markdown = render_progress(repo, window, &updates);
        let path = self.store.github_progress_path(repo, window);
        self.store.write(&path, &markdown).await?;

        info!(
            path = %path.display(),
            commits = updates.commits.len(),
            issues = updates.issues.len(),
            pull_requests = updates.pull_requests.len(),
            "Exported repository progress"
        );
        Ok(path)
    }
}

/// RFC 3339 bounds covering whole days of the window.
fn window_bounds(window: &DateWindow) -> (String, String) {
    (
        format!("{}T00:00:00Z", window.since),
        format!("{}T23:59:59Z", window.until),
    )
}

fn closed_within(closed_at: Option<DateTime<Utc>>, window: &DateWindow) -> bool {
    closed_at.is_some_and(|t| window.contains(t.date_naive()))
}

pub fn render_progress(repo: &str, window: &DateWindow, updates: &RepoUpdates) -> String {
    let days = (window.until - window.since).num_days().max(1);
    let mut md = format!("# Progress for {repo} ({window})\n\n");

    md.push_str("## Commits\n");
    for c in &updates.commits {
        let subject = c.commit.message.lines().next().unwrap_or_default();
        let short = c.sha.get(..7).unwrap_or(&c.sha);
        let _ = writeln!(md, "- {subject} ({short})");
    }

    let _ = writeln!(md, "\n## Issues Closed in the Last {days} Days");
    for i in &updates.issues {
        let _ = writeln!(md, "- {} #{}", i.title, i.number);
    }

    let _ = writeln!(md, "\n## Pull Requests Merged in the Last {days} Days");
    for p in &updates.pull_requests {
        let _ = writeln!(md, "- {} #{}", p.title, p.number);
    }
    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn window() -> DateWindow {
        DateWindow::ending_at(NaiveDate::from_ymd_opt(2024, 8, 24).unwrap(), 1)
    }

    fn client(server: &MockServer, root: &std::path::Path) -> GitHubClient {
        let config = GithubConfig {
            token: Some("ghp_test".into()),
            api_base_url: server.uri(),
            ..GithubConfig::default()
        };
        GitHubClient::new(reqwest::Client::new(), &config, DocumentStore::new(root))
            .with_backoff(Backoff::immediate(2))
    }

    async fn mount_repo(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits"))
            .and(header("authorization", "token ghp_test"))
            .and(query_param("since", "2024-08-23T00:00:00Z"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"sha": "a1b2c3d4e5f6", "commit": {"message": "Bump version\n\nlong body"}}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/issues"))
            .and(query_param("state", "closed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"number": 123, "title": "Fix bug", "closed_at": "2024-08-24T10:00:00Z"},
                {"number": 124, "title": "PR in disguise", "closed_at": "2024-08-24T11:00:00Z",
                 "pull_request": {"url": "x"}},
                {"number": 99, "title": "Old issue", "closed_at": "2024-07-01T00:00:00Z"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"number": 124, "title": "Add feature", "closed_at": "2024-08-24T11:00:00Z"},
                {"number": 50, "title": "Ancient PR", "closed_at": "2023-01-01T00:00:00Z"},
                {"number": 51, "title": "Still open?", "closed_at": null}
            ])))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_export_progress_writes_filtered_document() {
        let server = MockServer::start().await;
        mount_repo(&server).await;
        let dir = tempfile::tempdir().unwrap();

        let path = client(&server, dir.path())
            .export_progress("octo/widgets", &window())
            .await
            .unwrap();

        assert_eq!(
            path,
            dir.path().join("daily_progress/octo_widgets/2024-08-23_to_2024-08-24.md")
        );
        let doc = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            doc,
            "# Progress for octo/widgets (2024-08-23 to 2024-08-24)\n\n\
             ## Commits\n- Bump version (a1b2c3d)\n\n\
             ## Issues Closed in the Last 1 Days\n- Fix bug #123\n\n\
             ## Pull Requests Merged in the Last 1 Days\n- Add feature #124\n"
        );
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octo/widgets/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let commits = client(&server, dir.path())
            .fetch_commits("octo/widgets", &window())
            .await
            .unwrap();
        assert!(commits.is_empty());
    }

    #[tokio::test]
    async fn test_not_found_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, dir.path())
            .fetch_commits("octo/missing", &window())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_malformed_repo_name_is_rejected() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, dir.path())
            .fetch_commits("not-a-repo", &window())
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Parse(_)));
    }
}
