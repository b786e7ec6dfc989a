//! Source connectors that turn remote activity into markdown documents.
//!
//! Each connector fetches raw items for a window, renders them in the
//! markdown shape its prompt expects, and persists the result through the
//! [`DocumentStore`](crate::store::DocumentStore):
//!
//! | Source | Module | Transport | Document |
//! |--------|--------|-----------|----------|
//! | GitHub | [`github`] | REST API (JSON) | `daily_progress/<owner_repo>/<since>_to_<until>.md` |
//! | Hacker News | [`hackernews`] | HTML scraping | `hacker_news/<date>/<HH>.md` |
//! | Tender search | [`bidder`] | Form POST (JSON envelope) | `bid_info/bidder_*.md` |
//!
//! Transient failures are retried with [`retry::Backoff`]; anything else
//! surfaces as a [`ConnectorError`] to the caller.

pub mod bidder;
pub mod github;
pub mod hackernews;
pub mod retry;

use std::time::Duration;

use crate::error::{ConnectorError, ReportError};
use crate::utils::truncate_for_log;

pub use bidder::{BidderClient, ProjectQuery};
pub use github::GitHubClient;
pub use hackernews::HackerNewsClient;
pub use retry::Backoff;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for all connectors.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ReportError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ReportError::Config(format!("cannot build http client: {e}")))
}

/// Send `request` and return the body of a 2xx response.
pub(crate) async fn send_for_text(
    url: &str,
    request: reqwest::RequestBuilder,
) -> Result<String, ConnectorError> {
    let http = |source| ConnectorError::Http {
        url: url.to_string(),
        source,
    };
    let response = request.send().await.map_err(http)?;
    let status = response.status();
    let body = response.text().await.map_err(http)?;

    if !status.is_success() {
        return Err(ConnectorError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body: truncate_for_log(&body, 300),
        });
    }
    Ok(body)
}
