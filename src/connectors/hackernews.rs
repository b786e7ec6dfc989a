//! Hacker News front page scraper.
//!
//! Stories are read from `tr.athing span.titleline > a`; relative links
//! (`item?id=…` for Ask HN posts) are resolved against the base URL.
//! The hourly document is a list of entries of the form
//!
//! ```text
//! ### <title>
//! Link: <url>
//! ```

use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::path::PathBuf;
use tracing::{debug, info, instrument};
use url::Url;

use super::{Backoff, send_for_text};
use crate::config::HackerNewsConfig;
use crate::error::ConnectorError;
use crate::models::Story;
use crate::store::DocumentStore;

static STORY_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr.athing span.titleline > a").expect("static selector"));

#[derive(Debug, Clone)]
pub struct HackerNewsClient {
    http: reqwest::Client,
    base_url: String,
    limit: usize,
    store: DocumentStore,
    backoff: Backoff,
}

impl HackerNewsClient {
    pub fn new(http: reqwest::Client, config: &HackerNewsConfig, store: DocumentStore) -> Self {
        Self {
            http,
            base_url: config.base_url.clone(),
            limit: config.limit,
            store,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    #[instrument(level = "info", skip_all, fields(base_url = %self.base_url))]
    pub async fn fetch_top_stories(&self) -> Result<Vec<Story>, ConnectorError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| ConnectorError::Parse(format!("bad base url {}: {e}", self.base_url)))?;
        let html = self
            .backoff
            .run("hacker news front page", || {
                send_for_text(&self.base_url, self.http.get(&self.base_url))
            })
            .await?;

        let stories = parse_front_page(&html, &base, self.limit);
        info!(count = stories.len(), "Indexed Hacker News stories");
        Ok(stories)
    }

    /// Scrape the front page into `hacker_news/<date>/<HH>.md`.
    ///
    /// An empty front page is [`ConnectorError::Empty`] and writes nothing.
    #[instrument(level = "info", skip_all, fields(%date, hour))]
    pub async fn export_top_stories(
        &self,
        date: NaiveDate,
        hour: u32,
    ) -> Result<PathBuf, ConnectorError> {
        let stories = self.fetch_top_stories().await?;
        if stories.is_empty() {
            return Err(ConnectorError::Empty(self.base_url.clone()));
        }

        let path = self.store.hacker_news_stories_path(date, hour);
        self.store.write(&path, &render_stories(&stories)).await?;
        info!(path = %path.display(), count = stories.len(), "Exported Hacker News stories");
        Ok(path)
    }
}

/// Stories in page order, deduplicated by link, at most `limit` of them.
pub fn parse_front_page(html: &str, base: &Url, limit: usize) -> Vec<Story> {
    let document = Html::parse_document(html);
    document
        .select(&STORY_LINK)
        .filter_map(|a| {
            let title = a.text().collect::<String>().trim().to_string();
            let href = a.value().attr("href")?;
            let link = base.join(href).ok()?.to_string();
            if title.is_empty() {
                debug!(%link, "Skipping story without a title");
                return None;
            }
            Some(Story { title, link })
        })
        .unique_by(|s| s.link.clone())
        .take(limit)
        .collect()
}

pub fn render_stories(stories: &[Story]) -> String {
    stories
        .iter()
        .map(|s| format!("### {}\nLink: {}\n", s.title, s.link))
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FRONT_PAGE: &str = r#"
        <html><body><table>
          <tr class="athing" id="1">
            <td class="title"><span class="titleline">
              <a href="https://example.com/rust">Rust 2.0 released</a>
              <span class="sitebit comhead">(<a href="from?site=example.com">example.com</a>)</span>
            </span></td>
          </tr>
          <tr class="athing" id="2">
            <td class="title"><span class="titleline"><a href="item?id=2">Ask HN: Favorite editor?</a></span></td>
          </tr>
          <tr class="athing" id="3">
            <td class="title"><span class="titleline"><a href="https://example.com/rust">Rust 2.0 released (dupe)</a></span></td>
          </tr>
          <tr class="spacer"><td><span class="titleline"><a href="https://ignored.test">Not a story row</a></span></td></tr>
          <tr class="athing" id="4">
            <td class="title"><span class="titleline"><a href="https://example.org/db">A new database</a></span></td>
          </tr>
        </table></body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://news.ycombinator.com/").unwrap()
    }

    #[test]
    fn test_parse_front_page_resolves_dedupes_and_skips_site_links() {
        let stories = parse_front_page(FRONT_PAGE, &base(), 10);
        assert_eq!(
            stories,
            vec![
                Story {
                    title: "Rust 2.0 released".into(),
                    link: "https://example.com/rust".into()
                },
                Story {
                    title: "Ask HN: Favorite editor?".into(),
                    link: "https://news.ycombinator.com/item?id=2".into()
                },
                Story {
                    title: "A new database".into(),
                    link: "https://example.org/db".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_front_page_respects_limit() {
        assert_eq!(parse_front_page(FRONT_PAGE, &base(), 1).len(), 1);
    }

    #[test]
    fn test_render_stories() {
        let stories = [
            Story {
                title: "One".into(),
                link: "https://a.test/".into(),
            },
            Story {
                title: "Two".into(),
                link: "https://b.test/".into(),
            },
        ];
        assert_eq!(
            render_stories(&stories),
            "### One\nLink: https://a.test/\n\n### Two\nLink: https://b.test/\n"
        );
    }

    #[tokio::test]
    async fn test_export_top_stories_writes_hourly_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FRONT_PAGE))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let config = HackerNewsConfig {
            base_url: format!("{}/", server.uri()),
            limit: 2,
        };
        let client = HackerNewsClient::new(reqwest::Client::new(), &config, DocumentStore::new(dir.path()));
        let date = NaiveDate::from_ymd_opt(2024, 8, 24).unwrap();

        let path = client.export_top_stories(date, 9).await.unwrap();

        assert_eq!(path, dir.path().join("hacker_news/2024-08-24/09.md"));
        let doc = std::fs::read_to_string(&path).unwrap();
        assert!(doc.starts_with("### Rust 2.0 released\nLink: https://example.com/rust\n"));
        assert!(doc.contains(&format!("Link: {}/item?id=2", server.uri())));
    }

    #[tokio::test]
    async fn test_empty_front_page_is_empty_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let config = HackerNewsConfig {
            base_url: server.uri(),
            limit: 30,
        };
        let client = HackerNewsClient::new(reqwest::Client::new(), &config, DocumentStore::new(dir.path()));
        let date = NaiveDate::from_ymd_opt(2024, 8, 24).unwrap();

        let err = client.export_top_stories(date, 9).await.unwrap_err();
        assert!(err.is_no_data());
        assert!(!dir.path().join("hacker_news").exists());
    }
}
