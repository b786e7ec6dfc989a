//! Data models shared by the connectors and the report pipeline.
//!
//! - [`ReportKind`]: which prompt and which naming convention apply to a report
//! - [`DateWindow`]: the `{since, until}` range a document covers
//! - [`Report`]: a generated report and where it was persisted
//! - [`Story`] / [`Project`]: structured records returned by connectors

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Identifier selecting the prompt template and output naming of a report.
///
/// The string forms match the prompt file names
/// (`<kind>_prompt.txt`) and the `report_types` list in `config.yaml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Repository progress over a date window.
    #[serde(rename = "github")]
    GithubProgress,
    /// One hour's Hacker News front page.
    HackerNewsHoursTopic,
    /// Rollup of a day's hourly topic reports.
    HackerNewsDailyReport,
    /// Tender search result list.
    BidderListReport,
    /// A single tender project in detail.
    BidderDetailsReport,
}

impl ReportKind {
    pub const ALL: [ReportKind; 5] = [
        ReportKind::GithubProgress,
        ReportKind::HackerNewsHoursTopic,
        ReportKind::HackerNewsDailyReport,
        ReportKind::BidderListReport,
        ReportKind::BidderDetailsReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::GithubProgress => "github",
            ReportKind::HackerNewsHoursTopic => "hacker_news_hours_topic",
            ReportKind::HackerNewsDailyReport => "hacker_news_daily_report",
            ReportKind::BidderListReport => "bidder_list_report",
            ReportKind::BidderDetailsReport => "bidder_details_report",
        }
    }

    /// Suffix appended to the source document's stem for per-document reports.
    ///
    /// Every kind has its own suffix so two kinds run over the same document
    /// never overwrite each other.
    pub fn report_suffix(&self) -> &'static str {
        match self {
            ReportKind::GithubProgress => "_report.md",
            ReportKind::HackerNewsHoursTopic => "_topic.md",
            ReportKind::HackerNewsDailyReport => "_trends.md",
            ReportKind::BidderListReport => "_list_report.md",
            ReportKind::BidderDetailsReport => "_details_report.md",
        }
    }

    /// For digest kinds, the per-unit kind whose reports get rolled up.
    pub fn digest_unit(&self) -> Option<ReportKind> {
        match self {
            ReportKind::HackerNewsDailyReport => Some(ReportKind::HackerNewsHoursTopic),
            _ => None,
        }
    }

    /// Human label used in notification subjects.
    pub fn label(&self) -> &'static str {
        match self {
            ReportKind::GithubProgress => "GitHub progress",
            ReportKind::HackerNewsHoursTopic => "Hacker News topics",
            ReportKind::HackerNewsDailyReport => "Hacker News daily trends",
            ReportKind::BidderListReport => "Tender list",
            ReportKind::BidderDetailsReport => "Tender details",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReportKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown report kind `{s}`"))
    }
}

/// Inclusive date range a source document covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub since: NaiveDate,
    pub until: NaiveDate,
}

impl DateWindow {
    /// Window ending today and starting `days` days ago.
    pub fn last_days(days: u32) -> Self {
        let until = Local::now().date_naive();
        Self::ending_at(until, days)
    }

    pub fn ending_at(until: NaiveDate, days: u32) -> Self {
        Self {
            since: until - Duration::days(i64::from(days)),
            until,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.since <= date && date <= self.until
    }

    /// `2024-08-01_to_2024-08-02`; used as the document stem.
    pub fn file_stem(&self) -> String {
        format!("{}_to_{}", self.since, self.until)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.since, self.until)
    }
}

/// What a report was generated from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSource {
    /// A single persisted document.
    Document(PathBuf),
    /// A transient concatenation of per-unit reports found in a directory.
    Aggregate { directory: PathBuf, units: usize },
}

/// A generated report.
#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    pub text: String,
    pub source: ReportSource,
    pub path: PathBuf,
}

/// A Hacker News front page entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    pub title: String,
    pub link: String,
}

/// A tender listing entry, as returned by the project-list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub publish_time: String,
    pub title: String,
}
