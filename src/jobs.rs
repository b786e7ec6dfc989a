//! Batch and single-shot jobs: fetch a document, summarize it, notify.
//!
//! Batch jobs keep going when one item fails; the failure is logged and
//! counted in the [`JobSummary`]. Single-shot jobs return the error so the
//! caller can tell "no data" apart from "generation failed".

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::fmt;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::connectors::{BidderClient, GitHubClient, HackerNewsClient, ProjectQuery};
use crate::error::{PipelineError, ReportError};
use crate::llm::Summarize;
use crate::models::{DateWindow, Project, Report, ReportKind};
use crate::notify::Notifier;
use crate::report::ReportGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    NoData,
    Failed,
}

/// Per-item tally of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub succeeded: usize,
    pub no_data: usize,
    pub failed: usize,
}

impl JobSummary {
    fn record(mut self, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::NoData => self.no_data += 1,
            Outcome::Failed => self.failed += 1,
        }
        self
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.no_data + self.failed
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} without data, {} failed",
            self.succeeded, self.no_data, self.failed
        )
    }
}

/// Export, summarize and notify every subscribed repository in turn.
#[instrument(level = "info", skip_all, fields(repos = repos.len(), %window))]
pub async fn github_job<B: Summarize>(
    generator: &ReportGenerator<B>,
    github: &GitHubClient,
    notifier: &Notifier,
    repos: &[String],
    window: DateWindow,
) -> JobSummary {
    let t0 = Instant::now();
    let window = &window;
    let outcomes: Vec<Outcome> = stream::iter(repos)
        .then(|repo| process_repo(generator, github, notifier, repo, window))
        .collect()
        .await;

    let summary = outcomes
        .into_iter()
        .fold(JobSummary::default(), JobSummary::record);
    info!(
        succeeded = summary.succeeded,
        no_data = summary.no_data,
        failed = summary.failed,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "GitHub job finished"
    );
    summary
}

async fn process_repo<B: Summarize>(
    generator: &ReportGenerator<B>,
    github: &GitHubClient,
    notifier: &Notifier,
    repo: &str,
    window: &DateWindow,
) -> Outcome {
    match github_report(generator, github, notifier, repo, window).await {
        Ok(report) => {
            info!(%repo, path = %report.path.display(), "Repository report done");
            Outcome::Succeeded
        }
        Err(e) if e.is_no_data() => {
            warn!(%repo, error = %e, "No data for repository; skipping");
            Outcome::NoData
        }
        Err(e) => {
            error!(%repo, error = %e, "Repository report failed; continuing with the rest");
            Outcome::Failed
        }
    }
}

/// One repository: export progress, summarize, notify.
pub async fn github_report<B: Summarize>(
    generator: &ReportGenerator<B>,
    github: &GitHubClient,
    notifier: &Notifier,
    repo: &str,
    window: &DateWindow,
) -> Result<Report, PipelineError> {
    let document = github.export_progress(repo, window).await?;
    let report = generator.generate(ReportKind::GithubProgress, &document).await?;
    notifier.notify(repo, &report).await;
    Ok(report)
}

/// Scrape the front page for `date`/`hour` and write the hourly topic report.
#[instrument(level = "info", skip_all, fields(%date, hour))]
pub async fn hacker_news_topic_job<B: Summarize>(
    generator: &ReportGenerator<B>,
    hacker_news: &HackerNewsClient,
    notifier: &Notifier,
    date: NaiveDate,
    hour: u32,
) -> Result<Report, PipelineError> {
    let document = hacker_news.export_top_stories(date, hour).await?;
    let report = generator
        .generate(ReportKind::HackerNewsHoursTopic, &document)
        .await?;
    notifier.notify(&format!("{date} {hour:02}:00"), &report).await;
    Ok(report)
}

/// Roll the day's hourly topic reports up into the daily trends digest.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn hacker_news_digest_job<B: Summarize>(
    generator: &ReportGenerator<B>,
    notifier: &Notifier,
    date: NaiveDate,
) -> Result<Report, ReportError> {
    let directory = generator.store().hacker_news_day_dir(date);
    let report = generator
        .generate_digest(ReportKind::HackerNewsDailyReport, &directory)
        .await?;
    notifier.notify(&date.to_string(), &report).await;
    Ok(report)
}

/// Search tenders and summarize the result list.
#[instrument(level = "info", skip_all, fields(keyword = %query.keyword))]
pub async fn tender_list_job<B: Summarize>(
    generator: &ReportGenerator<B>,
    bidder: &BidderClient,
    notifier: &Notifier,
    query: &ProjectQuery,
) -> Result<(Report, Vec<Project>), PipelineError> {
    let (projects, document) = bidder.query_project_list(query).await?;
    let report = generator
        .generate(ReportKind::BidderListReport, &document)
        .await?;
    notifier.notify(&query.keyword, &report).await;
    Ok((report, projects))
}

/// Fetch one tender in detail and summarize it.
#[instrument(level = "info", skip_all, fields(id = %project.id))]
pub async fn tender_detail_job<B: Summarize>(
    generator: &ReportGenerator<B>,
    bidder: &BidderClient,
    notifier: &Notifier,
    project: &Project,
) -> Result<Report, PipelineError> {
    let document = bidder.query_project_details(project).await?;
    let report = generator
        .generate(ReportKind::BidderDetailsReport, &document)
        .await?;
    notifier.notify(&project.title, &report).await;
    Ok(report)
}
