//! # Progress Sentinel
//!
//! Collects activity from several sources, turns each into a markdown
//! document, asks a language model to summarize it, and keeps both the
//! document and the report on disk.
//!
//! ## Sources
//!
//! - GitHub repositories: commits, closed issues and merged pull requests
//!   over a date window, for every subscribed repository
//! - Hacker News: the front page once an hour, rolled up into a daily
//!   trends digest
//! - A tender search API: keyword searches and single-project details
//!
//! ## Usage
//!
//! ```sh
//! progress_sentinel github --repo langchain-ai/langchain
//! progress_sentinel hn-topic && progress_sentinel hn-digest
//! progress_sentinel run-jobs --with-digest
//! ```
//!
//! ## Architecture
//!
//! 1. **Connectors** fetch raw items and write a normalized document
//! 2. **Prompt registry** picks the template for the report kind
//! 3. **Backend** (OpenAI, Ollama, or a dry run) produces the summary
//! 4. **Report generator** persists the summary next to its document
//! 5. **Aggregator** concatenates hourly reports for the daily digest
//!
//! Exit codes: `0` success, `1` generation or configuration failure,
//! `2` nothing to summarize.

use chrono::{Duration, Local};
use clap::Parser;
use std::process::ExitCode;
use std::time::{Duration as StdDuration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregate;
mod cli;
mod config;
mod connectors;
mod error;
mod jobs;
mod llm;
mod models;
mod notify;
mod prompts;
mod report;
mod store;
mod subscriptions;
mod utils;

use cli::{Cli, Command, SubscriptionAction};
use config::Config;
use connectors::{Backoff, BidderClient, GitHubClient, HackerNewsClient, ProjectQuery};
use error::{PipelineError, ReportError};
use models::{DateWindow, Project, Report};
use notify::Notifier;
use report::ReportGenerator;
use store::DocumentStore;
use subscriptions::SubscriptionManager;
use utils::{ensure_writable_dir, local_date_and_hour};

const DEFAULT_TENDER_SPAN_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> ExitCode {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(config = %args.config.display(), command = ?args.command, "Parsed CLI arguments");

    let code = match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_no_data() => {
            warn!(error = %e, "Nothing to summarize");
            eprintln!("No data found: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("Generation failed: {e}");
            ExitCode::FAILURE
        }
    };

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    code
}

async fn run(args: Cli) -> Result<(), PipelineError> {
    let mut config = Config::load(&args.config)?
        .with_model(args.model_type.as_deref(), args.model_name.as_deref());
    config.llm.dry_run |= args.dry_run;
    info!(
        config = %args.config.display(),
        model_type = %config.llm.model_type,
        dry_run = config.llm.dry_run,
        "Loaded configuration"
    );

    let store = DocumentStore::new(&config.reports_root);

    if let Command::Subscriptions { action } = &args.command {
        return manage_subscriptions(&config, store, action).await;
    }

    // Early check: the report tree must be writable before any model call.
    ensure_writable_dir(&config.reports_root)
        .await
        .map_err(|source| ReportError::Storage {
            path: config.reports_root.clone(),
            source,
        })?;

    let generator = ReportGenerator::from_config(&config)?;
    let http = connectors::http_client(StdDuration::from_secs(config.llm.timeout_secs))?;
    let notifier = Notifier::from_config(&config.notifier, http.clone());
    let backoff = Backoff::new(config.connector_retries, StdDuration::from_secs(1));

    match args.command {
        Command::Github { repo, days } => {
            let github = GitHubClient::new(http, &config.github, store).with_backoff(backoff);
            let window = DateWindow::last_days(days);
            let report = jobs::github_report(&generator, &github, &notifier, &repo, &window).await?;
            print_report(&report);
        }
        Command::HnTopic { date, hour } => {
            let (today, this_hour) = local_date_and_hour();
            let hacker_news = HackerNewsClient::new(http, &config.hacker_news, store).with_backoff(backoff);
            let report = jobs::hacker_news_topic_job(
                &generator,
                &hacker_news,
                &notifier,
                date.unwrap_or(today),
                hour.unwrap_or(this_hour),
            )
            .await?;
            print_report(&report);
        }
        Command::HnDigest { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            let report = jobs::hacker_news_digest_job(&generator, &notifier, date).await?;
            print_report(&report);
        }
        Command::TenderList {
            keyword,
            start,
            end,
            page_size,
        } => {
            let bidder = BidderClient::new(http, &config.bidder, store)?.with_backoff(backoff);
            let end = end.unwrap_or_else(|| Local::now().date_naive());
            let start = start.unwrap_or(end - Duration::days(DEFAULT_TENDER_SPAN_DAYS));
            let query = ProjectQuery::new(
                &keyword,
                start,
                end,
                page_size.unwrap_or(config.bidder.page_size),
            );
            let (report, projects) =
                jobs::tender_list_job(&generator, &bidder, &notifier, &query).await?;
            print_report(&report);
            println!();
            for p in &projects {
                println!("{}\t{}\t{}", p.id, p.publish_time, p.title);
            }
        }
        Command::TenderDetail {
            id,
            publish_time,
            title,
        } => {
            let bidder = BidderClient::new(http, &config.bidder, store)?.with_backoff(backoff);
            let project = Project {
                id,
                publish_time,
                title,
            };
            let report = jobs::tender_detail_job(&generator, &bidder, &notifier, &project).await?;
            print_report(&report);
        }
        Command::RunJobs { days, with_digest } => {
            let subscriptions =
                SubscriptionManager::load(store.clone(), &config.github.subscriptions_file).await?;
            let github = GitHubClient::new(http.clone(), &config.github, store.clone()).with_backoff(backoff);
            let summary = jobs::github_job(
                &generator,
                &github,
                &notifier,
                subscriptions.list(),
                DateWindow::last_days(days),
            )
            .await;
            println!("GitHub ({} repositories): {summary}", summary.total());

            let (today, this_hour) = local_date_and_hour();
            let hacker_news = HackerNewsClient::new(http, &config.hacker_news, store).with_backoff(backoff);
            match jobs::hacker_news_topic_job(&generator, &hacker_news, &notifier, today, this_hour)
                .await
            {
                Ok(report) => println!("Hacker News topics: {}", report.path.display()),
                Err(e) => error!(error = %e, "Hacker News topic job failed"),
            }

            if with_digest {
                match jobs::hacker_news_digest_job(&generator, &notifier, today).await {
                    Ok(report) => println!("Hacker News trends: {}", report.path.display()),
                    Err(e) => error!(error = %e, "Hacker News digest job failed"),
                }
            }
        }
        Command::Subscriptions { .. } => {}
    }
    Ok(())
}

async fn manage_subscriptions(
    config: &Config,
    store: DocumentStore,
    action: &SubscriptionAction,
) -> Result<(), PipelineError> {
    let mut subscriptions =
        SubscriptionManager::load(store, &config.github.subscriptions_file).await?;
    match action {
        SubscriptionAction::List => {
            for repo in subscriptions.list() {
                println!("{repo}");
            }
        }
        SubscriptionAction::Add { repo } => {
            if subscriptions.add(repo).await? {
                println!("Subscribed to {repo}");
            } else {
                println!("Already subscribed to {repo}");
            }
        }
        SubscriptionAction::Remove { repo } => {
            if subscriptions.remove(repo).await? {
                println!("Unsubscribed from {repo}");
            } else {
                println!("Not subscribed to {repo}");
            }
        }
    }
    Ok(())
}

fn print_report(report: &Report) {
    info!(kind = %report.kind, path = %report.path.display(), "Report ready");
    println!("{}", report.text);
}
