//! Command-line interface definitions for Progress Sentinel.
//!
//! Global flags select the configuration file and may override the
//! summarization backend for a single invocation. Each subcommand runs one
//! job to completion and exits.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Collect activity, summarize it with an LLM, and write markdown reports.
///
/// # Examples
///
/// ```sh
/// # Progress report for one repository over the last two days
/// progress_sentinel github --repo langchain-ai/langchain --days 2
///
/// # Hourly Hacker News topics, then the day's trend digest, with a local model
/// progress_sentinel --model-type ollama hn-topic
/// progress_sentinel --model-type ollama hn-digest
///
/// # Inspect the prompt that would be sent, without calling a model
/// progress_sentinel --dry-run tender-list --keyword "data center"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to config.yaml
    #[arg(short, long, env = "PROGRESS_SENTINEL_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Summarization backend (`openai` or `ollama`), overriding the config file
    #[arg(long, global = true)]
    pub model_type: Option<String>,

    /// Model name for the selected backend
    #[arg(long, global = true)]
    pub model_name: Option<String>,

    /// Save the request that would be sent instead of calling the model
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Progress report for one repository
    Github {
        /// Repository in owner/name form
        #[arg(short, long)]
        repo: String,

        /// Number of days back from today to cover
        #[arg(short, long, default_value_t = 1)]
        days: u32,
    },

    /// Topic report for one hour of the Hacker News front page
    HnTopic {
        /// Date of the hourly document (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Hour of the hourly document, 0-23 (defaults to the current hour)
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..24))]
        hour: Option<u32>,
    },

    /// Daily trends digest over a day's Hacker News topic reports
    HnDigest {
        /// Day to roll up (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Search tenders and summarize the result list
    TenderList {
        #[arg(short, long)]
        keyword: String,

        /// First publish date to include (defaults to 30 days before --end)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last publish date to include (defaults to today)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Results per page (defaults to bidder.page_size)
        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Fetch and summarize a single tender
    TenderDetail {
        #[arg(long)]
        id: String,

        /// Publish time exactly as returned by tender-list
        #[arg(long)]
        publish_time: String,

        /// Title used in the notification subject
        #[arg(long, default_value = "")]
        title: String,
    },

    /// Manage subscribed repositories
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionAction,
    },

    /// Run the GitHub job over all subscriptions and the hourly Hacker News job
    RunJobs {
        /// Number of days back from today the GitHub reports cover
        #[arg(short, long, default_value_t = 1)]
        days: u32,

        /// Also build today's Hacker News trends digest
        #[arg(long)]
        with_digest: bool,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SubscriptionAction {
    List,
    Add { repo: String },
    Remove { repo: String },
}
