//! Tender search API connector.
//!
//! Every endpoint takes a form-encoded POST authenticated with the
//! `X-APISpace-Token` header and answers with an envelope:
//!
//! ```json
//! {"code": 200, "msg": "success", "data": …}
//! ```
//!
//! Any `code` other than 200 is an API error even when the HTTP status is 200.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

use super::{Backoff, send_for_text};
use crate::config::BidderConfig;
use crate::error::{ConnectorError, ReportError};
use crate::models::Project;
use crate::store::DocumentStore;

const TOKEN_HEADER: &str = "X-APISpace-Token";
const MISSING: &str = "n/a";

/// Search parameters for the `project-list` endpoint, serialized under the
/// API's own key names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectQuery {
    #[serde(rename = "startDate")]
    pub start_date: String,
    #[serde(rename = "endDate")]
    pub end_date: String,
    pub keyword: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    #[serde(rename = "searchMode")]
    pub search_mode: String,
    #[serde(rename = "searchType")]
    pub search_type: String,
    #[serde(rename = "pageIndex")]
    pub page_index: String,
    #[serde(rename = "pageSize")]
    pub page_size: String,
    #[serde(rename = "proviceCode")]
    pub province_code: String,
    #[serde(rename = "cityCode")]
    pub city_code: String,
}

impl ProjectQuery {
    /// A first-page keyword search across all provinces.
    pub fn new(keyword: &str, start: NaiveDate, end: NaiveDate, page_size: u32) -> Self {
        Self {
            start_date: start.to_string(),
            end_date: end.to_string(),
            keyword: keyword.to_string(),
            class_id: "1".into(),
            search_mode: "1".into(),
            search_type: "1".into(),
            page_index: "1".into(),
            page_size: page_size.to_string(),
            province_code: "0".into(),
            city_code: String::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Clone)]
pub struct BidderClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    store: DocumentStore,
    backoff: Backoff,
}

impl BidderClient {
    /// Fails with a configuration error when no API token is configured.
    pub fn new(
        http: reqwest::Client,
        config: &BidderConfig,
        store: DocumentStore,
    ) -> Result<Self, ReportError> {
        let token = config
            .api_key
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ReportError::Config("BID_TOKEN is required for the tender API".into()))?;
        let base_url = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };
        Ok(Self {
            http,
            base_url,
            token,
            store,
            backoff: Backoff::default(),
        })
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// POST `form` to `endpoint` and unwrap the envelope's `data`.
    #[instrument(level = "info", skip_all, fields(%endpoint))]
    async fn call<F: Serialize>(&self, endpoint: &str, form: &F) -> Result<Value, ConnectorError> {
        let url = format!("{}{endpoint}", self.base_url);
        let body = self
            .backoff
            .run(endpoint, || {
                let request = self
                    .http
                    .post(&url)
                    .header(TOKEN_HEADER, &self.token)
                    .form(form);
                send_for_text(&url, request)
            })
            .await?;

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| ConnectorError::Parse(format!("{endpoint}: {e}")))?;
        if envelope.code != 200 {
            warn!(code = envelope.code, msg = %envelope.msg, "Tender API returned an error");
            return Err(ConnectorError::Api {
                code: envelope.code,
                message: envelope.msg,
            });
        }
        if envelope.data.is_null() {
            return Err(ConnectorError::Empty(endpoint.to_string()));
        }
        Ok(envelope.data)
    }

    /// Search for projects and persist the result list.
    ///
    /// Writes `bid_info/bidder_list_<start>_to_<end>_<YYYYMMDD>.md`. A search
    /// with no hits is [`ConnectorError::Empty`] and writes nothing.
    #[instrument(level = "info", skip_all, fields(keyword = %query.keyword, start = %query.start_date, end = %query.end_date))]
    pub async fn query_project_list(
        &self,
        query: &ProjectQuery,
    ) -> Result<(Vec<Project>, PathBuf), ConnectorError> {
        let data = self.call("project-list", query).await?;
        // The list is either the payload itself or nested under `data`.
        let rows = match &data {
            Value::Array(rows) => rows.as_slice(),
            Value::Object(map) => match map.get("data") {
                Some(Value::Array(rows)) => rows.as_slice(),
                _ => &[],
            },
            other => {
                return Err(ConnectorError::Parse(format!(
                    "project-list: expected a list, got {other}"
                )));
            }
        };
        if rows.is_empty() {
            return Err(ConnectorError::Empty(format!("keyword `{}`", query.keyword)));
        }

        let projects: Vec<Project> = rows
            .iter()
            .map(|row| Project {
                id: field(row, "id"),
                publish_time: field(row, "publish"),
                title: field(row, "title"),
            })
            .collect();

        let file_name = format!(
            "bidder_list_{}_to_{}_{}.md",
            query.start_date,
            query.end_date,
            today_stamp()
        );
        let path = self.store.bid_info_path(&file_name);
        self.store.write(&path, &render_project_list(query, rows)).await?;

        info!(count = projects.len(), path = %path.display(), "Exported project list");
        Ok((projects, path))
    }

    /// Fetch the detail and structured views of one project and persist them
    /// as `bid_info/bidder_details_<id>_<YYYYMMDD>.md`.
    #[instrument(level = "info", skip_all, fields(id = %project.id))]
    pub async fn query_project_details(&self, project: &Project) -> Result<PathBuf, ConnectorError> {
        let form = [
            ("publishTime", project.publish_time.as_str()),
            ("id", project.id.as_str()),
        ];
        let details = self.call("get-project", &form).await?;
        let structured = self.call("getDetail", &form).await?;

        let mut md = String::from("# Project details\n\n## Details\n\n");
        md.push_str(&json_to_markdown(&details, 0));
        md.push_str("\n## Structured data\n\n");
        md.push_str(&json_to_markdown(&structured, 0));

        let file_name = format!(
            "bidder_details_{}_{}.md",
            file_safe(&project.id),
            today_stamp()
        );
        let path = self.store.bid_info_path(&file_name);
        self.store.write(&path, &md).await?;

        info!(path = %path.display(), "Exported project details");
        Ok(path)
    }
}

/// Keep only characters that cannot leave `bid_info/` once used in a file name.
fn file_safe(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

fn today_stamp() -> String {
    Local::now().date_naive().format("%Y%m%d").to_string()
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => MISSING.to_string(),
        other => other.to_string(),
    }
}

fn field(row: &Value, key: &str) -> String {
    row.get(key).map(scalar).unwrap_or_else(|| MISSING.to_string())
}

fn render_project_list(query: &ProjectQuery, rows: &[Value]) -> String {
    let mut md = format!("# Project list ({} - {})\n\n", query.start_date, query.end_date);
    for row in rows {
        let _ = writeln!(md, "## title: {}", field(row, "title"));
        for key in ["id", "newsTypeID", "publish", "proviceCode", "cityCode"] {
            let _ = writeln!(md, "- **{key}**: {}", field(row, key));
        }
        md.push_str("---\n");
    }
    md
}

/// Render a JSON value as nested markdown: objects become `**key**: value`
/// lines indented two spaces per level, arrays become `- item` bullets.
pub fn json_to_markdown(value: &Value, indent: usize) -> String {
    let pad = " ".repeat(indent);
    let Value::Object(map) = value else {
        return format!("{pad}{}\n", scalar(value));
    };

    let mut md = String::new();
    for (key, value) in map {
        let _ = write!(md, "{pad}**{key}**: ");
        match value {
            Value::Object(_) => {
                md.push('\n');
                md.push_str(&json_to_markdown(value, indent + 2));
            }
            Value::Array(items) => {
                md.push('\n');
                for item in items {
                    let _ = writeln!(md, "{pad}  - {}", scalar(item));
                }
            }
            other => {
                let _ = writeln!(md, "{}", scalar(other));
            }
        }
    }
    md
}
