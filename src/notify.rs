//! Report delivery.
//!
//! A delivery failure is logged and dropped: the report is already on disk
//! and stays valid whether or not anyone was told about it.

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::config::NotifierConfig;
use crate::error::NotifyError;
use crate::models::{Report, ReportKind};

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    subject: String,
    kind: ReportKind,
    report: &'a str,
    file_path: String,
}

#[derive(Debug, Clone)]
pub enum Notifier {
    /// Only logs that a report is ready.
    Log,
    /// POSTs the report as JSON to a webhook.
    Webhook { http: reqwest::Client, url: String },
}

impl Notifier {
    pub fn from_config(config: &NotifierConfig, http: reqwest::Client) -> Self {
        match config.webhook_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => Notifier::Webhook {
                http,
                url: url.to_string(),
            },
            None => Notifier::Log,
        }
    }

    fn subject(subject: &str, kind: ReportKind) -> String {
        format!("[ProgressSentinel] {subject} {} report", kind.label())
    }

    /// Deliver `report`, logging instead of failing.
    pub async fn notify(&self, subject: &str, report: &Report) {
        if let Err(e) = self.try_notify(subject, report).await {
            error!(%subject, kind = %report.kind, error = %e, "Notification failed; report kept on disk");
        }
    }

    #[instrument(level = "info", skip_all, fields(%subject, kind = %report.kind))]
    pub async fn try_notify(&self, subject: &str, report: &Report) -> Result<(), NotifyError> {
        let subject = Self::subject(subject, report.kind);
        match self {
            Notifier::Log => {
                info!(%subject, path = %report.path.display(), "Report ready");
                Ok(())
            }
            Notifier::Webhook { http, url } => {
                let payload = WebhookPayload {
                    subject,
                    kind: report.kind,
                    report: &report.text,
                    file_path: report.path.display().to_string(),
                };
                let response = http.post(url).json(&payload).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(NotifyError::Status(status.as_u16()));
                }
                info!("Webhook notified");
                Ok(())
            }
        }
    }
}
