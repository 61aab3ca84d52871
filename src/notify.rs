//! Human-readable run reports.
//!
//! Every line goes to the log. When a webhook is configured, anything at
//! `INFO` or above is also posted to it as `{"content": "<line>"}`, which is
//! what Discord-style webhooks expect. Lines at `WARN` or above are prefixed
//! with `@here` so someone actually looks.

use serde_json::json;
use std::time::Duration;
use tracing::Level;

const MENTION: &str = "@here";
const TIMEOUT: Duration = Duration::from_secs(10);

pub struct Notifier {
    client: reqwest::Client,
    webhook: Option<String>,
}

impl Notifier {
    pub fn new(webhook: Option<String>) -> Self {
        let client = reqwest::Client::builder().timeout(TIMEOUT).build().unwrap_or_default();
        Self { client, webhook }
    }

    /// Log `line` at `level` and forward it to the webhook if it matters.
    pub async fn send(&self, level: Level, line: &str) {
        match level {
            Level::ERROR => tracing::error!("{line}"),
            Level::WARN => tracing::warn!("{line}"),
            Level::INFO => tracing::info!("{line}"),
            Level::DEBUG => tracing::debug!("{line}"),
            _ => tracing::trace!("{line}"),
        }
        if let (Some(url), Some(content)) = (&self.webhook, webhook_content(level, line)) {
            self.post(url, &content).await;
        }
    }

    async fn post(&self, url: &str, content: &str) {
        let response = self.client.post(url).json(&payload(content)).send().await;
        // Losing a notification is not worth losing a pass over.
        match response.and_then(reqwest::Response::error_for_status) {
            Ok(_) => tracing::trace!("Notification delivered"),
            Err(e) => tracing::warn!(error = %e, "Could not deliver notification"),
        }
    }
}

fn payload(content: &str) -> serde_json::Value {
    json!({ "content": content })
}

/// What the webhook receives for `line`, or `None` if it stays in the log.
fn webhook_content(level: Level, line: &str) -> Option<String> {
    if level > Level::INFO {
        return None;
    }
    Some(if level <= Level::WARN { format!("{MENTION} {line}") } else { line.to_string() })
}
