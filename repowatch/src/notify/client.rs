//! Webhook HTTP client

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::RepoConfig;
use crate::errors::WatchError;
use crate::notify::payload::{Embed, WebhookPayload};
use crate::update::RunOutcome;

/// Posts messages to a chat webhook
pub struct Notifier {
    client: Client,
    webhook_url: Option<String>,
}

impl Notifier {
    /// Create a notifier. A missing or blank URL disables delivery.
    pub fn new(webhook_url: Option<&str>) -> Result<Self, WatchError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            webhook_url: webhook_url
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// POST `payload`. Does nothing when no endpoint is configured.
    ///
    /// The endpoint is expected to answer 204; any other status is an error.
    pub async fn send(&self, payload: &WebhookPayload) -> Result<(), WatchError> {
        let Some(url) = &self.webhook_url else {
            return Ok(());
        };
        debug!("POST webhook");

        // The webhook URL embeds its own secret, so keep it out of errors.
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| WatchError::HttpError(e.without_url()))?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(WatchError::WebhookError(format!(
                "Unexpected status {}: {}",
                status,
                body.trim()
            )));
        }

        Ok(())
    }

    /// Send a plain text message
    pub async fn send_text(&self, content: &str) -> Result<(), WatchError> {
        self.send(&WebhookPayload::text(content)).await
    }

    /// Report the outcome of a repository cycle. Only applied updates and
    /// failures produce a message.
    pub async fn notify_outcome(&self, repo: &RepoConfig, outcome: &RunOutcome) -> Result<(), WatchError> {
        let embed = match outcome {
            RunOutcome::Updated(report) => Embed::update_applied(repo, report, Utc::now()),
            RunOutcome::Failed {
                stage,
                message,
                report,
            } => Embed::update_failed(repo, stage, message, report.as_ref(), Utc::now()),
            RunOutcome::NoUpdate | RunOutcome::Indeterminate(_) => return Ok(()),
        };
        self.send(&WebhookPayload::embed(embed)).await
    }
}
