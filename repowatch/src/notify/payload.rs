//! Webhook message bodies

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RepoConfig;
use crate::update::{Stage, UpdateReport};
use crate::utils::truncate;

/// Log fields are cut to this many characters
pub const LOG_FIELD_LIMIT: usize = 1000;

pub const COLOR_UPDATED: u32 = 5_814_783;
pub const COLOR_FAILED: u32 = 15_158_332;

/// Body of a webhook POST: plain content, embeds, or both
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embeds: Vec::new(),
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embeds: vec![embed],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    /// RFC 3339
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

impl EmbedField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl Embed {
    /// Report a successfully applied update
    pub fn update_applied(repo: &RepoConfig, report: &UpdateReport, now: DateTime<Utc>) -> Self {
        Self {
            title: "Update detected and applied".to_string(),
            description: format!(
                "Repository **{}** was updated on branch `{}`.",
                repo.repo_url, repo.branch
            ),
            color: COLOR_UPDATED,
            fields: vec![
                EmbedField::new("Previous commit", inline_code(&report.old_revision)),
                EmbedField::new("New commit", inline_code(&report.new_revision)),
                EmbedField::new("Pull log", code_block(&report.pull_log)),
                EmbedField::new("Command log", code_block(&report.command_log)),
            ],
            timestamp: rfc3339(now),
        }
    }

    /// Report a failed repository cycle. When the pull already went through,
    /// `pulled` carries the revisions the working tree moved between.
    pub fn update_failed(
        repo: &RepoConfig,
        stage: &Stage,
        message: &str,
        pulled: Option<&UpdateReport>,
        now: DateTime<Utc>,
    ) -> Self {
        let description = match pulled {
            Some(_) => format!(
                "Repository **{}** on branch `{}` was pulled, but the {} step failed.",
                repo.repo_url, repo.branch, stage
            ),
            None => format!(
                "Repository **{}** on branch `{}` could not be updated.",
                repo.repo_url, repo.branch
            ),
        };

        let mut fields = vec![
            EmbedField::new("Stage", stage.to_string()),
            EmbedField::new("Error", code_block(message)),
        ];
        if let Some(report) = pulled {
            fields.extend([
                EmbedField::new("Previous commit", inline_code(&report.old_revision)),
                EmbedField::new("New commit", inline_code(&report.new_revision)),
                EmbedField::new("Pull log", code_block(&report.pull_log)),
            ]);
        }

        Self {
            title: format!("Update failed at {}", stage),
            description,
            color: COLOR_FAILED,
            fields,
            timestamp: rfc3339(now),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }
}

fn rfc3339(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn inline_code(value: &str) -> String {
    format!("`{}`", value)
}

/// Leading whitespace is kept so the field stays a prefix of the log
fn code_block(log: &str) -> String {
    let log = log.trim_end();
    if log.trim_start().is_empty() {
        return "```(no output)```".to_string();
    }
    format!("```{}```", truncate(log, LOG_FIELD_LIMIT))
}
