//! Configuration file loading
//!
//! The configuration is read once at startup and never reloaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::errors::WatchError;
use crate::logs::LogLevel;
use crate::process::CommandSpec;

/// Default configuration file name, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// How upstream changes are detected for a repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Fetch `origin`, then compare `HEAD` against `origin/<branch>`
    #[default]
    Revision,

    /// `git fetch --dry-run` against the token-authenticated remote;
    /// any output means there is something to pull
    DryRun,
}

/// One watched repository
#[derive(Debug, Clone, Deserialize)]
pub struct RepoConfig {
    /// Display identifier, a URL or `owner/repo`
    pub repo_url: String,

    /// Local working tree
    pub repo_path: PathBuf,

    /// Tracked branch
    pub branch: String,

    /// Directory where install + build run after a pull
    #[serde(default)]
    pub build_path: Option<PathBuf>,

    #[serde(default = "default_install_command")]
    pub install_command: CommandSpec,

    #[serde(default = "default_build_command")]
    pub build_command: CommandSpec,

    /// Commands run in `repo_path` after a pull, when no build path is set
    #[serde(default)]
    pub commands: Vec<CommandSpec>,

    /// Stash local modifications before fetching
    #[serde(default)]
    pub stash: bool,

    #[serde(default)]
    pub detection: DetectionMode,
}

fn default_install_command() -> CommandSpec {
    CommandSpec::new("npm", ["install"])
}

fn default_build_command() -> CommandSpec {
    CommandSpec::new("npm", ["run", "build"])
}

/// Daemon configuration
#[derive(Debug)]
pub struct Config {
    /// Chat webhook endpoint; notifications are skipped when unset
    pub webhook_url: Option<String>,

    /// Watched repositories, processed in this order
    pub repos: Vec<RepoConfig>,

    /// Access token embedded in the remote URL for dry-run detection
    pub git_token: Option<SecretString>,

    pub poll_interval: Duration,

    /// Upper bound for every external command
    pub command_timeout: Duration,

    pub log_level: LogLevel,

    pub log_dir: Option<PathBuf>,

    pub log_json: bool,
}

/// On-disk layout. Older files describe a single repository with top-level
/// `repo_url`/`repo_path`/`branch` keys instead of a `repos` list.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    webhook_url: Option<String>,

    #[serde(default)]
    repos: Vec<RepoConfig>,

    #[serde(default)]
    git_token: Option<String>,

    #[serde(default = "default_poll_interval")]
    poll_interval_secs: u64,

    #[serde(default = "default_command_timeout")]
    command_timeout_secs: u64,

    #[serde(default)]
    log_level: LogLevel,

    #[serde(default)]
    log_dir: Option<PathBuf>,

    #[serde(default)]
    log_json: bool,

    #[serde(default)]
    repo_url: Option<String>,

    #[serde(default)]
    repo_path: Option<PathBuf>,

    #[serde(default)]
    branch: Option<String>,

    #[serde(default)]
    build_path: Option<PathBuf>,

    #[serde(default)]
    commands: Vec<CommandSpec>,

    #[serde(default)]
    stash: bool,

    #[serde(default)]
    detection: Option<DetectionMode>,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_command_timeout() -> u64 {
    300
}

impl Config {
    /// Read and validate the configuration file
    pub async fn load(path: &Path) -> Result<Self, WatchError> {
        debug!(path = %path.display(), "Loading configuration");
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            WatchError::ConfigError(format!("Unable to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate configuration JSON
    pub fn from_json(contents: &str) -> Result<Self, WatchError> {
        let raw: RawConfig = serde_json::from_str(contents)
            .map_err(|e| WatchError::ConfigError(format!("Invalid configuration: {}", e)))?;
        Self::try_from(raw)
    }

    /// The webhook URL, with an empty string treated as unset
    pub fn webhook_url(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// The git token, with an empty string treated as unset
    pub fn git_token(&self) -> Option<&SecretString> {
        self.git_token
            .as_ref()
            .filter(|token| !token.expose_secret().trim().is_empty())
    }

    fn validate(&self) -> Result<(), WatchError> {
        if self.poll_interval.is_zero() {
            return Err(WatchError::ConfigError(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.command_timeout.is_zero() {
            return Err(WatchError::ConfigError(
                "command_timeout_secs must be at least 1".to_string(),
            ));
        }

        for (idx, repo) in self.repos.iter().enumerate() {
            if repo.repo_url.trim().is_empty() {
                return Err(WatchError::ConfigError(format!("repos[{}]: repo_url is empty", idx)));
            }
            if repo.repo_path.as_os_str().is_empty() {
                return Err(WatchError::ConfigError(format!(
                    "repos[{}] ({}): repo_path is empty",
                    idx, repo.repo_url
                )));
            }
            if repo.branch.trim().is_empty() {
                return Err(WatchError::ConfigError(format!(
                    "repos[{}] ({}): branch is empty",
                    idx, repo.repo_url
                )));
            }
            if repo.detection == DetectionMode::DryRun && self.git_token().is_none() {
                return Err(WatchError::ConfigError(format!(
                    "repos[{}] ({}): dry_run detection requires git_token",
                    idx, repo.repo_url
                )));
            }
        }

        Ok(())
    }
}

impl TryFrom<RawConfig> for Config {
    type Error = WatchError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let mut repos = raw.repos;

        let legacy = raw.repo_url.is_some() || raw.repo_path.is_some() || raw.branch.is_some();
        if legacy {
            if !repos.is_empty() {
                return Err(WatchError::ConfigError(
                    "Use either `repos` or top-level repo_url/repo_path/branch, not both".to_string(),
                ));
            }
            // Single-repository files that carry a token predate the
            // `detection` key and always checked the authenticated remote.
            let has_token = raw.git_token.as_deref().is_some_and(|t| !t.trim().is_empty());
            let detection = raw.detection.unwrap_or(if has_token {
                DetectionMode::DryRun
            } else {
                DetectionMode::Revision
            });
            let missing = |field: &str| {
                WatchError::ConfigError(format!("Missing required field `{}`", field))
            };
            repos.push(RepoConfig {
                repo_url: raw.repo_url.ok_or_else(|| missing("repo_url"))?,
                repo_path: raw.repo_path.ok_or_else(|| missing("repo_path"))?,
                branch: raw.branch.ok_or_else(|| missing("branch"))?,
                build_path: raw.build_path,
                install_command: default_install_command(),
                build_command: default_build_command(),
                commands: raw.commands,
                stash: raw.stash,
                detection,
            });
        }

        let config = Config {
            webhook_url: raw.webhook_url,
            repos,
            git_token: raw.git_token.map(SecretString::from),
            poll_interval: Duration::from_secs(raw.poll_interval_secs),
            command_timeout: Duration::from_secs(raw.command_timeout_secs),
            log_level: raw.log_level,
            log_dir: raw.log_dir,
            log_json: raw.log_json,
        };
        config.validate()?;
        Ok(config)
    }
}
