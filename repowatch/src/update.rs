//! Pull and post-pull steps for one repository

use std::fmt;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::config::{DetectionMode, RepoConfig};
use crate::detect::{Detection, UpdateDetector};
use crate::git::remote::{authenticated_url, redact};
use crate::git::Git;
use crate::process::{CommandRunner, CommandSpec};

/// Step of a repository cycle that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Stash,
    Fetch,
    Pull,
    Install,
    Build,
    Command(String),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Stash => write!(f, "stash"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Pull => write!(f, "pull"),
            Stage::Install => write!(f, "install"),
            Stage::Build => write!(f, "build"),
            Stage::Command(cmd) => write!(f, "command `{}`", cmd),
        }
    }
}

/// What an applied update changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub old_revision: String,
    pub new_revision: String,
    pub pull_log: String,
    /// Output of the install/build pair or the custom commands
    pub command_log: String,
}

/// Result of one repository cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoUpdate,
    Indeterminate(String),
    Updated(UpdateReport),
    /// `report` is set when the failure came after a successful pull, so the
    /// working tree has already moved to `report.new_revision`.
    Failed {
        stage: Stage,
        message: String,
        report: Option<UpdateReport>,
    },
}

impl RunOutcome {
    fn failed(stage: Stage, message: impl Into<String>) -> Self {
        RunOutcome::Failed {
            stage,
            message: message.into(),
            report: None,
        }
    }
}

/// A failed install, build or custom command, with the log gathered so far
struct StepFailure {
    stage: Stage,
    message: String,
    log: String,
}

const UNKNOWN_REVISION: &str = "unknown";

/// Applies upstream changes to a repository
pub struct Updater<'a> {
    runner: &'a dyn CommandRunner,
    git_token: Option<&'a SecretString>,
}

impl<'a> Updater<'a> {
    pub fn new(runner: &'a dyn CommandRunner, git_token: Option<&'a SecretString>) -> Self {
        Self { runner, git_token }
    }

    /// Run one cycle for `repo`: stash, fetch, detect, pull, then either
    /// install + build or the custom commands. Stops at the first failing step.
    pub async fn process(&self, repo: &RepoConfig) -> RunOutcome {
        let git = Git::new(self.runner, &repo.repo_path);

        if repo.stash {
            if let Err(e) = git.stash().await {
                return RunOutcome::failed(Stage::Stash, e.to_string());
            }
        }

        if repo.detection == DetectionMode::Revision {
            if let Err(e) = git.fetch("origin").await {
                return RunOutcome::failed(Stage::Fetch, e.to_string());
            }
        }

        let detection = UpdateDetector::new(self.runner, self.git_token)
            .detect(repo)
            .await;
        let old_revision = match detection {
            Detection::UpToDate => return RunOutcome::NoUpdate,
            Detection::Indeterminate(reason) => return RunOutcome::Indeterminate(reason),
            Detection::UpdateAvailable { local, .. } => local,
        };

        info!(repo = %repo.repo_url, branch = %repo.branch, "Update detected, pulling");

        let pull_log = match self.pull(&git, repo).await {
            Ok(output) => output,
            Err(message) => return RunOutcome::failed(Stage::Pull, message),
        };

        let new_revision = git
            .rev_parse("HEAD")
            .await
            .unwrap_or_else(|_| UNKNOWN_REVISION.to_string());
        debug!(old = %old_revision, new = %new_revision, "Pulled");

        let mut report = UpdateReport {
            old_revision,
            new_revision,
            pull_log,
            command_log: String::new(),
        };

        let steps = if let Some(build_path) = &repo.build_path {
            self.build(repo, build_path).await
        } else {
            self.run_commands(&repo.repo_path, &repo.commands).await
        };

        match steps {
            Ok(log) => {
                report.command_log = log;
                RunOutcome::Updated(report)
            }
            Err(failure) => {
                report.command_log = failure.log;
                RunOutcome::Failed {
                    stage: failure.stage,
                    message: failure.message,
                    report: Some(report),
                }
            }
        }
    }

    /// Pull from `origin`, or from the token-authenticated remote when the
    /// repository is checked that way. The token never reaches the message.
    async fn pull(&self, git: &Git<'_>, repo: &RepoConfig) -> Result<String, String> {
        if repo.detection == DetectionMode::Revision {
            return git
                .pull("origin", &repo.branch)
                .await
                .map_err(|e| e.to_string());
        }

        let token = self
            .git_token
            .ok_or_else(|| "no git_token configured".to_string())?;
        let url = authenticated_url(&repo.repo_url, token).map_err(|e| e.to_string())?;
        git.pull_url(url.expose_secret(), &repo.branch)
            .await
            .map_err(|e| redact(&e.to_string(), token))
    }

    /// Install dependencies, then build. The build never runs after a
    /// failed install.
    async fn build(&self, repo: &RepoConfig, build_path: &Path) -> Result<String, StepFailure> {
        let mut log = String::new();
        for (stage, command) in [
            (Stage::Install, &repo.install_command),
            (Stage::Build, &repo.build_command),
        ] {
            info!(repo = %repo.repo_url, command = %command, "Running {} step", stage);
            if let Err(message) = self.step(build_path, command, &mut log).await {
                return Err(StepFailure { stage, message, log });
            }
        }
        Ok(log)
    }

    /// Run the custom commands in order; the first failure ends the sequence
    async fn run_commands(&self, dir: &Path, commands: &[CommandSpec]) -> Result<String, StepFailure> {
        let mut log = String::new();
        for command in commands {
            info!(command = %command, "Running post-pull command");
            if let Err(message) = self.step(dir, command, &mut log).await {
                return Err(StepFailure {
                    stage: Stage::Command(command.to_string()),
                    message,
                    log,
                });
            }
        }
        Ok(log)
    }

    /// Run one command, appending its output to `log`
    async fn step(&self, dir: &Path, command: &CommandSpec, log: &mut String) -> Result<(), String> {
        let output = self
            .runner
            .run(dir, command)
            .await
            .map_err(|e| e.to_string())?;

        log.push_str(&format!("$ {}\n{}", command, output.output));
        if !log.ends_with('\n') {
            log.push('\n');
        }

        if output.success() {
            Ok(())
        } else {
            Err(format!(
                "`{}` {}\n{}",
                command,
                output.failure_reason(),
                output.output.trim()
            ))
        }
    }
}
