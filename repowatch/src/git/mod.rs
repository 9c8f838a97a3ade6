//! Git operations

pub mod remote;

use std::path::Path;

use tracing::debug;

use crate::errors::WatchError;
use crate::process::{CommandOutput, CommandRunner, CommandSpec};

/// Git commands against one working tree
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    dir: &'a Path,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, dir: &'a Path) -> Self {
        Self { runner, dir }
    }

    /// Resolve a revision to its full commit id
    pub async fn rev_parse(&self, rev: &str) -> Result<String, WatchError> {
        let output = self.checked(&["rev-parse", rev], None).await?;
        Ok(output.trim().to_string())
    }

    /// Stash local modifications
    pub async fn stash(&self) -> Result<String, WatchError> {
        self.checked(&["stash"], None).await
    }

    /// Fetch from a named remote
    pub async fn fetch(&self, remote: &str) -> Result<String, WatchError> {
        self.checked(&["fetch", remote], None).await
    }

    /// Look up the tip of `branch` on the remote at `url` without fetching.
    /// `None` when the remote has no such branch.
    ///
    /// `url` may carry credentials, so it is kept out of logs and errors.
    pub async fn ls_remote(&self, url: &str, branch: &str) -> Result<Option<String>, WatchError> {
        let head = format!("refs/heads/{}", branch);
        let output = self
            .checked(
                &["ls-remote", url, &head],
                Some(format!("ls-remote <remote> {}", head)),
            )
            .await?;

        Ok(output
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .find(|(_, name)| name.trim() == head)
            .map(|(rev, _)| rev.trim().to_string()))
    }

    /// Pull `branch` from `remote` into the working tree
    pub async fn pull(&self, remote: &str, branch: &str) -> Result<String, WatchError> {
        self.checked(&["pull", remote, branch], None).await
    }

    /// Pull `branch` straight from `url`, which may carry credentials
    pub async fn pull_url(&self, url: &str, branch: &str) -> Result<String, WatchError> {
        self.checked(
            &["pull", url, branch],
            Some(format!("pull <remote> {}", branch)),
        )
        .await
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput, WatchError> {
        let command = CommandSpec::new("git", args.iter().copied());
        self.runner.run(self.dir, &command).await
    }

    /// Run git and turn an unsuccessful exit into an error carrying its output
    async fn checked(&self, args: &[&str], label: Option<String>) -> Result<String, WatchError> {
        let label = label.unwrap_or_else(|| args.join(" "));
        debug!(dir = %self.dir.display(), "git {}", label);

        let output = self.run(args).await?;
        if output.success() {
            return Ok(output.output);
        }

        let detail = output.output.trim();
        let message = if detail.is_empty() {
            format!("git {} {}", label, output.failure_reason())
        } else {
            format!("git {} {}: {}", label, output.failure_reason(), detail)
        };
        Err(WatchError::GitError(message))
    }
}
