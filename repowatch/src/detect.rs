//! Upstream change detection

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::{DetectionMode, RepoConfig};
use crate::git::remote::{authenticated_url, redact};
use crate::git::Git;
use crate::process::CommandRunner;

/// Outcome of checking one repository against its remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    UpToDate,

    /// The remote tip differs from the checked out commit
    UpdateAvailable { local: String, remote: String },

    /// A lookup failed, so nothing can be said about the remote. No pull
    /// is attempted.
    Indeterminate(String),
}

impl Detection {
    pub fn is_update(&self) -> bool {
        matches!(self, Detection::UpdateAvailable { .. })
    }
}

/// Whether two tip ids name different commits
pub fn has_update(local: &str, remote: &str) -> bool {
    local.trim() != remote.trim()
}

/// Detects pending upstream commits
pub struct UpdateDetector<'a> {
    runner: &'a dyn CommandRunner,
    git_token: Option<&'a SecretString>,
}

impl<'a> UpdateDetector<'a> {
    pub fn new(runner: &'a dyn CommandRunner, git_token: Option<&'a SecretString>) -> Self {
        Self { runner, git_token }
    }

    /// Check `repo` for upstream changes.
    ///
    /// Revision detection compares against `origin/<branch>`, so the caller
    /// is expected to have fetched `origin` already. Dry-run detection asks
    /// the token-authenticated remote directly.
    pub async fn detect(&self, repo: &RepoConfig) -> Detection {
        match repo.detection {
            DetectionMode::Revision => self.compare_revisions(repo).await,
            DetectionMode::DryRun => self.query_remote(repo).await,
        }
    }

    async fn compare_revisions(&self, repo: &RepoConfig) -> Detection {
        let git = Git::new(self.runner, &repo.repo_path);

        let local = match git.rev_parse("HEAD").await {
            Ok(rev) => rev,
            Err(e) => return Detection::Indeterminate(e.to_string()),
        };
        let remote = match git.rev_parse(&format!("origin/{}", repo.branch)).await {
            Ok(rev) => rev,
            Err(e) => return Detection::Indeterminate(e.to_string()),
        };

        compare(local, remote)
    }

    /// Ask the authenticated remote for its branch tip. Nothing is fetched
    /// and `origin` is left untouched.
    async fn query_remote(&self, repo: &RepoConfig) -> Detection {
        let Some(token) = self.git_token else {
            return Detection::Indeterminate("no git_token configured".to_string());
        };
        let url = match authenticated_url(&repo.repo_url, token) {
            Ok(url) => url,
            Err(e) => return Detection::Indeterminate(e.to_string()),
        };

        let git = Git::new(self.runner, &repo.repo_path);
        let remote = match git.ls_remote(url.expose_secret(), &repo.branch).await {
            Ok(Some(rev)) => rev,
            Ok(None) => {
                return Detection::Indeterminate(format!(
                    "branch `{}` not found on remote",
                    repo.branch
                ))
            }
            Err(e) => return Detection::Indeterminate(redact(&e.to_string(), token)),
        };
        let local = match git.rev_parse("HEAD").await {
            Ok(rev) => rev,
            Err(e) => return Detection::Indeterminate(e.to_string()),
        };

        compare(local, remote)
    }
}

fn compare(local: String, remote: String) -> Detection {
    debug!(local = %local, remote = %remote, "Compared revisions");
    if has_update(&local, &remote) {
        Detection::UpdateAvailable { local, remote }
    } else {
        Detection::UpToDate
    }
}
