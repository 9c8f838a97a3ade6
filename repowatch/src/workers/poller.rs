//! Polling worker: checks every repository, then sleeps

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::config::{Config, RepoConfig};
use crate::notify::Notifier;
use crate::process::CommandRunner;
use crate::update::{RunOutcome, Updater};

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay between the end of one cycle and the start of the next
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Run the poller worker until `shutdown_signal` resolves.
///
/// The first cycle starts immediately. A cycle in progress always runs to
/// completion; shutdown is only observed while sleeping.
pub async fn run<S, F>(
    options: &Options,
    config: &Config,
    runner: &dyn CommandRunner,
    notifier: &Notifier,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!(
        repos = config.repos.len(),
        interval = ?options.interval,
        "Poller worker starting..."
    );

    loop {
        poll_once(config, runner, notifier).await;

        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Poller worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }
    }
}

/// Check every configured repository once, in configuration order
pub async fn poll_once(
    config: &Config,
    runner: &dyn CommandRunner,
    notifier: &Notifier,
) -> Vec<RunOutcome> {
    debug!("Checking {} repositories for updates", config.repos.len());

    let updater = Updater::new(runner, config.git_token());
    let mut outcomes = Vec::with_capacity(config.repos.len());

    for repo in &config.repos {
        info!(repo = %repo.repo_url, branch = %repo.branch, "Checking repository");
        let outcome = updater.process(repo).await;
        log_and_notify(repo, &outcome, notifier).await;
        outcomes.push(outcome);
    }

    outcomes
}

async fn log_and_notify(repo: &RepoConfig, outcome: &RunOutcome, notifier: &Notifier) {
    match outcome {
        RunOutcome::NoUpdate => {
            info!(repo = %repo.repo_url, "No update");
            return;
        }
        RunOutcome::Indeterminate(reason) => {
            warn!(repo = %repo.repo_url, "Could not check for updates: {}", reason);
            return;
        }
        RunOutcome::Updated(report) => {
            info!(
                repo = %repo.repo_url,
                old = %report.old_revision,
                new = %report.new_revision,
                "Update applied"
            );
        }
        RunOutcome::Failed { stage, message, .. } => {
            error!(repo = %repo.repo_url, stage = %stage, "Update failed: {}", message);
        }
    }

    if let Err(e) = notifier.notify_outcome(repo, outcome).await {
        warn!(repo = %repo.repo_url, "Failed to send notification: {}", e);
    }
}
