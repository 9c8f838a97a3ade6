//! Main application run loop

use std::future::Future;

use futures::FutureExt;
use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::config::Config;
use crate::errors::WatchError;
use crate::notify::Notifier;
use crate::process::SystemRunner;
use crate::workers::poller;

/// Run the daemon until `shutdown_signal` resolves, or for a single cycle
/// when `options.run_once` is set
pub async fn run(
    config: &Config,
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), WatchError> {
    info!("Initializing repowatch...");

    let runner = SystemRunner::new(options.command_timeout);
    let notifier = Notifier::new(config.webhook_url())?;
    if !notifier.is_enabled() {
        info!("No webhook configured, notifications are disabled");
    }

    if options.announce_startup {
        let notice = format!(
            "repowatch {} started, watching {} repositories",
            env!("CARGO_PKG_VERSION"),
            config.repos.len()
        );
        if let Err(e) = notifier.send_text(&notice).await {
            warn!("Failed to send startup notice: {}", e);
        }
    }

    if options.run_once {
        poller::poll_once(config, &runner, &notifier).await;
        return Ok(());
    }

    poller::run(
        &options.poller,
        config,
        &runner,
        &notifier,
        tokio::time::sleep,
        shutdown_signal.boxed(),
    )
    .await;

    info!("repowatch stopped");
    Ok(())
}
