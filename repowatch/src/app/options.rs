//! Application configuration options

use std::time::Duration;

use crate::config::Config;
use crate::workers::poller;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Poller worker options
    pub poller: poller::Options,

    /// Time budget for each external command
    pub command_timeout: Duration,

    /// Run a single poll cycle and return
    pub run_once: bool,

    /// Post a plain text notice when the daemon starts
    pub announce_startup: bool,
}

impl AppOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poller: poller::Options {
                interval: config.poll_interval,
            },
            command_timeout: config.command_timeout,
            ..Default::default()
        }
    }
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            poller: poller::Options::default(),
            command_timeout: Duration::from_secs(300),
            run_once: false,
            announce_startup: true,
        }
    }
}
