//! repowatch - Entry Point
//!
//! Polls git repositories for upstream changes, pulls them, optionally
//! builds, and reports to a chat webhook.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use repowatch::app::check::{print_results, run_checks};
use repowatch::app::options::AppOptions;
use repowatch::app::run::run;
use repowatch::config::{Config, DEFAULT_CONFIG_FILE};
use repowatch::logs::{init_logging, LogOptions};
use repowatch::process::SystemRunner;
use repowatch::utils::version_info;

use tracing::{error, info};

const CONFIG_ENV_VAR: &str = "REPOWATCH_CONFIG";

/// Options that need a value, given as `--key=value` or `--key value`
const VALUE_OPTIONS: &[&str] = &["config"];

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let cli_args = match parse_args(env::args().skip(1)) {
        Ok(cli_args) => cli_args,
        Err(e) => {
            eprintln!("repowatch: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    let config_path = cli_args
        .get("config")
        .cloned()
        .or_else(|| env::var(CONFIG_ENV_VAR).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let config = match Config::load(&config_path).await {
        Ok(config) => config,
        Err(e) => {
            let _ = init_logging(LogOptions::default());
            error!("Unable to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let log_options = LogOptions {
        log_level: config.log_level,
        log_dir: config.log_dir.clone(),
        json_format: config.log_json,
        ..Default::default()
    };
    let _log_guard = match init_logging(log_options) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run diagnostics
    if cli_args.contains_key("check") {
        let runner = SystemRunner::new(config.command_timeout);
        let results = run_checks(&config, &runner).await;
        return if print_results(&results) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let options = AppOptions {
        run_once: cli_args.contains_key("once"),
        ..AppOptions::from_config(&config)
    };

    info!(
        version = %version.version,
        config = %config_path.display(),
        "Running repowatch with options: {:?}",
        options
    );
    if let Err(e) = run(&config, options, await_shutdown_signal()).await {
        error!("Failed to run repowatch: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<HashMap<String, String>, String> {
    let mut cli_args = HashMap::new();
    let mut args = args.into_iter().peekable();

    while let Some(arg) = args.next() {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            let clean_key = arg.trim_start_matches('-').to_string();
            if VALUE_OPTIONS.contains(&clean_key.as_str()) {
                // Handle --key value format
                match args.next_if(|next| !next.starts_with("--")) {
                    Some(value) => cli_args.insert(clean_key, value),
                    None => return Err(format!("--{} requires a value", clean_key)),
                };
            } else {
                // Handle standalone flags like --version
                cli_args.insert(clean_key, "true".to_string());
            }
        }
    }

    Ok(cli_args)
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                _ => {
                    error!("Failed to install signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl+C received, shutting down...");
        }
    }
}
