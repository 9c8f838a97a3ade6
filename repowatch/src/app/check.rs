//! Configuration diagnostics for `--check`

use colored::Colorize;

use secrecy::SecretString;

use crate::config::{Config, DetectionMode, RepoConfig};
use crate::detect::{Detection, UpdateDetector};
use crate::git::Git;
use crate::process::{CommandRunner, CommandSpec};

/// One diagnostic line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub label: String,
    pub ok: bool,
    pub detail: String,
}

impl CheckResult {
    fn pass(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(label: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Verify that git is runnable and every repository is usable
pub async fn run_checks(config: &Config, runner: &dyn CommandRunner) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let git_version = CommandSpec::new("git", ["--version"]);
    results.push(match runner.run(std::path::Path::new("."), &git_version).await {
        Ok(output) if output.success() => CheckResult::pass("git", output.output.trim()),
        Ok(output) => CheckResult::fail("git", output.failure_reason()),
        Err(e) => CheckResult::fail("git", e.to_string()),
    });

    results.push(match config.webhook_url() {
        Some(_) => CheckResult::pass("webhook", "configured"),
        None => CheckResult::pass("webhook", "not configured, notifications disabled"),
    });

    for repo in &config.repos {
        check_repo(repo, runner, config.git_token(), &mut results).await;
    }

    results
}

async fn check_repo(
    repo: &RepoConfig,
    runner: &dyn CommandRunner,
    git_token: Option<&SecretString>,
    results: &mut Vec<CheckResult>,
) {
    let label = format!("{} ({})", repo.repo_url, repo.branch);

    if !repo.repo_path.is_dir() {
        results.push(CheckResult::fail(
            label,
            format!("{} is not a directory", repo.repo_path.display()),
        ));
        return;
    }

    let git = Git::new(runner, &repo.repo_path);
    match git.rev_parse("HEAD").await {
        Ok(head) => results.push(CheckResult::pass(&label, format!("HEAD {}", head))),
        Err(e) => {
            results.push(CheckResult::fail(label, e.to_string()));
            return;
        }
    }

    match repo.detection {
        DetectionMode::Revision => {
            let tracking = format!("origin/{}", repo.branch);
            if let Err(e) = git.rev_parse(&tracking).await {
                results.push(CheckResult::fail(&label, e.to_string()));
            }
        }
        DetectionMode::DryRun => {
            let detection = UpdateDetector::new(runner, git_token).detect(repo).await;
            if let Detection::Indeterminate(reason) = detection {
                results.push(CheckResult::fail(&label, reason));
            }
        }
    }

    if let Some(build_path) = &repo.build_path {
        if !build_path.is_dir() {
            results.push(CheckResult::fail(
                &label,
                format!("build path {} is not a directory", build_path.display()),
            ));
        }
    }
}

/// Print results to stdout; returns whether every check passed
pub fn print_results(results: &[CheckResult]) -> bool {
    for result in results {
        let status = if result.ok { "ok".green() } else { "FAIL".red().bold() };
        println!("[{}] {}: {}", status, result.label.bold(), result.detail);
    }
    results.iter().all(|result| result.ok)
}
