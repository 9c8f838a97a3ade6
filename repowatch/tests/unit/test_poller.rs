//! Poll loop tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use repowatch::config::Config;
use repowatch::notify::Notifier;
use repowatch::update::{RunOutcome, Stage};
use repowatch::workers::poller::{self, poll_once};
use tokio::sync::Notify;

use crate::support::{fail, ok, ScriptedRunner, WebhookServer};

fn config(json: &str) -> Config {
    Config::from_json(json).unwrap()
}

#[tokio::test]
async fn test_zero_repos_still_sleeps_and_repeats() {
    let config = config("{}");
    let runner = ScriptedRunner::new();
    let notifier = Notifier::new(None).unwrap();
    let options = poller::Options {
        interval: Duration::from_secs(10),
    };

    let sleeps = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(Notify::new());
    let sleep_fn = {
        let sleeps = sleeps.clone();
        let stop = stop.clone();
        move |interval: Duration| {
            assert_eq!(interval, Duration::from_secs(10));
            if sleeps.fetch_add(1, Ordering::SeqCst) + 1 >= 3 {
                stop.notify_one();
            }
            std::future::ready(())
        }
    };
    let shutdown = {
        let stop = stop.clone();
        Box::pin(async move { stop.notified().await })
    };

    poller::run(&options, &config, &runner, &notifier, sleep_fn, shutdown).await;

    assert!(sleeps.load(Ordering::SeqCst) >= 3);
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_shutdown_stops_before_sleeping_again() {
    let config = config(r#"{"repos": [{"repo_url": "acme/site", "repo_path": "/srv/site", "branch": "main"}]}"#);
    let runner = ScriptedRunner::new();
    let notifier = Notifier::new(None).unwrap();

    poller::run(
        &poller::Options::default(),
        &config,
        &runner,
        &notifier,
        |_| futures::future::pending::<()>(),
        Box::pin(async {}),
    )
    .await;

    // One full cycle ran before shutdown was observed.
    assert!(runner.ran("git fetch origin"));
}

#[tokio::test]
async fn test_repos_processed_in_order_and_failures_isolated() {
    let config = config(
        r#"{"repos": [
            {"repo_url": "acme/broken", "repo_path": "/srv/broken", "branch": "main"},
            {"repo_url": "acme/site", "repo_path": "/srv/site", "branch": "main"}
        ]}"#,
    );
    let runner = ScriptedRunner::new()
        .on("git fetch origin", fail(128, "fatal: repository not found"))
        .on("git fetch origin", ok(""))
        .on("git rev-parse HEAD", ok("abc123"))
        .on("git rev-parse origin/main", ok("abc123"));
    let notifier = Notifier::new(None).unwrap();

    let outcomes = poll_once(&config, &runner, &notifier).await;

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], RunOutcome::Failed { stage: Stage::Fetch, .. }));
    assert_eq!(outcomes[1], RunOutcome::NoUpdate);
    assert_eq!(runner.calls_in("/srv/broken"), vec!["git fetch origin"]);
    assert_eq!(runner.calls_in("/srv/site")[0], "git fetch origin");
}

#[tokio::test]
async fn test_failed_pull_is_notified() {
    let server = WebhookServer::spawn(StatusCode::NO_CONTENT).await;
    let config = config(&format!(
        r#"{{"webhook_url": "{}", "repos": [
            {{"repo_url": "acme/site", "repo_path": "/srv/site", "branch": "main",
              "build_path": "/srv/site/web"}}
        ]}}"#,
        server.url
    ));
    let runner = ScriptedRunner::new()
        .on("git rev-parse HEAD", ok("abc123"))
        .on("git rev-parse origin/main", ok("def456"))
        .on("git pull origin main", fail(1, "error: Your local changes would be overwritten"));
    let notifier = Notifier::new(config.webhook_url()).unwrap();

    let outcomes = poll_once(&config, &runner, &notifier).await;

    assert!(matches!(outcomes[0], RunOutcome::Failed { stage: Stage::Pull, .. }));
    assert!(!runner.ran("npm install"));
    assert!(!runner.ran("npm run build"));

    let bodies = server.bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["embeds"][0]["title"], "Update failed at pull");
}

#[tokio::test]
async fn test_webhook_failure_does_not_stop_cycle() {
    let server = WebhookServer::spawn(StatusCode::INTERNAL_SERVER_ERROR).await;
    let config = config(&format!(
        r#"{{"webhook_url": "{}", "repos": [
            {{"repo_url": "acme/one", "repo_path": "/srv/one", "branch": "main"}},
            {{"repo_url": "acme/two", "repo_path": "/srv/two", "branch": "main"}}
        ]}}"#,
        server.url
    ));
    let runner = ScriptedRunner::new()
        .on("git rev-parse HEAD", ok("abc123"))
        .on("git rev-parse origin/main", ok("def456"));
    let notifier = Notifier::new(config.webhook_url()).unwrap();

    let outcomes = poll_once(&config, &runner, &notifier).await;

    assert!(outcomes.iter().all(|o| matches!(o, RunOutcome::Updated(_))));
    assert_eq!(server.bodies().len(), 2);
}
