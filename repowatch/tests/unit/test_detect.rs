//! Update detection tests

use repowatch::config::{DetectionMode, RepoConfig};
use repowatch::detect::{Detection, UpdateDetector};
use repowatch::update::{RunOutcome, Stage, Updater};
use secrecy::SecretString;

use crate::support::{fail, ok, repo, ScriptedRunner};

const LS_REMOTE: &str = "git ls-remote https://ghp_token@github.com/acme/site.git refs/heads/main";
const AUTHENTICATED_PULL: &str = "git pull https://ghp_token@github.com/acme/site.git main";

fn token() -> SecretString {
    SecretString::from("ghp_token".to_string())
}

#[tokio::test]
async fn test_revision_mismatch_is_update() {
    let runner = ScriptedRunner::new()
        .on("git rev-parse HEAD", ok("abc123\n"))
        .on("git rev-parse origin/main", ok("def456\n"));

    let detection = UpdateDetector::new(&runner, None)
        .detect(&repo("acme/site", "/srv/site"))
        .await;

    assert_eq!(
        detection,
        Detection::UpdateAvailable {
            local: "abc123".to_string(),
            remote: "def456".to_string(),
        }
    );
}

#[tokio::test]
async fn test_failed_head_lookup_is_indeterminate() {
    let runner = ScriptedRunner::new().on(
        "git rev-parse HEAD",
        fail(128, "fatal: not a git repository"),
    );

    let detection = UpdateDetector::new(&runner, None)
        .detect(&repo("acme/site", "/nope"))
        .await;

    assert!(matches!(detection, Detection::Indeterminate(_)));
    assert!(!detection.is_update());
}

fn dry_run_repo() -> RepoConfig {
    let mut repo = repo("acme/site", "/srv/site");
    repo.detection = DetectionMode::DryRun;
    repo
}

#[tokio::test]
async fn test_remote_tip_ahead_is_update() {
    let runner = ScriptedRunner::new()
        .on(LS_REMOTE, ok("def456\trefs/heads/main\n"))
        .on("git rev-parse HEAD", ok("abc123\n"));

    let token = token();
    let detection = UpdateDetector::new(&runner, Some(&token))
        .detect(&dry_run_repo())
        .await;

    assert_eq!(
        detection,
        Detection::UpdateAvailable {
            local: "abc123".to_string(),
            remote: "def456".to_string(),
        }
    );
    assert_eq!(runner.calls(), vec![LS_REMOTE, "git rev-parse HEAD"]);
}

#[tokio::test]
async fn test_remote_tip_matching_head_is_up_to_date() {
    let runner = ScriptedRunner::new()
        .on(LS_REMOTE, ok("abc123\trefs/heads/main\n"))
        .on("git rev-parse HEAD", ok("abc123\n"));

    let token = token();
    let detection = UpdateDetector::new(&runner, Some(&token))
        .detect(&dry_run_repo())
        .await;

    assert_eq!(detection, Detection::UpToDate);
}

#[tokio::test]
async fn test_missing_remote_branch_is_indeterminate() {
    let runner = ScriptedRunner::new().on(LS_REMOTE, ok(""));

    let token = token();
    let detection = UpdateDetector::new(&runner, Some(&token))
        .detect(&dry_run_repo())
        .await;

    let Detection::Indeterminate(reason) = detection else {
        panic!("expected indeterminate, got {:?}", detection);
    };
    assert!(reason.contains("main"));
}

#[tokio::test]
async fn test_remote_lookup_failure_hides_token() {
    let runner = ScriptedRunner::new().on(
        LS_REMOTE,
        fail(128, "fatal: could not read from https://ghp_token@github.com/acme/site.git"),
    );

    let token = token();
    let detection = UpdateDetector::new(&runner, Some(&token))
        .detect(&dry_run_repo())
        .await;

    let Detection::Indeterminate(reason) = detection else {
        panic!("expected indeterminate, got {:?}", detection);
    };
    assert!(!reason.contains("ghp_token"));
}

#[tokio::test]
async fn test_dry_run_without_token_is_indeterminate() {
    let runner = ScriptedRunner::new();

    let detection = UpdateDetector::new(&runner, None).detect(&dry_run_repo()).await;

    assert!(matches!(detection, Detection::Indeterminate(_)));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_dry_run_pulls_from_authenticated_remote() {
    let runner = ScriptedRunner::new()
        .on(LS_REMOTE, ok("def456\trefs/heads/main\n"))
        .on("git rev-parse HEAD", ok("abc123\n"))
        .on("git rev-parse HEAD", ok("def456\n"));

    let token = token();
    let outcome = Updater::new(&runner, Some(&token))
        .process(&dry_run_repo())
        .await;

    let RunOutcome::Updated(report) = outcome else {
        panic!("expected an update, got {:?}", outcome);
    };
    assert_eq!(report.old_revision, "abc123");
    assert_eq!(report.new_revision, "def456");
    assert!(!runner.ran("git fetch origin"));
    assert!(!runner.ran("git pull origin main"));
    assert!(runner.ran(AUTHENTICATED_PULL));
}

#[tokio::test]
async fn test_authenticated_pull_failure_hides_token() {
    let runner = ScriptedRunner::new()
        .on(LS_REMOTE, ok("def456\trefs/heads/main\n"))
        .on("git rev-parse HEAD", ok("abc123\n"))
        .on(
            AUTHENTICATED_PULL,
            fail(1, "fatal: unable to access 'https://ghp_token@github.com/acme/site.git/'"),
        );

    let token = token();
    let outcome = Updater::new(&runner, Some(&token))
        .process(&dry_run_repo())
        .await;

    let RunOutcome::Failed { stage, message, .. } = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(stage, Stage::Pull);
    assert!(message.contains("unable to access"));
    assert!(!message.contains("ghp_token"));
}
