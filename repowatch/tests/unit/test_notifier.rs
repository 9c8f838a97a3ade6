//! Webhook delivery tests

use axum::http::StatusCode;
use repowatch::errors::WatchError;
use repowatch::notify::{Notifier, WebhookPayload};
use repowatch::update::{RunOutcome, Stage, UpdateReport};

use crate::support::{repo, WebhookServer};

#[tokio::test]
async fn test_unset_webhook_is_noop() {
    for url in [None, Some(""), Some("   ")] {
        let notifier = Notifier::new(url).unwrap();
        assert!(!notifier.is_enabled());
        assert!(notifier.send_text("hello").await.is_ok());

        let outcome = RunOutcome::Failed {
            stage: Stage::Pull,
            message: "x".repeat(10_000),
            report: None,
        };
        assert!(notifier
            .notify_outcome(&repo("acme/site", "/srv/site"), &outcome)
            .await
            .is_ok());
    }
}

#[tokio::test]
async fn test_text_payload_delivered() {
    let server = WebhookServer::spawn(StatusCode::NO_CONTENT).await;
    let notifier = Notifier::new(Some(server.url.as_str())).unwrap();

    notifier.send_text("repowatch started").await.unwrap();

    assert_eq!(
        server.bodies(),
        vec![serde_json::json!({"content": "repowatch started"})]
    );
}

#[tokio::test]
async fn test_unexpected_status_is_an_error() {
    let server = WebhookServer::spawn(StatusCode::BAD_REQUEST).await;
    let notifier = Notifier::new(Some(server.url.as_str())).unwrap();

    let err = notifier
        .send(&WebhookPayload::text("hello"))
        .await
        .unwrap_err();

    assert!(matches!(err, WatchError::WebhookError(_)));
    assert!(err.to_string().contains("400"));
    assert_eq!(server.bodies().len(), 1);
}

#[tokio::test]
async fn test_ok_status_is_not_no_content() {
    let server = WebhookServer::spawn(StatusCode::OK).await;
    let notifier = Notifier::new(Some(server.url.as_str())).unwrap();

    assert!(notifier.send_text("hello").await.is_err());
}

#[tokio::test]
async fn test_update_embed_delivered() {
    let server = WebhookServer::spawn(StatusCode::NO_CONTENT).await;
    let notifier = Notifier::new(Some(server.url.as_str())).unwrap();
    let outcome = RunOutcome::Updated(UpdateReport {
        old_revision: "abc123".to_string(),
        new_revision: "def456".to_string(),
        pull_log: "Fast-forward".to_string(),
        command_log: String::new(),
    });

    notifier
        .notify_outcome(&repo("acme/site", "/srv/site"), &outcome)
        .await
        .unwrap();

    let bodies = server.bodies();
    assert_eq!(bodies.len(), 1);
    let embed = &bodies[0]["embeds"][0];
    assert_eq!(embed["title"], "Update detected and applied");
    assert_eq!(embed["fields"][1]["name"], "New commit");
    assert_eq!(embed["fields"][1]["value"], "`def456`");
    assert!(embed["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_quiet_outcomes_send_nothing() {
    let server = WebhookServer::spawn(StatusCode::NO_CONTENT).await;
    let notifier = Notifier::new(Some(server.url.as_str())).unwrap();
    let repo = repo("acme/site", "/srv/site");

    notifier.notify_outcome(&repo, &RunOutcome::NoUpdate).await.unwrap();
    notifier
        .notify_outcome(&repo, &RunOutcome::Indeterminate("offline".to_string()))
        .await
        .unwrap();

    assert!(server.bodies().is_empty());
}

#[tokio::test]
async fn test_failure_after_pull_carries_revisions() {
    let server = WebhookServer::spawn(StatusCode::NO_CONTENT).await;
    let notifier = Notifier::new(Some(server.url.as_str())).unwrap();
    let outcome = RunOutcome::Failed {
        stage: Stage::Build,
        message: "`npm run build` exited with code 1".to_string(),
        report: Some(UpdateReport {
            old_revision: "abc123".to_string(),
            new_revision: "def456".to_string(),
            pull_log: "Fast-forward".to_string(),
            command_log: String::new(),
        }),
    };

    notifier
        .notify_outcome(&repo("acme/site", "/srv/site"), &outcome)
        .await
        .unwrap();

    let bodies = server.bodies();
    let fields = bodies[0]["embeds"][0]["fields"].as_array().unwrap();
    let value = |name: &str| {
        fields
            .iter()
            .find(|field| field["name"] == name)
            .map(|field| field["value"].clone())
    };
    assert_eq!(bodies[0]["embeds"][0]["title"], "Update failed at build");
    assert_eq!(value("Previous commit"), Some(serde_json::json!("`abc123`")));
    assert_eq!(value("New commit"), Some(serde_json::json!("`def456`")));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_an_error() {
    let notifier = Notifier::new(Some("http://127.0.0.1:1/hook")).unwrap();
    assert!(notifier.send_text("hello").await.is_err());
}

#[tokio::test]
async fn test_delivery_error_hides_webhook_url() {
    let notifier =
        Notifier::new(Some("http://127.0.0.1:1/api/webhooks/42/s3cr3t-webhook-token")).unwrap();

    let err = notifier.send_text("hello").await.unwrap_err();

    assert!(matches!(err, WatchError::HttpError(_)));
    assert!(!err.to_string().contains("s3cr3t-webhook-token"));
}
