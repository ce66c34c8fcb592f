//! Notification credential handling across the coordinator and notifier crates

use anyhow::Result;
use backup::BackupCoordinator;
use std::collections::HashMap;
use sync_core::{
    BackupConfig, ErrorKind, NotificationConfig, NotificationKind, NotificationService,
    NotifyConfig,
};
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn coordinator(dir: &TempDir, endpoint: &str) -> BackupCoordinator {
    let config = BackupConfig {
        backup_root: dir.path().join("drive"),
        staging_dir: dir.path().join("staging"),
        ..BackupConfig::default()
    };
    let settings = NotifyConfig {
        endpoint: endpoint.to_string(),
        ..NotifyConfig::default()
    };
    BackupCoordinator::new(config, settings)
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_notify_before_configuration_never_hits_network() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let coordinator = coordinator(&dir, &server.uri());

    for kind in [
        NotificationKind::Done,
        NotificationKind::Error,
        NotificationKind::Custom("EPOCH 1".to_string()),
    ] {
        let err = coordinator.notify(&kind, "hello").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }
    Ok(())
}

#[tokio::test]
async fn test_incomplete_credentials_always_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let mut coordinator = coordinator(&dir, "http://127.0.0.1:9/unused");

    let cases = [
        params(&[]),
        params(&[("app_token", "a")]),
        params(&[("user_token", "u")]),
        params(&[("app_token", ""), ("user_token", "u")]),
        params(&[("app_token", "a"), ("user_token", "   ")]),
        params(&[("api_token", "a"), ("user_key", "u")]),
    ];

    for case in cases {
        let err = NotificationConfig::new(NotificationService::Pushover, case.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication, "{case:?}");

        let unchecked = NotificationConfig {
            service: NotificationService::Pushover,
            params: case,
        };
        let err = coordinator.set_notification(unchecked).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    assert!(!coordinator.has_notifier());
    Ok(())
}

#[tokio::test]
async fn test_failed_reconfiguration_keeps_working_channel() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let mut coordinator = coordinator(&dir, &server.uri());
    coordinator.set_notification(NotificationConfig::pushover("a", "u")?)?;

    let broken = NotificationConfig {
        service: NotificationService::Pushover,
        params: params(&[("app_token", "a")]),
    };
    assert!(coordinator.set_notification(broken).is_err());

    coordinator.notify(&NotificationKind::Info, "still configured").await?;
    Ok(())
}

#[tokio::test]
async fn test_delivery_failure_is_operational() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new()?;
    let mut coordinator = coordinator(&dir, &server.uri());
    coordinator.set_notification(NotificationConfig::pushover("a", "u")?)?;

    let err = coordinator
        .notify(&NotificationKind::Done, "")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Operational);
    Ok(())
}
