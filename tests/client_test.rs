//! Integration tests for ConnectionManager.

use aws_session::client::{ConnectionManager, ServiceId, SessionOutcome};
use aws_session::config::{ConnectionConfig, EnvOverrides};
use aws_session::credentials::AwsCredentials;
use aws_session::error::{ConfigurationError, NetworkError, SessionError};
use aws_session::mocks::{MockCredentialsProvider, MockSupportedRegions};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn env() -> EnvOverrides {
    EnvOverrides {
        config_file: Some("/nonexistent/aws/config".to_string()),
        ..Default::default()
    }
}

fn manager_with(config: ConnectionConfig, lookup: Arc<MockSupportedRegions>) -> ConnectionManager {
    ConnectionManager::builder()
        .config(config)
        .env(env())
        .credentials_provider(Arc::new(MockCredentialsProvider::default()))
        .supported_regions(lookup)
        .build()
}

fn manager() -> ConnectionManager {
    manager_with(
        ConnectionConfig::default(),
        Arc::new(MockSupportedRegions::new().with_service("pinpoint", ["us-east-1", "eu-central-1"])),
    )
}

#[tokio::test]
async fn test_query_region_client_uses_cached_session() {
    let manager = manager();
    let first = manager
        .client(ServiceId::DynamoDb, Some("eu-west-1"))
        .await
        .unwrap()
        .ready()
        .unwrap();
    let second = manager
        .client(ServiceId::Ecs, Some("eu-west-1"))
        .await
        .unwrap()
        .ready()
        .unwrap();

    assert!(Arc::ptr_eq(first.session(), second.session()));
    assert_eq!(manager.cache().len(), 1);
}

#[tokio::test]
async fn test_query_region_required() {
    let err = manager().client(ServiceId::DynamoDb, None).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Configuration(ConfigurationError::MissingRegion { .. })
    ));
}

#[tokio::test]
async fn test_supported_region_lookup() {
    let lookup = Arc::new(MockSupportedRegions::new().with_service("pinpoint", ["us-east-1"]));
    let manager = manager_with(ConnectionConfig::default(), lookup.clone());

    let outcome = manager.client(ServiceId::Pinpoint, Some("ap-south-1")).await.unwrap();
    assert!(matches!(outcome, SessionOutcome::Unsupported));

    let client = manager
        .client(ServiceId::Pinpoint, Some("us-east-1"))
        .await
        .unwrap()
        .ready()
        .unwrap();
    assert_eq!(client.region(), "us-east-1");
    assert_eq!(lookup.call_count(), 2);
}

#[tokio::test]
async fn test_supported_region_lookup_failure_propagates() {
    let lookup = Arc::new(MockSupportedRegions::new().failing());
    let manager = manager_with(ConnectionConfig::default(), lookup);

    let err = manager
        .session_for_supported_region(Some("us-east-1"), "securityhub")
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Network(NetworkError::ConnectionFailed { .. })));
    assert!(manager.cache().is_empty());
}

#[tokio::test]
async fn test_default_region_services() {
    let config = ConnectionConfig::builder()
        .regions(["ap-northeast-1", "us-*"])
        .build()
        .unwrap();
    let manager = manager_with(config, Arc::new(MockSupportedRegions::new()));

    for service in [ServiceId::CloudFront, ServiceId::Route53, ServiceId::Sts] {
        let client = manager.client(service, None).await.unwrap().ready().unwrap();
        assert_eq!(client.region(), "ap-northeast-1");
    }
}

#[tokio::test]
async fn test_invalid_regions_fail_default_session() {
    let config = ConnectionConfig::builder().region("atlantis-1").build().unwrap();
    let manager = manager_with(config, Arc::new(MockSupportedRegions::new()));

    assert!(manager.default_region_session().await.is_err());
    assert!(manager.default_region_session().await.is_err());
    assert!(manager.cache().is_empty());
}

#[tokio::test]
async fn test_retry_settings_from_config() {
    let config = ConnectionConfig::builder()
        .max_error_retry_attempts(3)
        .min_error_retry_delay(100)
        .build()
        .unwrap();
    let manager = manager_with(config, Arc::new(MockSupportedRegions::new()));

    let session = manager.session_for_region("us-east-1").unwrap();
    assert_eq!(session.max_retries(), 3);
}

#[tokio::test]
async fn test_env_retry_settings_invalid() {
    let manager = ConnectionManager::builder()
        .env(EnvOverrides {
            max_attempts: Some("lots".to_string()),
            ..env()
        })
        .credentials_provider(Arc::new(MockCredentialsProvider::default()))
        .build();

    let err = manager.session("us-east-1").unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("AWS_MAX_ATTEMPTS"));
}

#[tokio::test]
async fn test_static_credentials_reach_client() {
    let config = ConnectionConfig::builder()
        .access_key("AKIASTATICKEY")
        .secret_key("static-secret")
        .build()
        .unwrap();
    let manager = manager_with(config, Arc::new(MockSupportedRegions::new()));

    let session = manager.session("us-west-2").unwrap();
    let creds: AwsCredentials = session.credentials().await.unwrap();
    assert_eq!(creds.access_key_id(), "AKIASTATICKEY");
}

#[tokio::test]
async fn test_session_ttl_expiry_rebuilds() {
    let manager = ConnectionManager::builder()
        .env(env())
        .credentials_provider(Arc::new(MockCredentialsProvider::default()))
        .session_ttl(Duration::from_millis(50))
        .build();

    let first = manager.session("eu-west-1").unwrap();
    std::thread::sleep(Duration::from_millis(250));
    let second = manager.session("eu-west-1").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test(start_paused = true)]
async fn test_client_send_retries_reset() {
    let client = manager()
        .client(ServiceId::Ec2, Some("us-east-1"))
        .await
        .unwrap()
        .ready()
        .unwrap();

    let calls = AtomicU32::new(0);
    let result = client
        .send(&CancellationToken::new(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(NetworkError::ConnectionReset.into())
                } else {
                    Ok(vec!["i-0123456789abcdef0"])
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), vec!["i-0123456789abcdef0"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_concurrent_sessions_share_one_region_entry() {
    let manager = Arc::new(manager());
    let tasks = (0..16).map(|i| {
        let manager = manager.clone();
        tokio::spawn(async move {
            let region = if i % 2 == 0 { "us-east-1" } else { "eu-central-1" };
            manager.session_for_region(region).map(|s| s.region().to_string())
        })
    });

    let results = futures::future::join_all(tasks).await;
    for result in results {
        let region = result.unwrap().unwrap();
        assert!(region == "us-east-1" || region == "eu-central-1");
    }
    assert_eq!(manager.cache().len(), 2);
}
