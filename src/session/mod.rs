//! Authenticated, region-bound sessions.
//!
//! A [`Session`] carries everything a service client needs to talk to AWS
//! in one region: a credentials provider, an optional endpoint override and
//! the retry strategy. Sessions are built by [`SessionFactory`] and shared
//! through [`SessionCache`].

mod cache;
mod factory;

pub use cache::{session_cache_key, SessionCache, SESSION_TTL};
pub use factory::SessionFactory;

use crate::credentials::{AwsCredentials, CredentialsProvider};
use crate::error::{ConfigurationError, SessionError};
use crate::region::partition_of;
use crate::retry::{self, RetryStrategy};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Handle bound to one region and one retry strategy.
pub struct Session {
    region: String,
    credentials: Arc<dyn CredentialsProvider>,
    endpoint: Option<Url>,
    force_path_style: bool,
    retry: Arc<dyn RetryStrategy>,
    created_at: Instant,
}

impl Session {
    pub(crate) fn new(
        region: impl Into<String>,
        credentials: Arc<dyn CredentialsProvider>,
        endpoint: Option<Url>,
        force_path_style: bool,
        retry: Arc<dyn RetryStrategy>,
    ) -> Self {
        Self {
            region: region.into(),
            credentials,
            endpoint,
            force_path_style,
            retry,
            created_at: Instant::now(),
        }
    }

    /// Region this session targets; empty for region-agnostic sessions.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Credentials provider backing the session.
    pub fn credentials_provider(&self) -> &Arc<dyn CredentialsProvider> {
        &self.credentials
    }

    /// Load credentials through the session's provider.
    pub async fn credentials(&self) -> Result<AwsCredentials, SessionError> {
        self.credentials.get_credentials().await
    }

    /// Endpoint override, if one was configured.
    pub fn endpoint_override(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    /// Whether S3 requests use path-style addressing.
    pub fn force_path_style(&self) -> bool {
        self.force_path_style
    }

    /// Retry strategy attached to the session.
    pub fn retry_strategy(&self) -> &Arc<dyn RetryStrategy> {
        &self.retry
    }

    /// Retry budget of the attached strategy.
    pub fn max_retries(&self) -> u32 {
        self.retry.max_retries()
    }

    /// When the session was built.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Endpoint for a service: the override if set, else the standard
    /// regional endpoint in the region's partition.
    pub fn endpoint_for(&self, endpoint_prefix: &str) -> Result<Url, SessionError> {
        if let Some(endpoint) = &self.endpoint {
            return Ok(endpoint.clone());
        }

        let suffix = partition_of(&self.region).dns_suffix();
        let raw = if self.region.is_empty() {
            format!("https://{}.{}", endpoint_prefix, suffix)
        } else {
            format!("https://{}.{}.{}", endpoint_prefix, self.region, suffix)
        };

        Url::parse(&raw).map_err(|e| {
            ConfigurationError::InvalidEndpoint {
                url: raw.clone(),
                details: e.to_string(),
            }
            .into()
        })
    }

    /// Run an operation under this session's retry strategy.
    pub async fn send<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        operation: F,
    ) -> Result<T, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        retry::execute(self.retry.as_ref(), cancel, operation).await
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("region", &self.region)
            .field("credentials", &self.credentials.name())
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn test_session(region: &str) -> Session {
    use crate::config::RetrySettings;
    use crate::mocks::MockCredentialsProvider;
    use crate::retry::ConnectionRetryPolicy;

    Session::new(
        region,
        Arc::new(MockCredentialsProvider::default()),
        None,
        false,
        Arc::new(ConnectionRetryPolicy::with_seed(RetrySettings::default(), 0)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_standard_endpoints() {
        let endpoint = test_session("eu-west-1").endpoint_for("dynamodb").unwrap();
        assert_eq!(endpoint.as_str(), "https://dynamodb.eu-west-1.amazonaws.com/");

        let endpoint = test_session("cn-north-1").endpoint_for("ec2").unwrap();
        assert_eq!(endpoint.host_str(), Some("ec2.cn-north-1.amazonaws.com.cn"));

        let endpoint = test_session("").endpoint_for("servicequotas").unwrap();
        assert_eq!(endpoint.host_str(), Some("servicequotas.amazonaws.com"));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let debug = format!("{:?}", test_session("us-east-1"));
        assert!(debug.contains("us-east-1"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_retries_connection_reset() {
        let session = test_session("us-east-1");
        let calls = AtomicU32::new(0);
        let result = session
            .send(&CancellationToken::new(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(NetworkError::ConnectionReset.into())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
