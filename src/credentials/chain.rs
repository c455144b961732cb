//! Ordered chain of credential sources with a shared cache.

use super::{
    AwsCredentials, CredentialsProvider, EnvCredentialsProvider, MetadataCredentialsProvider,
    ProfileCredentialsProvider,
};
use crate::error::{CredentialsError, SessionError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Tries each provider in order and caches the first success.
///
/// Cached credentials are reused until they come within the refresh buffer
/// of their expiration.
pub struct ChainCredentialsProvider {
    providers: Vec<Arc<dyn CredentialsProvider>>,
    cached: RwLock<Option<(AwsCredentials, &'static str)>>,
    refresh_buffer: chrono::Duration,
}

impl ChainCredentialsProvider {
    /// Environment, then the shared profile, then instance metadata.
    ///
    /// `profile` selects the shared-file profile; `None` defers to
    /// `AWS_PROFILE`.
    pub fn ambient(profile: Option<&str>) -> Result<Self, SessionError> {
        let profile = match profile {
            Some(name) => ProfileCredentialsProvider::with_profile(name),
            None => ProfileCredentialsProvider::new(),
        };
        Ok(Self::with_providers(vec![
            Arc::new(EnvCredentialsProvider::new()),
            Arc::new(profile),
            Arc::new(MetadataCredentialsProvider::new()?),
        ]))
    }

    /// Chain over the given providers.
    pub fn with_providers(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self {
            providers,
            cached: RwLock::new(None),
            refresh_buffer: chrono::Duration::minutes(5),
        }
    }

    /// Refresh this long before expiration.
    pub fn with_refresh_buffer(mut self, buffer: chrono::Duration) -> Self {
        self.refresh_buffer = buffer;
        self
    }

    /// Names of the chained providers, in order.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    async fn try_providers(&self) -> Result<(AwsCredentials, &'static str), SessionError> {
        let mut last_error = None;

        for provider in &self.providers {
            let name = provider.name();
            trace!(provider = name, "Trying credentials provider");

            match provider.get_credentials().await {
                Ok(creds) => {
                    debug!(provider = name, "Credentials loaded");
                    return Ok((creds, name));
                }
                Err(e) => {
                    trace!(provider = name, error = %e, "Credentials provider failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CredentialsError::NotFound.into()))
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, SessionError> {
        {
            let cache = self.cached.read();
            if let Some((creds, source)) = cache.as_ref() {
                if !creds.expires_within(self.refresh_buffer) {
                    trace!(provider = *source, "Using cached credentials");
                    return Ok(creds.clone());
                }
            }
        }

        let (creds, source) = self.try_providers().await?;
        *self.cached.write() = Some((creds.clone(), source));
        Ok(creds)
    }

    async fn refresh_credentials(&self) -> Result<AwsCredentials, SessionError> {
        *self.cached.write() = None;
        self.get_credentials().await
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainCredentialsProvider")
            .field("providers", &self.provider_names())
            .field("refresh_buffer", &self.refresh_buffer)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockCredentialsProvider;
    use chrono::Utc;

    #[tokio::test]
    async fn test_first_success_wins() {
        let failing = Arc::new(MockCredentialsProvider::failing());
        let working = Arc::new(MockCredentialsProvider::new(AwsCredentials::new("AKID", "SECRET", None)));
        let chain = ChainCredentialsProvider::with_providers(vec![failing.clone(), working.clone()]);

        assert_eq!(chain.get_credentials().await.unwrap().access_key_id(), "AKID");
        assert_eq!(failing.call_count(), 1);
        assert_eq!(working.call_count(), 1);
    }

    #[tokio::test]
    async fn test_caches_until_refresh() {
        let working = Arc::new(MockCredentialsProvider::new(AwsCredentials::new("AKID", "SECRET", None)));
        let chain = ChainCredentialsProvider::with_providers(vec![working.clone()]);

        chain.get_credentials().await.unwrap();
        chain.get_credentials().await.unwrap();
        assert_eq!(working.call_count(), 1);

        chain.refresh_credentials().await.unwrap();
        assert_eq!(working.call_count(), 2);
    }

    #[tokio::test]
    async fn test_expiring_credentials_are_reloaded() {
        let expiring = AwsCredentials::new("AKID", "SECRET", Some("TOKEN".to_string()))
            .with_expiration(Utc::now() + chrono::Duration::seconds(60));
        let working = Arc::new(MockCredentialsProvider::new(expiring));
        let chain = ChainCredentialsProvider::with_providers(vec![working.clone()])
            .with_refresh_buffer(chrono::Duration::minutes(2));

        chain.get_credentials().await.unwrap();
        chain.get_credentials().await.unwrap();
        assert_eq!(working.call_count(), 2);
    }

    #[tokio::test]
    async fn test_all_failing_returns_last_error() {
        let chain = ChainCredentialsProvider::with_providers(vec![
            Arc::new(MockCredentialsProvider::failing()),
            Arc::new(MockCredentialsProvider::failing()),
        ]);
        assert!(chain.get_credentials().await.is_err());
    }

    #[tokio::test]
    async fn test_empty_chain_is_not_found() {
        let chain = ChainCredentialsProvider::with_providers(Vec::new());
        let err = chain.get_credentials().await.unwrap_err();
        assert!(matches!(err, SessionError::Credentials(CredentialsError::NotFound)));
    }

    #[test]
    fn test_ambient_chain_order() {
        let chain = ChainCredentialsProvider::ambient(Some("prod")).unwrap();
        assert_eq!(
            chain.provider_names(),
            vec!["environment", "profile", "instance-metadata"]
        );
    }
}
