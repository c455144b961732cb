//! Builds sessions from a connection config.

use super::Session;
use crate::config::{ConnectionConfig, EnvOverrides, RetrySettings};
use crate::credentials::{ChainCredentialsProvider, CredentialsProvider, StaticCredentialsProvider};
use crate::error::SessionError;
use crate::retry::{ConnectionRetryPolicy, RetryStrategy};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Turns a [`ConnectionConfig`] plus environment overrides into sessions.
///
/// Static keys in the config take priority. Without them every session
/// shares one ambient credentials chain, created on first use, so cached
/// role credentials survive across sessions.
pub struct SessionFactory {
    config: Arc<ConnectionConfig>,
    env: EnvOverrides,
    ambient: OnceCell<Arc<dyn CredentialsProvider>>,
}

impl SessionFactory {
    /// Factory for one connection.
    pub fn new(config: Arc<ConnectionConfig>, env: EnvOverrides) -> Self {
        Self {
            config,
            env,
            ambient: OnceCell::new(),
        }
    }

    /// Use `provider` instead of the ambient chain when the config carries
    /// no static keys.
    pub fn with_credentials_provider(self, provider: Arc<dyn CredentialsProvider>) -> Self {
        let ambient = OnceCell::new();
        let _ = ambient.set(provider);
        Self { ambient, ..self }
    }

    /// The connection config.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Retry settings for this connection.
    pub fn retry_settings(&self) -> Result<RetrySettings, SessionError> {
        RetrySettings::resolve(&self.config, &self.env).map_err(|e| {
            error!(error = %e, "Invalid retry settings");
            e.into()
        })
    }

    /// Build a session for `region` with the given retry strategy.
    pub fn build(
        &self,
        region: &str,
        retry: Arc<dyn RetryStrategy>,
    ) -> Result<Session, SessionError> {
        self.try_build(region, retry).map_err(|e| {
            error!(region = %region, error = %e, "Failed to build session");
            e
        })
    }

    /// Build a session with a [`ConnectionRetryPolicy`] of the given size.
    pub fn build_with_max_retries(
        &self,
        region: &str,
        max_retries: u32,
        min_delay: Duration,
    ) -> Result<Session, SessionError> {
        let settings = RetrySettings::new(max_retries, min_delay).map_err(|e| {
            error!(region = %region, error = %e, "Invalid retry settings");
            SessionError::from(e)
        })?;
        self.build(region, Arc::new(ConnectionRetryPolicy::new(settings)))
    }

    /// Build a small-budget session for listing regions.
    ///
    /// Region listing fails slowly when credentials are missing, so these
    /// sessions retry at most four times. They are never cached.
    pub fn build_for_region_discovery(&self, region: &str) -> Result<Session, SessionError> {
        let settings = RetrySettings::region_discovery();
        self.build_with_max_retries(region, settings.max_retries, settings.min_delay)
    }

    fn credentials_provider(&self) -> Result<Arc<dyn CredentialsProvider>, SessionError> {
        if let Some(credentials) = self.config.static_credentials()? {
            return Ok(Arc::new(StaticCredentialsProvider::new(credentials)));
        }

        self.ambient
            .get_or_try_init(|| {
                let chain = ChainCredentialsProvider::ambient(self.ambient_profile())?;
                Ok::<_, SessionError>(Arc::new(chain) as Arc<dyn CredentialsProvider>)
            })
            .cloned()
    }

    /// Profile for the ambient chain: the configured profile, else the
    /// injected `AWS_PROFILE`. Region lookup picks profiles the same way.
    pub(crate) fn ambient_profile(&self) -> Option<&str> {
        self.config.profile.as_deref().or(self.env.profile.as_deref())
    }

    fn try_build(
        &self,
        region: &str,
        retry: Arc<dyn RetryStrategy>,
    ) -> Result<Session, SessionError> {
        let credentials = self.credentials_provider()?;
        let endpoint = self.config.effective_endpoint(&self.env)?;
        let force_path_style = self.config.s3_force_path_style.unwrap_or(false);

        debug!(
            region = %region,
            credentials = credentials.name(),
            endpoint = ?endpoint.as_ref().map(|u| u.as_str()),
            max_retries = retry.max_retries(),
            "Building session"
        );

        Ok(Session::new(region, credentials, endpoint, force_path_style, retry))
    }
}

impl std::fmt::Debug for SessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("config", &self.config)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}
