//! Per-connection session management and service client construction.
//!
//! [`ConnectionManager`] owns everything cached for one logical connection:
//! the session cache, the default-region resolver and the session factory.
//! Service constructors call [`ConnectionManager::client`] (or one of the
//! session helpers) and receive a ready [`ServiceClient`], an
//! [`SessionOutcome::Unsupported`] signal, or an error.

mod regions;
mod service;

pub use regions::{StaticSupportedRegions, SupportedRegions};
pub use service::{ServiceId, ServiceScope};

use crate::config::{ConnectionConfig, EnvOverrides};
use crate::credentials::CredentialsProvider;
use crate::error::{ConfigurationError, SessionError};
use crate::region::RegionResolver;
use crate::retry::execute;
use crate::session::{Session, SessionCache, SessionFactory, SESSION_TTL};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use url::Url;

/// Result of asking for a session in a region a service may not support.
#[derive(Debug, Clone)]
pub enum SessionOutcome<T = Arc<Session>> {
    /// The session or client is ready.
    Ready(T),
    /// The service is not offered in the requested region.
    Unsupported,
}

impl<T> SessionOutcome<T> {
    /// The ready value, if any.
    pub fn ready(self) -> Option<T> {
        match self {
            SessionOutcome::Ready(value) => Some(value),
            SessionOutcome::Unsupported => None,
        }
    }

    /// Whether the region was unsupported.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SessionOutcome::Unsupported)
    }

    /// Transform the ready value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SessionOutcome<U> {
        match self {
            SessionOutcome::Ready(value) => SessionOutcome::Ready(f(value)),
            SessionOutcome::Unsupported => SessionOutcome::Unsupported,
        }
    }
}

/// A session paired with the service it was built for.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    service: ServiceId,
    session: Arc<Session>,
}

impl ServiceClient {
    /// Service this client talks to.
    pub fn service(&self) -> ServiceId {
        self.service
    }

    /// Underlying session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Region of the underlying session.
    pub fn region(&self) -> &str {
        self.session.region()
    }

    /// Service endpoint.
    pub fn endpoint(&self) -> Result<Url, SessionError> {
        self.session.endpoint_for(self.service.endpoint_prefix())
    }

    /// Run an operation under the session's retry strategy.
    pub async fn send<F, Fut, T>(&self, cancel: &CancellationToken, operation: F) -> Result<T, SessionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SessionError>>,
    {
        execute(self.session.retry_strategy().as_ref(), cancel, operation).await
    }
}

/// Session state for one logical connection.
pub struct ConnectionManager {
    factory: SessionFactory,
    cache: SessionCache,
    resolver: RegionResolver,
    supported_regions: Arc<dyn SupportedRegions>,
}

impl ConnectionManager {
    /// Manager for `config` using the process environment.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::builder().config(config).from_env().build()
    }

    /// Create a new builder.
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::default()
    }

    /// The connection config.
    pub fn config(&self) -> &ConnectionConfig {
        self.factory.config()
    }

    /// The session cache.
    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// The region resolver.
    pub fn regions(&self) -> &RegionResolver {
        &self.resolver
    }

    /// The session factory.
    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    /// Cached session for `region`, building and caching one on a miss.
    ///
    /// Only successfully built sessions are cached.
    pub fn session(&self, region: &str) -> Result<Arc<Session>, SessionError> {
        if let Some(session) = self.cache.get(region) {
            return Ok(session);
        }

        let settings = self.factory.retry_settings()?;
        let session = Arc::new(self.factory.build_with_max_retries(
            region,
            settings.max_retries,
            settings.min_delay,
        )?);
        debug!(region = %region, max_retries = settings.max_retries, "Created session");
        self.cache.set(region, session.clone());
        Ok(session)
    }

    /// Session for an explicit, non-empty region.
    pub fn session_for_region(&self, region: &str) -> Result<Arc<Session>, SessionError> {
        if region.is_empty() {
            return Err(ConfigurationError::MissingRegion {
                operation: "session_for_region",
            }
            .into());
        }
        self.session(region)
    }

    /// Session for the region qualifier of the current query.
    pub fn session_for_query_region(&self, query_region: Option<&str>) -> Result<Arc<Session>, SessionError> {
        match query_region.filter(|r| !r.is_empty()) {
            Some(region) => self.session(region),
            None => Err(ConfigurationError::MissingRegion {
                operation: "session_for_query_region",
            }
            .into()),
        }
    }

    /// Session for the query region if `service` is offered there.
    pub async fn session_for_supported_region(
        &self,
        query_region: Option<&str>,
        service: &str,
    ) -> Result<SessionOutcome, SessionError> {
        let region = query_region
            .filter(|r| !r.is_empty())
            .ok_or(ConfigurationError::MissingRegion {
                operation: "session_for_supported_region",
            })?;

        let supported = self.supported_regions.supported_regions(service).await?;
        if !supported.iter().any(|r| r == region) {
            trace!(service = %service, region = %region, "Service not offered in region");
            return Ok(SessionOutcome::Unsupported);
        }

        self.session(region).map(SessionOutcome::Ready)
    }

    /// Session for the connection's default region.
    pub async fn default_region_session(&self) -> Result<Arc<Session>, SessionError> {
        let region = self.resolver.load_default_region().await?;
        self.session(&region)
    }

    /// Uncached session with a small retry budget, for listing regions.
    pub fn region_discovery_session(&self, region: &str) -> Result<Arc<Session>, SessionError> {
        Ok(Arc::new(self.factory.build_for_region_discovery(region)?))
    }

    /// Client for `service`, with its region chosen by the service scope.
    ///
    /// `region` is the query region, or the explicit region for services
    /// that take one. Region-restricted services answer
    /// [`SessionOutcome::Unsupported`] outside their regions.
    pub async fn client(
        &self,
        service: ServiceId,
        region: Option<&str>,
    ) -> Result<SessionOutcome<ServiceClient>, SessionError> {
        let outcome = match service.scope() {
            ServiceScope::QueryRegion => SessionOutcome::Ready(self.session_for_query_region(region)?),
            ServiceScope::ExplicitRegion => {
                SessionOutcome::Ready(self.session_for_region(region.unwrap_or_default())?)
            }
            ServiceScope::DefaultRegion => SessionOutcome::Ready(self.default_region_session().await?),
            ServiceScope::Pinned(pinned) => SessionOutcome::Ready(self.session(pinned)?),
            ServiceScope::Global => SessionOutcome::Ready(self.session("")?),
            ServiceScope::SupportedRegion => {
                self.session_for_supported_region(region, service.endpoint_prefix())
                    .await?
            }
        };

        Ok(outcome.map(|session| ServiceClient { service, session }))
    }

    /// EC2 client on an uncached region-discovery session.
    pub fn region_discovery_client(&self, region: &str) -> Result<ServiceClient, SessionError> {
        Ok(ServiceClient {
            service: ServiceId::Ec2,
            session: self.region_discovery_session(region)?,
        })
    }

    /// Drop cached sessions when the connection closes.
    pub fn close(&self) {
        let dropped = self.cache.len();
        self.cache.clear();
        debug!(sessions = dropped, "Connection closed");
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("factory", &self.factory)
            .field("cache", &self.cache)
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ConnectionManager`].
#[derive(Default)]
pub struct ConnectionManagerBuilder {
    config: Option<ConnectionConfig>,
    env: Option<EnvOverrides>,
    supported_regions: Option<Arc<dyn SupportedRegions>>,
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    session_ttl: Option<Duration>,
}

impl ConnectionManagerBuilder {
    /// Use the given connection config.
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use explicit environment overrides.
    pub fn env(mut self, env: EnvOverrides) -> Self {
        self.env = Some(env);
        self
    }

    /// Read environment overrides from the process environment.
    pub fn from_env(mut self) -> Self {
        self.env = Some(EnvOverrides::from_env());
        self
    }

    /// Use a custom supported-region lookup.
    pub fn supported_regions(mut self, lookup: Arc<dyn SupportedRegions>) -> Self {
        self.supported_regions = Some(lookup);
        self
    }

    /// Replace the ambient credentials chain.
    pub fn credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Override the session TTL.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Build the manager.
    pub fn build(self) -> ConnectionManager {
        let config = Arc::new(self.config.unwrap_or_default());
        let env = self.env.unwrap_or_default();

        let mut factory = SessionFactory::new(config.clone(), env.clone());
        if let Some(provider) = self.credentials_provider {
            factory = factory.with_credentials_provider(provider);
        }

        ConnectionManager {
            factory,
            cache: SessionCache::with_ttl(self.session_ttl.unwrap_or(SESSION_TTL)),
            resolver: RegionResolver::new(config, env),
            supported_regions: self
                .supported_regions
                .unwrap_or_else(|| Arc::new(StaticSupportedRegions::new())),
        }
    }
}
