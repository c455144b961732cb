//! Connection configuration and environment overrides.
//!
//! A [`ConnectionConfig`] is the immutable per-connection snapshot handed in
//! by the host. [`EnvOverrides`] captures the handful of process environment
//! variables that influence session construction; it is read once at the
//! edge with [`EnvOverrides::from_env`] and injected everywhere else.

use crate::credentials::AwsCredentials;
use crate::error::ConfigurationError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Endpoint override variable.
pub const AWS_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";
/// Retry budget override variable.
pub const AWS_MAX_ATTEMPTS: &str = "AWS_MAX_ATTEMPTS";
/// Region variable.
pub const AWS_REGION: &str = "AWS_REGION";
/// Fallback region variable.
pub const AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
/// Shared config file override variable.
pub const AWS_CONFIG_FILE: &str = "AWS_CONFIG_FILE";

/// Retries allowed when neither config nor environment sets a budget.
pub const DEFAULT_MAX_RETRIES: u32 = 9;
/// Minimum backoff when the config does not set one.
pub const DEFAULT_MIN_RETRY_DELAY: Duration = Duration::from_millis(25);
/// Retry budget for region-discovery sessions.
pub const REGION_DISCOVERY_MAX_RETRIES: u32 = 4;

/// Per-connection AWS settings.
///
/// All fields are optional. `access_key` and `secret_key` must be given
/// together.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Regions to query, in order. Entries may use `*` and `?` wildcards.
    pub regions: Vec<String>,
    /// Static access key ID.
    pub access_key: Option<String>,
    /// Static secret access key.
    pub secret_key: Option<SecretString>,
    /// Session token for temporary static keys.
    pub session_token: Option<SecretString>,
    /// Shared-config profile name.
    pub profile: Option<String>,
    /// Custom service endpoint.
    pub endpoint_url: Option<String>,
    /// Use path-style S3 addressing.
    pub s3_force_path_style: Option<bool>,
    /// Maximum retries for failed requests.
    pub max_error_retry_attempts: Option<i64>,
    /// Minimum retry backoff in milliseconds.
    pub min_error_retry_delay: Option<i64>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("regions", &self.regions)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("session_token", &self.session_token.as_ref().map(|_| "[REDACTED]"))
            .field("profile", &self.profile)
            .field("endpoint_url", &self.endpoint_url)
            .field("s3_force_path_style", &self.s3_force_path_style)
            .field("max_error_retry_attempts", &self.max_error_retry_attempts)
            .field("min_error_retry_delay", &self.min_error_retry_delay)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Parse a JSON connection config.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Static credentials from the config, if both keys are present.
    ///
    /// Exactly one key present is a [`ConfigurationError::PartialCredentials`]
    /// naming the missing one.
    pub fn static_credentials(&self) -> Result<Option<AwsCredentials>, ConfigurationError> {
        match (&self.access_key, &self.secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(Some(AwsCredentials::new(
                access_key.clone(),
                secret_key.expose_secret().clone(),
                self.session_token.as_ref().map(|t| t.expose_secret().clone()),
            ))),
            (Some(_), None) => Err(ConfigurationError::PartialCredentials {
                missing: "secret_key",
            }),
            (None, Some(_)) => Err(ConfigurationError::PartialCredentials {
                missing: "access_key",
            }),
            (None, None) => Ok(None),
        }
    }

    /// Endpoint to use: the config value, else `AWS_ENDPOINT_URL`, else none.
    pub fn effective_endpoint(&self, env: &EnvOverrides) -> Result<Option<Url>, ConfigurationError> {
        let raw = self
            .endpoint_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| env.endpoint_url.as_deref().filter(|u| !u.is_empty()));

        raw.map(parse_endpoint).transpose()
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigurationError> {
    Url::parse(raw).map_err(|e| ConfigurationError::InvalidEndpoint {
        url: raw.to_string(),
        details: e.to_string(),
    })
}

/// Builder for [`ConnectionConfig`].
#[derive(Default)]
pub struct ConnectionConfigBuilder {
    regions: Vec<String>,
    access_key: Option<String>,
    secret_key: Option<String>,
    session_token: Option<String>,
    profile: Option<String>,
    endpoint_url: Option<String>,
    s3_force_path_style: Option<bool>,
    max_error_retry_attempts: Option<i64>,
    min_error_retry_delay: Option<i64>,
}

impl ConnectionConfigBuilder {
    /// Append a region or region pattern.
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.regions.push(region.into());
        self
    }

    /// Replace the region list.
    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the static access key ID.
    pub fn access_key(mut self, access_key: impl Into<String>) -> Self {
        self.access_key = Some(access_key.into());
        self
    }

    /// Set the static secret access key.
    pub fn secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Set the session token.
    pub fn session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Set the shared-config profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set a custom endpoint. The URL is validated immediately.
    pub fn endpoint_url(mut self, endpoint: impl Into<String>) -> Result<Self, ConfigurationError> {
        let endpoint = endpoint.into();
        parse_endpoint(&endpoint)?;
        self.endpoint_url = Some(endpoint);
        Ok(self)
    }

    /// Force path-style S3 addressing.
    pub fn s3_force_path_style(mut self, enabled: bool) -> Self {
        self.s3_force_path_style = Some(enabled);
        self
    }

    /// Set the maximum retry count.
    pub fn max_error_retry_attempts(mut self, attempts: i64) -> Self {
        self.max_error_retry_attempts = Some(attempts);
        self
    }

    /// Set the minimum retry delay in milliseconds.
    pub fn min_error_retry_delay(mut self, millis: i64) -> Self {
        self.min_error_retry_delay = Some(millis);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ConnectionConfig, ConfigurationError> {
        let config = ConnectionConfig {
            regions: self.regions,
            access_key: self.access_key,
            secret_key: self.secret_key.map(SecretString::new),
            session_token: self.session_token.map(SecretString::new),
            profile: self.profile,
            endpoint_url: self.endpoint_url,
            s3_force_path_style: self.s3_force_path_style,
            max_error_retry_attempts: self.max_error_retry_attempts,
            min_error_retry_delay: self.min_error_retry_delay,
        };

        config.static_credentials()?;
        RetrySettings::resolve(&config, &EnvOverrides::default())?;
        Ok(config)
    }
}

/// Process environment values that affect session construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    /// `AWS_ENDPOINT_URL`.
    pub endpoint_url: Option<String>,
    /// `AWS_MAX_ATTEMPTS`, unparsed.
    pub max_attempts: Option<String>,
    /// `AWS_REGION`, else `AWS_DEFAULT_REGION`.
    pub region: Option<String>,
    /// `AWS_PROFILE`.
    pub profile: Option<String>,
    /// `AWS_CONFIG_FILE`.
    pub config_file: Option<String>,
}

impl EnvOverrides {
    /// Snapshot the current process environment.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            endpoint_url: var(AWS_ENDPOINT_URL),
            max_attempts: var(AWS_MAX_ATTEMPTS),
            region: var(AWS_REGION).or_else(|| var(AWS_DEFAULT_REGION)),
            profile: var(crate::credentials::AWS_PROFILE),
            config_file: var(AWS_CONFIG_FILE),
        }
    }
}

/// Effective retry budget and minimum backoff for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Base delay of the backoff curve.
    pub min_delay: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: DEFAULT_MIN_RETRY_DELAY,
        }
    }
}

impl RetrySettings {
    /// Validated explicit settings.
    pub fn new(max_retries: u32, min_delay: Duration) -> Result<Self, ConfigurationError> {
        if max_retries < 1 {
            return Err(ConfigurationError::InvalidRetrySetting {
                field: "max_error_retry_attempts",
            });
        }
        if min_delay.is_zero() {
            return Err(ConfigurationError::InvalidRetrySetting {
                field: "min_error_retry_delay",
            });
        }
        Ok(Self {
            max_retries,
            min_delay,
        })
    }

    /// Settings used by region-discovery sessions.
    pub fn region_discovery() -> Self {
        Self {
            max_retries: REGION_DISCOVERY_MAX_RETRIES,
            min_delay: DEFAULT_MIN_RETRY_DELAY,
        }
    }

    /// Resolve settings for a connection.
    ///
    /// Max retries come from the config, else `AWS_MAX_ATTEMPTS`, else
    /// [`DEFAULT_MAX_RETRIES`]. The minimum delay comes from the config in
    /// milliseconds, else [`DEFAULT_MIN_RETRY_DELAY`].
    pub fn resolve(config: &ConnectionConfig, env: &EnvOverrides) -> Result<Self, ConfigurationError> {
        let max_retries = match (config.max_error_retry_attempts, env.max_attempts.as_deref()) {
            (Some(attempts), _) => attempts,
            (None, Some(raw)) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| ConfigurationError::InvalidEnvironment {
                    variable: AWS_MAX_ATTEMPTS,
                    message: "it should be an integer value greater than or equal to 1".to_string(),
                })?,
            (None, None) => i64::from(DEFAULT_MAX_RETRIES),
        };

        let min_delay_ms = config
            .min_error_retry_delay
            .unwrap_or(DEFAULT_MIN_RETRY_DELAY.as_millis() as i64);

        if max_retries < 1 {
            return Err(ConfigurationError::InvalidRetrySetting {
                field: "max_error_retry_attempts",
            });
        }
        if min_delay_ms < 1 {
            return Err(ConfigurationError::InvalidRetrySetting {
                field: "min_error_retry_delay",
            });
        }

        Self::new(
            u32::try_from(max_retries).unwrap_or(u32::MAX),
            Duration::from_millis(min_delay_ms as u64),
        )
    }
}
