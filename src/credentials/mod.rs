//! AWS credentials and the ambient discovery chain.
//!
//! Static keys from a connection config win; otherwise sessions use
//! [`ChainCredentialsProvider`], which tries the environment, the shared
//! profile file and the instance metadata service in that order.

mod chain;
mod env;
mod metadata;
mod profile;

pub use chain::ChainCredentialsProvider;
pub use env::{EnvCredentialsProvider, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN};
pub use metadata::{MetadataCredentialsProvider, DEFAULT_METADATA_ENDPOINT};
pub use profile::{ProfileCredentialsProvider, AWS_PROFILE, AWS_SHARED_CREDENTIALS_FILE, DEFAULT_PROFILE};

pub(crate) use profile::parse_profile_file;

use crate::error::{CredentialsError, SessionError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// An AWS access key pair with an optional session token.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    /// Create credentials from a key pair and optional session token.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: session_token.map(SecretString::new),
            expiration: None,
        }
    }

    /// Attach an expiration time.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key. Avoid logging the returned value.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Expiration time, if any.
    pub fn expiration(&self) -> Option<&DateTime<Utc>> {
        self.expiration.as_ref()
    }

    /// Whether the credentials are past their expiration.
    pub fn is_expired(&self) -> bool {
        self.expiration.map_or(false, |exp| Utc::now() >= exp)
    }

    /// Whether the credentials expire within `window`.
    pub fn expires_within(&self, window: chrono::Duration) -> bool {
        self.expiration.map_or(false, |exp| Utc::now() + window >= exp)
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Source of AWS credentials.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Load credentials.
    async fn get_credentials(&self) -> Result<AwsCredentials, SessionError>;

    /// Drop any cached value and load again.
    async fn refresh_credentials(&self) -> Result<AwsCredentials, SessionError> {
        self.get_credentials().await
    }

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}

/// Provider for keys taken verbatim from a connection config.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Wrap fixed credentials.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, SessionError> {
        if let Some(expiration) = self.credentials.expiration().filter(|_| self.credentials.is_expired()) {
            return Err(CredentialsError::Expired {
                expiration: expiration.to_rfc3339(),
            }
            .into());
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}
