//! Role credentials from the EC2 instance metadata service.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, SessionError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

/// Base URL of the instance metadata service.
pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
const TOKEN_TTL_SECONDS: u32 = 21600;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: Option<String>,
    expiration: Option<String>,
}

/// Fetches instance-role credentials, preferring IMDSv2 tokens.
///
/// Every failure is reported as [`CredentialsError::Metadata`] carrying the
/// URL that was requested, so retry policies can recognise an unreachable
/// metadata endpoint.
pub struct MetadataCredentialsProvider {
    endpoint: String,
    http: reqwest::Client,
    cached: RwLock<Option<AwsCredentials>>,
}

impl MetadataCredentialsProvider {
    /// Provider for the standard metadata endpoint.
    pub fn new() -> Result<Self, SessionError> {
        Self::with_endpoint(DEFAULT_METADATA_ENDPOINT, Duration::from_secs(1))
    }

    /// Provider for a custom endpoint and per-request timeout.
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CredentialsError::Metadata {
                url: endpoint.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            endpoint,
            http,
            cached: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/latest/{}", self.endpoint, path)
    }

    fn error(url: &str, message: impl std::fmt::Display) -> SessionError {
        CredentialsError::Metadata {
            url: url.to_string(),
            message: message.to_string(),
        }
        .into()
    }

    /// Request an IMDSv2 session token. `Ok(None)` means the service only
    /// speaks IMDSv1.
    async fn session_token(&self) -> Result<Option<String>, SessionError> {
        let url = self.url("api/token");
        let response = self
            .http
            .put(&url)
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS.to_string())
            .send()
            .await
            .map_err(|e| Self::error(&url, e))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "IMDSv2 token unavailable, using IMDSv1");
            return Ok(None);
        }

        let token = response.text().await.map_err(|e| Self::error(&url, e))?;
        Ok(Some(token))
    }

    async fn get_text(&self, url: &str, token: Option<&str>) -> Result<String, SessionError> {
        let mut request = self.http.get(url);
        if let Some(token) = token {
            request = request.header(TOKEN_HEADER, token);
        }

        let response = request.send().await.map_err(|e| Self::error(url, e))?;
        if !response.status().is_success() {
            return Err(Self::error(url, format!("status {}", response.status())));
        }
        response.text().await.map_err(|e| Self::error(url, e))
    }

    async fn fetch(&self) -> Result<AwsCredentials, SessionError> {
        let token = self.session_token().await?;

        let roles_url = self.url("meta-data/iam/security-credentials/");
        let roles = self.get_text(&roles_url, token.as_deref()).await?;
        let role = roles
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .ok_or_else(|| Self::error(&roles_url, "no IAM role attached to instance"))?
            .to_string();
        trace!(role = %role, "Found instance role");

        let creds_url = format!("{}{}", roles_url, role);
        let body = self.get_text(&creds_url, token.as_deref()).await?;
        let parsed: RoleCredentials =
            serde_json::from_str(&body).map_err(|e| Self::error(&creds_url, e))?;

        let mut credentials =
            AwsCredentials::new(parsed.access_key_id, parsed.secret_access_key, parsed.token);
        if let Some(expiration) = parsed
            .expiration
            .as_deref()
            .and_then(|exp| DateTime::parse_from_rfc3339(exp).ok())
        {
            credentials = credentials.with_expiration(expiration.with_timezone(&Utc));
        }
        Ok(credentials)
    }
}

#[async_trait]
impl CredentialsProvider for MetadataCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, SessionError> {
        {
            let cache = self.cached.read();
            if let Some(creds) = cache.as_ref() {
                if !creds.expires_within(chrono::Duration::minutes(5)) {
                    return Ok(creds.clone());
                }
            }
        }

        let creds = self.fetch().await?;
        *self.cached.write() = Some(creds.clone());
        Ok(creds)
    }

    async fn refresh_credentials(&self) -> Result<AwsCredentials, SessionError> {
        *self.cached.write() = None;
        self.get_credentials().await
    }

    fn name(&self) -> &'static str {
        "instance-metadata"
    }
}

impl std::fmt::Debug for MetadataCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataCredentialsProvider")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}
