//! Credentials from the shared `~/.aws/credentials` file.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, SessionError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use tracing::trace;

/// Profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "default";

/// Profile selection variable.
pub const AWS_PROFILE: &str = "AWS_PROFILE";

/// Credentials file override variable.
pub const AWS_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// Profile name to key/value pairs.
pub(crate) type ProfileSections = HashMap<String, HashMap<String, String>>;

/// Parse an INI-style shared config or credentials file.
///
/// Section headers may carry the `profile ` prefix used by `~/.aws/config`;
/// it is stripped so both files share the same profile names.
pub(crate) fn parse_profile_file(content: &str) -> ProfileSections {
    let mut sections = ProfileSections::new();
    let mut current: Option<String> = None;

    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let header = header.trim();
            let name = header.strip_prefix("profile ").unwrap_or(header).trim();
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }

        if let (Some(section), Some((key, value))) = (&current, line.split_once('=')) {
            sections
                .entry(section.clone())
                .or_default()
                .insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    sections
}

/// Reads a named profile from the shared credentials file.
///
/// The profile is the one given at construction, else `AWS_PROFILE`, else
/// `default`.
#[derive(Debug, Clone)]
pub struct ProfileCredentialsProvider {
    profile: String,
    credentials_file: Option<PathBuf>,
}

impl ProfileCredentialsProvider {
    /// Provider for `AWS_PROFILE` or the default profile.
    pub fn new() -> Self {
        Self::with_profile(env::var(AWS_PROFILE).unwrap_or_else(|_| DEFAULT_PROFILE.to_string()))
    }

    /// Provider for a specific profile.
    pub fn with_profile(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            credentials_file: None,
        }
    }

    /// Read from a specific file instead of the standard location.
    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    /// Selected profile name.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    fn credentials_file_path(&self) -> Option<PathBuf> {
        self.credentials_file
            .clone()
            .or_else(|| env::var(AWS_SHARED_CREDENTIALS_FILE).ok().map(PathBuf::from))
            .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("credentials")))
    }

    fn profile_error(&self, message: String) -> SessionError {
        CredentialsError::Profile { message }.into()
    }
}

impl Default for ProfileCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ProfileCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, SessionError> {
        let path = self
            .credentials_file_path()
            .ok_or_else(|| self.profile_error("cannot locate home directory".to_string()))?;

        trace!(path = %path.display(), profile = %self.profile, "Reading shared credentials file");

        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            self.profile_error(format!("failed to read {}: {}", path.display(), e))
        })?;

        let sections = parse_profile_file(&content);
        let section = sections.get(&self.profile).ok_or_else(|| {
            self.profile_error(format!("profile '{}' not found in {}", self.profile, path.display()))
        })?;

        let access_key = section.get("aws_access_key_id").ok_or_else(|| {
            self.profile_error(format!("aws_access_key_id missing from profile '{}'", self.profile))
        })?;
        let secret_key = section.get("aws_secret_access_key").ok_or_else(|| {
            self.profile_error(format!(
                "aws_secret_access_key missing from profile '{}'",
                self.profile
            ))
        })?;

        Ok(AwsCredentials::new(
            access_key.clone(),
            secret_key.clone(),
            section.get("aws_session_token").cloned(),
        ))
    }

    fn name(&self) -> &'static str {
        "profile"
    }
}
