//! Credentials from `AWS_ACCESS_KEY_ID` and friends.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, SessionError};
use async_trait::async_trait;
use std::env;

/// Access key ID variable.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Secret access key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Session token variable.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

/// Reads credentials from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialsProvider;

impl EnvCredentialsProvider {
    /// Create a new provider.
    pub fn new() -> Self {
        Self
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.is_empty())
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, SessionError> {
        match (non_empty(AWS_ACCESS_KEY_ID), non_empty(AWS_SECRET_ACCESS_KEY)) {
            (Some(access_key), Some(secret_key)) => Ok(AwsCredentials::new(
                access_key,
                secret_key,
                non_empty(AWS_SESSION_TOKEN),
            )),
            (None, None) => Err(CredentialsError::NotFound.into()),
            (Some(_), None) => Err(CredentialsError::Invalid {
                message: format!("{} is set but {} is not", AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY),
            }
            .into()),
            (None, Some(_)) => Err(CredentialsError::Invalid {
                message: format!("{} is set but {} is not", AWS_SECRET_ACCESS_KEY, AWS_ACCESS_KEY_ID),
            }
            .into()),
        }
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
