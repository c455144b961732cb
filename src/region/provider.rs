//! Region discovery from the ambient environment and shared config file.

use crate::config::EnvOverrides;
use crate::credentials::{parse_profile_file, DEFAULT_PROFILE};
use std::path::PathBuf;
use tracing::{debug, trace};

/// Region from the environment, else from the shared config profile.
///
/// `profile` is the connection's configured profile; when absent
/// `AWS_PROFILE` and then `default` are used. Returns `None` when nothing
/// names a region.
pub fn ambient_region(env: &EnvOverrides, profile: Option<&str>) -> Option<String> {
    if let Some(region) = env_region(env) {
        return Some(region);
    }

    let path = config_file_path(env)?;
    match std::fs::read_to_string(&path) {
        Ok(content) => region_from_config(&content, env, profile),
        Err(e) => {
            trace!(path = %path.display(), error = %e, "Shared config file not readable");
            None
        }
    }
}

/// Async variant of [`ambient_region`] that reads the config file with
/// `tokio::fs`.
pub async fn load_ambient_region(env: &EnvOverrides, profile: Option<&str>) -> Option<String> {
    if let Some(region) = env_region(env) {
        return Some(region);
    }

    let path = config_file_path(env)?;
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => region_from_config(&content, env, profile),
        Err(e) => {
            trace!(path = %path.display(), error = %e, "Shared config file not readable");
            None
        }
    }
}

fn env_region(env: &EnvOverrides) -> Option<String> {
    let region = env.region.as_deref().filter(|r| !r.is_empty())?;
    trace!(region = %region, "Region taken from environment");
    Some(region.to_string())
}

fn region_from_config(content: &str, env: &EnvOverrides, profile: Option<&str>) -> Option<String> {
    let profile = profile
        .or(env.profile.as_deref())
        .unwrap_or(DEFAULT_PROFILE);
    let region = parse_profile_file(content)
        .get(profile)
        .and_then(|section| section.get("region"))
        .filter(|r| !r.is_empty())
        .cloned();

    if let Some(region) = &region {
        debug!(profile = %profile, region = %region, "Region taken from shared config");
    }
    region
}

fn config_file_path(env: &EnvOverrides) -> Option<PathBuf> {
    env.config_file
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".aws").join("config")))
}
