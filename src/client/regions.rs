//! Lookup of the regions a service is offered in.

use crate::error::SessionError;
use crate::region::KNOWN_REGIONS;
use async_trait::async_trait;
use std::collections::HashMap;

/// Source of per-service region availability.
#[async_trait]
pub trait SupportedRegions: Send + Sync {
    /// Regions where the service with this endpoint prefix is available.
    async fn supported_regions(&self, service: &str) -> Result<Vec<String>, SessionError>;
}

/// Fixed availability table.
///
/// Services without an entry are treated as available in every known
/// region.
#[derive(Debug, Clone, Default)]
pub struct StaticSupportedRegions {
    services: HashMap<String, Vec<String>>,
}

impl StaticSupportedRegions {
    /// Empty table: every service is available everywhere.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict a service to the given regions.
    pub fn with_service<I, S>(mut self, service: impl Into<String>, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services
            .insert(service.into(), regions.into_iter().map(Into::into).collect());
        self
    }
}

#[async_trait]
impl SupportedRegions for StaticSupportedRegions {
    async fn supported_regions(&self, service: &str) -> Result<Vec<String>, SessionError> {
        Ok(self.services.get(service).cloned().unwrap_or_else(|| {
            KNOWN_REGIONS.iter().map(|r| r.to_string()).collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_listed_service_is_restricted() {
        let table = StaticSupportedRegions::new().with_service("pinpoint", ["us-east-1", "eu-west-1"]);
        assert_eq!(
            table.supported_regions("pinpoint").await.unwrap(),
            vec!["us-east-1", "eu-west-1"]
        );
    }

    #[tokio::test]
    async fn test_unlisted_service_is_everywhere() {
        let regions = StaticSupportedRegions::new()
            .supported_regions("securityhub")
            .await
            .unwrap();
        assert_eq!(regions.len(), KNOWN_REGIONS.len());
    }
}
