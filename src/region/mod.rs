//! Region table, partitions and default-region resolution.
//!
//! A connection lists the regions it queries, possibly with `*` and `?`
//! wildcards. [`RegionResolver`] validates those patterns against
//! [`KNOWN_REGIONS`], expands them and picks the default region used by
//! global services. The default is computed once per resolver.

mod provider;

pub use provider::{ambient_region, load_ambient_region};

use crate::config::{ConnectionConfig, EnvOverrides};
use crate::error::ConfigurationError;
use glob::Pattern;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Every region identifier the resolver recognises.
pub const KNOWN_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "ca-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "cn-north-1",
    "cn-northwest-1",
    "us-gov-east-1",
    "us-gov-west-1",
    "us-iso-east-1",
    "us-iso-west-1",
    "us-isob-east-1",
];

/// AWS partition a region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Commercial regions.
    Aws,
    /// China regions.
    AwsCn,
    /// GovCloud regions.
    AwsUsGov,
    /// US ISO regions.
    AwsIso,
    /// US ISOB regions.
    AwsIsoB,
}

impl Partition {
    /// Region used by global services in this partition.
    pub fn default_region(self) -> &'static str {
        match self {
            Partition::Aws => "us-east-1",
            Partition::AwsCn => "cn-northwest-1",
            Partition::AwsUsGov => "us-gov-west-1",
            Partition::AwsIso => "us-iso-east-1",
            Partition::AwsIsoB => "us-isob-east-1",
        }
    }

    /// DNS suffix of service endpoints.
    pub fn dns_suffix(self) -> &'static str {
        match self {
            Partition::Aws | Partition::AwsUsGov => "amazonaws.com",
            Partition::AwsCn => "amazonaws.com.cn",
            Partition::AwsIso => "c2s.ic.gov",
            Partition::AwsIsoB => "sc2s.sgov.gov",
        }
    }

    /// Partition identifier as used in ARNs.
    pub fn as_str(self) -> &'static str {
        match self {
            Partition::Aws => "aws",
            Partition::AwsCn => "aws-cn",
            Partition::AwsUsGov => "aws-us-gov",
            Partition::AwsIso => "aws-iso",
            Partition::AwsIsoB => "aws-iso-b",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partition of a region, decided by its prefix.
pub fn partition_of(region: &str) -> Partition {
    if region.starts_with("us-gov") {
        Partition::AwsUsGov
    } else if region.starts_with("cn") {
        Partition::AwsCn
    } else if region.starts_with("us-isob") {
        Partition::AwsIsoB
    } else if region.starts_with("us-iso") {
        Partition::AwsIso
    } else {
        Partition::Aws
    }
}

/// Whether `region` is in [`KNOWN_REGIONS`].
pub fn is_known_region(region: &str) -> bool {
    KNOWN_REGIONS.contains(&region)
}

/// Map an unknown region to its partition's default; known regions pass
/// through unchanged.
pub fn normalize_region(region: &str) -> String {
    if is_known_region(region) {
        region.to_string()
    } else {
        partition_of(region).default_region().to_string()
    }
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(|c| c == '*' || c == '?')
}

fn compile(pattern: &str) -> Result<Pattern, ConfigurationError> {
    Pattern::new(pattern).map_err(|e| ConfigurationError::InvalidRegionPattern {
        pattern: pattern.to_string(),
        details: e.to_string(),
    })
}

/// Known regions matching a single pattern, in table order.
pub fn matching_regions(pattern: &str) -> Result<Vec<&'static str>, ConfigurationError> {
    let compiled = compile(pattern)?;
    Ok(KNOWN_REGIONS
        .iter()
        .copied()
        .filter(|region| compiled.matches(region))
        .collect())
}

/// Check every pattern against the region table.
///
/// A literal that matches nothing is invalid; a wildcard that matches
/// nothing is tolerated. All invalid literals are reported together.
pub fn validate_patterns(patterns: &[String]) -> Result<(), ConfigurationError> {
    let mut invalid = Vec::new();

    for pattern in patterns {
        if matching_regions(pattern)?.is_empty() {
            if has_wildcard(pattern) {
                debug!(pattern = %pattern, "Region wildcard matches no known region");
            } else {
                invalid.push(pattern.clone());
            }
        }
    }

    if invalid.is_empty() {
        Ok(())
    } else {
        warn!(patterns = ?invalid, "Connection config lists invalid regions");
        Err(ConfigurationError::InvalidRegions { patterns: invalid })
    }
}

/// Resolve the default region for a connection without caching.
///
/// The first configured region is the candidate; with no configured
/// regions the ambient region is used. The patterns are validated, then an
/// unknown candidate is replaced by its partition's default region.
pub fn resolve_default_region(
    config: &ConnectionConfig,
    env: &EnvOverrides,
) -> Result<String, ConfigurationError> {
    let ambient = if config.regions.is_empty() {
        ambient_region(env, config.profile.as_deref())
    } else {
        None
    };
    default_region_from(config, ambient)
}

/// Same as [`resolve_default_region`], reading the shared config file
/// without blocking the runtime.
pub async fn load_default_region(
    config: &ConnectionConfig,
    env: &EnvOverrides,
) -> Result<String, ConfigurationError> {
    let ambient = if config.regions.is_empty() {
        load_ambient_region(env, config.profile.as_deref()).await
    } else {
        None
    };
    default_region_from(config, ambient)
}

fn default_region_from(
    config: &ConnectionConfig,
    ambient: Option<String>,
) -> Result<String, ConfigurationError> {
    let (patterns, candidate) = match config.regions.first() {
        Some(first) => (config.regions.clone(), first.clone()),
        None => match ambient {
            Some(region) => (vec![region.clone()], region),
            None => (Vec::new(), String::new()),
        },
    };

    validate_patterns(&patterns)?;

    let region = normalize_region(&candidate);
    if region != candidate {
        debug!(candidate = %candidate, region = %region, "Normalized default region");
    }
    Ok(region)
}

/// Per-connection region resolution with a cached default.
pub struct RegionResolver {
    config: Arc<ConnectionConfig>,
    env: EnvOverrides,
    default_region: OnceCell<String>,
}

impl RegionResolver {
    /// Create a resolver for one connection.
    pub fn new(config: Arc<ConnectionConfig>, env: EnvOverrides) -> Self {
        Self {
            config,
            env,
            default_region: OnceCell::new(),
        }
    }

    /// Default region, computed on first success and reused afterwards.
    /// Failures are returned every time and never cached.
    pub fn resolve_default_region(&self) -> Result<String, ConfigurationError> {
        self.default_region
            .get_or_try_init(|| resolve_default_region(&self.config, &self.env))
            .cloned()
    }

    /// Async form of [`RegionResolver::resolve_default_region`] sharing the
    /// same cache. Use it from async code.
    pub async fn load_default_region(&self) -> Result<String, ConfigurationError> {
        if let Some(region) = self.default_region.get() {
            return Ok(region.clone());
        }
        let region = load_default_region(&self.config, &self.env).await?;
        Ok(self.default_region.get_or_init(|| region).clone())
    }

    /// Whether a default region has been resolved and cached.
    pub fn has_cached_default(&self) -> bool {
        self.default_region.get().is_some()
    }

    /// Concrete regions this connection queries.
    ///
    /// Patterns are expanded in order against [`KNOWN_REGIONS`] with
    /// duplicates dropped. A connection without configured regions queries
    /// only its default region.
    pub fn expand_regions(&self) -> Result<Vec<String>, ConfigurationError> {
        if self.config.regions.is_empty() {
            return Ok(vec![self.resolve_default_region()?]);
        }

        validate_patterns(&self.config.regions)?;

        let mut regions: Vec<String> = Vec::new();
        for pattern in &self.config.regions {
            for region in matching_regions(pattern)? {
                if !regions.iter().any(|r| r == region) {
                    regions.push(region.to_string());
                }
            }
        }
        Ok(regions)
    }

    /// Partition of the default region.
    pub fn partition(&self) -> Result<Partition, ConfigurationError> {
        Ok(partition_of(&self.resolve_default_region()?))
    }
}

impl fmt::Debug for RegionResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionResolver")
            .field("regions", &self.config.regions)
            .field("default_region", &self.default_region.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn no_ambient() -> EnvOverrides {
        EnvOverrides {
            config_file: Some("/nonexistent/aws/config".to_string()),
            ..Default::default()
        }
    }

    fn with_regions(regions: &[&str]) -> ConnectionConfig {
        ConnectionConfig {
            regions: regions.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test_case("us-gov-foo", "us-gov-west-1" ; "govcloud prefix")]
    #[test_case("cn-south-9", "cn-northwest-1" ; "china prefix")]
    #[test_case("us-isob-west-7", "us-isob-east-1" ; "isob before iso")]
    #[test_case("us-iso-north-3", "us-iso-east-1" ; "iso prefix")]
    #[test_case("mars-central-1", "us-east-1" ; "unknown prefix")]
    #[test_case("", "us-east-1" ; "empty")]
    #[test_case("eu-west-2", "eu-west-2" ; "known region kept")]
    #[test_case("us-gov-east-1", "us-gov-east-1" ; "known govcloud kept")]
    fn test_normalize_region(input: &str, expected: &str) {
        assert_eq!(normalize_region(input), expected);
    }

    #[test_case("us-east-2", Partition::Aws)]
    #[test_case("cn-north-1", Partition::AwsCn)]
    #[test_case("us-gov-west-1", Partition::AwsUsGov)]
    #[test_case("us-iso-west-1", Partition::AwsIso)]
    #[test_case("us-isob-east-1", Partition::AwsIsoB)]
    fn test_partition_of(region: &str, partition: Partition) {
        assert_eq!(partition_of(region), partition);
    }

    #[test]
    fn test_every_partition_default_is_known() {
        for partition in [
            Partition::Aws,
            Partition::AwsCn,
            Partition::AwsUsGov,
            Partition::AwsIso,
            Partition::AwsIsoB,
        ] {
            assert!(is_known_region(partition.default_region()), "{}", partition);
        }
    }

    #[test]
    fn test_unmatched_wildcard_is_tolerated() {
        assert!(validate_patterns(&["xx-*".to_string(), "us-east-1".to_string()]).is_ok());
    }

    #[test]
    fn test_unmatched_literals_are_reported_together() {
        let err = validate_patterns(&[
            "us-east-1".to_string(),
            "us-east-9".to_string(),
            "moon-1".to_string(),
        ])
        .unwrap_err();
        match err {
            ConfigurationError::InvalidRegions { patterns } => {
                assert_eq!(patterns, vec!["us-east-9", "moon-1"])
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_broken_pattern_is_rejected() {
        assert!(matches!(
            validate_patterns(&["us-[east".to_string()]),
            Err(ConfigurationError::InvalidRegionPattern { .. })
        ));
    }

    #[test]
    fn test_first_configured_region_is_default() {
        let region = resolve_default_region(&with_regions(&["eu-west-1", "us-east-2"]), &no_ambient()).unwrap();
        assert_eq!(region, "eu-west-1");
    }

    #[test]
    fn test_wildcard_candidate_is_normalized() {
        let region = resolve_default_region(&with_regions(&["us-gov-*"]), &no_ambient()).unwrap();
        assert_eq!(region, "us-gov-west-1");
    }

    #[test]
    fn test_ambient_region_used_without_config() {
        let env = EnvOverrides {
            region: Some("ap-northeast-1".to_string()),
            ..no_ambient()
        };
        assert_eq!(
            resolve_default_region(&ConnectionConfig::default(), &env).unwrap(),
            "ap-northeast-1"
        );
    }

    #[test]
    fn test_invalid_ambient_region_is_rejected() {
        let env = EnvOverrides {
            region: Some("nowhere-1".to_string()),
            ..no_ambient()
        };
        assert!(resolve_default_region(&ConnectionConfig::default(), &env).is_err());
    }

    #[test]
    fn test_nothing_configured_falls_back_to_us_east_1() {
        assert_eq!(
            resolve_default_region(&ConnectionConfig::default(), &no_ambient()).unwrap(),
            "us-east-1"
        );
    }

    #[test]
    fn test_resolver_caches_default() {
        let resolver = RegionResolver::new(Arc::new(with_regions(&["cn-*"])), no_ambient());
        let first = resolver.resolve_default_region().unwrap();
        let second = resolver.resolve_default_region().unwrap();
        assert_eq!(first, "cn-northwest-1");
        assert_eq!(first, second);
        assert!(resolver.has_cached_default());
        assert_eq!(resolver.partition().unwrap(), Partition::AwsCn);
    }

    #[test]
    fn test_cached_default_survives_config_file_change() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "[default]\nregion = eu-west-2\n").unwrap();
        let env = EnvOverrides {
            config_file: Some(path.display().to_string()),
            ..Default::default()
        };
        let resolver = RegionResolver::new(Arc::new(ConnectionConfig::default()), env);

        assert_eq!(resolver.resolve_default_region().unwrap(), "eu-west-2");
        std::fs::write(&path, "[default]\nregion = ap-east-1\n").unwrap();
        assert_eq!(resolver.resolve_default_region().unwrap(), "eu-west-2");
        std::fs::remove_file(&path).unwrap();
        assert_eq!(resolver.resolve_default_region().unwrap(), "eu-west-2");
    }

    #[tokio::test]
    async fn test_async_resolution_shares_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(&path, "[default]\nregion = sa-east-1\n").unwrap();
        let env = EnvOverrides {
            config_file: Some(path.display().to_string()),
            ..Default::default()
        };
        let resolver = RegionResolver::new(Arc::new(ConnectionConfig::default()), env);

        assert!(!resolver.has_cached_default());
        assert_eq!(resolver.load_default_region().await.unwrap(), "sa-east-1");
        assert!(resolver.has_cached_default());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(resolver.resolve_default_region().unwrap(), "sa-east-1");
        assert_eq!(resolver.load_default_region().await.unwrap(), "sa-east-1");
    }

    #[test]
    fn test_resolver_does_not_cache_failure() {
        let resolver = RegionResolver::new(Arc::new(with_regions(&["bogus-1"])), no_ambient());
        assert!(resolver.resolve_default_region().is_err());
        assert!(resolver.resolve_default_region().is_err());
        assert!(resolver.default_region.get().is_none());
    }

    #[test]
    fn test_expand_regions_dedupes_in_order() {
        let resolver = RegionResolver::new(
            Arc::new(with_regions(&["us-west-2", "us-*", "cn-north-1"])),
            no_ambient(),
        );
        let regions = resolver.expand_regions().unwrap();
        assert_eq!(regions[0], "us-west-2");
        assert_eq!(regions.iter().filter(|r| *r == "us-west-2").count(), 1);
        assert!(regions.contains(&"us-gov-west-1".to_string()));
        assert_eq!(regions.last().map(String::as_str), Some("cn-north-1"));
    }

    #[test]
    fn test_expand_without_regions_uses_default() {
        let resolver = RegionResolver::new(Arc::new(ConnectionConfig::default()), no_ambient());
        assert_eq!(resolver.expand_regions().unwrap(), vec!["us-east-1"]);
    }

    #[test]
    fn test_question_mark_matches_single_char() {
        assert_eq!(matching_regions("us-west-?").unwrap(), vec!["us-west-1", "us-west-2"]);
    }
}
