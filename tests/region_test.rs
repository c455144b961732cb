//! Integration tests for region resolution.

use aws_session::config::{
    ConnectionConfig, EnvOverrides, AWS_CONFIG_FILE, AWS_DEFAULT_REGION, AWS_REGION,
};
use aws_session::credentials::AWS_PROFILE;
use aws_session::error::ConfigurationError;
use aws_session::region::{Partition, RegionResolver};
use serial_test::serial;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_case::test_case;

fn resolver(regions: &[&str], env: EnvOverrides) -> RegionResolver {
    let config = ConnectionConfig::builder().regions(regions.iter().copied()).build().unwrap();
    RegionResolver::new(Arc::new(config), env)
}

fn no_ambient() -> EnvOverrides {
    EnvOverrides {
        config_file: Some("/nonexistent/aws/config".to_string()),
        ..Default::default()
    }
}

#[test_case(&["eu-west-1", "us-east-1"], "eu-west-1" ; "first configured region")]
#[test_case(&["us-*"], "us-east-1" ; "wildcard falls back to partition default")]
#[test_case(&["cn-*"], "cn-northwest-1" ; "china wildcard")]
#[test_case(&["us-gov-*"], "us-gov-west-1" ; "govcloud wildcard")]
fn test_default_region_from_config(regions: &[&str], expected: &str) {
    let resolver = resolver(regions, no_ambient());
    assert_eq!(resolver.resolve_default_region().unwrap(), expected);
}

#[test]
fn test_default_region_from_env() {
    let env = EnvOverrides {
        region: Some("ap-southeast-2".to_string()),
        ..no_ambient()
    };
    let resolver = resolver(&[], env);
    assert_eq!(resolver.resolve_default_region().unwrap(), "ap-southeast-2");
    assert_eq!(resolver.expand_regions().unwrap(), vec!["ap-southeast-2"]);
}

#[test]
fn test_default_region_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[default]\nregion = eu-north-1\n\n[profile dev]\nregion = ca-central-1").unwrap();

    let env = EnvOverrides {
        config_file: Some(file.path().display().to_string()),
        profile: Some("dev".to_string()),
        ..Default::default()
    };
    assert_eq!(resolver(&[], env).resolve_default_region().unwrap(), "ca-central-1");
}

#[test]
fn test_nothing_configured_uses_aws_default() {
    let resolver = resolver(&[], no_ambient());
    assert_eq!(resolver.resolve_default_region().unwrap(), "us-east-1");
    assert_eq!(resolver.partition().unwrap(), Partition::Aws);
}

#[test]
fn test_invalid_literal_region_rejected() {
    let resolver = resolver(&["us-east-1", "mars-central-1", "moon-1"], no_ambient());
    match resolver.resolve_default_region().unwrap_err() {
        ConfigurationError::InvalidRegions { patterns } => {
            assert_eq!(patterns, vec!["mars-central-1", "moon-1"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_expand_regions_dedupes_in_order() {
    let resolver = resolver(&["eu-west-1", "eu-west-*", "xx-*"], no_ambient());
    let regions = resolver.expand_regions().unwrap();
    assert_eq!(regions[0], "eu-west-1");
    assert!(regions.contains(&"eu-west-3".to_string()));
    assert_eq!(regions.iter().filter(|r| *r == "eu-west-1").count(), 1);
}

#[test]
#[serial]
fn test_env_overrides_from_process_env() {
    std::env::set_var(AWS_REGION, "sa-east-1");
    std::env::set_var(AWS_CONFIG_FILE, "/nonexistent/aws/config");

    let env = EnvOverrides::from_env();
    let resolved = resolver(&[], env).resolve_default_region();

    std::env::remove_var(AWS_REGION);
    std::env::remove_var(AWS_CONFIG_FILE);
    assert_eq!(resolved.unwrap(), "sa-east-1");
}

#[test]
#[serial]
fn test_default_region_not_recomputed_after_config_file_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config");
    std::fs::write(&path, "[default]\nregion = eu-north-1\n").unwrap();
    std::env::remove_var(AWS_REGION);
    std::env::remove_var(AWS_DEFAULT_REGION);
    std::env::remove_var(AWS_PROFILE);
    std::env::set_var(AWS_CONFIG_FILE, &path);

    let resolver = resolver(&[], EnvOverrides::from_env());
    std::env::remove_var(AWS_CONFIG_FILE);

    let first = resolver.resolve_default_region().unwrap();
    std::fs::write(&path, "[default]\nregion = ap-southeast-1\n").unwrap();
    let second = resolver.resolve_default_region().unwrap();
    std::fs::remove_file(&path).unwrap();
    let third = resolver.resolve_default_region().unwrap();

    assert_eq!(first, "eu-north-1");
    assert_eq!(second, first);
    assert_eq!(third, first);
}
