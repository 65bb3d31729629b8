//! Tests for config file resolution and graceful degradation
//!
//! - Missing TOML files must not cause termination
//! - Priority order: CLI argument → environment → user config dir → defaults
//!
//! Tests that touch SEDQ_CONFIG are marked #[serial] so they never race.

use sedq_common::config::{load_toml_or_default, ConfigResolver, ConfigSource, LoggingConfig};
use sedq_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct ServiceConfig {
    threshold: f64,
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_env_var_used_without_cli_argument() {
    env::set_var("SEDQ_CONFIG", "/tmp/sedq-env-config.toml");

    let resolver = ConfigResolver::new("test-module");
    let (path, source) = resolver.resolve(None).unwrap();

    assert_eq!(path, PathBuf::from("/tmp/sedq-env-config.toml"));
    assert_eq!(source, ConfigSource::Environment);

    env::remove_var("SEDQ_CONFIG");
}

#[test]
#[serial]
fn test_cli_argument_takes_precedence_over_env() {
    env::set_var("SEDQ_CONFIG", "/tmp/sedq-priority-2.toml");

    let resolver = ConfigResolver::new("test-module");
    let (path, source) = resolver
        .resolve(Some(Path::new("/tmp/sedq-priority-1.toml")))
        .unwrap();

    assert_eq!(path, PathBuf::from("/tmp/sedq-priority-1.toml"));
    assert_eq!(source, ConfigSource::CommandLine);

    env::remove_var("SEDQ_CONFIG");
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var("SEDQ_CONFIG", "   ");

    // Module name chosen so no user config file can exist
    let resolver = ConfigResolver::new("sedq-test-module-that-does-not-exist");
    assert!(resolver.resolve(None).is_none());

    env::remove_var("SEDQ_CONFIG");
}

#[test]
fn test_partial_toml_keeps_defaults_for_missing_fields() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("service.toml");
    std::fs::write(&path, "threshold = 0.75\n").unwrap();

    let config: ServiceConfig = load_toml_or_default(Some(&path)).unwrap();

    assert_eq!(config.threshold, 0.75);
    assert_eq!(config.logging, LoggingConfig::default());
}

#[test]
fn test_logging_section_parsed() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("service.toml");
    std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

    let config: ServiceConfig = load_toml_or_default(Some(&path)).unwrap();

    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_malformed_toml_is_config_error() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "threshold = [unclosed").unwrap();

    let result: Result<ServiceConfig, _> = load_toml_or_default(Some(&path));

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_missing_file_does_not_error() {
    let result: Result<ServiceConfig, _> =
        load_toml_or_default(Some(Path::new("/tmp/sedq-missing-config-file.toml")));

    assert!(result.is_ok(), "Missing config must fall back to defaults");
}
