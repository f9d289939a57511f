//! Integration tests for TOML configuration loading

use serial_test::serial;
use std::path::PathBuf;
use tally_common::config::{
    default_config_path, load_config, read_toml_config, write_toml_config, AbusePolicy, TomlConfig,
};
use tally_common::Error;
use tempfile::TempDir;

#[test]
fn test_write_then_read_preserves_settings() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sub").join("config.toml");

    let mut config = TomlConfig::default();
    config.server.port = 6100;
    config.storage.database_path = Some(PathBuf::from("/var/lib/tally/tally.db"));
    config.abuse.policy = AbusePolicy::Log;
    config.moderation.extra_banned_terms = vec!["spamword".to_string()];
    config.election.full_turnout_votes = 250;

    write_toml_config(&config, &path).unwrap();
    let loaded = read_toml_config(&path).unwrap();

    assert_eq!(loaded.server.port, 6100);
    assert_eq!(loaded.storage.database_path, Some(PathBuf::from("/var/lib/tally/tally.db")));
    assert_eq!(loaded.abuse.policy, AbusePolicy::Log);
    assert_eq!(loaded.moderation.extra_banned_terms, vec!["spamword".to_string()]);
    assert_eq!(loaded.election.full_turnout_votes, 250);
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = load_config(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_malformed_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[server\nport = ").unwrap();

    match load_config(Some(&path)) {
        Err(Error::Config(msg)) => assert!(msg.contains("config.toml")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn test_unknown_policy_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[abuse]\npolicy = \"quarantine\"\n").unwrap();

    assert!(read_toml_config(&path).is_err());
}

#[test]
#[serial]
#[cfg(target_os = "linux")]
fn test_default_location_used_when_no_path_given() {
    let dir = TempDir::new().unwrap();
    let previous = std::env::var_os("XDG_CONFIG_HOME");
    std::env::set_var("XDG_CONFIG_HOME", dir.path());

    let path = default_config_path().unwrap();
    assert!(path.starts_with(dir.path()));

    // No file yet: built-in defaults
    let config = load_config(None).unwrap();
    assert_eq!(config.server.port, TomlConfig::default().server.port);

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[server]\nport = 7001\n").unwrap();
    let config = load_config(None).unwrap();
    assert_eq!(config.server.port, 7001);

    match previous {
        Some(value) => std::env::set_var("XDG_CONFIG_HOME", value),
        None => std::env::remove_var("XDG_CONFIG_HOME"),
    }
}

#[test]
fn test_written_defaults_load_as_explicit_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    write_toml_config(&TomlConfig::default(), &path).unwrap();
    let loaded = load_config(Some(&path)).unwrap();

    assert_eq!(loaded.server.port, TomlConfig::default().server.port);
    assert_eq!(loaded.server.host, "127.0.0.1");
    assert!(loaded.storage.database_path.is_none());
    assert_eq!(loaded.abuse.policy, AbusePolicy::default());
}
