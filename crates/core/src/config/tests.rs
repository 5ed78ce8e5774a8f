//! Tests for configuration module

use super::*;
use crate::error::{Error, Result};
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn create_temp_config_file(content: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .map_err(|e| Error::config(format!("Failed to create temp file: {e}")))?;
    file.write_all(content.as_bytes())
        .map_err(|e| Error::config(format!("Failed to write temp file: {e}")))?;
    file.flush()
        .map_err(|e| Error::config(format!("Failed to flush temp file: {e}")))?;
    Ok(file)
}

fn with_env_var<F, T>(key: &str, value: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    std::env::set_var(key, value);
    let result = f();
    std::env::remove_var(key);
    result
}

#[test]
fn test_from_toml_str_valid() {
    let toml = r#"
        [watcher]
        ignore_initial_adds = true
        ignore_patterns = ["node_modules", "re:\\.log$"]
        poll_interval_ms = 250
    "#;

    let config = Config::from_toml_str(toml).expect("Failed to parse valid TOML");
    assert!(config.watcher.ignore_initial_adds);
    assert_eq!(
        config.watcher.ignore_patterns,
        vec!["node_modules".to_string(), "re:\\.log$".to_string()]
    );
    assert_eq!(config.watcher.poll_interval_ms, 250);
}

#[test]
fn test_from_toml_str_minimal() {
    let config = Config::from_toml_str("").expect("Failed to parse empty TOML");
    assert_eq!(config.watcher, WatcherConfig::default());
    assert_eq!(config.watcher.poll_interval_ms, 100);
}

#[test]
fn test_from_toml_str_invalid_syntax() {
    let result = Config::from_toml_str("[watcher\npoll_interval_ms = ");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_validate_valid_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_validate_zero_interval() {
    let config = Config {
        watcher: WatcherConfig::builder().poll_interval_ms(0).build(),
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("poll_interval_ms"));
}

#[test]
fn test_validate_empty_pattern() {
    let config = Config {
        watcher: WatcherConfig::builder()
            .add_ignore_pattern("target")
            .add_ignore_pattern("")
            .build(),
    };
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("ignore_patterns[1]"));
}

#[test]
fn test_watcher_config_builder() {
    let config = WatcherConfig::builder()
        .ignore_initial_adds(true)
        .poll_interval_ms(50)
        .add_ignore_pattern("glob:*.tmp")
        .build();

    assert!(config.ignore_initial_adds);
    assert_eq!(config.poll_interval(), std::time::Duration::from_millis(50));
    assert_eq!(config.ignore_patterns, vec!["glob:*.tmp".to_string()]);
}

#[test]
fn test_save_and_load_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("pollwatch.toml");

    let original = Config {
        watcher: WatcherConfig::builder()
            .ignore_initial_adds(true)
            .ignore_patterns(vec![".git".to_string()])
            .poll_interval_ms(400)
            .build(),
    };
    original.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.watcher, original.watcher);
    Ok(())
}

#[test]
fn test_from_file_missing_file_uses_defaults() -> Result<()> {
    let config = Config::from_file(std::path::Path::new("/definitely/not/here.toml"))?;
    assert_eq!(config.watcher.poll_interval_ms, 100);
    assert!(config.watcher.ignore_patterns.is_empty());
    Ok(())
}

#[test]
fn test_from_file_partial_section() -> Result<()> {
    let file = create_temp_config_file(
        r#"
        [watcher]
        ignore_patterns = ["dist"]
        "#,
    )?;

    let config = Config::from_file(file.path())?;
    assert_eq!(config.watcher.ignore_patterns, vec!["dist".to_string()]);
    assert_eq!(config.watcher.poll_interval_ms, 100);
    Ok(())
}

#[test]
fn test_env_overrides_file() -> Result<()> {
    let file = create_temp_config_file(
        r#"
        [watcher]
        ignore_initial_adds = false
        poll_interval_ms = 300
        "#,
    )?;

    let config = with_env_var("POLLWATCH_WATCHER__IGNORE_INITIAL_ADDS", "true", || {
        Config::from_file(file.path())
    })?;
    assert!(config.watcher.ignore_initial_adds);
    assert_eq!(config.watcher.poll_interval_ms, 300);
    Ok(())
}
