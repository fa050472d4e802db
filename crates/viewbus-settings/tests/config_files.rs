// Configuration file round trips through real files in a temp directory

use tempfile::TempDir;
use viewbus_core::DispatchErrorPolicy;
use viewbus_settings::{Config, SettingsError};

fn sample() -> Config {
    let mut config = Config::new();
    config.bus.error_policy = DispatchErrorPolicy::Continue;
    config.bus.trace_dispatch = true;
    config.logging.level = "debug".to_string();
    config.logging.directives = vec!["viewbus_view=trace".to_string()];
    config.logging.json = true;
    config
}

#[test]
fn test_toml_file_round_trip() {
    let dir = TempDir::new().expect("Should create temp dir");
    let path = dir.path().join("nested").join("config.toml");

    sample().save_to_file(&path).expect("Should save");
    let content = std::fs::read_to_string(&path).expect("Should read");
    assert!(content.contains("error_policy = \"continue\""));

    let loaded = Config::load_from_file(&path).expect("Should load");
    assert_eq!(loaded, sample());
}

#[test]
fn test_json_file_round_trip() {
    let dir = TempDir::new().expect("Should create temp dir");
    let path = dir.path().join("config.json");

    sample().save_to_file(&path).expect("Should save");
    let loaded = Config::load_from_file(&path).expect("Should load");
    assert_eq!(loaded, sample());
}

#[test]
fn test_invalid_file_is_rejected_on_load() {
    let dir = TempDir::new().expect("Should create temp dir");
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"chatty\"\n").expect("Should write");

    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::Config(_))
    ));
}

#[test]
fn test_invalid_config_is_not_saved() {
    let dir = TempDir::new().expect("Should create temp dir");
    let path = dir.path().join("config.toml");
    let mut config = Config::new();
    config.logging.level = "chatty".to_string();

    assert!(config.save_to_file(&path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().expect("Should create temp dir");
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        Config::load_from_file(&path),
        Err(SettingsError::LoadError { .. })
    ));
    assert_eq!(
        Config::load_or_default(&path).expect("Should default"),
        Config::default()
    );
}
