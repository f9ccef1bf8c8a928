//! Layered configuration loading.

use courier_core::config::{ConfigManager, ConfigurationError};
use rust_decimal_macros::dec;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn config_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        fs::write(dir.path().join(name), contents).unwrap();
    }
    dir
}

#[test]
fn test_repository_config_loads_for_test_environment() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config");
    let manager = ConfigManager::load_from_directory_with_env(Some(dir), "test").unwrap();

    let config = manager.config();
    assert_eq!(manager.environment(), "test");
    assert!(config.database.url.ends_with("/courier_test"));
    assert_eq!(config.database.max_connections, 5);
    assert_eq!(config.pricing.tax_rate, dec!(0.18));
    assert_eq!(config.pricing.tax_rate_version, "IGV-2011");
    assert_eq!(config.tracking.fallback_prefix, "UNK");
}

#[test]
fn test_environment_file_overrides_base() {
    let dir = config_dir(&[
        (
            "courier.toml",
            "[pricing]\ntax_rate = \"0.18\"\ntax_rate_version = \"IGV-2011\"\n\n[quotes]\nvalidity_days = 7\n",
        ),
        (
            "courier.staging.toml",
            "[pricing]\ntax_rate = \"0.16\"\ntax_rate_version = \"IGV-2027\"\n",
        ),
    ]);

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "staging").unwrap();
    assert_eq!(manager.config().pricing.tax_rate, dec!(0.16));
    assert_eq!(manager.config().pricing.tax_rate_version, "IGV-2027");
    assert_eq!(manager.config().quotes.validity_days, 7);

    let base =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "production").unwrap();
    assert_eq!(base.config().pricing.tax_rate, dec!(0.18));
}

#[test]
fn test_missing_sections_fall_back_to_defaults() {
    let dir = config_dir(&[("courier.toml", "[quotes]\nvalidity_days = 3\n")]);

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "development").unwrap();
    assert_eq!(manager.config().quotes.validity_days, 3);
    assert_eq!(manager.config().tracking.max_attempts, 5);
    assert_eq!(manager.config().pricing.volumetric_divisor, dec!(6000));
}

#[test]
fn test_invalid_values_are_rejected_at_load() {
    let dir = config_dir(&[("courier.toml", "[quotes]\nvalidity_days = 0\n")]);

    let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "development")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { ref field, .. } if field == "quotes.validity_days"));
}

#[test]
fn test_unbounded_quote_validity_is_rejected_at_load() {
    let dir = config_dir(&[("courier.toml", "[quotes]\nvalidity_days = 9223372036854775807\n")]);

    let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "development")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidValue { ref field, .. } if field == "quotes.validity_days"));

    let dir = config_dir(&[("courier.toml", "[quotes]\nvalidity_days = 365\n")]);
    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "development").unwrap();
    assert_eq!(manager.config().quotes.validity(), chrono::Duration::days(365));
}

#[test]
fn test_malformed_file_is_a_load_error() {
    let dir = config_dir(&[("courier.toml", "[quotes\nvalidity_days = 3\n")]);

    let err = ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "development")
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::LoadError { .. }));
}

#[test]
fn test_debug_config_masks_database_password() {
    let dir = config_dir(&[(
        "courier.toml",
        "[database]\nurl = \"postgresql://courier:hunter2@db:5432/courier\"\n",
    )]);

    let manager =
        ConfigManager::load_from_directory_with_env(Some(dir.path().to_path_buf()), "development").unwrap();
    let rendered = manager.debug_config().to_string();
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("courier:***@db:5432"));
}
