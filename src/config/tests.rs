//! Unit tests for configuration module
//!
//! Tests configuration parsing, validation, serialization and defaults
//! filling for partial files.

use super::*;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_configuration_is_valid() {
    let config = WayhostConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.window.width, 800);
    assert_eq!(config.window.height, 600);
    assert_eq!(config.window.pixel_ratio, 1.0);
    assert_eq!(config.cursor.name, "left_ptr");
    assert_eq!(config.engine.icu_data_file, "icudtl.dat");
    assert!(config.engine.frame_interval_ms > 0);
    assert!(!config.general.debug);
}

#[test]
fn test_configuration_serialization_roundtrip() -> Result<()> {
    let mut original = WayhostConfig::default();
    original.engine.args = vec!["--verbose-logging".to_string()];
    original.cursor.theme = "Adwaita".to_string();

    let toml_string = toml::to_string(&original)?;
    let deserialized: WayhostConfig = toml::from_str(&toml_string)?;

    assert_eq!(original, deserialized);

    Ok(())
}

#[test]
fn test_configuration_from_file() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("wayhost.toml");

    let test_config = r#"
[window]
width = 1280
height = 720
pixel_ratio = 2.0

[cursor]
theme = "Adwaita"
size = 32
name = "left_ptr"

[engine]
icu_data_file = "icudtl.dat"
args = ["--observatory-port=0"]
frame_interval_ms = 8

[general]
debug = true
"#;

    fs::write(&file_path, test_config)?;

    let config = WayhostConfig::load(&file_path)?;

    assert_eq!(config.window.width, 1280);
    assert_eq!(config.window.height, 720);
    assert_eq!(config.window.pixel_ratio, 2.0);
    assert_eq!(config.cursor.theme, "Adwaita");
    assert_eq!(config.cursor.size, 32);
    assert_eq!(config.engine.args, vec!["--observatory-port=0"]);
    assert_eq!(config.engine.frame_interval_ms, 8);
    assert!(config.general.debug);

    Ok(())
}

#[test]
fn test_partial_configuration_fills_defaults() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("partial.toml");

    fs::write(
        &file_path,
        r#"
[window]
width = 1024
"#,
    )?;

    let config = WayhostConfig::load(&file_path)?;
    let defaults = WayhostConfig::default();

    assert_eq!(config.window.width, 1024);
    assert_eq!(config.window.height, defaults.window.height);
    assert_eq!(config.window.pixel_ratio, defaults.window.pixel_ratio);
    assert_eq!(config.cursor, defaults.cursor);
    assert_eq!(config.engine, defaults.engine);

    Ok(())
}

#[test]
fn test_empty_file_is_default() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("empty.toml");
    fs::write(&file_path, "")?;

    assert_eq!(WayhostConfig::load(&file_path)?, WayhostConfig::default());

    Ok(())
}

#[test]
fn test_zero_dimensions_are_rejected() {
    let mut config = WayhostConfig::default();
    config.window.width = 0;
    assert!(config.validate().is_err());

    let mut config = WayhostConfig::default();
    config.window.height = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_values_are_rejected() {
    let mut config = WayhostConfig::default();
    config.window.pixel_ratio = 0.0;
    assert!(config.validate().is_err());

    let mut config = WayhostConfig::default();
    config.window.pixel_ratio = f64::NAN;
    assert!(config.validate().is_err());

    let mut config = WayhostConfig::default();
    config.cursor.size = 0;
    assert!(config.validate().is_err());

    let mut config = WayhostConfig::default();
    config.engine.frame_interval_ms = 0;
    assert!(config.validate().is_err());

    let mut config = WayhostConfig::default();
    config.engine.icu_data_file = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_file_fails_to_load() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("broken.toml");

    fs::write(&file_path, "[window]\nwidth = \"wide\"\n")?;
    assert!(WayhostConfig::load(&file_path).is_err());

    fs::write(&file_path, "[window]\nwidth = 0\n")?;
    let err = WayhostConfig::load(&file_path).expect_err("zero width must be rejected");
    assert!(err.to_string().contains("window size"));

    Ok(())
}

#[test]
fn test_missing_file_reports_path() {
    let err = WayhostConfig::load("/nonexistent/wayhost.toml").expect_err("missing file");
    assert!(format!("{:#}", err).contains("/nonexistent/wayhost.toml"));
}

#[test]
fn test_save_and_reload() -> Result<()> {
    let dir = tempdir()?;
    let file_path = dir.path().join("saved.toml");

    let mut config = WayhostConfig::default();
    config.window.width = 1920;
    config.window.height = 1080;
    config.general.debug = true;
    config.save(&file_path)?;

    let reloaded = WayhostConfig::load(&file_path)?;
    assert_eq!(reloaded, config);

    Ok(())
}
