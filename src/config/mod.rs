//! Configuration management for Wayhost
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. It covers the window, the pointer cursor and the
//! embedded rendering engine.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration struct containing all Wayhost settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WayhostConfig {
    /// Initial window geometry
    #[serde(default)]
    pub window: WindowConfig,

    /// Pointer cursor appearance
    #[serde(default)]
    pub cursor: CursorConfig,

    /// Rendering engine launch settings
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub general: GeneralConfig,
}

/// Window geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in surface pixels
    pub width: u32,

    /// Height in surface pixels
    pub height: u32,

    /// Device pixel ratio reported to the engine
    pub pixel_ratio: f64,
}

/// Cursor theme selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CursorConfig {
    /// Theme name; empty or "default" picks the system theme
    pub theme: String,

    /// Cursor size in pixels
    pub size: u32,

    /// Cursor image shown over the window
    pub name: String,
}

/// Rendering engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Data file the engine needs, looked up next to the executable
    pub icu_data_file: String,

    /// Extra command-line switches handed to the engine
    pub args: Vec<String>,

    /// Target interval between frames (milliseconds)
    pub frame_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable debug logging
    pub debug: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            pixel_ratio: 1.0,
        }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            theme: "default".to_string(),
            size: 24,
            name: "left_ptr".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            icu_data_file: "icudtl.dat".to_string(),
            args: Vec::new(),
            frame_interval_ms: 16,
        }
    }
}

impl WayhostConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            let relative = path.strip_prefix("~").unwrap_or(path);
            Path::new(&home).join(relative)
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: WayhostConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            anyhow::bail!(
                "Invalid window size {}x{}: both dimensions must be non-zero",
                self.window.width,
                self.window.height
            );
        }

        if !(self.window.pixel_ratio > 0.0) || !self.window.pixel_ratio.is_finite() {
            anyhow::bail!("Invalid pixel_ratio: must be a positive number");
        }

        if self.cursor.size == 0 {
            anyhow::bail!("Invalid cursor size: must be greater than 0");
        }

        if self.engine.frame_interval_ms == 0 {
            anyhow::bail!("Invalid frame_interval_ms: must be greater than 0");
        }

        if self.engine.icu_data_file.trim().is_empty() {
            anyhow::bail!("Invalid icu_data_file: must name a file");
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
