//! Configuration management for the application.
//!
//! This module handles loading, validating, and saving the dashboard
//! configuration in TOML format with platform-specific directory resolution.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_CANDIDATE_PORTS, DEFAULT_DETECTION_ROOM, DEFAULT_DETECTOR_HOST,
    DEFAULT_DETECT_TIMEOUT_MS, DEFAULT_HEALTH_TIMEOUT_MS, DEFAULT_SNIPPET_LEN,
};
use crate::models::{Position, TransitionScheme, Trap};

/// Whether detection results may change trap statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePolicy {
    /// Detection results never touch trap statuses.
    #[default]
    Off,
    /// A confirmed sighting raises the trap named by the detection status
    /// room to the scheme's alert status.
    AlertRoom,
}

/// Connection settings for the external detection service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Host the service listens on.
    pub host: String,
    /// Ports to try, in order. The first one also serves liveness checks.
    pub candidate_ports: Vec<u16>,
    /// Liveness check bound in milliseconds.
    pub health_timeout_ms: u64,
    /// Per-port detect bound in milliseconds.
    pub detect_timeout_ms: u64,
    /// Characters of a raw body quoted in diagnostics.
    pub snippet_len: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DETECTOR_HOST.to_string(),
            candidate_ports: DEFAULT_CANDIDATE_PORTS.to_vec(),
            health_timeout_ms: DEFAULT_HEALTH_TIMEOUT_MS,
            detect_timeout_ms: DEFAULT_DETECT_TIMEOUT_MS,
            snippet_len: DEFAULT_SNIPPET_LEN,
        }
    }
}

impl DetectorConfig {
    /// Liveness check bound.
    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    /// Per-port detect bound.
    pub fn detect_timeout(&self) -> Duration {
        Duration::from_millis(self.detect_timeout_ms)
    }
}

/// Dashboard behaviour settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Status scheme cycled on click.
    pub transition_scheme: TransitionScheme,
    /// How detection results feed back into trap statuses.
    pub reconcile: ReconcilePolicy,
    /// Room reported by the detection status slot at startup.
    pub default_room: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            transition_scheme: TransitionScheme::default(),
            reconcile: ReconcilePolicy::default(),
            default_room: DEFAULT_DETECTION_ROOM.to_string(),
        }
    }
}

/// A trap entry as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrapConfig {
    /// Stable key (e.g., "kitchen").
    pub id: String,
    /// Label shown on the floor plan.
    pub display_name: String,
    /// Horizontal position (0-100).
    pub x: f32,
    /// Vertical position (0-100).
    pub y: f32,
}

impl TrapConfig {
    fn new(id: &str, display_name: &str, x: f32, y: f32) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            x,
            y,
        }
    }
}

impl From<&TrapConfig> for Trap {
    fn from(entry: &TrapConfig) -> Self {
        Self::new(
            entry.id.clone(),
            entry.display_name.clone(),
            Position::new(entry.x, entry.y),
        )
    }
}

/// Rooms of the default floor plan.
fn default_traps() -> Vec<TrapConfig> {
    vec![
        TrapConfig::new("kitchen", "Kitchen", 22.0, 30.0),
        TrapConfig::new("living_room", "Living Room", 68.0, 28.0),
        TrapConfig::new("bedroom", "Bedroom", 70.0, 74.0),
        TrapConfig::new("bathroom", "Bathroom", 24.0, 76.0),
    ]
}

/// Application configuration.
///
/// # File Location
///
/// - Linux: `~/.config/TrapWatch/config.toml`
/// - macOS: `~/Library/Application Support/TrapWatch/config.toml`
/// - Windows: `%APPDATA%\TrapWatch\config.toml`
///
/// # Validation
///
/// - at least one candidate port, none of them 0
/// - timeouts greater than zero
/// - at least one trap, ids unique and non-empty, positions within 0-100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Detection service connection
    #[serde(default)]
    pub detector: DetectorConfig,
    /// Dashboard behaviour
    #[serde(default)]
    pub dashboard: DashboardConfig,
    /// Registered traps, in display order
    #[serde(default = "default_traps")]
    pub traps: Vec<TrapConfig>,
}

impl Config {
    /// Creates a new Config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            detector: DetectorConfig::default(),
            dashboard: DashboardConfig::default(),
            traps: default_traps(),
        }
    }

    /// Gets the platform-specific config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join(CONFIG_DIR_NAME);

        Ok(config_dir)
    }

    /// Gets the full path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Loads configuration from the platform config file.
    ///
    /// If the file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .context(format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to the platform config file.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Saves configuration to `path` using atomic write.
    ///
    /// Uses temp file + rename pattern for atomic writes.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context(format!(
                "Failed to create config directory: {}",
                parent.display()
            ))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        let temp_path = path.with_extension("toml.tmp");

        fs::write(&temp_path, content).context(format!(
            "Failed to write temp config file: {}",
            temp_path.display()
        ))?;

        fs::rename(&temp_path, path).context(format!(
            "Failed to rename temp config file to: {}",
            path.display()
        ))?;

        Ok(())
    }

    /// Validates configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.detector.candidate_ports.is_empty() {
            anyhow::bail!("detector.candidate_ports must list at least one port");
        }
        if self.detector.candidate_ports.contains(&0) {
            anyhow::bail!("detector.candidate_ports cannot contain port 0");
        }
        if self.detector.health_timeout_ms == 0 || self.detector.detect_timeout_ms == 0 {
            anyhow::bail!("detector timeouts must be greater than zero");
        }
        if self.detector.host.trim().is_empty() {
            anyhow::bail!("detector.host cannot be empty");
        }

        if self.traps.is_empty() {
            anyhow::bail!("at least one trap must be configured");
        }

        let mut seen = HashSet::new();
        for trap in &self.traps {
            if trap.id.trim().is_empty() {
                anyhow::bail!("trap ids cannot be empty");
            }
            if !seen.insert(trap.id.as_str()) {
                anyhow::bail!("duplicate trap id '{}'", trap.id);
            }
            if !Position::new(trap.x, trap.y).in_range() {
                anyhow::bail!(
                    "trap '{}' position ({}, {}) must be within 0-100",
                    trap.id,
                    trap.x,
                    trap.y
                );
            }
        }

        Ok(())
    }

    /// Converts the configured trap entries into trap records.
    pub fn trap_records(&self) -> Vec<Trap> {
        self.traps.iter().map(Trap::from).collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
