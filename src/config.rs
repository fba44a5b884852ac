//! TOML configuration: key bindings, tick rate and timer-view layout.
//!
//! Lookup order: an explicit `--config` path (must load), `./config.toml`,
//! `<config dir>/splitkeeper/config.toml`, then compiled-in defaults.

use crate::actions::{default_hotkeys, Hotkey};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Blocks of the timer view, drawn top to bottom in configured order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Header,
    Splits,
    Timer,
    PreviousSegment,
    Controls,
}

pub fn default_layout() -> Vec<Component> {
    vec![
        Component::Header,
        Component::Splits,
        Component::Timer,
        Component::PreviousSegment,
        Component::Controls,
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    #[serde(rename = "hotkey")]
    pub hotkeys: Vec<Hotkey>,
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    pub layout: Vec<Component>,
    /// `[ui]` table as written by older config files.
    #[serde(skip_serializing)]
    ui: UiSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UiSection {
    #[serde(default)]
    layout: Option<Vec<Component>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            hotkeys: default_hotkeys(),
            tick_interval: Duration::from_millis(10),
            layout: default_layout(),
            ui: UiSection::default(),
        }
    }
}

impl AppConfig {
    /// Parse configuration text. Empty binding or layout lists fall back to defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        if let Some(layout) = config.ui.layout.take() {
            config.layout = layout;
        }
        if config.hotkeys.is_empty() {
            config.hotkeys = default_hotkeys();
        }
        if config.layout.is_empty() {
            config.layout = default_layout();
        }
        if config.tick_interval.is_zero() {
            config.tick_interval = Self::default().tick_interval;
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        tracing::info!(path = %path.display(), hotkeys = config.hotkeys.len(), "loaded configuration");
        Ok(config)
    }

    /// Resolve and load the configuration. A broken file that exists is an error;
    /// a missing one is not.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for candidate in default_locations() {
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }
}

fn default_locations() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("splitkeeper").join(CONFIG_FILE_NAME));
    }
    paths
}
