/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! TOML configuration. Every field has a default, so a partial or empty file
//! is valid.

use std::path::{Path, PathBuf};

use dash_layout::{GridMetrics, LayoutExtras, LayoutMode};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ITEMS_KEY: &str = "dashboard-items";
pub const DEFAULT_CHANNEL_NAME: &str = "dashboard-sync";

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "Config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub layout: LayoutConfig,
    pub history: HistoryConfig,
    pub sync: SyncConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub cell_size: f32,
    pub gap: f32,
    pub padding: f32,
    pub snap_grid_size: f32,
    pub square_columns: usize,
    pub virtual_rows: usize,
    pub default_mode: LayoutMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        let metrics = GridMetrics::default();
        Self {
            cell_size: metrics.cell_size,
            gap: metrics.gap,
            padding: metrics.padding,
            snap_grid_size: 20.0,
            square_columns: 3,
            virtual_rows: dash_layout::DEFAULT_VIRTUAL_ROWS,
            default_mode: LayoutMode::default(),
        }
    }
}

impl LayoutConfig {
    pub fn metrics(&self) -> GridMetrics {
        GridMetrics {
            cell_size: self.cell_size,
            gap: self.gap,
            padding: self.padding,
        }
    }

    /// Layout inputs seeded from configuration; the caller fills in the
    /// per-render fields.
    pub fn extras(&self) -> LayoutExtras {
        LayoutExtras {
            metrics: self.metrics(),
            square_columns: self.square_columns.max(1),
            virtual_rows: self.virtual_rows.max(1),
            ..LayoutExtras::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_undo_steps: usize,
    pub max_navigation_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_undo_steps: 128,
            max_navigation_entries: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub channel_name: String,
    pub user_id: Option<String>,
    pub mirror_enabled: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            user_id: None,
            mirror_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub items_key: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            items_key: DEFAULT_ITEMS_KEY.to_string(),
            data_dir: None,
        }
    }
}

impl StorageConfig {
    /// Configured data dir, else `<config dir>/dashshell`.
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join("dashshell")))
    }
}

impl DashboardConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("config: {} not found, using defaults", path.display());
                Ok(Self::default())
            },
            Err(e) => Err(ConfigError::Io(format!("{}: {e}", path.display()))),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dashshell").join("config.toml"))
    }
}
