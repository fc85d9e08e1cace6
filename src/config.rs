//! Application configuration.
//!
//! A flat JSON file: where the target stores live, where screenshots go, and
//! the session options the shell feeds into the engine. Every field has a
//! default so a partial (or absent) file still yields a usable config.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::capture::DisplayInfo;
use crate::engine::TitleFilter;
use crate::macros::DEFAULT_FILENAME_MACRO;
use crate::store::BootstrapEnv;
use crate::utils;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Screen store location. `None` until the first save resolves it.
    pub screens_file: Option<PathBuf>,
    /// Region store location. `None` until the first save resolves it.
    pub regions_file: Option<PathBuf>,
    pub screenshots_folder: PathBuf,
    pub filename_macro: String,
    pub title_filter_enabled: bool,
    pub title_filter_text: String,
    /// Applied to every capture when set.
    pub screenshot_label: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            screens_file: None,
            regions_file: None,
            screenshots_folder: default_config_dir().join("screenshots"),
            filename_macro: DEFAULT_FILENAME_MACRO.to_string(),
            title_filter_enabled: false,
            title_filter_text: String::new(),
            screenshot_label: None,
        }
    }
}

/// Directory for config and store files when nothing is configured.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autoshot")
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// Load, or fall back to defaults when the file is missing or broken.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "using default config");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(self).context("failed to encode config")?;
        fs::write(path, data)
            .with_context(|| format!("failed to write config at {}", path.display()))
    }

    pub fn title_filter(&self) -> TitleFilter {
        TitleFilter {
            enabled: self.title_filter_enabled,
            text: self.title_filter_text.clone(),
        }
    }

    /// Bootstrap inputs for the target stores, from this config plus the
    /// detected displays.
    pub fn bootstrap_env(&self, displays: Vec<DisplayInfo>) -> BootstrapEnv {
        BootstrapEnv {
            displays,
            screenshots_folder: utils::correct_folder_path(
                &self.screenshots_folder.to_string_lossy(),
            ),
            filename_macro: self.filename_macro.clone(),
        }
    }
}
