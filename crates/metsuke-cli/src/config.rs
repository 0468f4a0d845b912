//! Configuration file management for metsuke.
//!
//! Provides a TOML-based config file at `~/.config/metsuke/config.toml` and a
//! resolution chain for the plan path: CLI flag > env var > config file >
//! default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use metsuke_core::LogBuffer;
use metsuke_core::plan::DEFAULT_PLAN_FILE;

/// Environment variable naming the plan file.
pub const PLAN_ENV: &str = "METSUKE_PLAN";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub plan: PlanSection,
    #[serde(default)]
    pub ui: UiSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlanSection {
    /// Plan file to show. Relative paths resolve against the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSection {
    /// How often the dashboard redraws when no key is pressed.
    pub tick_rate_ms: u64,
    /// Capacity of the in-memory log panel.
    pub log_lines: usize,
    /// Whether the log panel is visible at startup.
    pub show_log: bool,
}

impl UiSection {
    pub const DEFAULT_TICK_RATE_MS: u64 = 250;
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            tick_rate_ms: Self::DEFAULT_TICK_RATE_MS,
            log_lines: LogBuffer::DEFAULT_CAPACITY,
            show_log: true,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the metsuke config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/metsuke` or `~/.config/metsuke`,
/// on macOS too.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("metsuke");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("metsuke")
}

/// Return the path to the metsuke config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_config(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Like [`load_config`], but a missing file is `Ok(None)`.
pub fn load_config_if_present() -> Result<Option<ConfigFile>> {
    if !config_path().exists() {
        return Ok(None);
    }
    load_config().map(Some)
}

pub fn parse_config(contents: &str) -> Result<ConfigFile> {
    toml::from_str(contents).context("invalid TOML")
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct MetsukeConfig {
    pub plan_path: PathBuf,
    pub tick_rate: Duration,
    pub log_lines: usize,
    pub show_log: bool,
}

impl MetsukeConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Plan path: `cli_plan` > `METSUKE_PLAN` env > `plan.path` > `PROJECT_PLAN.yaml`
    /// - UI settings: config file > built-in defaults
    ///
    /// A config file that exists but cannot be parsed is an error.
    pub fn resolve(cli_plan: Option<&Path>) -> Result<Self> {
        let file_config = load_config_if_present()?.unwrap_or_default();
        Ok(Self::from_parts(cli_plan, std::env::var_os(PLAN_ENV), file_config))
    }

    fn from_parts(
        cli_plan: Option<&Path>,
        env_plan: Option<std::ffi::OsString>,
        file_config: ConfigFile,
    ) -> Self {
        let plan_path = if let Some(path) = cli_plan {
            path.to_path_buf()
        } else if let Some(path) = env_plan.filter(|p| !p.is_empty()) {
            PathBuf::from(path)
        } else if let Some(path) = file_config.plan.path {
            path
        } else {
            PathBuf::from(DEFAULT_PLAN_FILE)
        };

        let ui = file_config.ui;
        Self {
            plan_path,
            tick_rate: Duration::from_millis(ui.tick_rate_ms.max(1)),
            log_lines: ui.log_lines.max(1),
            show_log: ui.show_log,
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
