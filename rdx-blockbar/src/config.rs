//! Defines the configuration structures for the Blockbar engine.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `BLOCKBAR_*` environment variables. The
//! `[blocks]` table is kept raw here; `assembly::read_sections` gives it
//! structure so a section of the wrong shape is reported, not ignored.

use crate::components::block::TimerSource;
use anyhow::Context;
use config::{Config, ConfigError, Environment, File, FileFormat, Map, Value};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Options that apply to the whole status line.
#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    /// Raises the default log level to `debug`.
    #[serde(default)]
    pub debug: bool,

    /// Seconds between global refreshes. Zero or negative disables the
    /// refresh timer, leaving only signals and update signals to publish.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval: f64,
}

/// The fully loaded settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub global: GlobalConfig,
    pub blocks: Map<String, Value>,
}

// --- Default value functions for serde ---

fn default_refresh_interval() -> f64 {
    1.0
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug: false,
            refresh_interval: default_refresh_interval(),
        }
    }
}

impl GlobalConfig {
    /// The global refresh timer, if one is configured.
    pub fn refresh_timer(&self) -> Option<TimerSource> {
        TimerSource::from_secs_f64(self.refresh_interval)
    }
}

impl Settings {
    /// Loads settings, reading `path` if one is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder()
            .set_default("global.debug", false)?
            .set_default("global.refresh_interval", default_refresh_interval())?;
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("BLOCKBAR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| match path {
                Some(path) => format!("failed to load configuration from {}", path.display()),
                None => "failed to load configuration".to_string(),
            })?;
        Self::from_config(&config)
    }

    /// Loads settings from TOML text.
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?;
        Self::from_config(&config)
    }

    fn from_config(config: &Config) -> anyhow::Result<Self> {
        let global = match config.get::<GlobalConfig>("global") {
            Ok(global) => global,
            Err(ConfigError::NotFound(_)) => GlobalConfig::default(),
            Err(e) => return Err(e).context("invalid [global] section"),
        };
        let blocks = match config.get_table("blocks") {
            Ok(blocks) => blocks,
            Err(ConfigError::NotFound(_)) => Map::new(),
            Err(e) => return Err(e).context("invalid [blocks] section"),
        };
        Ok(Self { global, blocks })
    }
}

/// `$XDG_CONFIG_HOME/blockbar/config.toml`, falling back to
/// `~/.config/blockbar/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("blockbar").join("config.toml"))
}
