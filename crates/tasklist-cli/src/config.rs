use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tasklist_core::tasks::SortMode;
use tracing::warn;

/// User-level configuration loaded from `~/.config/tasklist/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the task file location.
    pub data_file: Option<PathBuf>,
    /// Initial sort order for `list` and the TUI.
    pub default_sort: Option<SortMode>,
}

impl Config {
    pub fn sort_mode(&self) -> SortMode {
        self.default_sort.unwrap_or_default()
    }
}

/// Load config from the default path. A file that cannot be read or parsed
/// is reported and replaced by defaults, so the task file stays reachable.
pub fn load() -> Config {
    match default_path() {
        Ok(path) => load_or_default(&path),
        Err(err) => {
            warn!("{err}, using default config");
            Config::default()
        }
    }
}

fn load_or_default(path: &Path) -> Config {
    load_from_path(path).unwrap_or_else(|err| {
        warn!(path = %path.display(), "ignoring unusable config: {err}");
        Config::default()
    })
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("tasklist").join("config.toml"))
}

/// Write the given config to the default path unless a file is already there.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    write_to_path_if_missing(config, &default_path()?)
}

fn write_to_path_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
