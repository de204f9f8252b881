use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

fn default_context_lines() -> usize {
    2
}

fn default_max_recent() -> usize {
    20
}

fn default_with_context() -> bool {
    true
}

/// Persisted search settings. Read at job submission; `recent_queries`,
/// `match_case` and `with_context` are written back synchronously before
/// the background worker starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub recent_queries: Vec<String>,
    pub match_case: bool,
    #[serde(default = "default_with_context")]
    pub with_context: bool,
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    #[serde(default = "default_max_recent")]
    pub max_recent_queries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recent_queries: Vec::new(),
            match_case: false,
            with_context: default_with_context(),
            context_lines: default_context_lines(),
            max_recent_queries: default_max_recent(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::find_config_path() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config =
                toml::from_str(&content).with_context(|| "Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    fn find_config_path() -> Option<PathBuf> {
        if let Some(xdg_config) = dirs::config_dir() {
            let xdg_path = xdg_config.join("quarry/config.toml");
            if xdg_path.exists() {
                return Some(xdg_path);
            }
        }

        if let Some(home) = dirs::home_dir() {
            let home_path = home.join(".quarry.toml");
            if home_path.exists() {
                return Some(home_path);
            }
        }

        let current_path = Path::new(".quarry.toml");
        if current_path.exists() {
            return Some(current_path.to_path_buf());
        }

        None
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    pub fn default_save_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("quarry/config.toml"))
    }
}

/// Where updated settings go after a submit. The controller only knows this
/// trait; on-disk persistence lives in the host wiring.
pub trait ConfigStore: Send {
    fn write(&mut self, config: &Config) -> Result<()>;
}

/// Store that keeps settings in memory only. Used in tests and for one-shot
/// CLI runs that should not touch the user's config file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub config: Option<Config>,
}

impl ConfigStore for MemoryStore {
    fn write(&mut self, config: &Config) -> Result<()> {
        self.config = Some(config.clone());
        Ok(())
    }
}

/// Store backed by a toml file at a fixed path.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStore for FileStore {
    fn write(&mut self, config: &Config) -> Result<()> {
        config.save(&self.path)
    }
}
