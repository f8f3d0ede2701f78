use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings read from `config.toml` in the platform config directory.
///
/// Every section and key is optional; a missing file means all defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub database: DatabaseConfig,
    pub log: LogConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

pub struct Config {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub log_level: String,
    pub server: ServerConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "bite").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let file = FileConfig::load_from(&proj_dirs.config_dir().join("config.toml"))?;
        Ok(Self::resolve(file, &data_dir))
    }

    fn resolve(file: FileConfig, data_dir: &Path) -> Self {
        let db_path = file
            .database
            .path
            .unwrap_or_else(|| data_dir.join("bite.db"));
        Config {
            db_path,
            busy_timeout: Duration::from_millis(file.database.busy_timeout_ms),
            log_level: file.log.level,
            server: file.server,
        }
    }
}

impl FileConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}
