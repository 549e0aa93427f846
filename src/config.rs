use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/anidb-sync.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

/// Staleness and matching policy of the cache entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub anime_max_age_days: i64,

    pub episode_max_age_days: i64,

    pub file_max_age_days: i64,

    /// Minimum title score when matching a directory name.
    pub title_min_score: f32,

    /// Minimum title score when matching text scraped from a file name.
    /// Lower than `title_min_score` since file names are noisier.
    pub filename_title_min_score: f32,

    /// Longest episode range a single file name may expand to.
    pub max_episode_range: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            anime_max_age_days: 7,
            episode_max_age_days: 7,
            file_max_age_days: 7,
            title_min_score: 0.8,
            filename_title_min_score: 0.6,
            max_episode_range: 200,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn anime_max_age(&self) -> TimeDelta {
        TimeDelta::days(self.anime_max_age_days)
    }

    #[must_use]
    pub fn episode_max_age(&self) -> TimeDelta {
        TimeDelta::days(self.episode_max_age_days)
    }

    #[must_use]
    pub fn file_max_age(&self) -> TimeDelta {
        TimeDelta::days(self.file_max_age_days)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("anidb-sync").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".anidb-sync").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        let sync = &self.sync;
        if sync.anime_max_age_days < 0 || sync.episode_max_age_days < 0 || sync.file_max_age_days < 0
        {
            anyhow::bail!("Max age values must not be negative");
        }

        for (name, score) in [
            ("title_min_score", sync.title_min_score),
            ("filename_title_min_score", sync.filename_title_min_score),
        ] {
            if !(0.0..=1.0).contains(&score) {
                anyhow::bail!("{name} must be between 0.0 and 1.0, got {score}");
            }
        }

        Ok(())
    }
}
