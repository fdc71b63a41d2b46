//! Application configuration loaded from `config.toml` and the environment.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// Directory name used under the platform config/cache/data roots.
pub const APP_DIR: &str = "eve-skillplan";

/// Prefix for environment overrides, e.g. `SKILLPLAN_SDE_SOURCE`.
pub const ENV_PREFIX: &str = "SKILLPLAN";

const DEFAULT_CONFIG: &str = r#"# eve-skillplan configuration
#
# Location of the SDE snapshot document. Either an http(s) URL or a local
# path (optionally prefixed with file://).
# sde_source = "https://example.invalid/sde/snapshot.json"

# Refresh the snapshot on startup when it is older than this many hours.
sde_max_age_hours = 24
auto_update = true

# Reload the snapshot when another process replaces it on disk.
watch_snapshot = true

# Training rate used for time estimates.
skill_points_per_minute = 30.0
"#;

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the SDE snapshot and its manifest.
    pub cache_root: PathBuf,
    /// Directory holding the EULA flag and log files.
    pub data_dir: PathBuf,
    /// Where to fetch the SDE snapshot from.
    pub sde_source: Option<String>,
    /// Maximum snapshot age before a startup refresh is triggered.
    pub sde_max_age_hours: u64,
    /// Whether stale snapshots are refreshed automatically on startup.
    pub auto_update: bool,
    /// Whether long-running front ends watch the snapshot file for changes.
    pub watch_snapshot: bool,
    /// Training rate used by the time estimator.
    pub skill_points_per_minute: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_root: dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR),
            sde_source: None,
            sde_max_age_hours: 24,
            auto_update: true,
            watch_snapshot: true,
            skill_points_per_minute: 30.0,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load configuration from `path` (optional) plus environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("failed to parse configuration {}", path.display()))?;
        let rate = config.skill_points_per_minute;
        if rate.is_nan() || rate <= 0.0 {
            anyhow::bail!("skill_points_per_minute must be positive, got {rate}");
        }
        Ok(config)
    }

    /// Directory holding the snapshot document and manifest.
    pub fn sde_dir(&self) -> PathBuf {
        self.cache_root.join("sde")
    }
}

/// Default path of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

/// Write the commented default configuration if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path();
    ensure_config_at(&path)?;
    Ok(path)
}

/// Write the commented default configuration to `path` if it is missing.
pub fn ensure_config_at(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_round_trips_through_loader() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested/config.toml");
        ensure_config_at(&path)?;
        assert!(path.exists());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.sde_max_age_hours, 24);
        assert!(config.auto_update);
        assert!(config.sde_source.is_none());
        assert_eq!(config.skill_points_per_minute, 30.0);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            format!(
                "sde_source = \"file:///tmp/sde.json\"\nauto_update = false\ncache_root = \"{}\"\n",
                dir.path().join("cache").display()
            ),
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.sde_source.as_deref(), Some("file:///tmp/sde.json"));
        assert!(!config.auto_update);
        assert_eq!(config.sde_dir(), dir.path().join("cache").join("sde"));
        Ok(())
    }

    #[test]
    fn single_underscore_environment_overrides_apply() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "watch_snapshot = true\n")?;

        std::env::set_var("SKILLPLAN_WATCH_SNAPSHOT", "false");
        let loaded = AppConfig::load_from(&path);
        std::env::remove_var("SKILLPLAN_WATCH_SNAPSHOT");

        assert!(!loaded?.watch_snapshot);
        Ok(())
    }

    #[test]
    fn rejects_non_positive_training_rate() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "skill_points_per_minute = 0.0\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        fs::write(&path, "skill_points_per_minute = nan\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }
}
