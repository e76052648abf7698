//! Optional TOML configuration for the command line tool

use crate::db::DEFAULT_DB_PATH;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct BehaviorConfig {
    /// Path to the SQLite database file
    pub database: Option<String>,
    /// tracing filter directive, e.g. "info" or "behavior_pipeline=debug"
    pub log_level: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("behavior.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<BehaviorConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: BehaviorConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

/// Command line flag wins over the config file, which wins over the default
pub fn resolve_database_path(cli: Option<&Path>, config: Option<&BehaviorConfig>) -> PathBuf {
    if let Some(path) = cli {
        return path.to_path_buf();
    }
    config
        .and_then(|c| c.database.as_deref())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH))
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
