// ⚙️ Configuration - where the database lives and who writes to it

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Env var pointing at a TOML config file
pub const CONFIG_ENV: &str = "UNIT_SYNC_CONFIG";

/// Env var overriding `database.path`
pub const DATABASE_ENV: &str = "UNIT_SYNC_DB";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Written to created_by / modified_by
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            actor: default_actor(),
        }
    }
}

fn default_database_path() -> PathBuf {
    PathBuf::from("db.sqlite")
}

fn default_actor() -> String {
    "unit-sync".to_string()
}

impl Config {
    /// Resolve config: explicit file, else `UNIT_SYNC_CONFIG`, else defaults.
    /// `UNIT_SYNC_DB` overrides the database path last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };

        if let Some(db_path) = env::var_os(DATABASE_ENV) {
            config.database.path = PathBuf::from(db_path);
        }

        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
