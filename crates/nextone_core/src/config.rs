//! Runtime path and level resolution.
//!
//! # Responsibility
//! - Resolve where the task store, scratch file and logs live.
//! - Apply precedence: explicit override, then environment, then the platform
//!   data directory.
//!
//! # Invariants
//! - Every resolved path is absolute.
//! - Scratch file and log directory always sit next to the database file.

use crate::logging::default_log_level;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store name; also the application directory name.
pub const STORE_NAME: &str = "nextone";
pub const DB_FILE_NAME: &str = "nextone.db";
pub const SCRATCH_FILE_NAME: &str = "scratch.json";
pub const LOG_DIR_NAME: &str = "logs";

pub const DB_PATH_ENV: &str = "NEXTONE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "NEXTONE_LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a data directory for `nextone`")]
    NoDataDir,
    #[error("invalid database path `{path}`: {source}")]
    InvalidPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub scratch_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    /// Resolves settings from overrides and the process environment.
    pub fn resolve(
        db_override: Option<PathBuf>,
        level_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::resolve_with(db_override, level_override, |key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::resolve`] with an injectable environment lookup.
    pub fn resolve_with(
        db_override: Option<PathBuf>,
        level_override: Option<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let db_path = match db_override.or_else(|| non_empty(env(DB_PATH_ENV)).map(PathBuf::from)) {
            Some(path) => absolute(&path)?,
            None => default_data_dir()?.join(DB_FILE_NAME),
        };

        let log_level = level_override
            .or_else(|| non_empty(env(LOG_LEVEL_ENV)))
            .unwrap_or_else(|| default_log_level().to_string());

        Ok(Self::from_db_path(db_path, log_level))
    }

    /// Derives sibling paths from an absolute database path.
    pub fn from_db_path(db_path: PathBuf, log_level: String) -> Self {
        let base = db_path
            .parent()
            .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);
        Self {
            scratch_path: base.join(SCRATCH_FILE_NAME),
            log_dir: base.join(LOG_DIR_NAME),
            db_path,
            log_level,
        }
    }
}

fn default_data_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("", "", STORE_NAME)
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or(ConfigError::NoDataDir)
}

fn absolute(path: &Path) -> Result<PathBuf, ConfigError> {
    std::path::absolute(path).map_err(|source| ConfigError::InvalidPath {
        path: path.to_path_buf(),
        source,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, DB_PATH_ENV, LOG_LEVEL_ENV};
    use std::path::PathBuf;

    fn env_of(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn override_wins_over_environment() {
        let config = AppConfig::resolve_with(
            Some(PathBuf::from("/tmp/flag/tasks.db")),
            Some("warn".to_string()),
            env_of(&[(DB_PATH_ENV, "/tmp/env/tasks.db"), (LOG_LEVEL_ENV, "trace")]),
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/flag/tasks.db"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn environment_used_when_no_override() {
        let config = AppConfig::resolve_with(
            None,
            None,
            env_of(&[(DB_PATH_ENV, "/tmp/env/tasks.db"), (LOG_LEVEL_ENV, "trace")]),
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/env/tasks.db"));
        assert_eq!(config.scratch_path, PathBuf::from("/tmp/env/scratch.json"));
        assert_eq!(config.log_dir, PathBuf::from("/tmp/env/logs"));
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn relative_override_becomes_absolute() {
        let config =
            AppConfig::resolve_with(Some(PathBuf::from("tasks.db")), None, env_of(&[])).unwrap();
        assert!(config.db_path.is_absolute());
        assert!(config.log_dir.is_absolute());
    }

    #[test]
    fn blank_environment_values_are_ignored() {
        let config = AppConfig::resolve_with(
            Some(PathBuf::from("/tmp/x.db")),
            None,
            env_of(&[(LOG_LEVEL_ENV, "  ")]),
        )
        .unwrap();
        assert!(!config.log_level.trim().is_empty());
    }
}
