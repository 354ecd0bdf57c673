use std::path::{Path, PathBuf};

use dotenvy::dotenv;
use serde::Deserialize;

use crate::error::{CrmError, Result};

const ENV_PREFIX: &str = "CRM_";

/// Configuration for the application
///
/// Read once at startup from `CRM_*` environment variables (after loading a
/// `.env` file if one exists) and never revisited during a session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    /// Path of the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Directory generated reports are written to
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Log filter directive, e.g. `info` or `client_reports=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// File the log output is appended to
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/clients.db")
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from("data/client_reports.log")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            reports_dir: default_reports_dir(),
            log_level: default_log_level(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        envy::prefixed(ENV_PREFIX)
            .from_env::<Config>()
            .map_err(|e| CrmError::Config(e.to_string()))
    }

    /// Build a configuration from explicit key/value pairs using the same
    /// names as the environment (`CRM_DATABASE_PATH`, ...)
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX)
            .from_iter::<_, Config>(pairs)
            .map_err(|e| CrmError::Config(e.to_string()))
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Apply command-line overrides on top of the environment values
    pub fn with_overrides(
        mut self,
        database: Option<PathBuf>,
        reports_dir: Option<PathBuf>,
        log_level: Option<String>,
    ) -> Self {
        if let Some(database) = database {
            self.database_path = database;
        }
        if let Some(reports_dir) = reports_dir {
            self.reports_dir = reports_dir;
        }
        if let Some(log_level) = log_level {
            self.log_level = log_level;
        }
        self
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    // A missing .env file is fine
    dotenv().ok();

    Config::load()
}
