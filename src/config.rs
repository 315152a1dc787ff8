use crate::error::DatabaseError;
use crate::query::ResultStorage;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Environment variable overriding where the config file is read from
pub const CONFIG_ENV: &str = "SAGASU_CONFIG";

/// Default config file, relative to the working directory
pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database directory
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Maximum number of recipes cooked from a result
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Bypass locking the database when opening
    #[serde(default)]
    pub bypass_lock: bool,

    /// Size of the worker pool. Defaults to the number of CPUs.
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Tasks allowed to be queued or running at once
    #[serde(default = "default_max_pending_tasks")]
    pub max_pending_tasks: usize,

    /// Minimum time between two progress events
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Search results above this count are reported without group stats
    #[serde(default)]
    pub group_stat_limit: Option<usize>,

    /// Keep search and filter results in the database's temp directory or in memory
    #[serde(default)]
    pub result_storage: ResultStorage,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("database/")
}

const fn default_result_limit() -> usize {
    5000
}

const fn default_max_pending_tasks() -> usize {
    64
}

const fn default_progress_interval_ms() -> u64 {
    250
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            result_limit: default_result_limit(),
            bypass_lock: false,
            worker_threads: None,
            max_pending_tasks: default_max_pending_tasks(),
            progress_interval_ms: default_progress_interval_ms(),
            group_stat_limit: None,
            result_storage: ResultStorage::default(),
        }
    }
}

impl Config {
    /// Load the config from `$SAGASU_CONFIG` or `config.yaml`.
    ///
    /// Never fails: problems are logged and the defaults are used instead.
    pub fn load() -> Self {
        let path = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                info!("using override config path from env: {}", path);
                PathBuf::from(path)
            }
            Err(_) => PathBuf::from(CONFIG_FILE),
        };
        if !path.exists() {
            info!(
                "config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }
        match Self::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("failed to load config file: {}", e);
                Self::default()
            }
        }
    }

    /// Read a config file, failing on a missing or malformed file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        info!("loading config from {}", path.display());
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(BufReader::new(file))?)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
