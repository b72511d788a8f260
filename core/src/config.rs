//! Layered configuration for the tracker.
//!
//! Precedence, lowest to highest:
//! 1. Hardcoded defaults
//! 2. `config.toml` in the data home
//! 3. `PACKTRACK_*` environment variables
//!
//! The resulting [`TrackerConfig`] is an explicit handle passed to
//! [`crate::Tracker::new`]; nothing in this crate reads a process-wide
//! mutable "current data path".

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, TrackerError};

pub const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_PREFIX: &str = "PACKTRACK";

/// Resolved tracker configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Root directory holding the record collections and customer working
    /// directories.
    pub data_home: PathBuf,
    /// Where backup artifacts are written. Defaults to `<data_home>/backups`.
    pub backup_dir: PathBuf,
    /// Subdirectory of a working directory holding scan drops.
    pub scans_subdir: String,
    /// Rewrite a record log once dead versions outnumber live records by
    /// this factor.
    pub compaction_factor: usize,
}

/// `config.toml` shape. Every field optional; defaults fill the gaps.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    backup_dir: Option<PathBuf>,
    scans_subdir: Option<String>,
    compaction_factor: Option<usize>,
}

impl TrackerConfig {
    pub fn with_defaults(data_home: impl Into<PathBuf>) -> Self {
        let data_home = data_home.into();
        let backup_dir = data_home.join("backups");
        Self {
            data_home,
            backup_dir,
            scans_subdir: "scans".to_string(),
            compaction_factor: 4,
        }
    }

    /// Load configuration for `data_home`, applying file and environment
    /// overrides on top of the defaults.
    pub fn load(data_home: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self::with_defaults(data_home);
        let config_path = config.data_home.join(CONFIG_FILE_NAME);
        config.apply_file(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&raw)
            .map_err(|e| TrackerError::InvalidState(format!("bad {CONFIG_FILE_NAME}: {e}")))?;
        if let Some(dir) = file.backup_dir {
            self.backup_dir = if dir.is_absolute() {
                dir
            } else {
                self.data_home.join(dir)
            };
        }
        if let Some(subdir) = file.scans_subdir {
            self.scans_subdir = subdir;
        }
        if let Some(factor) = file.compaction_factor {
            self.compaction_factor = factor.max(1);
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = env::var(format!("{ENV_PREFIX}_BACKUP_DIR")) {
            self.backup_dir = PathBuf::from(dir);
        }
        if let Ok(factor) = env::var(format!("{ENV_PREFIX}_COMPACTION_FACTOR"))
            && let Ok(parsed) = factor.parse::<usize>()
        {
            self.compaction_factor = parsed.max(1);
        }
    }

    /// Working directory assigned to a customer while not archived.
    pub fn working_dir_for(&self, customer_name: &str) -> PathBuf {
        self.data_home.join("customers").join(customer_name)
    }
}
