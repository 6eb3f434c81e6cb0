//! Whole-document persistence for the config and lock files.
//!
//! No internal caching: the filesystem is the single source of truth, so a
//! concurrent external edit is visible on the next read.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::CoreError;
use crate::hashing;
use crate::lock::LockFile;
use crate::{CONFIG_FILE, LOCK_FILE};

#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// `None` means no config exists yet (first run / onboarding), distinct
    /// from an empty one.
    pub fn read_config(&self) -> Result<Option<Config>, CoreError> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let config: Config = serde_json::from_str(&text)?;
        Ok(Some(config))
    }

    /// Persist the config and stamp its canonical hash into the lock,
    /// creating an empty lock on first write.
    pub fn write_config(&self, config: &Config) -> Result<(), CoreError> {
        let config = config.clone().normalized();
        config.validate()?;

        let pretty = serde_json::to_string_pretty(&config)?;
        fs::write(self.config_path(), pretty)?;

        let hash = hashing::config_hash(&config)?;
        let mut lock = self.read_lock()?.unwrap_or_default();
        lock.config_hash = hash;
        self.write_lock(&lock)?;

        debug!(path = %self.config_path().display(), "wrote config");
        Ok(())
    }

    pub fn read_lock(&self) -> Result<Option<LockFile>, CoreError> {
        let path = self.lock_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let lock: LockFile = serde_json::from_str(&text)?;
        Ok(Some(lock))
    }

    pub fn write_lock(&self, lock: &LockFile) -> Result<(), CoreError> {
        let pretty = serde_json::to_string_pretty(lock)?;
        fs::write(self.lock_path(), pretty)?;
        debug!(path = %self.lock_path().display(), "wrote lock");
        Ok(())
    }
}
