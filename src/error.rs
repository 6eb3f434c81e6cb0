//! Core error taxonomy.
//!
//! `NotFound`-family errors mean a prerequisite is absent and the caller can
//! supply it; `FileMissing` means an expected on-disk artifact vanished.

use std::path::PathBuf;
use thiserror::Error;

use crate::adapter::AdapterError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("config file not found")]
    ConfigNotFound,

    #[error("lock file not found")]
    LockNotFound,

    #[error("icon {0} not found in lock file")]
    IconNotFound(String),

    #[error("no target adapter registered for {0}")]
    AdapterNotFound(String),

    #[error("file {} is missing", .0.display())]
    FileMissing(PathBuf),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("malformed svg: {0}")]
    Svg(String),

    #[error("target adapter failed: {0}")]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// True for the `NotFound` family (config, lock, icon, adapter).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::ConfigNotFound
                | CoreError::LockNotFound
                | CoreError::IconNotFound(_)
                | CoreError::AdapterNotFound(_)
        )
    }
}
