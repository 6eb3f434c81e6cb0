//! Target adapter capability - implemented outside the core.
//!
//! An adapter knows how to emit/remove one platform-specific artifact for an
//! icon (a UI-framework component, a raw asset copy, ...). The executor
//! resolves adapters by target id and treats their failures as the enclosing
//! action's failure.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::lock::Icon;

/// Opaque failure from a target adapter.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct AdapterError(pub String);

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub trait TargetAdapter: Send + Sync {
    /// Emit the artifact for `icon` at `file_path` (absolute, already
    /// resolved against the project root).
    fn add_icon(&self, icon: &Icon, icon_key: &str, file_path: &Path) -> Result<(), AdapterError>;

    /// Remove the artifact previously emitted at `file_path`.
    fn remove_icon(&self, icon: &Icon, icon_key: &str, file_path: &Path)
        -> Result<(), AdapterError>;
}

/// Adapters resolved by target id.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn TargetAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    pub fn register(&mut self, target_id: impl Into<String>, adapter: Arc<dyn TargetAdapter>) {
        self.adapters.insert(target_id.into(), adapter);
    }

    pub fn get(&self, target_id: &str) -> Option<Arc<dyn TargetAdapter>> {
        self.adapters.get(target_id).cloned()
    }

    pub fn contains(&self, target_id: &str) -> bool {
        self.adapters.contains_key(target_id)
    }
}
