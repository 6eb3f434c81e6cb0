//! Action handlers - the mutations behind every queued change.
//!
//! Each handler reads the current config/lock fresh from disk (no
//! cross-action caching), mutates the catalog and the filesystem, and
//! returns the follow-up changes the queue should enqueue on its behalf.
//! Handlers never touch the queue directly.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::actions::{ActionTable, Change};
use crate::adapter::AdapterRegistry;
use crate::error::CoreError;
use crate::hashing;
use crate::lock::{BuiltFrom, Icon, Target};
use crate::naming;
use crate::store::ProjectStore;
use crate::svg::SvgPipeline;

/// Progress reporting for the one action currently in flight.
pub(crate) struct ActionContext<'a> {
    table: &'a ActionTable,
    id: u64,
}

impl<'a> ActionContext<'a> {
    pub(crate) fn new(table: &'a ActionTable, id: u64) -> Self {
        Self { table, id }
    }

    fn mark_processing(&self) {
        self.table.mark_processing(self.id);
    }

    fn set_percentage(&self, percentage: u8) {
        self.table.set_percentage(self.id, percentage);
    }
}

pub struct Executor {
    store: ProjectStore,
    pipeline: SvgPipeline,
    adapters: AdapterRegistry,
}

impl Executor {
    pub fn new(root: impl Into<PathBuf>, adapters: AdapterRegistry) -> Self {
        let root = root.into();
        Self {
            store: ProjectStore::new(&root),
            pipeline: SvgPipeline::new(root),
            adapters,
        }
    }

    pub fn with_pipeline(
        root: impl Into<PathBuf>,
        pipeline: SvgPipeline,
        adapters: AdapterRegistry,
    ) -> Self {
        Self { store: ProjectStore::new(root.into()), pipeline, adapters }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    pub fn pipeline(&self) -> &SvgPipeline {
        &self.pipeline
    }

    /// Run one change to completion and return its follow-up changes.
    pub(crate) fn run(
        &self,
        change: &Change,
        ctx: &ActionContext<'_>,
    ) -> Result<Vec<Change>, CoreError> {
        match change {
            Change::CreateIcon { name, tags, content, color_map } => {
                self.create_icon(name, tags, content, color_map.as_ref())
            }
            Change::AddExtraTarget { icon_key, target_id, file_path } => {
                self.add_extra_target(icon_key, target_id, file_path)
            }
            Change::RemoveExtraTarget { icon_key, target_id, file_path } => {
                self.remove_extra_target(icon_key, target_id, file_path)
            }
            Change::MigrateSvgToLock { file_path, icon_key } => {
                self.migrate_svg_to_lock(file_path, icon_key)
            }
            Change::MigrateSvgToFile { file_path, icon_key } => {
                self.migrate_svg_to_file(file_path, icon_key)
            }
            Change::RemoveIcon { icon_key } => self.remove_icon(icon_key),
            Change::RegenerateIcon { icon_key } => self.regenerate_icon(icon_key),
            Change::RegenerateAll => self.regenerate_all(ctx),
        }
    }

    fn create_icon(
        &self,
        name: &str,
        tags: &[String],
        content: &str,
        color_map: Option<&BTreeMap<String, String>>,
    ) -> Result<Vec<Change>, CoreError> {
        if name.trim().is_empty() {
            return Err(CoreError::Validation("icon name must not be empty".to_string()));
        }
        if content.trim().is_empty() {
            return Err(CoreError::Validation("icon content must not be empty".to_string()));
        }

        let icon_key = naming::icon_key(name);
        let config = self.store.read_config()?.ok_or(CoreError::ConfigNotFound)?;

        let canonical = self.pipeline.optimize(content, &config.optimizer, color_map)?;
        let stored = self.pipeline.store(&config, &icon_key, &canonical)?;

        let mut lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;

        let color_variable_keys: Vec<String> =
            color_map.map(|m| m.values().cloned().collect()).unwrap_or_default();

        let icon = lock.icons.entry(icon_key.clone()).or_insert_with(|| Icon {
            name: icon_key.clone(),
            tags: vec![],
            svg: Default::default(),
            targets: Default::default(),
            color_variable_keys: vec![],
        });
        icon.name = icon_key.clone();
        icon.tags = tags.to_vec();
        icon.svg.content = stored.content;
        icon.svg.hash = stored.hash;
        icon.targets.clear();
        icon.color_variable_keys = color_variable_keys;

        self.store.write_lock(&lock)?;
        info!(icon = %icon_key, "created icon");

        // One user action fans out into an add per configured target.
        Ok(config
            .extra_targets
            .iter()
            .map(|target| Change::AddExtraTarget {
                icon_key: icon_key.clone(),
                target_id: target.target_id.clone(),
                file_path: target.resolved_path(&icon_key),
            })
            .collect())
    }

    fn add_extra_target(
        &self,
        icon_key: &str,
        target_id: &str,
        file_path: &str,
    ) -> Result<Vec<Change>, CoreError> {
        let mut lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;
        let icon = lock
            .icons
            .get(icon_key)
            .cloned()
            .ok_or_else(|| CoreError::IconNotFound(icon_key.to_string()))?;
        let adapter = self
            .adapters
            .get(target_id)
            .ok_or_else(|| CoreError::AdapterNotFound(target_id.to_string()))?;

        adapter.add_icon(&icon, icon_key, &self.store.root().join(file_path))?;

        let config_hash = lock.config_hash.clone();
        if let Some(entry) = lock.icons.get_mut(icon_key) {
            entry.targets.insert(
                target_id.to_string(),
                Target {
                    path: file_path.to_string(),
                    built_from: BuiltFrom { svg_hash: entry.svg.hash.clone(), config_hash },
                },
            );
        }
        self.store.write_lock(&lock)?;

        info!(icon = %icon_key, target = %target_id, "added target");
        Ok(vec![])
    }

    fn remove_extra_target(
        &self,
        icon_key: &str,
        target_id: &str,
        file_path: &str,
    ) -> Result<Vec<Change>, CoreError> {
        let mut lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;
        let icon = lock
            .icons
            .get(icon_key)
            .cloned()
            .ok_or_else(|| CoreError::IconNotFound(icon_key.to_string()))?;
        let adapter = self
            .adapters
            .get(target_id)
            .ok_or_else(|| CoreError::AdapterNotFound(target_id.to_string()))?;

        adapter.remove_icon(&icon, icon_key, &self.store.root().join(file_path))?;

        if let Some(entry) = lock.icons.get_mut(icon_key) {
            entry.targets.remove(target_id);
        }
        self.store.write_lock(&lock)?;

        info!(icon = %icon_key, target = %target_id, "removed target");
        Ok(vec![])
    }

    fn migrate_svg_to_lock(
        &self,
        file_path: &str,
        icon_key: &str,
    ) -> Result<Vec<Change>, CoreError> {
        let mut lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;
        let icon = lock
            .icons
            .get(icon_key)
            .cloned()
            .ok_or_else(|| CoreError::IconNotFound(icon_key.to_string()))?;

        let full = self.store.root().join(file_path);
        if !full.exists() {
            return Err(CoreError::FileMissing(full));
        }

        let content = self.pipeline.read(&icon)?;
        if icon.svg.content != content {
            if let Some(entry) = lock.icons.get_mut(icon_key) {
                entry.svg.content = content.clone();
                entry.svg.hash = hashing::content_hash(&content);
            }
            self.store.write_lock(&lock)?;
        } else {
            debug!(icon = %icon_key, "svg already inline in lock");
        }

        fs::remove_file(&full)?;
        remove_dir_if_empty(full.parent());

        info!(icon = %icon_key, "migrated svg into lock");
        Ok(vec![])
    }

    fn migrate_svg_to_file(
        &self,
        file_path: &str,
        icon_key: &str,
    ) -> Result<Vec<Change>, CoreError> {
        let dest = self.store.root().join(file_path);
        if dest.exists() {
            // Second run observes the destination and becomes a no-op.
            info!(path = %dest.display(), "destination already exists, skipping");
            return Ok(vec![]);
        }

        let mut lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;
        let icon = lock
            .icons
            .get(icon_key)
            .cloned()
            .ok_or_else(|| CoreError::IconNotFound(icon_key.to_string()))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = self.pipeline.read(&icon)?;
        fs::write(&dest, &content)?;

        if let Some(entry) = lock.icons.get_mut(icon_key) {
            entry.svg.content = format!("{}{}", crate::lock::FILE_PREFIX, file_path);
            entry.svg.hash = hashing::content_hash(&content);
        }
        self.store.write_lock(&lock)?;

        info!(icon = %icon_key, "migrated svg to file");
        Ok(vec![])
    }

    fn remove_icon(&self, icon_key: &str) -> Result<Vec<Change>, CoreError> {
        let lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;
        let icon = lock
            .icons
            .get(icon_key)
            .cloned()
            .ok_or_else(|| CoreError::IconNotFound(icon_key.to_string()))?;

        // Targets go synchronously, so every artifact is gone before the
        // icon record disappears.
        for (target_id, target) in &icon.targets {
            self.remove_extra_target(icon_key, target_id, &target.path)?;
        }

        let mut lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;

        if let Some(relative) = icon.svg.file_path() {
            let full = self.store.root().join(relative);
            if full.exists() {
                fs::remove_file(&full)?;
                remove_dir_if_empty(full.parent());
            }
        }

        lock.icons.remove(icon_key);
        self.store.write_lock(&lock)?;

        info!(icon = %icon_key, "removed icon");
        Ok(vec![])
    }

    fn regenerate_icon(&self, icon_key: &str) -> Result<Vec<Change>, CoreError> {
        let lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;
        let icon = lock
            .icons
            .get(icon_key)
            .cloned()
            .ok_or_else(|| CoreError::IconNotFound(icon_key.to_string()))?;

        // Snapshot before removal; regeneration rebuilds targets from the
        // current config, dropping any out-of-band target edits.
        let content = self.pipeline.read(&icon)?;
        let name = icon.name.clone();
        let tags = icon.tags.clone();

        self.remove_icon(icon_key)?;
        let follow_ups = self.create_icon(&name, &tags, &content, None)?;

        info!(icon = %icon_key, "regenerated icon");
        Ok(follow_ups)
    }

    fn regenerate_all(&self, ctx: &ActionContext<'_>) -> Result<Vec<Change>, CoreError> {
        let lock = self.store.read_lock()?.ok_or(CoreError::LockNotFound)?;
        let icon_keys = lock.icon_keys();
        let total = icon_keys.len();

        if total == 0 {
            info!("no icons to regenerate");
            return Ok(vec![]);
        }

        ctx.mark_processing();
        ctx.set_percentage(0);

        let mut follow_ups = Vec::new();
        for (index, icon_key) in icon_keys.iter().enumerate() {
            match self.regenerate_icon(icon_key) {
                Ok(mut changes) => follow_ups.append(&mut changes),
                // One broken icon must not abort the batch.
                Err(e) => warn!(icon = %icon_key, error = %e, "failed to regenerate icon"),
            }

            let percentage = (((index + 1) as f64 / total as f64) * 100.0).round() as u8;
            ctx.set_percentage(percentage);
            debug!(icon = %icon_key, done = index + 1, total, "regenerate-all progress");
        }

        info!(total, "regenerated all icons");
        Ok(follow_ups)
    }
}

/// Best-effort cleanup: drop a directory once its last file is gone.
fn remove_dir_if_empty(dir: Option<&Path>) {
    let Some(dir) = dir else { return };
    let is_empty = fs::read_dir(dir).map(|mut entries| entries.next().is_none()).unwrap_or(false);
    if is_empty {
        if let Err(e) = fs::remove_dir(dir) {
            warn!(path = %dir.display(), error = %e, "could not remove empty folder");
        } else {
            debug!(path = %dir.display(), "removed empty folder");
        }
    }
}
