//! Change diff engine - computes the minimal ordered action list that moves
//! the catalog from one configuration to another.
//!
//! Evaluation order is deterministic: once per icon key in the lock, in
//! lexicographic key order (the lock's BTreeMap order), storage migration
//! before target changes, with a single trailing `RegenerateAll` when the
//! optimizer rules drifted.

use std::collections::BTreeMap;

use crate::actions::Change;
use crate::config::Config;
use crate::hashing;
use crate::lock::LockFile;

/// Compute the ordered changes needed to move from `old` to `new` given the
/// current lock. `old == None` means first run: the caller writes the config
/// directly and no reconciliation actions are needed.
pub fn compute_changes(old: Option<&Config>, new: &Config, lock: &LockFile) -> Vec<Change> {
    let Some(old) = old else { return Vec::new() };

    let mut changes = Vec::new();

    let storage_changed = old.svg_storage != new.svg_storage;

    let old_targets: BTreeMap<&str, &str> = old
        .extra_targets
        .iter()
        .map(|t| (t.target_id.as_str(), t.output_path.as_str()))
        .collect();
    let new_targets: BTreeMap<&str, &str> = new
        .extra_targets
        .iter()
        .map(|t| (t.target_id.as_str(), t.output_path.as_str()))
        .collect();

    let added: Vec<(&str, &str)> = new_targets
        .iter()
        .filter(|(id, _)| !old_targets.contains_key(**id))
        .map(|(id, path)| (*id, *path))
        .collect();
    let removed: Vec<(&str, &str)> = old_targets
        .iter()
        .filter(|(id, _)| !new_targets.contains_key(**id))
        .map(|(id, path)| (*id, *path))
        .collect();
    let changed: Vec<(&str, &str, &str)> = old_targets
        .iter()
        .filter_map(|(id, old_path)| {
            let new_path = new_targets.get(id)?;
            (new_path != old_path).then_some((*id, *old_path, *new_path))
        })
        .collect();

    for (icon_key, icon) in &lock.icons {
        if storage_changed {
            if icon.svg.is_file_backed() && new.svg_storage.in_lock {
                if let Some(file_path) = icon.svg.file_path() {
                    changes.push(Change::MigrateSvgToLock {
                        file_path: file_path.to_string(),
                        icon_key: icon_key.clone(),
                    });
                }
            } else if !icon.svg.is_file_backed() && !new.svg_storage.in_lock {
                // Without a folder this transition cannot be expressed; the
                // caller must supply one before attempting it.
                if let Some(folder) = new.svg_storage.folder.as_deref() {
                    changes.push(Change::MigrateSvgToFile {
                        file_path: format!("{}/{}.svg", folder.trim_end_matches('/'), icon_key),
                        icon_key: icon_key.clone(),
                    });
                }
            }
        }

        for (target_id, template) in &added {
            changes.push(Change::AddExtraTarget {
                icon_key: icon_key.clone(),
                target_id: target_id.to_string(),
                file_path: template.replace("{name}", icon_key),
            });
        }

        for (target_id, template) in &removed {
            changes.push(Change::RemoveExtraTarget {
                icon_key: icon_key.clone(),
                target_id: target_id.to_string(),
                file_path: template.replace("{name}", icon_key),
            });
        }

        // Removal must use the old path before it is overwritten, so each
        // changed target emits remove-then-add back to back.
        for (target_id, old_template, new_template) in &changed {
            changes.push(Change::RemoveExtraTarget {
                icon_key: icon_key.clone(),
                target_id: target_id.to_string(),
                file_path: old_template.replace("{name}", icon_key),
            });
            changes.push(Change::AddExtraTarget {
                icon_key: icon_key.clone(),
                target_id: target_id.to_string(),
                file_path: new_template.replace("{name}", icon_key),
            });
        }
    }

    if optimizer_drifted(old, new) {
        changes.push(Change::RegenerateAll);
    }

    changes
}

fn optimizer_drifted(old: &Config, new: &Config) -> bool {
    let old_canonical = hashing::canonical_json(&old.optimizer).unwrap_or_default();
    let new_canonical = hashing::canonical_json(&new.optimizer).unwrap_or_default();
    old_canonical != new_canonical
}
