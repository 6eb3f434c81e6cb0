//! Lock file model - the persisted source of truth for the icon catalog
//! and per-target build provenance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Prefix marking `Icon.svg.content` as a relative-path reference rather
/// than inline markup.
pub const FILE_PREFIX: &str = "file://";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockFile {
    #[serde(default)]
    pub config_hash: String,
    /// Keyed by icon key; BTreeMap gives the lexicographic iteration order
    /// the diff engine documents.
    #[serde(default)]
    pub icons: BTreeMap<String, Icon>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Icon {
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub svg: SvgRecord,
    #[serde(default)]
    pub targets: BTreeMap<String, Target>,
    #[serde(default)]
    pub color_variable_keys: Vec<String>,
}

/// The storage-mode union: `content` is either inline canonical markup or a
/// `file://`-prefixed relative path, never both. Interpret it only through
/// [`SvgRecord::file_path`] so the prefix check stays in one place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SvgRecord {
    pub content: String,
    /// Digest of the canonical markup bytes, regardless of storage mode.
    pub hash: String,
}

impl SvgRecord {
    pub fn is_file_backed(&self) -> bool {
        self.content.starts_with(FILE_PREFIX)
    }

    /// The relative path behind a `file://` reference, or `None` when the
    /// markup is stored inline.
    pub fn file_path(&self) -> Option<&str> {
        self.content.strip_prefix(FILE_PREFIX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub path: String,
    pub built_from: BuiltFrom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltFrom {
    pub svg_hash: String,
    pub config_hash: String,
}

impl Target {
    /// A target is stale when its recorded provenance no longer matches the
    /// icon's current content hash or the lock's current config hash.
    pub fn is_stale(&self, icon: &Icon, lock: &LockFile) -> bool {
        self.built_from.svg_hash != icon.svg.hash
            || self.built_from.config_hash != lock.config_hash
    }
}

impl LockFile {
    /// Icon keys in lexicographic order. Snapshot for iterations that mutate
    /// the catalog while walking it.
    pub fn icon_keys(&self) -> Vec<String> {
        self.icons.keys().cloned().collect()
    }
}
