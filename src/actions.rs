//! Reconciliation actions and the in-memory record table.
//!
//! A `Change` is a single reconciliation instruction; each variant carries
//! only the fields its handler needs. An `ActionRecord` wraps a submitted
//! change with its queue status, consumed by an external polling surface.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Change {
    #[serde(rename = "MIGRATE_SVG_TO_LOCK", rename_all = "camelCase")]
    MigrateSvgToLock { file_path: String, icon_key: String },

    #[serde(rename = "MIGRATE_SVG_TO_FILE", rename_all = "camelCase")]
    MigrateSvgToFile { file_path: String, icon_key: String },

    #[serde(rename = "ADD_EXTRA_TARGET", rename_all = "camelCase")]
    AddExtraTarget { icon_key: String, target_id: String, file_path: String },

    #[serde(rename = "REMOVE_EXTRA_TARGET", rename_all = "camelCase")]
    RemoveExtraTarget { icon_key: String, target_id: String, file_path: String },

    #[serde(rename = "CREATE_ICON", rename_all = "camelCase")]
    CreateIcon {
        name: String,
        tags: Vec<String>,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color_map: Option<BTreeMap<String, String>>,
    },

    #[serde(rename = "REMOVE_ICON", rename_all = "camelCase")]
    RemoveIcon { icon_key: String },

    #[serde(rename = "REGENERATE_ICON", rename_all = "camelCase")]
    RegenerateIcon { icon_key: String },

    #[serde(rename = "REGENERATE_ALL")]
    RegenerateAll,
}

impl Change {
    /// Short label for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Change::MigrateSvgToLock { .. } => "MIGRATE_SVG_TO_LOCK",
            Change::MigrateSvgToFile { .. } => "MIGRATE_SVG_TO_FILE",
            Change::AddExtraTarget { .. } => "ADD_EXTRA_TARGET",
            Change::RemoveExtraTarget { .. } => "REMOVE_EXTRA_TARGET",
            Change::CreateIcon { .. } => "CREATE_ICON",
            Change::RemoveIcon { .. } => "REMOVE_ICON",
            Change::RegenerateIcon { .. } => "REGENERATE_ICON",
            Change::RegenerateAll => "REGENERATE_ALL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionStatus::Completed | ActionStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: u64,
    #[serde(flatten)]
    pub change: Change,
    pub status: ActionStatus,
    pub percentage: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insertion-ordered store of submitted actions, safe for concurrent
/// submit/get against the worker's status updates. Ids are 1-based and
/// monotonically increasing from an explicit counter, so they are never
/// reused within a process lifetime, even after deletion.
#[derive(Debug, Default)]
pub struct ActionTable {
    inner: Mutex<TableInner>,
}

#[derive(Debug, Default)]
struct TableInner {
    next_id: u64,
    rows: BTreeMap<u64, ActionRecord>,
}

impl ActionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `pending` record and return its id.
    pub fn insert(&self, change: Change) -> u64 {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.insert(
            id,
            ActionRecord {
                id,
                change,
                status: ActionStatus::Pending,
                percentage: 0,
                error: None,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn get(&self, id: u64) -> Option<ActionRecord> {
        self.inner.lock().rows.get(&id).cloned()
    }

    /// All records in submission order.
    pub fn list(&self) -> Vec<ActionRecord> {
        self.inner.lock().rows.values().cloned().collect()
    }

    pub fn remove(&self, id: u64) -> bool {
        self.inner.lock().rows.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().rows.is_empty()
    }

    pub(crate) fn mark_processing(&self, id: u64) {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.rows.get_mut(&id) {
            row.status = ActionStatus::Processing;
        }
    }

    pub(crate) fn set_percentage(&self, id: u64, percentage: u8) {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.rows.get_mut(&id) {
            row.percentage = percentage.min(100);
        }
    }

    pub(crate) fn complete(&self, id: u64) {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.rows.get_mut(&id) {
            row.status = ActionStatus::Completed;
            row.percentage = 100;
        }
    }

    pub(crate) fn fail(&self, id: u64, message: String) {
        let mut inner = self.inner.lock();
        if let Some(row) = inner.rows.get_mut(&id) {
            row.status = ActionStatus::Failed;
            row.error = Some(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_one_based_and_never_reused() {
        let table = ActionTable::new();
        let a = table.insert(Change::RegenerateAll);
        let b = table.insert(Change::RemoveIcon { icon_key: "home".to_string() });
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        assert!(table.remove(a));
        let c = table.insert(Change::RegenerateAll);
        assert_eq!(c, 3);
    }

    #[test]
    fn records_list_in_submission_order() {
        let table = ActionTable::new();
        for key in ["a", "b", "c"] {
            table.insert(Change::RemoveIcon { icon_key: key.to_string() });
        }
        let kinds: Vec<u64> = table.list().iter().map(|r| r.id).collect();
        assert_eq!(kinds, vec![1, 2, 3]);
    }

    #[test]
    fn status_transitions() {
        let table = ActionTable::new();
        let id = table.insert(Change::RegenerateAll);
        assert_eq!(table.get(id).unwrap().status, ActionStatus::Pending);

        table.mark_processing(id);
        table.set_percentage(id, 50);
        let row = table.get(id).unwrap();
        assert_eq!(row.status, ActionStatus::Processing);
        assert_eq!(row.percentage, 50);

        table.complete(id);
        let row = table.get(id).unwrap();
        assert_eq!(row.status, ActionStatus::Completed);
        assert_eq!(row.percentage, 100);
        assert!(row.status.is_terminal());
    }

    #[test]
    fn wire_format_matches_tagged_shape() {
        let change = Change::AddExtraTarget {
            icon_key: "home".to_string(),
            target_id: "svg".to_string(),
            file_path: "./out/home.svg".to_string(),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["type"], "ADD_EXTRA_TARGET");
        assert_eq!(json["iconKey"], "home");
        assert_eq!(json["targetId"], "svg");
        assert_eq!(json["filePath"], "./out/home.svg");
    }
}
