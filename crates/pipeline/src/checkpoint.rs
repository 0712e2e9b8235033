//! Checkpoint model and storage abstraction.
//!
//! The checkpoint maps each completed recipient to what was delivered. It is
//! written through after every successful item, so a crash loses at most the
//! item that was in flight, and it is read at startup so completed
//! recipients are never notified twice.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use blueprint_core::{RecipientKey, WorkItem};

use crate::error::CheckpointError;

/// What was delivered to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub buys: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub notified: bool,
    pub completed_at: DateTime<Utc>,
}

/// Completed work, keyed by recipient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint {
    entries: BTreeMap<RecipientKey, CheckpointEntry>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &RecipientKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &RecipientKey) -> Option<&CheckpointEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RecipientKey, &CheckpointEntry)> {
        self.entries.iter()
    }

    pub fn insert(&mut self, key: RecipientKey, entry: CheckpointEntry) {
        self.entries.insert(key, entry);
    }

    /// Record a succeeded item. Returns `false` (and records nothing) when the
    /// item has no result yet.
    pub fn record(&mut self, item: &WorkItem, completed_at: DateTime<Utc>) -> bool {
        let Some(result) = item.result() else {
            return false;
        };
        let params = item.params();
        self.entries.insert(
            item.key().clone(),
            CheckpointEntry {
                buys: result.buys.clone(),
                league_id: params.league_id.as_ref().map(ToString::to_string),
                user_id: params.user_id.as_ref().map(ToString::to_string),
                file_id: result.file_id.clone(),
                link: result.link.clone(),
                notified: result.notified,
                completed_at,
            },
        );
        true
    }

    /// Recipient key → buys.
    pub fn buys_by_key(&self) -> BTreeMap<RecipientKey, String> {
        self.entries
            .iter()
            .map(|(k, e)| (k.clone(), e.buys.clone()))
            .collect()
    }

    /// League id → buys, for entries that carry a league id.
    pub fn buys_by_league(&self) -> BTreeMap<String, String> {
        self.entries
            .values()
            .filter_map(|e| e.league_id.clone().map(|id| (id, e.buys.clone())))
            .collect()
    }

    /// User id → buys, for entries that carry a user id.
    pub fn buys_by_user(&self) -> BTreeMap<String, String> {
        self.entries
            .values()
            .filter_map(|e| e.user_id.clone().map(|id| (id, e.buys.clone())))
            .collect()
    }
}

/// Durable home of a run's checkpoint.
///
/// Concurrent runs must use distinct stores; merging them is left to the
/// operator.
pub trait CheckpointStore: Send + Sync {
    /// Load the current checkpoint; a store that was never written yields an
    /// empty checkpoint.
    fn load(&self) -> Result<Checkpoint, CheckpointError>;

    /// Replace the stored checkpoint.
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;
}

/// In-memory checkpoint store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    checkpoint: RwLock<Checkpoint>,
    saves: AtomicUsize,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            checkpoint: RwLock::new(checkpoint),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Checkpoint {
        self.checkpoint
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn load(&self) -> Result<Checkpoint, CheckpointError> {
        self.checkpoint
            .read()
            .map(|c| c.clone())
            .map_err(|_| CheckpointError::Storage("checkpoint lock poisoned".to_string()))
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let mut guard = self
            .checkpoint
            .write()
            .map_err(|_| CheckpointError::Storage("checkpoint lock poisoned".to_string()))?;
        *guard = checkpoint.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::{LeagueId, RecipientParams, RenderedResult, UserId};

    fn succeeded_item(key: &str) -> WorkItem {
        let mut item = WorkItem::new(
            RecipientKey::parse(key).unwrap(),
            RecipientParams {
                league_id: Some(LeagueId::parse("118").unwrap()),
                user_id: Some(UserId::parse("u-1").unwrap()),
                ..Default::default()
            },
        );
        item.mark_succeeded(RenderedResult {
            buys: "1,2,3".into(),
            file_id: "file-1".into(),
            link: Some("https://files/1".into()),
            notified: true,
        });
        item
    }

    #[test]
    fn record_requires_result() {
        let mut checkpoint = Checkpoint::new();
        let pending = WorkItem::new(RecipientKey::parse("p@x.io").unwrap(), RecipientParams::default());
        assert!(!checkpoint.record(&pending, Utc::now()));
        assert!(checkpoint.is_empty());

        assert!(checkpoint.record(&succeeded_item("a@x.io"), Utc::now()));
        let entry = checkpoint.get(&RecipientKey::parse("a@x.io").unwrap()).unwrap();
        assert_eq!(entry.buys, "1,2,3");
        assert_eq!(entry.league_id.as_deref(), Some("118"));
        assert!(entry.notified);
    }

    #[test]
    fn projections_by_identifier() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.record(&succeeded_item("a@x.io"), Utc::now());

        assert_eq!(checkpoint.buys_by_league().get("118").map(String::as_str), Some("1,2,3"));
        assert_eq!(checkpoint.buys_by_user().get("u-1").map(String::as_str), Some("1,2,3"));
        assert_eq!(checkpoint.buys_by_key().len(), 1);
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut checkpoint = Checkpoint::new();
        checkpoint.record(&succeeded_item("a@x.io"), Utc::now());

        let json = serde_json::to_value(&checkpoint).unwrap();
        assert!(json.get("a@x.io").is_some());
        let back: Checkpoint = serde_json::from_value(json).unwrap();
        assert_eq!(back, checkpoint);
    }

    #[test]
    fn in_memory_store_counts_saves() {
        let store = InMemoryCheckpointStore::new();
        assert!(store.load().unwrap().is_empty());

        let mut checkpoint = Checkpoint::new();
        checkpoint.record(&succeeded_item("a@x.io"), Utc::now());
        store.save(&checkpoint).unwrap();
        store.save(&checkpoint).unwrap();

        assert_eq!(store.save_count(), 2);
        assert_eq!(store.snapshot().len(), 1);
    }
}
