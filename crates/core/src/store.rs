//! Ordered store of work items.
//!
//! Insertion order is the index space the partitioner and `start_index`
//! refer to, so loading the same input twice must yield the same order.
//! Rows without a usable identity key are dropped with a warning rather than
//! aborting the load.

use std::collections::BTreeMap;

use tracing::warn;

use crate::error::CoreError;
use crate::id::{LeagueId, RecipientKey, TeamId, UserId};
use crate::item::{RecipientParams, WorkItem, parse_disallowed_buys};
use crate::record::RawRow;

/// Column-oriented input: parallel lists indexed by position, as kept in the
/// sender config. `team_ids`/`user_ids`/`disallowed_buys` may be shorter than
/// `keys` (or empty); missing positions count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLists {
    pub keys: Vec<String>,
    pub league_ids: Vec<String>,
    pub team_ids: Vec<String>,
    pub user_ids: Vec<String>,
    pub disallowed_buys: Vec<String>,
}

impl ColumnLists {
    fn row(&self, i: usize) -> RawRow {
        let at = |list: &Vec<String>| list.get(i).cloned();
        RawRow {
            key: at(&self.keys),
            league_id: at(&self.league_ids),
            team_id: at(&self.team_ids),
            user_id: at(&self.user_ids),
            disallowed_buys: self
                .disallowed_buys
                .get(i)
                .map(|raw| parse_disallowed_buys(raw))
                .unwrap_or_default(),
        }
    }
}

/// Rows rejected while loading, by input position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    pub position: usize,
    pub error: CoreError,
}

#[derive(Debug, Clone, Default)]
pub struct WorkItemStore {
    items: Vec<WorkItem>,
    rejected: Vec<Rejected>,
}

impl WorkItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from row-oriented input.
    pub fn from_rows(rows: impl IntoIterator<Item = RawRow>) -> Self {
        let mut store = Self::new();
        for (position, row) in rows.into_iter().enumerate() {
            store.push_row(position, row);
        }
        store
    }

    /// Build a store from parallel lists; the key list drives the length.
    pub fn from_columns(columns: &ColumnLists) -> Self {
        if !columns.league_ids.is_empty() && columns.league_ids.len() != columns.keys.len() {
            warn!(
                keys = columns.keys.len(),
                league_ids = columns.league_ids.len(),
                "key and league id lists differ in length"
            );
        }
        Self::from_rows((0..columns.keys.len()).map(|i| columns.row(i)))
    }

    fn push_row(&mut self, position: usize, row: RawRow) {
        let key = match row.key.as_deref().map(RecipientKey::parse) {
            Some(Ok(key)) => key,
            Some(Err(error)) => {
                warn!(position, %error, "dropping row without a usable recipient key");
                self.rejected.push(Rejected { position, error });
                return;
            }
            None => {
                let error = CoreError::malformed("missing recipient key");
                warn!(position, %error, "dropping row without a recipient key");
                self.rejected.push(Rejected { position, error });
                return;
            }
        };

        let params = RecipientParams {
            league_id: LeagueId::parse_optional(row.league_id.as_deref()),
            team_id: TeamId::parse_optional(row.team_id.as_deref()),
            user_id: UserId::parse_optional(row.user_id.as_deref()),
            disallowed_buys: row.disallowed_buys,
        };
        self.items.push(WorkItem::new(key, params));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkItem> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut WorkItem> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkItem> {
        self.items.iter()
    }

    pub fn rejected(&self) -> &[Rejected] {
        &self.rejected
    }

    /// Overwrite disallowed buys from a key → `a,b,c` map (previous run's
    /// checkpoint). Returns how many items were updated.
    pub fn apply_disallowed(&mut self, prior: &BTreeMap<RecipientKey, String>) -> usize {
        let mut updated = 0;
        for item in &mut self.items {
            if let Some(buys) = prior.get(item.key()) {
                item.set_disallowed_buys(parse_disallowed_buys(buys));
                updated += 1;
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: Option<&str>, league: &str, team: &str) -> RawRow {
        RawRow {
            key: key.map(str::to_string),
            league_id: Some(league.to_string()),
            team_id: Some(team.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn blank_keys_are_dropped_not_fatal() {
        let store = WorkItemStore::from_rows(vec![
            row(Some("a@x.io"), "1", "1"),
            row(Some("   "), "2", "2"),
            row(None, "3", "3"),
            row(Some("d@x.io"), "4", "4"),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().key().as_str(), "a@x.io");
        assert_eq!(store.get(1).unwrap().key().as_str(), "d@x.io");
        let positions: Vec<usize> = store.rejected().iter().map(|r| r.position).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn columns_allow_short_optional_lists() {
        let columns = ColumnLists {
            keys: vec!["a@x.io".into(), "b@x.io".into()],
            league_ids: vec!["10".into(), "20".into()],
            team_ids: vec!["4".into()],
            user_ids: vec![],
            disallowed_buys: vec!["1-2".into(), "None".into()],
        };
        let store = WorkItemStore::from_columns(&columns);

        assert_eq!(store.len(), 2);
        let first = store.get(0).unwrap().params();
        assert_eq!(first.team_id.as_ref().map(TeamId::as_str), Some("4"));
        assert_eq!(first.disallowed_buys, vec!["1", "2"]);
        let second = store.get(1).unwrap().params();
        assert!(second.team_id.is_none());
        assert!(!second.has_identifiers());
        assert!(second.disallowed_buys.is_empty());
    }

    #[test]
    fn loading_is_order_stable() {
        let rows = || (0..20).map(|i| row(Some(&format!("r{i}@x.io")), "1", "1"));
        let a: Vec<_> = WorkItemStore::from_rows(rows()).iter().map(|i| i.key().clone()).collect();
        let b: Vec<_> = WorkItemStore::from_rows(rows()).iter().map(|i| i.key().clone()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn apply_disallowed_updates_known_keys() {
        let mut store = WorkItemStore::from_rows(vec![row(Some("a@x.io"), "1", "1"), row(Some("b@x.io"), "2", "2")]);
        let prior = BTreeMap::from([(RecipientKey::parse("b@x.io").unwrap(), "5,6".to_string())]);

        assert_eq!(store.apply_disallowed(&prior), 1);
        assert!(store.get(0).unwrap().params().disallowed_buys.is_empty());
        assert_eq!(store.get(1).unwrap().params().disallowed_buys, vec!["5", "6"]);
    }
}
