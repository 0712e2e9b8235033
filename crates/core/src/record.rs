//! Customer-info rows as exported from the signup sheet.
//!
//! Values are loosely typed in the export (league ids are sometimes numbers,
//! sometimes strings), so fields are kept as raw JSON and normalized when a
//! row is turned into a [`RawRow`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One row of the customer-info export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    #[serde(rename = "Email", default)]
    pub email: JsonValue,
    #[serde(rename = "League ID", default)]
    pub league_id: JsonValue,
    #[serde(rename = "Team ID", default)]
    pub team_id: JsonValue,
    #[serde(rename = "Sleeper ID", default)]
    pub user_id: JsonValue,
    /// Buys carried over from the previous run; `null` when unknown.
    #[serde(default)]
    pub disallowed: Option<Vec<String>>,
    /// Columns this tool does not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub extra: BTreeMap<String, JsonValue>,
}

/// Text view of a row before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    pub key: Option<String>,
    pub league_id: Option<String>,
    pub team_id: Option<String>,
    pub user_id: Option<String>,
    pub disallowed_buys: Vec<String>,
}

fn text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl CustomerRecord {
    pub fn email_text(&self) -> Option<String> {
        text(&self.email)
    }

    pub fn to_raw_row(&self) -> RawRow {
        RawRow {
            key: text(&self.email),
            league_id: text(&self.league_id),
            team_id: text(&self.team_id),
            user_id: text(&self.user_id),
            disallowed_buys: self.disallowed.clone().unwrap_or_default(),
        }
    }
}

/// Attach last run's buys to each record as `disallowed`.
///
/// `prior` maps are consulted in order and the first one that knows the
/// (trimmed) e-mail wins; its comma-separated value is split into ids.
/// Records no map knows get `disallowed = null`.
pub fn carry_forward_disallowed(
    records: &mut [CustomerRecord],
    prior: &[BTreeMap<String, String>],
) -> usize {
    let mut matched = 0;
    for record in records.iter_mut() {
        let found = record
            .email_text()
            .and_then(|email| prior.iter().find_map(|m| m.get(&email)));
        record.disallowed = found.map(|buys| {
            buys.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        });
        if record.disallowed.is_some() {
            matched += 1;
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: JsonValue) -> CustomerRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn numeric_ids_become_text() {
        let r = record(json!({
            "Email": " fan@example.com ",
            "League ID": 1180303064879046656u64,
            "Team ID": 4,
            "Timestamp": "2025-07-01"
        }));
        let row = r.to_raw_row();
        assert_eq!(row.key.as_deref(), Some("fan@example.com"));
        assert_eq!(row.league_id.as_deref(), Some("1180303064879046656"));
        assert_eq!(row.team_id.as_deref(), Some("4"));
        assert_eq!(row.user_id, None);
        assert!(r.extra.contains_key("Timestamp"));
    }

    #[test]
    fn carry_forward_prefers_first_map() {
        let mut records = vec![
            record(json!({"Email": "a@x.io ", "League ID": "1"})),
            record(json!({"Email": "b@x.io", "League ID": "2"})),
            record(json!({"Email": "c@x.io", "League ID": "3"})),
        ];
        let first = BTreeMap::from([("a@x.io".to_string(), "1,2".to_string())]);
        let second = BTreeMap::from([
            ("a@x.io".to_string(), "9".to_string()),
            ("b@x.io".to_string(), "3, 4".to_string()),
        ]);

        let matched = carry_forward_disallowed(&mut records, &[first, second]);

        assert_eq!(matched, 2);
        assert_eq!(records[0].disallowed, Some(vec!["1".into(), "2".into()]));
        assert_eq!(records[1].disallowed, Some(vec!["3".into(), "4".into()]));
        assert_eq!(records[2].disallowed, None);
    }
}
