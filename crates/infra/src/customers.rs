//! JSON customer-info files: loading work items, slicing, carry-forward.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::info;

use blueprint_core::{ChunkRange, CustomerRecord, WorkItemStore, carry_forward_disallowed, select_by_ranges};

use crate::fs::{read_json, write_json_atomic};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("cannot write {path}: {message}")]
    Write { path: PathBuf, message: String },

    #[error("{path} must contain a JSON array")]
    NotAList { path: PathBuf },
}

fn read_error(path: &Path, e: impl ToString) -> InputError {
    InputError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

fn write_error(path: &Path, e: impl ToString) -> InputError {
    InputError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

pub fn load_customer_records(path: &Path) -> Result<Vec<CustomerRecord>, InputError> {
    let value: JsonValue = read_json(path).map_err(|e| read_error(path, e))?;
    if !value.is_array() {
        return Err(InputError::NotAList { path: path.to_path_buf() });
    }
    serde_json::from_value(value).map_err(|e| read_error(path, e))
}

pub fn save_customer_records(path: &Path, records: &[CustomerRecord]) -> Result<(), InputError> {
    write_json_atomic(path, records).map_err(|e| write_error(path, e))
}

/// Load the customer-info export as an ordered work item store.
pub fn load_work_items(path: &Path) -> Result<WorkItemStore, InputError> {
    let records = load_customer_records(path)?;
    let store = WorkItemStore::from_rows(records.iter().map(CustomerRecord::to_raw_row));
    info!(
        path = %path.display(),
        rows = records.len(),
        items = store.len(),
        rejected = store.rejected().len(),
        "loaded customer info"
    );
    Ok(store)
}

/// Write the elements of the JSON array at `input` that fall inside
/// `ranges` to `output`. Elements are copied untouched. Returns how many
/// were kept.
pub fn write_selected(input: &Path, output: &Path, ranges: &[ChunkRange]) -> Result<usize, InputError> {
    let value: JsonValue = read_json(input).map_err(|e| read_error(input, e))?;
    let JsonValue::Array(items) = value else {
        return Err(InputError::NotAList { path: input.to_path_buf() });
    };
    let selected = select_by_ranges(&items, ranges);
    write_json_atomic(output, &selected).map_err(|e| write_error(output, e))?;
    Ok(selected.len())
}

/// Attach last run's buys (from one or more key → buys maps) to every
/// customer record and write the result to `output`.
pub fn merge_disallowed(customers: &Path, prior: &[PathBuf], output: &Path) -> Result<usize, InputError> {
    let mut records = load_customer_records(customers)?;
    let maps = prior
        .iter()
        .map(|p| read_json::<BTreeMap<String, String>>(p).map_err(|e| read_error(p, e)))
        .collect::<Result<Vec<_>, _>>()?;
    let matched = carry_forward_disallowed(&mut records, &maps);
    save_customer_records(output, &records)?;
    info!(records = records.len(), matched, output = %output.display(), "merged disallowed buys");
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(path: &Path, value: JsonValue) {
        std::fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
    }

    #[test]
    fn loads_items_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customers.json");
        write(
            &path,
            json!([
                {"Email": "a@x.io", "League ID": 1, "Team ID": 2},
                {"Email": "", "League ID": 3, "Team ID": 4},
                {"Email": "c@x.io", "League ID": "5", "Sleeper ID": "u-6"}
            ]),
        );

        let store = load_work_items(&path).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().key().as_str(), "c@x.io");
        assert_eq!(store.rejected().len(), 1);
    }

    #[test]
    fn object_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("customers.json");
        write(&path, json!({"Email": "a@x.io"}));
        assert!(matches!(load_work_items(&path), Err(InputError::NotAList { .. })));
    }

    #[test]
    fn selected_chunk_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("all.json");
        let output = dir.path().join("part.json");
        write(&input, json!([0, 1, 2, 3, 4, 5, 6, 7, 8, 9]));

        let range = blueprint_core::chunk_range(10, 2, 3).unwrap();
        let kept = write_selected(&input, &output, &[range]).unwrap();

        assert_eq!(kept, 3);
        let back: JsonValue = read_json(&output).unwrap();
        assert_eq!(back, json!([4, 5, 6]));
    }

    #[test]
    fn merge_writes_disallowed_column() {
        let dir = tempfile::tempdir().unwrap();
        let customers = dir.path().join("customers.json");
        let prior = dir.path().join("email_to_buys.json");
        let output = dir.path().join("merged.json");
        write(
            &customers,
            json!([
                {"Email": "a@x.io ", "League ID": "1", "Team ID": "1"},
                {"Email": "b@x.io", "League ID": "2", "Team ID": "2"}
            ]),
        );
        write(&prior, json!({"a@x.io": "10,11"}));

        let matched = merge_disallowed(&customers, &[prior], &output).unwrap();

        assert_eq!(matched, 1);
        let merged = load_customer_records(&output).unwrap();
        assert_eq!(merged[0].disallowed, Some(vec!["10".to_string(), "11".to_string()]));
        assert_eq!(merged[1].disallowed, None);
    }
}
