//! JSON-file checkpoint store and the buy-map exports derived from it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use blueprint_pipeline::{Checkpoint, CheckpointError, CheckpointStore};

use crate::fs::{read_json, write_json_atomic};

pub const EMAIL_BUYS_FILE: &str = "email_to_buys.json";
pub const LEAGUE_BUYS_FILE: &str = "league_id_to_buys.json";
pub const USER_BUYS_FILE: &str = "user_id_to_buys.json";

/// Checkpoint kept in a single JSON document, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointStore {
    path: PathBuf,
}

impl JsonFileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CheckpointStore for JsonFileCheckpointStore {
    fn load(&self) -> Result<Checkpoint, CheckpointError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no checkpoint yet");
            return Ok(Checkpoint::new());
        }
        read_json(&self.path).map_err(|e| match e.kind() {
            std::io::ErrorKind::InvalidData => {
                CheckpointError::Encoding(format!("{}: {e}", self.path.display()))
            }
            _ => CheckpointError::Storage(format!("{}: {e}", self.path.display())),
        })
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        write_json_atomic(&self.path, checkpoint)
            .map_err(|e| CheckpointError::Storage(format!("{}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), entries = checkpoint.len(), "checkpoint saved");
        Ok(())
    }
}

/// Write the key, league, and user buy maps next to each other in `dir`.
pub fn export_buy_maps(checkpoint: &Checkpoint, dir: &Path) -> std::io::Result<()> {
    let by_key: BTreeMap<String, String> = checkpoint
        .buys_by_key()
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    write_json_atomic(&dir.join(EMAIL_BUYS_FILE), &by_key)?;
    write_json_atomic(&dir.join(LEAGUE_BUYS_FILE), &checkpoint.buys_by_league())?;
    write_json_atomic(&dir.join(USER_BUYS_FILE), &checkpoint.buys_by_user())?;
    info!(dir = %dir.display(), entries = checkpoint.len(), "exported buy maps");
    Ok(())
}

/// Read one exported map (identifier → comma-separated buys).
pub fn load_buy_map(path: &Path) -> std::io::Result<BTreeMap<String, String>> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::{LeagueId, RecipientKey, RecipientParams, RenderedResult, TeamId, WorkItem};
    use chrono::Utc;

    fn delivered(key: &str, league: &str, buys: &str) -> WorkItem {
        let mut item = WorkItem::new(
            RecipientKey::parse(key).unwrap(),
            RecipientParams {
                league_id: Some(LeagueId::parse(league).unwrap()),
                team_id: Some(TeamId::parse("3").unwrap()),
                ..Default::default()
            },
        );
        item.mark_succeeded(RenderedResult {
            buys: buys.into(),
            file_id: format!("{key}.png"),
            link: None,
            notified: false,
        });
        item
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileCheckpointStore::new(dir.path().join("checkpoint.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run/checkpoint.json");

        let mut checkpoint = Checkpoint::new();
        checkpoint.record(&delivered("a@x.io", "11", "1,2"), Utc::now());
        JsonFileCheckpointStore::new(&path).save(&checkpoint).unwrap();

        let reopened = JsonFileCheckpointStore::new(&path).load().unwrap();
        assert_eq!(reopened, checkpoint);
    }

    #[test]
    fn corrupt_file_is_an_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileCheckpointStore::new(&path).load().unwrap_err();
        assert!(matches!(err, CheckpointError::Encoding(_)));
    }

    #[test]
    fn exports_three_maps() {
        let dir = tempfile::tempdir().unwrap();
        let mut checkpoint = Checkpoint::new();
        checkpoint.record(&delivered("a@x.io", "11", "1,2"), Utc::now());
        checkpoint.record(&delivered("b@x.io", "12", "3"), Utc::now());

        export_buy_maps(&checkpoint, dir.path()).unwrap();

        let by_email = load_buy_map(&dir.path().join(EMAIL_BUYS_FILE)).unwrap();
        assert_eq!(by_email.get("b@x.io").map(String::as_str), Some("3"));
        let by_league = load_buy_map(&dir.path().join(LEAGUE_BUYS_FILE)).unwrap();
        assert_eq!(by_league.get("11").map(String::as_str), Some("1,2"));
        let by_user = load_buy_map(&dir.path().join(USER_BUYS_FILE)).unwrap();
        assert!(by_user.is_empty());
    }
}
