//! Sources of raw match history.

use async_trait::async_trait;
use tracing::{debug, info};

use super::{JsonlReader, StorageConfig, StorageError};
use crate::models::{MatchRecord, PlayerMatches};

/// Player name every custom game is listed under.
pub const CUSTOM_GAMES_PLAYER: &str = "Custom Games";

/// Supplies the raw records behind a share key.
#[async_trait]
pub trait MatchSource: Send + Sync {
    /// Load every player's matches for a share key.
    async fn load(&self, share_key: &str) -> Result<Vec<PlayerMatches>, StorageError>;
}

/// Reads `<data_dir>/matches/<share_key>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlMatchSource {
    config: StorageConfig,
}

impl JsonlMatchSource {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MatchSource for JsonlMatchSource {
    async fn load(&self, share_key: &str) -> Result<Vec<PlayerMatches>, StorageError> {
        let path = self.config.match_file(share_key)?;
        let reader: JsonlReader<MatchRecord> = JsonlReader::new(path);
        if !reader.exists() {
            debug!("No match file at {:?}", reader.path());
            return Err(StorageError::NotFound(share_key.to_string()));
        }

        let records = tokio::task::spawn_blocking(move || reader.read_all()).await??;
        let players = group_by_player(records);
        info!(share_key, players = players.len(), "Loaded match history");
        Ok(players)
    }
}

fn is_custom(record: &MatchRecord) -> bool {
    record.custom_game || record.player.contains("(Custom Games)")
}

/// Group records by player in order of first appearance.
///
/// Custom games from every account are pooled under one pseudo-player.
pub fn group_by_player(records: Vec<MatchRecord>) -> Vec<PlayerMatches> {
    let mut groups: Vec<PlayerMatches> = Vec::new();

    for record in records {
        let name = if is_custom(&record) {
            CUSTOM_GAMES_PLAYER
        } else {
            record.player.as_str()
        };

        match groups.iter().position(|g| g.player == name) {
            Some(idx) => groups[idx].matches.push(record),
            None => {
                let player = name.to_string();
                groups.push(PlayerMatches {
                    player,
                    matches: vec![record],
                });
            }
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchResult;
    use chrono::DateTime;
    use tempfile::TempDir;

    fn record(player: &str, ts: i64) -> MatchRecord {
        MatchRecord::new(
            player,
            DateTime::from_timestamp(ts, 0).unwrap(),
            MatchResult::Win,
        )
    }

    #[test]
    fn test_group_first_appearance_order() {
        let mut custom = record("beta", 5);
        custom.custom_game = true;

        let groups = group_by_player(vec![
            record("beta", 1),
            record("alpha", 2),
            record("beta", 3),
            record("alpha (Custom Games)", 4),
            custom,
        ]);

        let names: Vec<&str> = groups.iter().map(|g| g.player.as_str()).collect();
        assert_eq!(names, vec!["beta", "alpha", "Custom Games"]);
        assert_eq!(groups[0].matches.len(), 2);
        assert_eq!(groups[2].matches.len(), 2);
    }

    #[tokio::test]
    async fn test_jsonl_source_load() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        std::fs::create_dir_all(config.matches_dir()).unwrap();
        std::fs::write(
            config.match_file("share1").unwrap(),
            concat!(
                r#"{"player":"alpha","key":"a1","time":1500000000,"result":"WIN","start_sr":2000,"end_sr":2025}"#,
                "\n",
                r#"{"player":"beta","key":"b1","time":1500000100,"result":"LOSS","start_sr":null,"end_sr":0}"#,
                "\n",
            ),
        )
        .unwrap();

        let source = JsonlMatchSource::new(config);
        let players = source.load("share1").await.unwrap();

        assert_eq!(players.len(), 2);
        assert_eq!(players[0].matches[0].end_sr, Some(2025));
        assert_eq!(players[1].matches[0].end_sr, None);
    }

    #[tokio::test]
    async fn test_jsonl_source_unknown_key() {
        let temp_dir = TempDir::new().unwrap();
        let source = JsonlMatchSource::new(StorageConfig::new(temp_dir.path().to_path_buf()));

        assert!(matches!(
            source.load("missing").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_jsonl_source_missing_time_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        std::fs::create_dir_all(config.matches_dir()).unwrap();
        std::fs::write(
            config.match_file("share2").unwrap(),
            "{\"player\":\"alpha\",\"key\":\"a1\",\"result\":\"WIN\"}\n",
        )
        .unwrap();

        let source = JsonlMatchSource::new(config);
        assert!(matches!(
            source.load("share2").await,
            Err(StorageError::Parse { line: 1, .. })
        ));
    }
}
