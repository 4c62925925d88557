//! Raw competitive match records as supplied by the data source.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use super::MatchKey;

/// Rank tag marking a provisional placement match.
pub const PLACEMENT_RANK: &str = "placement";

/// Fatal problems with input records. These fail the whole request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Match {key} has no player id")]
    MissingPlayer { key: String },

    #[error("Match {key} of player {player} has no start timestamp")]
    MissingTimestamp { player: String, key: String },

    #[error("Match of player {player} at {time} has no key")]
    MissingKey { player: String, time: i64 },
}

/// Outcome of a match.
///
/// Values the source sends that are not recognised are kept verbatim so
/// they can be listed, but they carry no rating delta.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
    #[default]
    Unknown,
    Unrecognized(String),
}

impl MatchResult {
    pub fn is_decisive(&self) -> bool {
        matches!(self, MatchResult::Win | MatchResult::Loss)
    }
}

impl From<String> for MatchResult {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "WIN" => MatchResult::Win,
            "LOSS" => MatchResult::Loss,
            "DRAW" => MatchResult::Draw,
            "UNKNOWN" | "UNKN" => MatchResult::Unknown,
            _ => MatchResult::Unrecognized(s),
        }
    }
}

impl From<MatchResult> for String {
    fn from(r: MatchResult) -> Self {
        r.to_string()
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Win => write!(f, "WIN"),
            MatchResult::Loss => write!(f, "LOSS"),
            MatchResult::Draw => write!(f, "DRAW"),
            MatchResult::Unknown => write!(f, "UNKNOWN"),
            MatchResult::Unrecognized(s) => write!(f, "{}", s),
        }
    }
}

/// Upstream encodes an absent SR as either null or 0.
fn zero_as_none<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<i32>::deserialize(deserializer)?.filter(|sr| *sr != 0))
}

fn default_viewable() -> bool {
    true
}

/// One competitive match of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Player (account) name
    pub player: String,

    /// Stable unique key
    pub key: MatchKey,

    /// Start of the match (epoch seconds on the wire)
    #[serde(rename = "time", with = "chrono::serde::ts_seconds")]
    pub start_time: DateTime<Utc>,

    /// Match length in seconds, used only to order timestamp collisions
    #[serde(default)]
    pub duration: Option<f64>,

    #[serde(default)]
    pub result: MatchResult,

    /// Observed SR before the match
    #[serde(default, deserialize_with = "zero_as_none")]
    pub start_sr: Option<i32>,

    /// Observed SR after the match
    #[serde(default, deserialize_with = "zero_as_none")]
    pub end_sr: Option<i32>,

    /// Rank tier; "placement" marks provisional matches
    #[serde(default)]
    pub rank: Option<String>,

    #[serde(default)]
    pub map: Option<String>,

    #[serde(default)]
    pub custom_game: bool,

    /// Whether the match has a detail page
    #[serde(default = "default_viewable")]
    pub viewable: bool,
}

impl MatchRecord {
    /// Create a record with a key derived from player and start time.
    pub fn new(player: &str, start_time: DateTime<Utc>, result: MatchResult) -> Self {
        let key = MatchKey::generate(&[player, &start_time.timestamp().to_string()]);
        Self {
            player: player.to_string(),
            key,
            start_time,
            duration: None,
            result,
            start_sr: None,
            end_sr: None,
            rank: None,
            map: None,
            custom_game: false,
            viewable: true,
        }
    }

    pub fn with_key(mut self, key: impl Into<MatchKey>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_start_sr(mut self, sr: i32) -> Self {
        self.start_sr = Some(sr);
        self
    }

    pub fn with_end_sr(mut self, sr: i32) -> Self {
        self.end_sr = Some(sr);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn with_rank(mut self, rank: &str) -> Self {
        self.rank = Some(rank.to_string());
        self
    }

    pub fn with_map(mut self, map: &str) -> Self {
        self.map = Some(map.to_string());
        self
    }

    /// Mark as a provisional placement match.
    pub fn placement(self) -> Self {
        self.with_rank(PLACEMENT_RANK)
    }

    pub fn is_placement(&self) -> bool {
        self.rank
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(PLACEMENT_RANK))
    }

    /// Check the fields every later stage relies on.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.player.trim().is_empty() {
            return Err(RecordError::MissingPlayer {
                key: self.key.to_string(),
            });
        }
        if self.start_time.timestamp() == 0 {
            return Err(RecordError::MissingTimestamp {
                player: self.player.clone(),
                key: self.key.to_string(),
            });
        }
        if self.key.is_empty() {
            return Err(RecordError::MissingKey {
                player: self.player.clone(),
                time: self.start_time.timestamp(),
            });
        }
        Ok(())
    }

    /// Chronological order with deterministic tie-breaks.
    ///
    /// Upstream data has produced duplicate start times, so equal timestamps
    /// fall back to duration and then key.
    pub fn chronological_cmp(&self, other: &Self) -> Ordering {
        self.start_time
            .cmp(&other.start_time)
            .then_with(|| {
                let a = self.duration.unwrap_or(0.0);
                let b = other.duration.unwrap_or(0.0);
                a.total_cmp(&b)
            })
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// All matches of one player, in any order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMatches {
    pub player: String,
    pub matches: Vec<MatchRecord>,
}

impl PlayerMatches {
    pub fn new(player: &str, matches: Vec<MatchRecord>) -> Self {
        Self {
            player: player.to_string(),
            matches,
        }
    }
}
