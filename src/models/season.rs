//! Competitive seasons - calendar periods delimited by fixed boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label used for matches played before the first recorded boundary.
pub const PRE_SEASON_LABEL: &str = "Pre-Season";

/// A season boundary: from `starts_at` onward matches belong to `label`
/// until the next boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    /// First instant of the season (epoch seconds on the wire)
    #[serde(with = "chrono::serde::ts_seconds")]
    pub starts_at: DateTime<Utc>,

    /// Human-readable name, e.g. "Season 4" or "Off-Season 4-5"
    pub label: String,

    /// Rating changes do not apply during an off-season
    #[serde(default)]
    pub off_season: bool,
}

impl Season {
    pub fn new(starts_at: i64, label: &str, off_season: bool) -> Self {
        Self {
            starts_at: DateTime::from_timestamp(starts_at, 0).unwrap_or(DateTime::UNIX_EPOCH),
            label: label.to_string(),
            off_season,
        }
    }
}

/// Ordered lookup table from timestamp to season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonTable {
    pre_season: Season,
    seasons: Vec<Season>,
}

impl SeasonTable {
    /// Build a table from boundaries in any order.
    pub fn new(pre_season_label: &str, mut seasons: Vec<Season>) -> Self {
        seasons.sort_by_key(|s| s.starts_at);
        Self {
            pre_season: Season {
                starts_at: DateTime::<Utc>::MIN_UTC,
                label: pre_season_label.to_string(),
                off_season: false,
            },
            seasons,
        }
    }

    /// The historical calendar: six seasons with short off-seasons between.
    pub fn historical() -> Self {
        Self::new(PRE_SEASON_LABEL, default_boundaries())
    }

    /// Season containing the given instant.
    pub fn classify(&self, time: DateTime<Utc>) -> &Season {
        let idx = self.seasons.partition_point(|s| s.starts_at <= time);
        if idx == 0 {
            &self.pre_season
        } else {
            &self.seasons[idx - 1]
        }
    }

    pub fn label_for(&self, time: DateTime<Utc>) -> &str {
        &self.classify(time).label
    }

    pub fn is_off_season(&self, time: DateTime<Utc>) -> bool {
        self.classify(time).off_season
    }

    /// All explicit boundaries, oldest first.
    pub fn all_seasons(&self) -> &[Season] {
        &self.seasons
    }

    pub fn pre_season_label(&self) -> &str {
        &self.pre_season.label
    }
}

impl Default for SeasonTable {
    fn default() -> Self {
        Self::historical()
    }
}

/// Boundaries of the historical calendar, in epoch seconds (UTC).
pub fn default_boundaries() -> Vec<Season> {
    vec![
        Season::new(1467072000, "Season 1", false),       // 2016-06-28
        Season::new(1471564800, "Off-Season 1-2", true),  // 2016-08-19
        Season::new(1472601600, "Season 2", false),       // 2016-08-31
        Season::new(1480118400, "Off-Season 2-3", true),  // 2016-11-26
        Season::new(1480377600, "Season 3", false),       // 2016-11-29
        Season::new(1487894400, "Off-Season 3-4", true),  // 2017-02-24
        Season::new(1488193200, "Season 4", false),       // 2017-02-27 11:00
        Season::new(1496059200, "Off-Season 4-5", true),  // 2017-05-29 12:00
        Season::new(1496102399, "Season 5", false),       // 2017-05-29 23:59:59
        Season::new(1503964799, "Off-Season 5-6", true),  // 2017-08-28 23:59:59
        Season::new(1504224000, "Season 6", false),       // 2017-09-01
    ]
}
