//! Match records annotated with a resolved SR.

use serde::{Deserialize, Serialize};

use super::MatchRecord;

/// Why a match has no observed ending SR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EstimateReason {
    /// Provisional placement match
    Placement,
    /// Played while rating changes were suspended
    OffSeason,
    /// Not recorded for any known reason
    Unknown,
}

impl std::fmt::Display for EstimateReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EstimateReason::Placement => write!(f, "placement"),
            EstimateReason::OffSeason => write!(f, "off-season"),
            EstimateReason::Unknown => write!(f, "unknown"),
        }
    }
}

/// A match together with its resolved SR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedMatch {
    #[serde(flatten)]
    pub record: MatchRecord,

    /// Season label of the start time
    pub season: String,

    /// Off-season matches behave like draws
    pub off_season: bool,

    /// Observed or estimated SR after the match; None when nothing anchors it
    pub sr: Option<i32>,

    /// None when `sr` was observed
    pub estimate: Option<EstimateReason>,
}

impl AnnotatedMatch {
    pub fn is_observed(&self) -> bool {
        self.estimate.is_none()
    }

    /// Only matches with some SR can be plotted.
    pub fn is_graphable(&self) -> bool {
        self.sr.is_some()
    }
}

/// Whether two consecutive matches of a player are drawn as one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Continuity {
    Connected,
    Broken,
}
