//! Rating reconstruction and graph layout.
//!
//! The pipeline runs fresh for every request:
//! - Rating estimation per player
//! - Graphable filtering
//! - Merged gap-aware timeline with date ticks
//! - Continuity, line segments and estimate bands per player
//! - Initial viewport

pub mod bands;
pub mod continuity;
pub mod estimate;
pub mod timeline;
pub mod viewport;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::GraphConfig;
use crate::models::{
    AnnotatedMatch, Continuity, EstimateReason, MatchKey, MatchResult, PlayerMatches, RecordError,
    SeasonTable,
};

pub use bands::EstimateBand;
pub use continuity::{LinePoint, LineSegment};
pub use estimate::RatingEstimator;
pub use timeline::{DateTick, Timeline, TimelineEntry};
pub use viewport::{RangePreset, ViewportLayout, ViewportQuery};

/// A plotted match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub sr: i32,
    pub estimate: Option<EstimateReason>,
    pub key: MatchKey,
    pub result: MatchResult,

    /// SRs as recorded, before estimation
    pub start_sr: Option<i32>,
    pub end_sr: Option<i32>,

    pub rank: Option<String>,
    pub map: Option<String>,
    pub season: String,
    pub viewable: bool,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    pub duration: Option<f64>,
}

impl SeriesPoint {
    fn from_entry(entry: &TimelineEntry) -> Option<Self> {
        let m = &entry.annotated;
        Some(Self {
            x: entry.x,
            sr: m.sr?,
            estimate: m.estimate,
            key: m.record.key.clone(),
            result: m.record.result.clone(),
            start_sr: m.record.start_sr,
            end_sr: m.record.end_sr,
            rank: m.record.rank.clone(),
            map: m.record.map.clone(),
            season: m.season.clone(),
            viewable: m.record.viewable,
            time: m.record.start_time,
            duration: m.record.duration,
        })
    }
}

/// Everything drawn for one player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSeries {
    pub name: String,

    /// Position of the player in the input, stable across filtering
    pub index: usize,

    pub points: Vec<SeriesPoint>,

    /// One entry per adjacent pair of points
    pub continuity: Vec<Continuity>,

    pub segments: Vec<LineSegment>,
    pub bands: Vec<EstimateBand>,
}

/// A player's full annotated history, including unplotted matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerListing {
    pub player: String,
    pub matches: Vec<AnnotatedMatch>,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphSeries {
    pub players: Vec<PlayerSeries>,
    pub ticks: Vec<DateTick>,

    /// None when no player has enough graphable matches
    pub initial: Option<ViewportLayout>,

    pub listing: Vec<PlayerListing>,
}

/// Run the whole pipeline over raw per-player records.
///
/// Fails only on records missing required fields; everything else degrades
/// into the output values.
pub fn build_graph(
    players: &[PlayerMatches],
    config: &GraphConfig,
    seasons: &SeasonTable,
) -> Result<GraphSeries, RecordError> {
    for record in players.iter().flat_map(|p| &p.matches) {
        record.validate()?;
    }

    let estimator = RatingEstimator::new(seasons, config.sr_per_match);
    let listing: Vec<PlayerListing> = players
        .iter()
        .map(|p| PlayerListing {
            player: p.player.clone(),
            matches: estimator.estimate(&p.matches),
        })
        .collect();

    let mut plotted: Vec<(usize, &str)> = Vec::new();
    let mut graphable: Vec<Vec<AnnotatedMatch>> = Vec::new();
    for (index, entry) in listing.iter().enumerate() {
        let matches: Vec<AnnotatedMatch> = entry
            .matches
            .iter()
            .filter(|m| m.is_graphable())
            .cloned()
            .collect();
        if matches.len() >= config.min_graphable_matches {
            plotted.push((index, entry.player.as_str()));
            graphable.push(matches);
        } else {
            debug!(
                player = %entry.player,
                graphable = matches.len(),
                "Not enough graphable matches to plot"
            );
        }
    }

    let timeline = Timeline::build(graphable, config.gap_scale, &config.date_format);

    let series: Vec<PlayerSeries> = plotted
        .iter()
        .enumerate()
        .map(|(position, (index, name))| {
            player_series(&timeline, position, *index, name, config)
        })
        .collect();

    let mut graph = GraphSeries {
        players: series,
        ticks: timeline.ticks.clone(),
        initial: None,
        listing,
    };

    let xs: Vec<f64> = timeline.entries.iter().map(|e| e.x).collect();
    let initial = viewport::initial_range(&xs, config.initial_matches_visible)
        .and_then(|[left, right]| graph.layout(left, right, None, config));
    graph.initial = initial;

    debug!(
        players = players.len(),
        plotted = graph.players.len(),
        merged = timeline.len(),
        "Built graph series"
    );

    Ok(graph)
}

fn player_series(
    timeline: &Timeline,
    position: usize,
    index: usize,
    name: &str,
    config: &GraphConfig,
) -> PlayerSeries {
    let entries: Vec<&TimelineEntry> = timeline.player_entries(position).collect();
    let points: Vec<SeriesPoint> = entries
        .iter()
        .filter_map(|e| SeriesPoint::from_entry(e))
        .collect();

    let edges = continuity::edges(entries.iter().map(|e| &e.annotated.record));

    let line: Vec<LinePoint> = points
        .iter()
        .map(|p| LinePoint { x: p.x, sr: p.sr })
        .collect();
    let segments = continuity::line_segments(&line, &edges);

    let shaded: Vec<(f64, i32, Option<EstimateReason>)> =
        points.iter().map(|p| (p.x, p.sr, p.estimate)).collect();
    let bands = bands::estimate_bands(&shaded, config.y_padding);

    PlayerSeries {
        name: name.to_string(),
        index,
        points,
        continuity: edges,
        segments,
        bands,
    }
}

impl GraphSeries {
    pub fn is_empty(&self) -> bool {
        self.players.iter().all(|p| p.points.is_empty())
    }

    /// All plotted points as (x, season) in merged order.
    fn merged(&self) -> Vec<(f64, &str)> {
        let mut merged: Vec<(f64, &str)> = self
            .players
            .iter()
            .flat_map(|p| p.points.iter().map(|pt| (pt.x, pt.season.as_str())))
            .collect();
        merged.sort_by(|a, b| a.0.total_cmp(&b.0));
        merged
    }

    /// Recompute the layout for a requested range.
    ///
    /// `players` limits the vertical autoscale to the named players.
    /// Returns None when nothing is plotted.
    pub fn layout(
        &self,
        left: f64,
        right: f64,
        players: Option<&[String]>,
        config: &GraphConfig,
    ) -> Option<ViewportLayout> {
        let merged = self.merged();
        let (min_x, _) = *merged.first()?;
        let (max_x, _) = *merged.last()?;

        let x_range = viewport::Bounds::new(min_x, max_x, config).clamp(left, right);

        let enabled = |name: &str| players.map_or(true, |names| names.iter().any(|n| n == name));
        let points = self
            .players
            .iter()
            .filter(|p| enabled(p.name.as_str()))
            .flat_map(|p| p.points.iter().map(|pt| (pt.x, pt.sr)));
        let y_range = viewport::autoscale(points, x_range, config);

        Some(ViewportLayout {
            x_range,
            y_range,
            tick_text: viewport::tick_text(&self.ticks, x_range, config.target_ticks),
        })
    }

    pub fn query(&self, query: &ViewportQuery, config: &GraphConfig) -> Option<ViewportLayout> {
        self.layout(query.left, query.right, query.players.as_deref(), config)
    }

    /// Layout for a quick range selection.
    pub fn preset(&self, preset: &RangePreset, config: &GraphConfig) -> Option<ViewportLayout> {
        let [left, right] = viewport::preset_range(&self.merged(), preset)?;
        self.layout(left, right, preset.players.as_deref(), config)
    }
}
