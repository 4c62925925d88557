//! Viewport recompute: x clamping, vertical autoscale and tick labels.

use serde::{Deserialize, Serialize};

use super::timeline::DateTick;
use crate::config::GraphConfig;

const EPS: f64 = 1e-9;

/// Requested horizontal range plus an optional set of enabled players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportQuery {
    pub left: f64,
    pub right: f64,

    /// None enables every player
    #[serde(default)]
    pub players: Option<Vec<String>>,
}

/// Quick range selections offered next to the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangePreset {
    /// Only matches of the season the latest match belongs to
    #[serde(default)]
    pub current_season: bool,

    /// Keep the last N matches; 0 keeps all
    #[serde(default)]
    pub last: usize,

    #[serde(default)]
    pub players: Option<Vec<String>>,
}

/// Everything a renderer needs to update for a new x range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportLayout {
    pub x_range: [f64; 2],
    pub y_range: [f64; 2],

    /// Aligned with the global date ticks; empty strings are unlabelled
    pub tick_text: Vec<String>,
}

/// Horizontal limits of a non-empty timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_left: f64,
    pub max_right: f64,
    pub min_span: f64,
}

impl Bounds {
    pub fn new(min_x: f64, max_x: f64, config: &GraphConfig) -> Self {
        Self {
            min_left: min_x - config.edge_margin,
            max_right: max_x + config.edge_margin,
            min_span: config.min_span,
        }
    }

    pub fn max_span(&self) -> f64 {
        self.max_right - self.min_left
    }

    /// Constrain a requested range, keeping its span where possible.
    pub fn clamp(&self, left: f64, right: f64) -> [f64; 2] {
        let (mut left, mut right) = (left, right);
        let mut span = right - left;
        let max_span = self.max_span();

        if span > max_span + EPS {
            let excess = span - max_span;
            span = max_span;
            left += excess / 2.0;
            right -= excess / 2.0;
        } else if span < self.min_span - EPS {
            let shortfall = self.min_span - span;
            span = self.min_span;
            left -= shortfall / 2.0;
            right += shortfall / 2.0;
        }

        if left < self.min_left - EPS {
            left = self.min_left;
            right = (left + span).min(self.max_right);
        } else if right > self.max_right + EPS {
            right = self.max_right;
            left = (right - span).max(self.min_left);
        }

        [left, right]
    }
}

/// Padded vertical range of the SRs plotted inside `[left, right]`.
pub fn autoscale<I>(points: I, x_range: [f64; 2], config: &GraphConfig) -> [f64; 2]
where
    I: IntoIterator<Item = (f64, i32)>,
{
    let [left, right] = x_range;
    let (min, max) = points
        .into_iter()
        .filter(|(x, _)| *x >= left && *x <= right)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, sr)| {
            let sr = f64::from(sr);
            (lo.min(sr), hi.max(sr))
        });

    let (min, max) = if min >= max {
        (config.fallback_sr_range[0], config.fallback_sr_range[1])
    } else {
        (min, max)
    };

    [min - config.y_padding, max + config.y_padding]
}

/// Label every n-th in-range date tick so about `target` labels show.
pub fn tick_text(ticks: &[DateTick], x_range: [f64; 2], target: usize) -> Vec<String> {
    let [left, right] = x_range;
    let in_range = |t: &DateTick| t.x >= left && t.x <= right;

    let visible = ticks.iter().filter(|t| in_range(t)).count();
    let every = ((visible as f64 / target.max(1) as f64).round() as usize).max(1);

    let mut seen = 0usize;
    ticks
        .iter()
        .map(|t| {
            if !in_range(t) {
                return String::new();
            }
            let labelled = seen % every == 0;
            seen += 1;
            if labelled {
                t.label.clone()
            } else {
                String::new()
            }
        })
        .collect()
}

/// Range showing the last `visible` positions of an ordered x list.
///
/// `visible == 0` shows every position.
pub fn initial_range(xs: &[f64], visible: usize) -> Option<[f64; 2]> {
    let last = *xs.last()?;
    let skipped = if visible == 0 {
        0
    } else {
        xs.len().saturating_sub(visible)
    };
    let first = *xs.get(skipped)?;
    Some([first - 0.5, last + 1.0])
}

/// Range covering the positions a preset selects.
///
/// `entries` are (x, season label) in merged order.
pub fn preset_range(entries: &[(f64, &str)], preset: &RangePreset) -> Option<[f64; 2]> {
    let (_, latest_season) = *entries.last()?;

    let selected: Vec<f64> = entries
        .iter()
        .filter(|(_, season)| !preset.current_season || *season == latest_season)
        .map(|(x, _)| *x)
        .collect();

    let kept = if preset.last > 0 {
        &selected[selected.len().saturating_sub(preset.last)..]
    } else {
        &selected[..]
    };

    Some([kept.first()? - 0.5, kept.last()? + 0.5])
}
