//! Shared gap-aware horizontal axis for all players.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::models::AnnotatedMatch;

/// One match on the merged axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    /// Index of the owning player among the plotted players
    pub player_index: usize,

    /// Horizontal position
    pub x: f64,

    /// First match of a calendar date not seen before
    pub new_date: bool,

    #[serde(flatten)]
    pub annotated: AnnotatedMatch,
}

impl TimelineEntry {
    pub fn player(&self) -> &str {
        &self.annotated.record.player
    }
}

/// A labelled position on the horizontal axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateTick {
    pub x: f64,
    pub date: NaiveDate,
    pub label: String,
}

/// Extra spacing after `hours` of idle time. Never negative.
pub fn gap_penalty(hours: f64, gap_scale: f64) -> f64 {
    gap_scale * hours.log10().max(0.0)
}

/// All players' matches merged onto one axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Timeline {
    pub entries: Vec<TimelineEntry>,
    pub ticks: Vec<DateTick>,
}

impl Timeline {
    /// Merge per-player match lists and assign positions.
    ///
    /// The first match sits at x = 0; each later one is one unit further
    /// plus the gap penalty of the time elapsed since its predecessor.
    pub fn build(players: Vec<Vec<AnnotatedMatch>>, gap_scale: f64, date_format: &str) -> Self {
        let mut merged: Vec<(usize, AnnotatedMatch)> = players
            .into_iter()
            .enumerate()
            .flat_map(|(idx, matches)| matches.into_iter().map(move |m| (idx, m)))
            .collect();
        merged.sort_by(|(_, a), (_, b)| a.record.chronological_cmp(&b.record));

        let mut entries: Vec<TimelineEntry> = Vec::with_capacity(merged.len());
        let mut ticks = Vec::new();

        for (player_index, annotated) in merged {
            let x = match entries.last() {
                None => 0.0,
                Some(prev) => {
                    let elapsed = annotated.record.start_time - prev.annotated.record.start_time;
                    let hours = elapsed.num_seconds() as f64 / 3600.0;
                    prev.x + 1.0 + gap_penalty(hours, gap_scale)
                }
            };

            let date = annotated.record.start_time.date_naive();
            let new_date = ticks.last().map_or(true, |t: &DateTick| t.date != date);
            if new_date {
                ticks.push(DateTick {
                    x,
                    date,
                    label: date.format(date_format).to_string(),
                });
            }

            entries.push(TimelineEntry {
                player_index,
                x,
                new_date,
                annotated,
            });
        }

        debug!(
            entries = entries.len(),
            ticks = ticks.len(),
            "Built merged timeline"
        );

        Self { entries, ticks }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Entries of one player, in order.
    pub fn player_entries(&self, player_index: usize) -> impl Iterator<Item = &TimelineEntry> {
        self.entries
            .iter()
            .filter(move |e| e.player_index == player_index)
    }
}
