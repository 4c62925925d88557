//! Continuity between consecutive matches of one player, and the line
//! segments that follow from it.

use serde::Serialize;

use crate::models::{Continuity, MatchRecord};

const EPS: f64 = 1e-9;

/// Decide whether `next` continues the rating progression of `prev`.
///
/// Both observed endpoints must agree exactly. A missing observed start on
/// `next` cannot contradict anything, so it counts as connected.
pub fn classify(prev: &MatchRecord, next: &MatchRecord) -> Continuity {
    match (prev.end_sr, next.start_sr) {
        (_, None) => Continuity::Connected,
        (Some(end), Some(start)) if end == start => Continuity::Connected,
        _ => Continuity::Broken,
    }
}

/// Classify every adjacent pair of an already ordered sequence.
/// The result has one element fewer than the input.
pub fn edges<'a, I>(records: I) -> Vec<Continuity>
where
    I: IntoIterator<Item = &'a MatchRecord>,
{
    let records: Vec<&MatchRecord> = records.into_iter().collect();
    records
        .windows(2)
        .map(|pair| classify(pair[0], pair[1]))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinePoint {
    pub x: f64,
    pub sr: i32,
}

/// A run of points drawn as one continuous line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSegment {
    pub points: Vec<LinePoint>,
}

/// Split a player's points into independently drawn lines.
///
/// `edges[i]` describes the step from `points[i]` to `points[i + 1]`.
/// Inside a line, a point more than one unit after its predecessor gets a
/// flat lead-in at `x - 1` carrying the previous SR.
pub fn line_segments(points: &[LinePoint], edges: &[Continuity]) -> Vec<LineSegment> {
    let mut segments: Vec<LineSegment> = Vec::new();
    let mut current: Vec<LinePoint> = Vec::new();

    for (i, point) in points.iter().enumerate() {
        let broken = i > 0 && edges.get(i - 1) == Some(&Continuity::Broken);
        if broken && !current.is_empty() {
            segments.push(LineSegment {
                points: std::mem::take(&mut current),
            });
        }

        if let Some(last) = current.last().copied() {
            let lead_in = point.x - 1.0;
            if last.x < lead_in - EPS {
                current.push(LinePoint {
                    x: lead_in,
                    sr: last.sr,
                });
            }
        }
        current.push(*point);
    }

    if !current.is_empty() {
        segments.push(LineSegment { points: current });
    }
    segments
}
