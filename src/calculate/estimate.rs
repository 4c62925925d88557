//! Rating estimation for matches without an observed ending SR.
//!
//! Estimates are anchored on the nearest known SR values around each run of
//! unknown matches:
//! 1. A known starting SR plus the natural delta of the result gives the end.
//!    A known starting SR on the following match gives the previous end.
//! 2. Remaining runs of unknown matches become segments, with draws and
//!    off-season matches tied to the decisive match before them.
//! 3. Each segment is resolved from its anchors: extrapolated from one,
//!    or fitted between two.

use tracing::debug;

use crate::models::{AnnotatedMatch, EstimateReason, MatchRecord, MatchResult, SeasonTable};

/// A maximal run of consecutive matches without a resolved SR.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// SR before the first match of the run
    pub start: Option<f64>,

    /// SR after the last match of the run
    pub end: Option<f64>,

    /// Indices into the player's match list. Matches in one group cannot be
    /// told apart in rating terms and share a value.
    pub groups: Vec<Vec<usize>>,
}

impl Segment {
    fn open(start: Option<f64>, first: usize) -> Self {
        Self {
            start,
            end: None,
            groups: vec![vec![first]],
        }
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Outcome counts over the groups of a segment, keyed by each group's head.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Tally {
    natural_delta: f64,
    wins: usize,
    losses: usize,
    flat: usize,
}

/// Fills in missing SR values for one player's matches.
#[derive(Debug, Clone, Copy)]
pub struct RatingEstimator<'a> {
    seasons: &'a SeasonTable,
    sr_per_match: f64,
}

impl<'a> RatingEstimator<'a> {
    pub fn new(seasons: &'a SeasonTable, sr_per_match: f64) -> Self {
        Self {
            seasons,
            sr_per_match,
        }
    }

    /// Annotate every match with an observed or estimated SR.
    ///
    /// Matches are put in chronological order first. The output has the same
    /// length as the input; `sr` is None only where no anchor exists.
    pub fn estimate(&self, matches: &[MatchRecord]) -> Vec<AnnotatedMatch> {
        let mut sorted: Vec<&MatchRecord> = matches.iter().collect();
        sorted.sort_by(|a, b| a.chronological_cmp(b));

        let annotated: Vec<AnnotatedMatch> =
            sorted.into_iter().map(|m| self.annotate(m)).collect();
        let mut resolved = self.propagate_direct(&annotated);

        let segments = self.discover_segments(&annotated, &resolved);
        let mut unanchored = 0;
        for segment in &segments {
            let values = self.resolve_segment(segment, &annotated);
            if values.is_empty() {
                unanchored += segment.len();
            }
            for (idx, sr) in values {
                resolved[idx] = Some(sr);
            }
        }

        debug!(
            matches = annotated.len(),
            segments = segments.len(),
            unanchored,
            "Estimated missing SR"
        );

        annotated
            .into_iter()
            .zip(resolved)
            .map(|(mut m, sr)| {
                m.sr = sr.map(|v| v.round() as i32);
                m
            })
            .collect()
    }

    fn annotate(&self, record: &MatchRecord) -> AnnotatedMatch {
        let season = self.seasons.classify(record.start_time);
        let estimate = match record.end_sr {
            Some(_) => None,
            None if record.is_placement() => Some(EstimateReason::Placement),
            None if season.off_season => Some(EstimateReason::OffSeason),
            None => Some(EstimateReason::Unknown),
        };

        AnnotatedMatch {
            record: record.clone(),
            season: season.label.clone(),
            off_season: season.off_season,
            sr: record.end_sr,
            estimate,
        }
    }

    /// Draws and off-season matches never move the rating.
    fn is_flat(m: &AnnotatedMatch) -> bool {
        m.off_season || m.record.result == MatchResult::Draw
    }

    /// SR change of a match, with wins and losses optionally scaled.
    /// None when the result carries no known direction.
    fn delta(
        &self,
        m: &AnnotatedMatch,
        win_coefficient: f64,
        loss_coefficient: f64,
    ) -> Option<f64> {
        if Self::is_flat(m) {
            return Some(0.0);
        }
        match m.record.result {
            MatchResult::Win => Some(self.sr_per_match * win_coefficient),
            MatchResult::Loss => Some(-self.sr_per_match * loss_coefficient),
            _ => None,
        }
    }

    fn natural_delta(&self, m: &AnnotatedMatch) -> Option<f64> {
        self.delta(m, 1.0, 1.0)
    }

    /// Step 1: values that follow directly from a neighbouring observation.
    fn propagate_direct(&self, matches: &[AnnotatedMatch]) -> Vec<Option<f64>> {
        let mut resolved: Vec<Option<f64>> = matches
            .iter()
            .map(|m| {
                m.sr.map(f64::from).or_else(|| {
                    let start = f64::from(m.record.start_sr?);
                    Some(start + self.natural_delta(m)?)
                })
            })
            .collect();

        for i in 1..matches.len() {
            if resolved[i - 1].is_none() {
                if let Some(start) = matches[i].record.start_sr {
                    resolved[i - 1] = Some(f64::from(start));
                }
            }
        }

        resolved
    }

    /// Step 2: fold the list into runs of unresolved matches.
    fn discover_segments(
        &self,
        matches: &[AnnotatedMatch],
        resolved: &[Option<f64>],
    ) -> Vec<Segment> {
        let (mut segments, open) = matches.iter().enumerate().fold(
            (Vec::new(), None::<Segment>),
            |(mut done, open), (i, m)| match (open, resolved[i]) {
                (Some(mut segment), Some(known)) => {
                    segment.end = Some(match m.record.start_sr {
                        Some(start) => f64::from(start),
                        None => known - self.natural_delta(m).unwrap_or(0.0),
                    });
                    done.push(segment);
                    (done, None)
                }
                (Some(mut segment), None) => {
                    if Self::is_flat(m) {
                        if let Some(group) = segment.groups.last_mut() {
                            group.push(i);
                        }
                    } else {
                        segment.groups.push(vec![i]);
                    }
                    (done, Some(segment))
                }
                (None, Some(_)) => (done, None),
                (None, None) => {
                    let start = i.checked_sub(1).and_then(|prev| resolved[prev]);
                    (done, Some(Segment::open(start, i)))
                }
            },
        );
        segments.extend(open);
        segments
    }

    fn tally(&self, segment: &Segment, matches: &[AnnotatedMatch]) -> Tally {
        segment
            .groups
            .iter()
            .filter_map(|group| group.first())
            .map(|&idx| &matches[idx])
            .fold(Tally::default(), |mut t, head| {
                t.natural_delta += self.natural_delta(head).unwrap_or(0.0);
                if Self::is_flat(head) {
                    t.flat += 1;
                } else {
                    match head.record.result {
                        MatchResult::Win => t.wins += 1,
                        MatchResult::Loss => t.losses += 1,
                        // unknown direction: a step when interpolating, zero when scaling
                        _ => {}
                    }
                }
                t
            })
    }

    /// Step 3: unrounded SR after each match of the segment.
    /// Empty when the segment has no anchor.
    fn resolve_segment(
        &self,
        segment: &Segment,
        matches: &[AnnotatedMatch],
    ) -> Vec<(usize, f64)> {
        if segment.is_empty() {
            return Vec::new();
        }
        let tally = self.tally(segment, matches);

        match (segment.start, segment.end) {
            (None, None) => Vec::new(),
            (Some(start), None) => self.walk(segment, matches, start, 1.0, 1.0),
            (None, Some(end)) => {
                self.walk(segment, matches, end - tally.natural_delta, 1.0, 1.0)
            }
            (Some(start), Some(end)) => {
                let known_delta = end - start;
                if tally.wins > 0 && tally.losses > 0 {
                    let shortfall = known_delta - tally.natural_delta;
                    let mut win_coefficient = 1.0;
                    let mut loss_coefficient = 1.0;
                    if shortfall > 0.0 {
                        win_coefficient += shortfall / tally.wins as f64 / self.sr_per_match;
                    } else if shortfall < 0.0 {
                        loss_coefficient += -shortfall / tally.losses as f64 / self.sr_per_match;
                    }
                    self.walk(segment, matches, start, win_coefficient, loss_coefficient)
                } else {
                    self.interpolate(segment, matches, start, known_delta, tally)
                }
            }
        }
    }

    /// Apply per-group deltas sequentially from `start`.
    fn walk(
        &self,
        segment: &Segment,
        matches: &[AnnotatedMatch],
        start: f64,
        win_coefficient: f64,
        loss_coefficient: f64,
    ) -> Vec<(usize, f64)> {
        let mut sr = start;
        let mut out = Vec::with_capacity(segment.len());
        for group in &segment.groups {
            sr += self
                .delta(&matches[group[0]], win_coefficient, loss_coefficient)
                .unwrap_or(0.0);
            out.extend(group.iter().map(|&idx| (idx, sr)));
        }
        out
    }

    /// Spread the known change evenly over the non-flat groups.
    fn interpolate(
        &self,
        segment: &Segment,
        matches: &[AnnotatedMatch],
        start: f64,
        known_delta: f64,
        tally: Tally,
    ) -> Vec<(usize, f64)> {
        let steps = segment.groups.len() - tally.flat;
        let step = if steps == 0 {
            0.0
        } else {
            known_delta / steps as f64
        };

        let mut sr = start;
        let mut out = Vec::with_capacity(segment.len());
        for group in &segment.groups {
            if !Self::is_flat(&matches[group[0]]) {
                sr += step;
            }
            out.extend(group.iter().map(|&idx| (idx, sr)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;

    use crate::models::Season;

    // 2020-09-13, inside the last historical season
    const BASE: i64 = 1_600_000_000;

    fn at(hours: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(BASE + hours * 3600, 0).unwrap()
    }

    fn game(hour: i64, result: MatchResult) -> MatchRecord {
        MatchRecord::new("p", at(hour), result)
    }

    fn observed(hour: i64, result: MatchResult, end_sr: i32) -> MatchRecord {
        game(hour, result).with_end_sr(end_sr)
    }

    fn srs(matches: &[AnnotatedMatch]) -> Vec<Option<i32>> {
        matches.iter().map(|m| m.sr).collect()
    }

    fn run(records: &[MatchRecord]) -> Vec<AnnotatedMatch> {
        let table = SeasonTable::historical();
        RatingEstimator::new(&table, 25.0).estimate(records)
    }

    use MatchResult::{Draw, Loss, Unknown, Win};

    #[test]
    fn test_start_sr_plus_win() {
        let out = run(&[game(0, Win).with_start_sr(1200)]);
        assert_eq!(srs(&out), vec![Some(1225)]);
        assert_eq!(out[0].estimate, Some(EstimateReason::Unknown));
    }

    #[test]
    fn test_observed_values_are_never_overwritten() {
        let records = vec![
            observed(0, Win, 2000),
            game(1, Win).with_start_sr(1500).with_end_sr(1800),
            game(2, Loss).with_start_sr(3000),
            observed(3, Loss, 1234),
        ];
        let out = run(&records);

        assert_eq!(out[0].sr, Some(2000));
        assert_eq!(out[1].sr, Some(1800));
        assert_eq!(out[3].sr, Some(1234));
        assert!(out[0].is_observed());
        assert!(out[1].is_observed());
        assert!(out[3].is_observed());
    }

    #[test]
    fn test_next_start_sr_closes_previous() {
        let records = vec![
            observed(0, Win, 1000),
            game(1, Unknown),
            game(2, Win).with_start_sr(1040).with_end_sr(1065),
        ];
        let out = run(&records);
        assert_eq!(out[1].sr, Some(1040));
    }

    #[test]
    fn test_win_loss_with_no_shortfall() {
        let records = vec![
            observed(0, Win, 1000),
            game(1, Win),
            game(2, Loss),
            observed(3, Win, 1025),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[1..3]), vec![Some(1025), Some(1000)]);
    }

    #[test]
    fn test_scaled_wins_absorb_positive_shortfall() {
        let records = vec![
            observed(0, Win, 1000),
            game(1, Win),
            game(2, Win),
            game(3, Loss),
            observed(4, Draw, 1100),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[1..4]), vec![Some(1063), Some(1125), Some(1100)]);
    }

    #[test]
    fn test_scaled_losses_absorb_negative_shortfall() {
        let records = vec![
            observed(0, Win, 1000),
            game(1, Win),
            game(2, Loss),
            game(3, Loss),
            observed(4, Draw, 900),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[1..4]), vec![Some(1025), Some(963), Some(900)]);
    }

    #[test]
    fn test_scaled_segment_lands_on_end_anchor() {
        let table = SeasonTable::historical();
        let estimator = RatingEstimator::new(&table, 25.0);
        let records = vec![
            observed(0, Win, 2000),
            game(1, Loss),
            game(2, Win),
            game(3, Win),
            game(4, Loss),
            game(5, Win),
            observed(6, Draw, 2137),
        ];
        let annotated: Vec<_> = records.iter().map(|r| estimator.annotate(r)).collect();
        let resolved = estimator.propagate_direct(&annotated);
        let segments = estimator.discover_segments(&annotated, &resolved);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].start, Some(2000.0));
        assert_eq!(segments[0].end, Some(2137.0));

        let values = estimator.resolve_segment(&segments[0], &annotated);
        let (_, last) = values.last().copied().unwrap();
        assert!((last - 2137.0).abs() < 1e-9);
    }

    #[test]
    fn test_forward_extrapolation_from_start_anchor() {
        let records = vec![
            observed(0, Win, 2000),
            game(1, Win),
            game(2, Loss),
            game(3, Win),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[1..]), vec![Some(2025), Some(2000), Some(2025)]);

        // Undo the natural deltas from the last estimate to recover the anchor.
        let back = out[1..]
            .iter()
            .rev()
            .fold(out[3].sr.unwrap(), |sr, m| match m.record.result {
                Win => sr - 25,
                Loss => sr + 25,
                _ => sr,
            });
        assert_eq!(back, 2000);
    }

    #[test]
    fn test_backward_extrapolation_from_end_anchor() {
        let records = vec![
            game(0, Win),
            game(1, Win),
            game(2, Loss),
            observed(3, Win, 1500),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[..3]), vec![Some(1475), Some(1500), Some(1475)]);
    }

    #[test]
    fn test_no_anchor_stays_unresolved() {
        let records = vec![game(0, Win), game(1, Loss), game(2, Draw)];
        let out = run(&records);
        assert_eq!(srs(&out), vec![None, None, None]);
        assert!(out
            .iter()
            .all(|m| m.estimate == Some(EstimateReason::Unknown)));
        assert!(out.iter().all(|m| !m.is_graphable()));
    }

    #[test]
    fn test_one_sided_run_is_interpolated() {
        let records = vec![
            observed(0, Loss, 1000),
            game(1, Win),
            game(2, Win),
            game(3, Win),
            game(4, Win),
            observed(5, Draw, 1200),
        ];
        let out = run(&records);
        assert_eq!(
            srs(&out[1..5]),
            vec![Some(1050), Some(1100), Some(1150), Some(1200)]
        );
    }

    #[test]
    fn test_draw_is_tied_to_previous_match() {
        let records = vec![
            observed(0, Loss, 1000),
            game(1, Win),
            game(2, Draw),
            game(3, Win),
            observed(4, Draw, 1100),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[1..4]), vec![Some(1050), Some(1050), Some(1100)]);
    }

    #[test]
    fn test_leading_draw_keeps_value_flat() {
        let records = vec![
            observed(0, Loss, 1000),
            game(1, Draw),
            game(2, Win),
            observed(3, Draw, 1050),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[1..3]), vec![Some(1000), Some(1050)]);
    }

    #[test]
    fn test_unrecognized_result_contributes_nothing_when_scaling() {
        let records = vec![
            observed(0, Loss, 1000),
            game(1, Win),
            game(2, Loss),
            game(3, MatchResult::Unrecognized("ERROR".to_string())),
            observed(4, Draw, 1050),
        ];
        let out = run(&records);
        assert_eq!(srs(&out[1..4]), vec![Some(1075), Some(1050), Some(1050)]);
    }

    #[test]
    fn test_unknown_result_does_not_propagate_start_sr() {
        let out = run(&[game(0, Unknown).with_start_sr(1500)]);
        assert_eq!(out[0].sr, None);
    }

    #[test]
    fn test_placement_reason() {
        let records = vec![
            game(0, Win).placement(),
            game(1, Loss).placement(),
            observed(2, Win, 2546),
        ];
        let out = run(&records);
        assert_eq!(out[0].estimate, Some(EstimateReason::Placement));
        assert_eq!(out[2].estimate, None);
        assert_eq!(srs(&out[..2]), vec![Some(2546), Some(2521)]);
    }

    #[test]
    fn test_off_season_matches_behave_like_draws() {
        let table = SeasonTable::new(
            "Pre",
            vec![Season::new(BASE - 3600, "Break", true)],
        );
        let estimator = RatingEstimator::new(&table, 25.0);
        let out = estimator.estimate(&[game(0, Win).with_start_sr(1500)]);

        assert_eq!(out[0].sr, Some(1500));
        assert_eq!(out[0].estimate, Some(EstimateReason::OffSeason));
        assert_eq!(out[0].season, "Break");
        assert!(out[0].off_season);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let records = vec![
            observed(3, Draw, 1100),
            game(2, Loss),
            game(1, Win),
            observed(0, Loss, 1000),
        ];
        let out = run(&records);
        let keys: Vec<_> = out.iter().map(|m| m.record.start_time).collect();
        assert_eq!(keys, vec![at(0), at(1), at(2), at(3)]);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_segments_are_split_by_known_values() {
        let table = SeasonTable::historical();
        let estimator = RatingEstimator::new(&table, 25.0);
        let records = vec![
            game(0, Win),
            observed(1, Win, 1500),
            game(2, Loss),
            game(3, Draw),
            game(4, Loss),
        ];
        let annotated: Vec<_> = records.iter().map(|r| estimator.annotate(r)).collect();
        let resolved = estimator.propagate_direct(&annotated);
        let segments = estimator.discover_segments(&annotated, &resolved);

        assert_eq!(
            segments,
            vec![
                Segment {
                    start: None,
                    end: Some(1475.0),
                    groups: vec![vec![0]],
                },
                Segment {
                    start: Some(1500.0),
                    end: None,
                    groups: vec![vec![2, 3], vec![4]],
                },
            ]
        );
    }
}
