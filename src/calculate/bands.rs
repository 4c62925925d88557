//! Shaded regions behind runs of estimated points.

use serde::Serialize;

use crate::models::EstimateReason;

/// One rectangle behind an estimated point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EstimateBand {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
    pub reason: EstimateReason,
}

/// Bands for every maximal run of consecutive estimated points.
///
/// Points are (x, sr, reason); a point with no reason ends the current run.
/// All bands of a run share the run's vertical extent.
pub fn estimate_bands(
    points: &[(f64, i32, Option<EstimateReason>)],
    y_padding: f64,
) -> Vec<EstimateBand> {
    let mut bands = Vec::new();
    let mut run: Vec<(f64, i32, EstimateReason)> = Vec::new();

    for &(x, sr, reason) in points {
        match reason {
            Some(reason) => run.push((x, sr, reason)),
            None => outline(&mut run, y_padding, &mut bands),
        }
    }
    outline(&mut run, y_padding, &mut bands);

    bands
}

fn outline(
    run: &mut Vec<(f64, i32, EstimateReason)>,
    y_padding: f64,
    bands: &mut Vec<EstimateBand>,
) {
    let Some(min) = run.iter().map(|(_, sr, _)| *sr).min() else {
        return;
    };
    let max = run.iter().map(|(_, sr, _)| *sr).max().unwrap_or(min);

    bands.extend(run.drain(..).map(|(x, _, reason)| EstimateBand {
        x0: x - 0.5,
        x1: x + 0.5,
        y0: f64::from(min) - y_padding,
        y1: f64::from(max) + y_padding,
        reason,
    }));
}
