//! Grid interpolation over (TTC, move threshold) samples
//!
//! Each grid cell is split along its (i, j) → (i+1, j+1) diagonal and the
//! query is answered by linear interpolation inside the containing triangle.
//! When that is undefined (query below the smallest threshold, a missing
//! corner sample, or a single-row/column grid) the nearest available sample
//! is used instead, with both axes normalized to their span.

use crate::fingerprint::DirectionGrid;

/// Interpolated hit rate for one direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSample {
    /// Percentage in [0, 100]
    pub value: f64,
    /// True when linear interpolation was undefined and the nearest sample was used
    pub fallback: bool,
}

/// Look up a hit rate, clamping TTC to the sampled range and the move to the
/// largest threshold.
pub fn interpolate_grid(ttcs: &[f64], grid: &DirectionGrid, ttc: f64, move_pct: f64) -> GridSample {
    let (first, last) = match (ttcs.first(), ttcs.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => {
            return GridSample {
                value: 0.0,
                fallback: true,
            }
        }
    };

    let t = if ttc.is_nan() { first } else { ttc.clamp(first, last) };
    let m = if move_pct.is_nan() {
        0.0
    } else {
        move_pct.min(grid.max_threshold())
    };

    match linear(ttcs, grid, t, m) {
        Some(value) => GridSample {
            value: value.clamp(0.0, 100.0),
            fallback: false,
        },
        None => GridSample {
            value: nearest(ttcs, grid, t, m).unwrap_or(0.0).clamp(0.0, 100.0),
            fallback: true,
        },
    }
}

/// Index `i` such that `points[i] <= x <= points[i + 1]`
fn bracket(points: &[f64], x: f64) -> Option<usize> {
    let last = *points.last()?;
    if points.len() < 2 || x < points[0] || x > last {
        return None;
    }
    let upper = points.partition_point(|p| *p <= x);
    Some(upper.saturating_sub(1).min(points.len() - 2))
}

fn linear(ttcs: &[f64], grid: &DirectionGrid, t: f64, m: f64) -> Option<f64> {
    let thresholds = grid.thresholds();
    let i = bracket(ttcs, t)?;
    let j = bracket(thresholds, m)?;

    let u = (t - ttcs[i]) / (ttcs[i + 1] - ttcs[i]);
    let v = (m - thresholds[j]) / (thresholds[j + 1] - thresholds[j]);

    let v00 = grid.value(i, j)?;
    let v11 = grid.value(i + 1, j + 1)?;

    if u >= v {
        let v10 = grid.value(i + 1, j)?;
        Some(v00 + u * (v10 - v00) + v * (v11 - v10))
    } else {
        let v01 = grid.value(i, j + 1)?;
        Some(v00 + v * (v01 - v00) + u * (v11 - v01))
    }
}

fn span(points: &[f64]) -> f64 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if last > first => last - first,
        _ => 1.0,
    }
}

fn nearest(ttcs: &[f64], grid: &DirectionGrid, t: f64, m: f64) -> Option<f64> {
    let thresholds = grid.thresholds();
    let t_span = span(ttcs);
    let m_span = span(thresholds);

    let mut best: Option<(f64, f64)> = None;
    for (i, ttc) in ttcs.iter().enumerate() {
        for (j, threshold) in thresholds.iter().enumerate() {
            let Some(value) = grid.value(i, j) else {
                continue;
            };
            let dt = (t - ttc) / t_span;
            let dm = (m - threshold) / m_span;
            let dist = dt * dt + dm * dm;
            if best.map_or(true, |(d, _)| dist < d) {
                best = Some((dist, value));
            }
        }
    }
    best.map(|(_, value)| value)
}
