//! Resampling a series from its native cadence onto a target time grid.
//!
//! All functions are pure. Source samples outside the series are replaced by
//! the nearest edge sample; NaN samples propagate except where the Hermite
//! kernels replicate neighbours.

use series_common::{Interpolation, TimeRange, Timestamp};
use tracing::trace;

use crate::error::{Result, TemporalError};
use crate::hermite::{clamp_bounds, hermite, linear, round_to_scale};
use crate::solar::{resolve_escalation, SolarContext};

/// Position of a target instant inside the source grid: source index at or
/// before the instant, plus the fraction towards the next source step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub index: i64,
    pub fraction: f32,
}

impl Position {
    pub fn locate(source: &TimeRange, t: Timestamp) -> Self {
        let offset = t.0 - source.start.0;
        let index = offset.div_euclid(source.dt_seconds);
        let remainder = offset.rem_euclid(source.dt_seconds);
        Self {
            index,
            fraction: remainder as f32 / source.dt_seconds as f32,
        }
    }

    /// Source index at or after the instant.
    pub fn ceil_index(&self) -> i64 {
        if self.fraction > 0.0 {
            self.index + 1
        } else {
            self.index
        }
    }
}

/// Sample at `index`, clamped to the series edges.
fn edge(series: &[f32], index: i64) -> f32 {
    let last = series.len() as i64 - 1;
    series[index.clamp(0, last) as usize]
}

/// Sample at `index` if it exists and is not NaN.
fn valid(series: &[f32], index: i64) -> Option<f32> {
    if index < 0 {
        return None;
    }
    series.get(index as usize).copied().filter(|v| !v.is_nan())
}

/// Resample `series`, sampled on `source`, onto `target`.
///
/// `scale_factor` is the variable's storage precision used to round linear
/// results. Solar interpolation needs `solar`; other kinds ignore it.
pub fn resample(
    series: &[f32],
    source: &TimeRange,
    target: &TimeRange,
    interpolation: Interpolation,
    scale_factor: f32,
    solar: Option<SolarContext<'_>>,
) -> Result<Vec<f32>> {
    TemporalError::check_len(source.len(), series.len())?;
    if source == target {
        return Ok(series.to_vec());
    }
    if series.is_empty() {
        return Ok(vec![f32::NAN; target.len()]);
    }
    trace!(%source, %target, %interpolation, "resampling");

    let out = match interpolation {
        Interpolation::Linear => target
            .iter()
            .map(|t| linear_at(series, Position::locate(source, t), scale_factor))
            .collect(),
        Interpolation::Hermite { bounds } => target
            .iter()
            .map(|t| clamp_bounds(hermite_at(series, Position::locate(source, t)), bounds))
            .collect(),
        Interpolation::SolarBackwardsAveraged => {
            let solar = solar.ok_or(TemporalError::MissingSolarFactor)?;
            target
                .iter()
                .map(|t| solar_at(series, source, t, target.dt_seconds, &solar))
                .collect()
        }
        Interpolation::BackwardsSum => {
            let ratio = target.dt_seconds as f32 / source.dt_seconds as f32;
            target
                .iter()
                .map(|t| linear_at(series, Position::locate(source, t), scale_factor) * ratio)
                .collect()
        }
        Interpolation::Backwards => target
            .iter()
            .map(|t| edge(series, Position::locate(source, t).ceil_index()))
            .collect(),
    };
    Ok(out)
}

/// Linear interpolation, rounded to the storage precision.
pub fn linear_at(series: &[f32], pos: Position, scale_factor: f32) -> f32 {
    let a = edge(series, pos.index);
    if pos.fraction == 0.0 {
        return round_to_scale(a, scale_factor);
    }
    let b = edge(series, pos.index + 1);
    round_to_scale(linear(a, b, pos.fraction), scale_factor)
}

/// Cubic Hermite. Missing or NaN neighbours are replicated from the inner
/// points: A and C from B, D from C.
pub fn hermite_at(series: &[f32], pos: Position) -> f32 {
    let b = edge(series, pos.index);
    if b.is_nan() || pos.fraction == 0.0 {
        return b;
    }
    let c = valid(series, pos.index + 1).unwrap_or(b);
    let a = valid(series, pos.index - 1).unwrap_or(b);
    let d = valid(series, pos.index + 2).unwrap_or(c);
    hermite(a, b, c, d, pos.fraction)
}

/// Solar interpolation via clearness index.
///
/// Each of the four bracketing source samples is divided by the solar factor
/// averaged over its own source step. Unresolved points (night, missing)
/// escalate to neighbours; if none resolve the result is 0.
pub fn solar_at(
    series: &[f32],
    source: &TimeRange,
    t: Timestamp,
    target_dt: i64,
    solar: &SolarContext<'_>,
) -> f32 {
    let pos = Position::locate(source, t);
    let b = edge(series, pos.index);
    if b.is_nan() {
        return f32::NAN;
    }
    let last = series.len() as i64 - 1;
    let kt_at = |index: i64| {
        let index = index.clamp(0, last);
        solar.clearness(
            series[index as usize],
            source.get(index as usize),
            source.dt_seconds,
        )
    };
    let points = [
        kt_at(pos.index - 1),
        kt_at(pos.index),
        kt_at(pos.index + 1),
        kt_at(pos.index + 2),
    ];
    let Some([a, b, c, d]) = resolve_escalation(points) else {
        return 0.0;
    };
    let kt = hermite(a, b, c, d, pos.fraction);
    (kt * solar.at(t, target_dt)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_series_approx_eq};

    fn hourly(count: usize) -> TimeRange {
        TimeRange::new(Timestamp(0), 3600, count)
    }

    #[test]
    fn test_position() {
        let source = TimeRange::new(Timestamp(0), 7200, 4);
        let pos = Position::locate(&source, Timestamp(3600));
        assert_eq!(pos, Position { index: 0, fraction: 0.5 });
        assert_eq!(pos.ceil_index(), 1);

        let before = Position::locate(&source, Timestamp(-3600));
        assert_eq!(before.index, -1);
        assert_eq!(before.fraction, 0.5);
    }

    #[test]
    fn test_linear_upsample() {
        let source = TimeRange::new(Timestamp(0), 7200, 3);
        let out = resample(
            &[0.0, 10.0, 20.0],
            &source,
            &hourly(5),
            Interpolation::Linear,
            0.0,
            None,
        )
        .unwrap();
        assert_series_approx_eq!(out, [0.0, 5.0, 10.0, 15.0, 20.0], 1e-6);
    }

    #[test]
    fn test_linear_rounds_to_scale() {
        let source = TimeRange::new(Timestamp(0), 3 * 3600, 2);
        let out = resample(&[0.0, 1.0], &source, &hourly(2), Interpolation::Linear, 10.0, None)
            .unwrap();
        assert_approx_eq!(out[1], 0.3, 1e-6);
    }

    #[test]
    fn test_edges_are_held() {
        let source = TimeRange::new(Timestamp(3600), 3600, 2);
        let out = resample(&[1.0, 2.0], &source, &hourly(4), Interpolation::Linear, 0.0, None)
            .unwrap();
        assert_series_approx_eq!(out, [1.0, 1.0, 2.0, 2.0], 1e-6);
    }

    #[test]
    fn test_hermite_bounds() {
        let source = TimeRange::new(Timestamp(0), 7200, 4);
        let out = resample(
            &[0.0, 100.0, 100.0, 0.0],
            &source,
            &hourly(7),
            Interpolation::Hermite {
                bounds: Some((0.0, 100.0)),
            },
            1.0,
            None,
        )
        .unwrap();
        // Overshoot between the two 100s is clamped
        assert_eq!(out[3], 100.0);
        assert!(out.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_hermite_replicates_nan_neighbours() {
        let pos = Position {
            index: 1,
            fraction: 0.5,
        };
        // A is NaN and replicated from B, D missing and replicated from C
        let v = hermite_at(&[f32::NAN, 10.0, 20.0], pos);
        assert_approx_eq!(v, hermite(10.0, 10.0, 20.0, 20.0, 0.5), 1e-6);
        assert_approx_eq!(v, 15.0, 1e-5);
    }

    #[test]
    fn test_backwards_sum_preserves_total() {
        let source = TimeRange::new(Timestamp(0), 3 * 3600, 3);
        let out = resample(
            &[3.0, 3.0, 3.0],
            &source,
            &hourly(9),
            Interpolation::BackwardsSum,
            0.0,
            None,
        )
        .unwrap();
        assert_approx_eq!(out.iter().sum::<f32>(), 9.0, 1e-5);
    }

    #[test]
    fn test_backwards_step_hold() {
        let source = TimeRange::new(Timestamp(0), 3 * 3600, 3);
        let out = resample(
            &[1.0, 2.0, 3.0],
            &source,
            &hourly(7),
            Interpolation::Backwards,
            0.0,
            None,
        )
        .unwrap();
        assert_eq!(out, vec![1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_solar_requires_factor() {
        let err = resample(
            &[1.0, 2.0],
            &hourly(2),
            &TimeRange::new(Timestamp(0), 1800, 4),
            Interpolation::SolarBackwardsAveraged,
            1.0,
            None,
        )
        .unwrap_err();
        assert_eq!(err, TemporalError::MissingSolarFactor);
    }

    #[test]
    fn test_solar_night_is_zero() {
        let factor = |_: usize, _: Timestamp, _: i64| 0.0_f32;
        let ctx = SolarContext::new(&factor, 0);
        let out = resample(
            &[0.0, 0.0, 0.0],
            &hourly(3),
            &TimeRange::new(Timestamp(0), 1800, 5),
            Interpolation::SolarBackwardsAveraged,
            1.0,
            Some(ctx),
        )
        .unwrap();
        assert_eq!(out, vec![0.0; 5]);
    }

    #[test]
    fn test_solar_constant_clearness() {
        // Constant factor: output is the clearness index times the factor
        let factor = |_: usize, _: Timestamp, _: i64| 0.5_f32;
        let ctx = SolarContext::new(&factor, 3);
        let source = TimeRange::new(Timestamp(0), 3 * 3600, 4);
        let out = resample(
            &[400.0, 400.0, 400.0, 400.0],
            &source,
            &hourly(10),
            Interpolation::SolarBackwardsAveraged,
            1.0,
            Some(ctx),
        )
        .unwrap();
        assert_series_approx_eq!(out, vec![400.0; 10], 1e-3);
    }

    #[test]
    fn test_length_mismatch() {
        let err = resample(&[1.0], &hourly(2), &hourly(2), Interpolation::Linear, 1.0, None)
            .unwrap_err();
        assert_eq!(
            err,
            TemporalError::LengthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }
}
