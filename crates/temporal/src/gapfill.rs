//! In-place filling of NaN runs inside one series.
//!
//! Used when a model switches cadence mid-forecast (hourly becoming 3-hourly)
//! and the stored series has regular holes. For every run of NaNs the next
//! valid sample after the run is C and the one after that is D. The spacing
//! `D - C` is replicated backwards to find B and A. Missing points are
//! replicated from their inner neighbour.

use series_common::{Interpolation, TimeRange};
use tracing::debug;

use crate::error::{Result, TemporalError};
use crate::hermite::{clamp_bounds, hermite, linear};
use crate::solar::{resolve_escalation, SolarContext};

/// Support points around one gap `[start, c)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    /// First NaN index.
    pub start: usize,
    /// First valid index after the gap.
    pub c: usize,
    /// Next valid index after `c`, or `c` if there is none.
    pub d: usize,
    pub pos_b: i64,
    pub pos_a: i64,
}

impl Gap {
    /// Locate the gap starting at `start`. `None` if no valid sample follows.
    pub fn locate(series: &[f32], start: usize) -> Option<Self> {
        let c = next_valid(series, start)?;
        let d = next_valid(series, c + 1).unwrap_or(c);
        let width = (if d != c { d - c } else { c - start + 1 }) as i64;
        let mut pos_b = c as i64 - width;
        if pos_b >= start as i64 {
            pos_b = start as i64 - 1;
        }
        Some(Self {
            start,
            c,
            d,
            pos_b,
            pos_a: pos_b - width,
        })
    }

    pub fn len(&self) -> usize {
        self.c - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.c == self.start
    }

    /// Fraction of `x` between B and C.
    pub fn fraction(&self, x: usize) -> f32 {
        (x as i64 - self.pos_b) as f32 / (self.c as i64 - self.pos_b) as f32
    }

    /// Values at A, B, C, D with replication for missing points.
    fn points(&self, series: &[f32]) -> [f32; 4] {
        let c = series[self.c];
        let d = series[self.d];
        let b = valid(series, self.pos_b).unwrap_or(c);
        let a = valid(series, self.pos_a).unwrap_or(b);
        [a, b, c, d]
    }
}

fn next_valid(series: &[f32], from: usize) -> Option<usize> {
    series
        .iter()
        .skip(from)
        .position(|v| !v.is_nan())
        .map(|i| i + from)
}

fn valid(series: &[f32], index: i64) -> Option<f32> {
    if index < 0 {
        return None;
    }
    series.get(index as usize).copied().filter(|v| !v.is_nan())
}

/// Fill every NaN run in `series` according to `interpolation`. Trailing NaNs
/// with no valid sample after them stay NaN. Returns the number of values
/// written.
pub fn fill_gaps(
    series: &mut [f32],
    time: &TimeRange,
    interpolation: Interpolation,
    solar: Option<SolarContext<'_>>,
) -> Result<usize> {
    TemporalError::check_len(time.len(), series.len())?;
    let solar = match interpolation {
        Interpolation::SolarBackwardsAveraged => {
            Some(solar.ok_or(TemporalError::MissingSolarFactor)?)
        }
        _ => None,
    };

    let mut filled = 0;
    let mut t = 0;
    while t < series.len() {
        if !series[t].is_nan() {
            t += 1;
            continue;
        }
        let Some(gap) = Gap::locate(series, t) else {
            break;
        };
        filled += match &solar {
            Some(solar) => fill_solar(series, time, &gap, solar),
            None => fill_plain(series, &gap, interpolation),
        };
        t = gap.c + 1;
    }
    if filled > 0 {
        debug!(filled, %interpolation, "filled gaps");
    }
    Ok(filled)
}

fn fill_plain(series: &mut [f32], gap: &Gap, interpolation: Interpolation) -> usize {
    let [a, b, c, d] = gap.points(series);
    match interpolation {
        // solar without a factor is rejected by fill_gaps
        Interpolation::Linear | Interpolation::SolarBackwardsAveraged => {
            for x in gap.start..gap.c {
                series[x] = linear(b, c, gap.fraction(x));
            }
        }
        Interpolation::Hermite { bounds } => {
            for x in gap.start..gap.c {
                series[x] = clamp_bounds(hermite(a, b, c, d, gap.fraction(x)), bounds);
            }
        }
        Interpolation::Backwards => {
            series[gap.start..gap.c].fill(c);
        }
        Interpolation::BackwardsSum => {
            // C holds the sum over the whole gap including its own step
            let share = c / (gap.len() + 1) as f32;
            series[gap.start..=gap.c].fill(share);
        }
    }
    gap.len()
}

/// Solar variant: interpolate clearness index. C averages over the whole gap
/// and is de-averaged onto its own native step. A and B are native steps, D
/// averages over `D - C` steps.
fn fill_solar(series: &mut [f32], time: &TimeRange, gap: &Gap, solar: &SolarContext<'_>) -> usize {
    let dt = time.dt_seconds;
    let kt = |index: i64, steps: i64| -> Option<f32> {
        let value = valid(series, index)?;
        solar.clearness(value, time.get(index as usize), steps.max(1) * dt)
    };
    let points = [
        kt(gap.pos_a, 1),
        kt(gap.pos_b, 1),
        kt(gap.c as i64, gap.c as i64 - gap.pos_b),
        kt(gap.d as i64, gap.d as i64 - gap.c as i64),
    ];
    let Some([a, b, c, d]) = resolve_escalation(points) else {
        series[gap.start..gap.c].fill(0.0);
        return gap.len();
    };
    for x in gap.start..gap.c {
        let k = hermite(a, b, c, d, gap.fraction(x));
        series[x] = (k * solar.at(time.get(x), dt)).max(0.0);
    }
    series[gap.c] = (c * solar.at(time.get(gap.c), dt)).max(0.0);
    gap.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use series_common::Timestamp;
    use test_utils::{assert_approx_eq, assert_series_approx_eq, ramp, thin_after};

    fn hourly(count: usize) -> TimeRange {
        TimeRange::new(Timestamp(0), 3600, count)
    }

    #[test]
    fn test_gap_support_points() {
        let nan = f32::NAN;
        let series = [0.0, 1.0, 2.0, nan, nan, 5.0, nan, nan, 8.0];
        let gap = Gap::locate(&series, 3).unwrap();
        assert_eq!((gap.c, gap.d, gap.pos_b, gap.pos_a), (5, 8, 2, -1));
        assert_eq!(gap.len(), 2);
        assert_approx_eq!(gap.fraction(3), 1.0 / 3.0, 1e-6);
    }

    #[test]
    fn test_gap_without_d_uses_own_width() {
        let nan = f32::NAN;
        let series = [1.0, nan, nan, 4.0];
        let gap = Gap::locate(&series, 1).unwrap();
        assert_eq!(gap.d, 3);
        assert_eq!(gap.pos_b, 0);
        assert_eq!(gap.pos_a, -3);
    }

    #[test]
    fn test_leading_gap_replicates_c() {
        let nan = f32::NAN;
        let mut series = [nan, nan, 3.0, 4.0];
        fill_gaps(&mut series, &hourly(4), Interpolation::Linear, None).unwrap();
        assert_series_approx_eq!(series, [3.0, 3.0, 3.0, 4.0], 1e-6);
    }

    #[test]
    fn test_trailing_gap_stays_nan() {
        let nan = f32::NAN;
        let mut series = [1.0, nan, 3.0, nan];
        let filled = fill_gaps(&mut series, &hourly(4), Interpolation::Linear, None).unwrap();
        assert_eq!(filled, 1);
        assert_series_approx_eq!(series, [1.0, 2.0, 3.0, nan], 1e-6);
    }

    #[test]
    fn test_hermite_fills_thinned_ramp() {
        let full = ramp(13, 0.0, 2.0);
        let mut series = thin_after(&full, 3, 3);
        fill_gaps(
            &mut series,
            &hourly(13),
            Interpolation::Hermite { bounds: None },
            None,
        )
        .unwrap();
        assert_series_approx_eq!(series[..10], full[..10], 1e-4);
        // last gap has no D, so it bends towards a flat tail
        assert!(series[10..].iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_backwards_sum_spreads_c() {
        let nan = f32::NAN;
        let mut series = [1.0, nan, nan, 6.0, 2.0];
        fill_gaps(&mut series, &hourly(5), Interpolation::BackwardsSum, None).unwrap();
        assert_series_approx_eq!(series, [1.0, 2.0, 2.0, 2.0, 2.0], 1e-6);
    }

    #[test]
    fn test_backwards_holds_c() {
        let nan = f32::NAN;
        let mut series = [1.0, nan, nan, 6.0];
        fill_gaps(&mut series, &hourly(4), Interpolation::Backwards, None).unwrap();
        assert_eq!(series, [1.0, 6.0, 6.0, 6.0]);
    }

    #[test]
    fn test_solar_constant_sky() {
        let factor = |_: usize, _: Timestamp, _: i64| 0.5_f32;
        let ctx = SolarContext::new(&factor, 0);
        let nan = f32::NAN;
        let mut series = [200.0, 200.0, nan, nan, 200.0, nan, nan, 200.0];
        fill_gaps(
            &mut series,
            &hourly(8),
            Interpolation::SolarBackwardsAveraged,
            Some(ctx),
        )
        .unwrap();
        assert_series_approx_eq!(series, [200.0; 8], 1e-3);
    }

    #[test]
    fn test_solar_night_fills_zero() {
        let factor = |_: usize, _: Timestamp, _: i64| 0.0_f32;
        let ctx = SolarContext::new(&factor, 0);
        let nan = f32::NAN;
        let mut series = [0.0, nan, nan, 0.0];
        fill_gaps(
            &mut series,
            &hourly(4),
            Interpolation::SolarBackwardsAveraged,
            Some(ctx),
        )
        .unwrap();
        assert_eq!(series, [0.0; 4]);
    }
}
