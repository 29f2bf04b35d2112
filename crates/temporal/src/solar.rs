//! Solar radiation factor seam and clearness-index helpers.

use series_common::Timestamp;

/// Below this factor the sun is (almost) down and a clearness index is
/// meaningless.
pub const MIN_SOLAR_FACTOR: f32 = 0.005;

/// Clear-sky radiation factor supplied by an astronomy model.
pub trait SolarFactor {
    /// Mean factor over `(time - dt_seconds, time]` at `location`.
    fn backwards_averaged(&self, location: usize, time: Timestamp, dt_seconds: i64) -> f32;
}

impl<F> SolarFactor for F
where
    F: Fn(usize, Timestamp, i64) -> f32,
{
    fn backwards_averaged(&self, location: usize, time: Timestamp, dt_seconds: i64) -> f32 {
        self(location, time, dt_seconds)
    }
}

/// Solar factor source bound to one grid location.
#[derive(Clone, Copy)]
pub struct SolarContext<'a> {
    pub factor: &'a dyn SolarFactor,
    pub location: usize,
}

impl<'a> SolarContext<'a> {
    pub fn new(factor: &'a dyn SolarFactor, location: usize) -> Self {
        Self { factor, location }
    }

    pub fn at(&self, time: Timestamp, dt_seconds: i64) -> f32 {
        self.factor
            .backwards_averaged(self.location, time, dt_seconds)
    }

    /// Clearness index `value / factor`, or `None` when the factor is too
    /// small to divide by or the value is missing.
    pub fn clearness(&self, value: f32, time: Timestamp, dt_seconds: i64) -> Option<f32> {
        let factor = self.at(time, dt_seconds);
        if factor <= MIN_SOLAR_FACTOR || value.is_nan() {
            None
        } else {
            Some(value / factor)
        }
    }
}

impl std::fmt::Debug for SolarContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolarContext")
            .field("location", &self.location)
            .finish()
    }
}

/// Resolve unresolved clearness indices of the four Hermite points.
///
/// Each point falls back to its neighbours in a fixed order (A: B, C, D;
/// B: A, C, D; C: B, D, A; D: C, B, A). Returns `None` if no point resolved.
pub fn resolve_escalation(points: [Option<f32>; 4]) -> Option<[f32; 4]> {
    const ORDER: [[usize; 3]; 4] = [[1, 2, 3], [0, 2, 3], [1, 3, 0], [2, 1, 0]];
    let mut out = [0.0; 4];
    for (i, fallbacks) in ORDER.iter().enumerate() {
        out[i] = match points[i] {
            Some(v) => v,
            None => fallbacks.iter().find_map(|&j| points[j])?,
        };
    }
    Some(out)
}
