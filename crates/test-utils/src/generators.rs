//! Test data generators for creating synthetic weather-like series.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite.

use series_common::{TimeRange, Timestamp};

/// Linear ramp `start, start + step, ...` of length `n`.
///
/// ```
/// use test_utils::ramp;
///
/// assert_eq!(ramp(3, 10.0, 2.5), vec![10.0, 12.5, 15.0]);
/// ```
pub fn ramp(n: usize, start: f32, step: f32) -> Vec<f32> {
    (0..n).map(|i| start + step * i as f32).collect()
}

/// Creates a multi-location series with predictable values.
///
/// Value at `(location, t)` is `location * 1000 + t`, laid out location-major,
/// so a read of any sub-range can be checked without the source array.
///
/// ```
/// use test_utils::location_series;
///
/// let data = location_series(3, 4);
/// assert_eq!(data.len(), 12);
/// assert_eq!(data[4 + 2], 1002.0);
/// ```
pub fn location_series(locations: usize, n_time: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(locations * n_time);
    for location in 0..locations {
        for t in 0..n_time {
            data.push((location * 1000 + t) as f32);
        }
    }
    data
}

/// Expected value of [`location_series`] at `(location, t)`.
pub fn location_value(location: usize, t: i64) -> f32 {
    (location as i64 * 1000 + t) as f32
}

/// Clear-sky radiation factor with a daily cycle: 0 at night, a sine bump
/// between 06:00 and 18:00 UTC peaking at 1.
pub fn clear_sky_factor(t: Timestamp) -> f32 {
    let seconds_of_day = t.0.rem_euclid(86_400) as f32;
    let hour = seconds_of_day / 3600.0;
    if (6.0..=18.0).contains(&hour) {
        (std::f32::consts::PI * (hour - 6.0) / 12.0).sin().max(0.0)
    } else {
        0.0
    }
}

/// Diurnal shortwave radiation in W/m² for every instant of `time`.
pub fn diurnal_radiation(time: &TimeRange, peak: f32) -> Vec<f32> {
    time.iter().map(|t| peak * clear_sky_factor(t)).collect()
}

/// Running sum of `increments`.
///
/// ```
/// use test_utils::cumulative_sum;
///
/// assert_eq!(cumulative_sum(&[1.0, 2.0, 3.0]), vec![1.0, 3.0, 6.0]);
/// ```
pub fn cumulative_sum(increments: &[f32]) -> Vec<f32> {
    increments
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Running average over windows of `width` steps starting at `offset`, the
/// way models report backwards-averaged fields.
pub fn running_average(values: &[f32], width: usize, offset: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (t, &v) in values.iter().enumerate() {
        let h = (t + width - offset % width) % width;
        if h == 0 {
            sum = 0.0;
        }
        sum += v;
        out.push(sum / (h + 1) as f32);
    }
    out
}

/// Copy of `values` with the given positions set to NaN.
pub fn with_gaps(values: &[f32], gaps: &[usize]) -> Vec<f32> {
    let mut out = values.to_vec();
    for &i in gaps {
        if let Some(v) = out.get_mut(i) {
            *v = f32::NAN;
        }
    }
    out
}

/// Keep every `stride`-th value and blank the rest, as when an hourly model
/// switches to 3-hourly output later in the forecast.
pub fn thin_after(values: &[f32], from: usize, stride: usize) -> Vec<f32> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if i > from && (i - from) % stride != 0 {
                f32::NAN
            } else {
                v
            }
        })
        .collect()
}
