//! Combining readers of several domains into one series.
//!
//! Readers are ranked lowest to highest resolution. The last reader always
//! wins; lower readers only fill positions it leaves NaN.

use async_trait::async_trait;
use futures::future::try_join_all;
use series_common::{TimeRange, VariableDescriptor};
use tracing::debug;

use crate::error::{ReaderError, Result};
use crate::reader::{DataAndUnit, TimeSeriesReader};

/// Read `variable` from `readers` (lowest to highest resolution) and merge.
///
/// The unit is the one reported by the highest-resolution reader. Lower
/// readers are only queried while the merged series still has NaNs.
pub async fn get_mixed<R: TimeSeriesReader>(
    readers: &[R],
    variable: &dyn VariableDescriptor,
    time: &TimeRange,
) -> Result<DataAndUnit> {
    let (highest, lower) = readers.split_last().ok_or(ReaderError::NoReaders)?;
    let mut merged = highest.get(variable, time).await?;
    check_len(highest, time, &merged.data)?;
    if lower.is_empty() || !merged.has_missing() {
        return Ok(merged);
    }

    if variable.requires_offset_correction() {
        let mut deltas = DeltaSeries::encode(&merged.data);
        for reader in lower.iter().rev() {
            let other = reader.get(variable, time).await?;
            check_len(reader, time, &other.data)?;
            let filled = deltas.fill_from(&other.data);
            debug!(reader = reader.name(), filled, "Filled deltas from lower resolution");
            if deltas.is_complete() {
                break;
            }
        }
        merged.data = deltas.decode();
    } else {
        for reader in lower.iter().rev() {
            let other = reader.get(variable, time).await?;
            check_len(reader, time, &other.data)?;
            let filled = fill_missing(&mut merged.data, &other.data);
            debug!(reader = reader.name(), filled, "Filled from lower resolution");
            if !merged.has_missing() {
                break;
            }
        }
    }
    Ok(merged)
}

fn check_len<R: TimeSeriesReader + ?Sized>(reader: &R, time: &TimeRange, data: &[f32]) -> Result<()> {
    if data.len() != time.count {
        return Err(ReaderError::LengthMismatch {
            reader: reader.name().to_string(),
            expected: time.count,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Copy values of `other` into NaN positions of `data`.
fn fill_missing(data: &mut [f32], other: &[f32]) -> usize {
    let mut filled = 0;
    for (dst, &src) in data.iter_mut().zip(other) {
        if dst.is_nan() && !src.is_nan() {
            *dst = src;
            filled += 1;
        }
    }
    filled
}

/// Delta-encoded series for mixing cumulative variables.
///
/// `delta[x] = raw[x] - raw[x - 1]`, with `delta[0] = raw[0]`. A valid value
/// whose predecessor is missing cannot be expressed as a delta; it is kept as
/// an anchor and only used if no other source supplies the delta.
#[derive(Debug, Clone)]
struct DeltaSeries {
    deltas: Vec<f32>,
    anchors: Vec<Option<f32>>,
}

impl DeltaSeries {
    fn encode(raw: &[f32]) -> Self {
        let mut deltas = Vec::with_capacity(raw.len());
        let mut anchors = vec![None; raw.len()];
        for (x, &value) in raw.iter().enumerate() {
            if x == 0 {
                deltas.push(value);
                continue;
            }
            let prev = raw[x - 1];
            if prev.is_nan() && !value.is_nan() {
                anchors[x] = Some(value);
            }
            deltas.push(value - prev);
        }
        Self { deltas, anchors }
    }

    fn is_complete(&self) -> bool {
        self.deltas.iter().all(|v| !v.is_nan())
    }

    /// Fill missing deltas from another source's own deltas. Returns the
    /// number of positions filled.
    fn fill_from(&mut self, other: &[f32]) -> usize {
        let mut filled = 0;
        for x in 0..self.deltas.len() {
            if !self.deltas[x].is_nan() {
                continue;
            }
            let delta = if x == 0 {
                other[0]
            } else {
                other[x] - other[x - 1]
            };
            if !delta.is_nan() {
                self.deltas[x] = delta;
                filled += 1;
            }
        }
        filled
    }

    /// Cumulative sum back to absolute values. Unresolved deltas fall back to
    /// their anchor or stay NaN without breaking the running sum.
    fn decode(self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.deltas.len());
        let mut running = f32::NAN;
        for (x, (delta, anchor)) in self.deltas.into_iter().zip(self.anchors).enumerate() {
            if x == 0 {
                running = delta;
                out.push(delta);
            } else if !delta.is_nan() && !running.is_nan() {
                running += delta;
                out.push(running);
            } else if let Some(anchor) = anchor {
                running = anchor;
                out.push(anchor);
            } else {
                out.push(f32::NAN);
            }
        }
        out
    }
}

/// A ranked set of readers for one location, usable as a reader itself.
pub struct ReaderMixer<R> {
    readers: Vec<R>,
}

impl<R: TimeSeriesReader> ReaderMixer<R> {
    /// `readers` ordered lowest to highest resolution.
    pub fn new(readers: Vec<R>) -> Result<Self> {
        if readers.is_empty() {
            return Err(ReaderError::NoReaders);
        }
        Ok(Self { readers })
    }

    pub fn readers(&self) -> &[R] {
        &self.readers
    }
}

#[async_trait]
impl<R: TimeSeriesReader> TimeSeriesReader for ReaderMixer<R> {
    fn name(&self) -> &str {
        self.readers
            .last()
            .map(|reader| reader.name())
            .unwrap_or("mixed")
    }

    async fn get(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<DataAndUnit> {
        get_mixed(&self.readers, variable, time).await
    }

    async fn prefetch(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<()> {
        try_join_all(self.readers.iter().map(|reader| reader.prefetch(variable, time))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_series_approx_eq;

    #[test]
    fn test_delta_round_trip_with_gap() {
        let nan = f32::NAN;
        let deltas = DeltaSeries::encode(&[10.0, nan, 12.0, 15.0]);
        assert_eq!(deltas.anchors[2], Some(12.0));
        assert!(!deltas.is_complete());
        assert_series_approx_eq!(deltas.decode(), [10.0, nan, 12.0, 15.0], 1e-6);
    }

    #[test]
    fn test_delta_fill_bridges_gap() {
        let nan = f32::NAN;
        let mut deltas = DeltaSeries::encode(&[10.0, nan, 12.0, 15.0]);
        let filled = deltas.fill_from(&[100.0, 101.0, 103.0, 106.0]);
        // positions 1 and 2 take the other source's steps
        assert_eq!(filled, 2);
        assert!(deltas.is_complete());
        assert_series_approx_eq!(deltas.decode(), [10.0, 11.0, 13.0, 16.0], 1e-6);
    }

    #[test]
    fn test_delta_leading_gap() {
        let nan = f32::NAN;
        let mut deltas = DeltaSeries::encode(&[nan, nan, 5.0, 6.0]);
        deltas.fill_from(&[1.0, 2.0, nan, 4.0]);
        // delta at 2 is unresolved in both, so the anchor takes over
        assert_series_approx_eq!(deltas.decode(), [1.0, 2.0, 5.0, 6.0], 1e-6);
    }

    #[test]
    fn test_fill_missing() {
        let nan = f32::NAN;
        let mut data = [1.0, nan, nan];
        assert_eq!(fill_missing(&mut data, &[9.0, 2.0, nan]), 1);
        assert_series_approx_eq!(data, [1.0, 2.0, nan], 1e-6);
    }
}
