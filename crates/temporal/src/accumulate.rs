//! Recovering per-step values from running averages and running sums.
//!
//! Models often report fields averaged or accumulated since the start of an
//! output window (e.g. every 6 hours). `width` is the window length in steps,
//! `offset` the index of the first window start.

use crate::error::{Result, TemporalError};

fn check_width(width: usize) -> Result<()> {
    if width == 0 {
        return Err(TemporalError::InvalidWindow(
            "window width must be at least one step".to_string(),
        ));
    }
    Ok(())
}

/// Position of step `t` inside its window, 0 at the window start.
#[inline]
fn window_step(t: usize, width: usize, offset: usize) -> usize {
    (t + width - offset % width) % width
}

/// Turn running averages into per-step values in place.
///
/// NaN steps are skipped; the next valid step absorbs them and holds the mean
/// over itself and the skipped steps. Skipped steps stay NaN. The first valid
/// step of a window that began before the series is NaN as well, since its
/// predecessors are unknown.
pub fn deaverage(series: &mut [f32], width: usize, offset: usize) -> Result<()> {
    check_width(width)?;
    let mut prev = 0.0;
    let mut prev_weight = 0.0;
    let mut skipped = 0usize;
    let mut anchored = false;
    for (t, value) in series.iter_mut().enumerate() {
        let h = window_step(t, width, offset);
        if h == 0 {
            prev = 0.0;
            prev_weight = 0.0;
            skipped = 0;
            anchored = true;
        }
        if value.is_nan() {
            skipped += 1;
            continue;
        }
        let weight = (h + 1) as f32;
        let current = *value;
        *value = if anchored {
            (current * weight - prev * prev_weight) / (skipped + 1) as f32
        } else {
            f32::NAN
        };
        anchored = true;
        prev = current;
        prev_weight = weight;
        skipped = 0;
    }
    Ok(())
}

/// Turn running sums into per-step increments in place.
///
/// Increments are never negative. A single missing predecessor is bridged by
/// halving the difference to the value two steps back, which matches the
/// one-step dropouts seen in some upstream accumulations. Steps whose window
/// began before the series and have no predecessor in it are NaN.
pub fn deaccumulate(series: &mut [f32], width: usize, offset: usize) -> Result<()> {
    check_width(width)?;
    // Reverse order keeps predecessors untouched while we read them
    for t in (0..series.len()).rev() {
        let value = series[t];
        if value.is_nan() {
            continue;
        }
        let h = window_step(t, width, offset);
        series[t] = if h == 0 {
            value.max(0.0)
        } else {
            let prev = if t >= 1 { series[t - 1] } else { f32::NAN };
            if !prev.is_nan() {
                (value - prev).max(0.0)
            } else if h >= 2 && t >= 2 && !series[t - 2].is_nan() {
                ((value - series[t - 2]) / 2.0).max(0.0)
            } else {
                f32::NAN
            }
        };
    }
    Ok(())
}
