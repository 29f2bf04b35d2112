//! Temporal processing for weather time series.
//!
//! Pure functions over a series and its [`TimeRange`](series_common::TimeRange):
//!
//! - [`resample`]: move a series onto another time grid with the variable's
//!   [`Interpolation`](series_common::Interpolation) kind
//! - [`fill_gaps`]: fill NaN runs in place (cadence switches mid-series)
//! - [`deaverage`] / [`deaccumulate`]: per-step values from running
//!   averages and running sums
//!
//! Solar interpolation needs a clear-sky factor from an astronomy model,
//! supplied through the [`SolarFactor`] trait.

pub mod accumulate;
pub mod error;
pub mod gapfill;
pub mod hermite;
pub mod resample;
pub mod solar;

pub use accumulate::{deaccumulate, deaverage};
pub use error::{Result, TemporalError};
pub use gapfill::{fill_gaps, Gap};
pub use hermite::{clamp_bounds, hermite, linear, round_to_scale};
pub use resample::{resample, Position};
pub use solar::{SolarContext, SolarFactor, MIN_SOLAR_FACTOR};
