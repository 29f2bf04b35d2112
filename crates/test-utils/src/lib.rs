//! Shared test utilities for the weather time-series workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Series generators (ramps, diurnal radiation, running sums, gaps)
//! - A temp-dir backed domain fixture and standard variables
//! - Approximate equality macros that treat NaN as equal to NaN
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{assert_series_approx_eq, TempDomain};
//! ```

pub mod fixtures;
pub mod generators;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use generators::*;

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if !(diff <= epsilon) {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Element-wise approximate equality of two series. NaN only matches NaN.
///
/// ```ignore
/// use test_utils::assert_series_approx_eq;
///
/// assert_series_approx_eq!(&[1.0, f32::NAN], &[1.0001, f32::NAN], 0.001);
/// ```
#[macro_export]
macro_rules! assert_series_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: &[f32] = &$left[..];
        let right: &[f32] = &$right[..];
        if let Some(message) = $crate::series_mismatch(left, right, $epsilon as f32) {
            panic!(
                "assertion failed: `(left ≈ right)`: {}\n  left: `{:?}`,\n right: `{:?}`",
                message, left, right
            );
        }
    }};
}

/// Describe the first difference between two series, if any.
pub fn series_mismatch(left: &[f32], right: &[f32], epsilon: f32) -> Option<String> {
    if left.len() != right.len() {
        return Some(format!("length {} != {}", left.len(), right.len()));
    }
    left.iter()
        .zip(right)
        .enumerate()
        .find_map(|(i, (&l, &r))| match (l.is_nan(), r.is_nan()) {
            (true, true) => None,
            (false, false) if (l - r).abs() <= epsilon => None,
            _ => Some(format!("index {i}: {l} vs {r}")),
        })
}
