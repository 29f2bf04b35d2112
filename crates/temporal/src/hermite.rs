//! Scalar interpolation kernels.

/// 4-point cubic Hermite (Catmull-Rom) between `p1` and `p2` at `t` in `[0, 1]`.
///
/// `p0` and `p3` are the outer neighbours.
#[inline]
pub fn hermite(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t * t * t + b * t * t + c * t + d
}

#[inline]
pub fn linear(p0: f32, p1: f32, t: f32) -> f32 {
    p0 * (1.0 - t) + p1 * t
}

/// Round to the precision the variable is stored at. Scale factors that are
/// not positive leave the value untouched.
#[inline]
pub fn round_to_scale(value: f32, scale_factor: f32) -> f32 {
    if scale_factor > 0.0 {
        (value * scale_factor).round() / scale_factor
    } else {
        value
    }
}

/// Clamp to optional physical bounds. NaN passes through.
#[inline]
pub fn clamp_bounds(value: f32, bounds: Option<(f32, f32)>) -> f32 {
    match bounds {
        Some((lo, hi)) if !value.is_nan() => value.clamp(lo, hi),
        _ => value,
    }
}
