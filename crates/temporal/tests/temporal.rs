//! End-to-end checks of the temporal functions on realistic series.

use series_common::{Interpolation, TimeRange, Timestamp};
use temporal::{deaccumulate, deaverage, fill_gaps, hermite, resample, SolarContext};
use test_utils::{
    assert_approx_eq, assert_series_approx_eq, clear_sky_factor, cumulative_sum,
    diurnal_radiation, reference_range, with_gaps,
};

#[test]
fn test_hermite_midpoint_catmull_rom() {
    // 2-hourly source, hourly target; 03:00 lies halfway between indices 1 and 2
    let source = TimeRange::new(Timestamp(0), 7200, 4);
    let target = TimeRange::new(Timestamp(3 * 3600), 3600, 1);
    let out = resample(
        &[10.0, 20.0, 30.0, 40.0],
        &source,
        &target,
        Interpolation::Hermite { bounds: None },
        0.0,
        None,
    )
    .unwrap();
    let expected = hermite(10.0, 20.0, 30.0, 40.0, 0.5);
    assert_approx_eq!(out[0], expected, 1e-6);
    assert_approx_eq!(out[0], 25.0, 1e-5);
}

#[test]
fn test_hermite_differs_from_linear_on_curves() {
    let source = TimeRange::new(Timestamp(0), 7200, 4);
    let target = TimeRange::new(Timestamp(3 * 3600), 3600, 1);
    let series = [0.0, 10.0, 40.0, 90.0];
    let cubic = resample(
        &series,
        &source,
        &target,
        Interpolation::Hermite { bounds: None },
        0.0,
        None,
    )
    .unwrap();
    let straight = resample(&series, &source, &target, Interpolation::Linear, 0.0, None).unwrap();
    assert_approx_eq!(cubic[0], 22.5, 1e-5);
    assert_approx_eq!(straight[0], 25.0, 1e-5);
}

#[test]
fn test_same_cadence_is_identity() {
    let source = reference_range(3600, 6);
    let series = [1.25, 2.5, f32::NAN, 4.0, 5.75, 6.0];
    // Shifted by whole steps, so not short-circuited by equality
    let target = TimeRange::new(source.get(1), 3600, 4);

    for interpolation in [
        Interpolation::Linear,
        Interpolation::Hermite { bounds: None },
        Interpolation::BackwardsSum,
        Interpolation::Backwards,
    ] {
        let out = resample(&series, &source, &target, interpolation, 20.0, None).unwrap();
        assert_series_approx_eq!(out, series[1..5], 1e-6);
    }
}

#[test]
fn test_solar_same_cadence_is_identity_in_daylight() {
    let source = reference_range(3600, 24);
    let series = diurnal_radiation(&source, 800.0);
    let factor = |_: usize, t: Timestamp, _: i64| clear_sky_factor(t);
    let ctx = SolarContext::new(&factor, 0);
    let target = TimeRange::new(source.get(8), 3600, 8);

    let out = resample(
        &series,
        &source,
        &target,
        Interpolation::SolarBackwardsAveraged,
        1.0,
        Some(ctx),
    )
    .unwrap();
    assert_series_approx_eq!(out, series[8..16], 1e-2);
}

#[test]
fn test_solar_upsampling_is_non_negative() {
    let source = reference_range(3 * 3600, 8);
    let series = diurnal_radiation(&source, 900.0);
    let factor = |_: usize, t: Timestamp, _: i64| clear_sky_factor(t);
    let target = reference_range(3600, 24);

    let out = resample(
        &series,
        &source,
        &target,
        Interpolation::SolarBackwardsAveraged,
        1.0,
        Some(SolarContext::new(&factor, 0)),
    )
    .unwrap();
    assert_eq!(out.len(), 24);
    assert!(out.iter().all(|v| *v >= 0.0));
    // Night hours stay dark
    assert_eq!(out[2], 0.0);
    assert_eq!(out[22], 0.0);
}

#[test]
fn test_deaverage_skips_nan() {
    let mut series = [5.0, 5.0, f32::NAN, 11.0];
    deaverage(&mut series, 4, 0).unwrap();
    // (11 * 4 - 5 * 2) / 2
    assert_series_approx_eq!(series, [5.0, 5.0, f32::NAN, 17.0], 1e-6);
}

#[test]
fn test_deaccumulate_never_negative() {
    let nan = f32::NAN;
    let cases: Vec<Vec<f32>> = vec![
        vec![3.0, 2.0, 1.0, 0.5],
        vec![1.0, nan, 0.5, 0.7, 0.2, nan, 0.1],
        vec![nan, 4.0, 1.0, nan, nan, 8.0],
        vec![-1.0, -0.5, -2.0, 3.0],
        vec![1.0, 1.0 - 1e-6, 1.0 + 1e-6, 1.0],
        vec![nan; 5],
    ];
    for (width, offset) in [(1, 0), (3, 0), (3, 2), (6, 1)] {
        for case in &cases {
            let mut series = case.clone();
            deaccumulate(&mut series, width, offset).unwrap();
            assert!(
                series.iter().all(|v| !(*v < 0.0)),
                "negative increment for {case:?} (width {width}, offset {offset}): {series:?}"
            );
        }
    }
}

#[test]
fn test_series_starting_mid_window() {
    let nan = f32::NAN;
    for (width, offset) in [(3, 2), (4, 1), (6, 5)] {
        for lead in [vec![nan, 1.0, 2.0], vec![1.0, nan, 2.0], vec![nan, nan, 2.0]] {
            let mut series: Vec<f32> = lead.iter().copied().chain([2.5, 3.0, 3.5, 4.0]).collect();
            deaccumulate(&mut series, width, offset).unwrap();
            assert!(series.iter().all(|v| !(*v < 0.0)), "{series:?}");
            // the first step closes a window opened before the series
            assert!(series[0].is_nan());

            let mut series: Vec<f32> = lead.iter().copied().chain([2.5, 3.0, 3.5, 4.0]).collect();
            deaverage(&mut series, width, offset).unwrap();
            assert!(series[0].is_nan());
        }
    }

    // whole windows after the partial one are recovered exactly
    let hourly = [0.3, 0.1, 0.0, 0.4, 1.2, 0.5, 0.2];
    let mut series = vec![0.7];
    series.extend(cumulative_sum(&hourly[1..4]));
    series.extend(cumulative_sum(&hourly[4..]));
    deaccumulate(&mut series, 3, 1).unwrap();
    assert!(series[0].is_nan());
    assert_series_approx_eq!(series[1..], hourly[1..], 1e-5);
}

#[test]
fn test_deaccumulate_restores_precipitation() {
    let hourly = [0.0, 0.4, 1.2, 0.0, 0.0, 2.2, 0.6, 0.0, 0.1, 0.0, 0.0, 0.3];
    let mut series: Vec<f32> = hourly.chunks(6).flat_map(cumulative_sum).collect();
    deaccumulate(&mut series, 6, 0).unwrap();
    assert_series_approx_eq!(series, hourly, 1e-5);
}

#[test]
fn test_gap_fill_after_cadence_switch() {
    let time = reference_range(3600, 10);
    let truth: Vec<f32> = (0..10).map(|t| 10.0 + t as f32 * 0.5).collect();
    let mut series = with_gaps(&truth, &[5, 6]);

    let filled = fill_gaps(&mut series, &time, Interpolation::Linear, None).unwrap();
    assert_eq!(filled, 2);
    assert_series_approx_eq!(series, truth, 1e-5);
}
