//! Store-backed readers over real chunk files.

use std::sync::Arc;

use chunk_store::{Splitter, StoreConfig, UpdateOptions};
use series_common::{DomainConfig, TimeRange, Timestamp, VariableDescriptor};
use series_reader::{get_mixed, ReaderError, StoreReader, TimeSeriesReader};
use temporal::SolarFactor;
use test_utils::{
    assert_series_approx_eq, clear_sky_factor, diurnal_radiation, location_series,
    location_value, reference_range, thin_after, variables, TempDomain,
};

const HOUR: i64 = 3600;

/// Splitter over a fresh domain with `series` (`locations x time`) stored.
fn stored(
    domain: &TempDomain,
    variable: &dyn VariableDescriptor,
    time: &TimeRange,
    series: &[f32],
) -> Arc<Splitter<DomainConfig>> {
    let splitter = Splitter::new(domain.config.clone(), StoreConfig::default());
    splitter
        .update_from_series(
            variable.name(),
            time,
            &UpdateOptions::new(variable.scale_factor()),
            series,
        )
        .unwrap();
    Arc::new(splitter)
}

#[tokio::test]
async fn test_native_cadence_read() {
    let domain = TempDomain::new(3, HOUR, 24);
    let time = reference_range(HOUR, 48);
    let variable = variables::weather_code();
    let splitter = stored(&domain, &variable, &time, &location_series(3, 48));

    let reader = StoreReader::new(splitter, 2).unwrap();
    let window = TimeRange::new(time.get(20), HOUR, 10);
    let series = reader.get(&variable, &window).await.unwrap();

    let expected: Vec<f32> = (20..30).map(|t| location_value(2, t)).collect();
    assert_series_approx_eq!(series.data, expected, 0.0);
    assert_eq!(series.unit, "wmo code");
}

#[tokio::test]
async fn test_upsampled_read_interpolates() {
    let domain = TempDomain::new(1, 3 * HOUR, 8);
    let time = reference_range(3 * HOUR, 16);
    let variable = variables::temperature_2m();
    let values: Vec<f32> = (0..16).map(|i| i as f32 * 3.0).collect();
    let splitter = stored(&domain, &variable, &time, &values);

    let reader = StoreReader::new(splitter, 0).unwrap();
    let hourly = TimeRange::new(time.get(2), HOUR, 9);
    let series = reader.get(&variable, &hourly).await.unwrap();

    // straight line: one degree per hour
    let expected: Vec<f32> = (0..9).map(|h| 6.0 + h as f32).collect();
    assert_series_approx_eq!(series.data, expected, 0.05);
}

#[tokio::test]
async fn test_source_range_padding() {
    let domain = TempDomain::new(1, 3 * HOUR, 8);
    let splitter = Arc::new(Splitter::new(domain.config.clone(), StoreConfig::default()));
    let reader = StoreReader::new(splitter, 0).unwrap();

    let native = reference_range(3 * HOUR, 4);
    assert_eq!(reader.source_range(&variables::temperature_2m(), &native), native);

    let hourly = TimeRange::new(Timestamp(native.start.0 + HOUR), HOUR, 4);
    let source = reader.source_range(&variables::temperature_2m(), &hourly);
    // floored start minus two hermite steps, ceiled end plus one step and padding
    assert_eq!(source.start, Timestamp(native.start.0 - 6 * HOUR));
    assert_eq!(source.dt_seconds, 3 * HOUR);
    assert_eq!(source.count, 7);
}

#[tokio::test]
async fn test_missing_variable_is_all_nan() {
    let domain = TempDomain::new(2, HOUR, 24);
    let splitter = Arc::new(Splitter::new(domain.config.clone(), StoreConfig::default()));
    let reader = StoreReader::new(splitter, 1).unwrap();

    let series = reader
        .get(&variables::temperature_2m(), &reference_range(HOUR, 12))
        .await
        .unwrap();
    assert_eq!(series.data.len(), 12);
    assert!(series.has_missing());
    assert!(series.data.iter().all(|v| v.is_nan()));
}

#[tokio::test]
async fn test_location_out_of_range() {
    let domain = TempDomain::new(2, HOUR, 24);
    let splitter = Arc::new(Splitter::new(domain.config.clone(), StoreConfig::default()));
    assert!(matches!(
        StoreReader::new(splitter, 2),
        Err(ReaderError::LocationOutOfRange { location: 2, count: 2, .. })
    ));
}

#[tokio::test]
async fn test_previous_run_reader() {
    let domain = TempDomain::new(1, HOUR, 24);
    let time = reference_range(HOUR, 48);
    let variable = variables::weather_code();
    let splitter = Splitter::new(domain.config.clone(), StoreConfig::default());
    let values: Vec<f32> = (0..48).map(|i| i as f32).collect();
    splitter
        .update_from_series(
            variable.name(),
            &time,
            &UpdateOptions::new(1.0).with_previous_runs(),
            &values,
        )
        .unwrap();
    let splitter = Arc::new(splitter);

    let current = StoreReader::new(Arc::clone(&splitter), 0).unwrap();
    let yesterday = StoreReader::new(splitter, 0).unwrap().with_previous_run(1);

    let series = current.get(&variable, &time).await.unwrap();
    assert_series_approx_eq!(series.data, values, 0.0);

    // day-old snapshot only holds the second day
    let series = yesterday.get(&variable, &time).await.unwrap();
    assert!(series.data[..24].iter().all(|v| v.is_nan()));
    assert_series_approx_eq!(series.data[24..], values[24..], 0.0);
}

#[tokio::test]
async fn test_gap_fill_domain() {
    let domain = TempDomain::new(1, HOUR, 24);
    let mut config = domain.config.clone().with_gap_fill(true);
    config.name = "switching_cadence".to_string();

    let time = reference_range(HOUR, 24);
    let variable = variables::temperature_2m();
    let truth: Vec<f32> = (0..24).map(|i| 10.0 + i as f32 * 0.5).collect();
    let splitter = Splitter::new(config, StoreConfig::default());
    splitter
        .update_from_series(
            variable.name(),
            &time,
            &UpdateOptions::new(variable.scale_factor()),
            &thin_after(&truth, 11, 3),
        )
        .unwrap();

    let reader = StoreReader::new(Arc::new(splitter), 0).unwrap();
    let window = TimeRange::new(time.get(4), HOUR, 16);
    let series = reader.get(&variable, &window).await.unwrap();
    assert_series_approx_eq!(series.data, truth[4..20], 0.05);
}

#[tokio::test]
async fn test_solar_reader() {
    let domain = TempDomain::new(1, 3 * HOUR, 8);
    let time = reference_range(3 * HOUR, 8);
    let variable = variables::shortwave_radiation();
    let splitter = stored(&domain, &variable, &time, &diurnal_radiation(&time, 800.0));

    let factor: Arc<dyn SolarFactor + Send + Sync> =
        Arc::new(|_: usize, t: Timestamp, _: i64| clear_sky_factor(t));
    let reader = StoreReader::new(splitter, 0)
        .unwrap()
        .with_solar_factor(factor);

    let hourly = reference_range(HOUR, 24);
    let series = reader.get(&variable, &hourly).await.unwrap();
    assert_eq!(series.data.len(), 24);
    assert!(series.data.iter().all(|v| *v >= 0.0));
    assert_eq!(series.data[1], 0.0);
    assert!(series.data[12] > 0.0);
}

#[tokio::test]
async fn test_solar_without_factor_fails() {
    let domain = TempDomain::new(1, 3 * HOUR, 8);
    let splitter = Arc::new(Splitter::new(domain.config.clone(), StoreConfig::default()));
    let reader = StoreReader::new(splitter, 0).unwrap();

    let err = reader
        .get(&variables::shortwave_radiation(), &reference_range(HOUR, 6))
        .await
        .unwrap_err();
    assert!(matches!(err, ReaderError::Temporal(_)));
}

#[tokio::test]
async fn test_mix_store_readers() {
    let global = TempDomain::new(1, HOUR, 24);
    let regional = TempDomain::new(1, HOUR, 24);
    let time = reference_range(HOUR, 24);
    let variable = variables::weather_code();

    let coarse = stored(&global, &variable, &time, &[1.0; 24]);
    let mut partial = vec![2.0; 12];
    partial.extend(std::iter::repeat(f32::NAN).take(12));
    let fine = stored(&regional, &variable, &time, &partial);

    let readers = vec![
        StoreReader::new(coarse, 0).unwrap(),
        StoreReader::new(fine, 0).unwrap(),
    ];
    let mixed = get_mixed(&readers, &variable, &time).await.unwrap();
    assert_eq!(&mixed.data[..12], &[2.0; 12]);
    assert_eq!(&mixed.data[12..], &[1.0; 12]);

    for reader in &readers {
        reader.prefetch(&variable, &time).await.unwrap();
    }
}
