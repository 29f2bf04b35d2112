//! Common test fixtures for time-series tests.

use std::path::{Path, PathBuf};

use series_common::{DomainConfig, Interpolation, TimeRange, Timestamp, VariableConfig};
use tempfile::TempDir;

/// A domain whose storage and archive roots live in a temp dir that is
/// removed on drop.
pub struct TempDomain {
    dir: TempDir,
    pub config: DomainConfig,
}

impl TempDomain {
    /// `nx x 1` surface domain at `dt_seconds` with `n_time_per_file` steps per chunk.
    pub fn new(nx: usize, dt_seconds: i64, n_time_per_file: usize) -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("failed to create temp dir: {e}"));
        let config = DomainConfig::new(
            "test_domain",
            nx,
            1,
            dt_seconds,
            dir.path().join("data"),
            n_time_per_file,
        );
        Self { dir, config }
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.config = self.config.with_levels(levels);
        self
    }

    pub fn with_chunk_locations(mut self, chunk_locations: usize) -> Self {
        self.config = self.config.with_chunk_locations(chunk_locations);
        self
    }

    /// Enable yearly files and/or a master file under `<tmp>/archive`.
    pub fn with_archive(mut self, yearly_files: bool, master: Option<TimeRange>) -> Self {
        let archive = self.dir.path().join("archive");
        self.config = self.config.with_archive(archive, yearly_files, master);
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn storage_root(&self) -> PathBuf {
        self.config.storage_root.clone()
    }

    pub fn archive_root(&self) -> PathBuf {
        self.dir.path().join("archive")
    }
}

/// Standard variables with the scale factors real deployments use.
pub mod variables {
    use super::*;

    pub fn temperature_2m() -> VariableConfig {
        VariableConfig::new("temperature_2m", 20.0, "celsius")
            .with_interpolation(Interpolation::Hermite { bounds: None })
            .with_elevation_correction()
    }

    pub fn relative_humidity_2m() -> VariableConfig {
        VariableConfig::new("relative_humidity_2m", 1.0, "%").with_interpolation(
            Interpolation::Hermite {
                bounds: Some((0.0, 100.0)),
            },
        )
    }

    pub fn precipitation() -> VariableConfig {
        VariableConfig::new("precipitation", 10.0, "mm")
            .with_interpolation(Interpolation::BackwardsSum)
    }

    pub fn shortwave_radiation() -> VariableConfig {
        VariableConfig::new("shortwave_radiation", 1.0, "W/m²")
            .with_interpolation(Interpolation::SolarBackwardsAveraged)
    }

    pub fn weather_code() -> VariableConfig {
        VariableConfig::new("weather_code", 1.0, "wmo code").with_interpolation(Interpolation::Backwards)
    }

    pub fn snow_depth() -> VariableConfig {
        VariableConfig::new("snow_depth", 100.0, "m").with_offset_correction()
    }
}

/// 2024-01-01T00:00:00Z.
pub fn reference_start() -> Timestamp {
    Timestamp(1_704_067_200)
}

/// `count` steps of `dt_seconds` from [`reference_start`].
pub fn reference_range(dt_seconds: i64, count: usize) -> TimeRange {
    TimeRange::new(reference_start(), dt_seconds, count)
}
