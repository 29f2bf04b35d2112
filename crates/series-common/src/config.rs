//! YAML configuration for domains and variables.
//!
//! A configuration file lists the domains served and the variables stored in
//! them:
//!
//! ```yaml
//! domains:
//!   - name: icon_d2
//!     nx: 1215
//!     ny: 746
//!     dt_seconds: 3600
//!     storage_root: ${DATA_DIR:-/var/lib/series}/icon_d2
//!     n_time_per_file: 48
//! variables:
//!   - name: temperature_2m
//!     scale_factor: 20
//!     unit: celsius
//!     interpolation: { kind: hermite }
//! ```
//!
//! `${VAR}` and `${VAR:-default}` are expanded from the environment before
//! parsing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{default_chunk_locations, DomainDescriptor};
use crate::error::{SeriesError, SeriesResult};
use crate::time::{TimeRange, Timestamp};
use crate::variable::{Interpolation, VariableDescriptor};

/// Master archive window as ISO-8601 instants (`end` exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterRangeConfig {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    pub name: String,
    pub nx: usize,
    pub ny: usize,
    #[serde(default = "default_levels")]
    pub levels: usize,
    pub dt_seconds: i64,
    pub storage_root: PathBuf,
    #[serde(default)]
    pub archive_root: Option<PathBuf>,
    pub n_time_per_file: usize,
    #[serde(default)]
    pub chunk_locations: Option<usize>,
    #[serde(default)]
    pub master_time_range: Option<MasterRangeConfig>,
    #[serde(default)]
    pub yearly_files: bool,
    #[serde(default)]
    pub gap_fill: bool,

    #[serde(skip)]
    master_range: Option<TimeRange>,
}

fn default_levels() -> usize {
    1
}

impl DomainConfig {
    /// Minimal surface domain with no archive.
    pub fn new(
        name: impl Into<String>,
        nx: usize,
        ny: usize,
        dt_seconds: i64,
        storage_root: impl Into<PathBuf>,
        n_time_per_file: usize,
    ) -> Self {
        Self {
            name: name.into(),
            nx,
            ny,
            levels: 1,
            dt_seconds,
            storage_root: storage_root.into(),
            archive_root: None,
            n_time_per_file,
            chunk_locations: None,
            master_time_range: None,
            yearly_files: false,
            gap_fill: false,
            master_range: None,
        }
    }

    pub fn with_levels(mut self, levels: usize) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_chunk_locations(mut self, chunk_locations: usize) -> Self {
        self.chunk_locations = Some(chunk_locations);
        self
    }

    pub fn with_gap_fill(mut self, gap_fill: bool) -> Self {
        self.gap_fill = gap_fill;
        self
    }

    /// Attach an archive root holding yearly and/or master files.
    pub fn with_archive(
        mut self,
        archive_root: impl Into<PathBuf>,
        yearly_files: bool,
        master: Option<TimeRange>,
    ) -> Self {
        self.archive_root = Some(archive_root.into());
        self.yearly_files = yearly_files;
        self.master_time_range = master.map(|range| MasterRangeConfig {
            start: range.start.to_string(),
            end: range.end().to_string(),
        });
        self.master_range = master;
        self
    }

    /// Check invariants and resolve the master time range.
    pub fn validate(&mut self) -> SeriesResult<()> {
        if self.dt_seconds <= 0 {
            return Err(SeriesError::invalid_config(&self.name, "dt_seconds must be > 0"));
        }
        if self.nx == 0 || self.ny == 0 {
            return Err(SeriesError::invalid_config(&self.name, "nx and ny must be > 0"));
        }
        if self.levels == 0 {
            return Err(SeriesError::invalid_config(&self.name, "levels must be > 0"));
        }
        if self.n_time_per_file == 0 {
            return Err(SeriesError::invalid_config(&self.name, "n_time_per_file must be > 0"));
        }
        if self.chunk_locations == Some(0) {
            return Err(SeriesError::invalid_config(&self.name, "chunk_locations must be > 0"));
        }
        if (self.master_time_range.is_some() || self.yearly_files) && self.archive_root.is_none() {
            return Err(SeriesError::invalid_config(
                &self.name,
                "master_time_range and yearly_files require archive_root",
            ));
        }

        self.master_range = match &self.master_time_range {
            Some(cfg) => {
                let start = Timestamp::parse_iso8601(&cfg.start)?;
                let end = Timestamp::parse_iso8601(&cfg.end)?;
                if end <= start {
                    return Err(SeriesError::invalid_config(
                        &self.name,
                        "master_time_range end must be after start",
                    ));
                }
                Some(TimeRange::from_bounds(
                    start.floor(self.dt_seconds),
                    end,
                    self.dt_seconds,
                ))
            }
            None => None,
        };

        Ok(())
    }
}

impl DomainDescriptor for DomainConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn nx(&self) -> usize {
        self.nx
    }

    fn ny(&self) -> usize {
        self.ny
    }

    fn levels(&self) -> usize {
        self.levels
    }

    fn dt_seconds(&self) -> i64 {
        self.dt_seconds
    }

    fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    fn archive_root(&self) -> Option<&Path> {
        self.archive_root.as_deref()
    }

    fn n_time_per_file(&self) -> usize {
        self.n_time_per_file
    }

    fn chunk_locations(&self) -> usize {
        self.chunk_locations
            .unwrap_or_else(|| default_chunk_locations(self.n_time_per_file))
    }

    fn master_time_range(&self) -> Option<TimeRange> {
        self.master_range
    }

    fn has_yearly_files(&self) -> bool {
        self.yearly_files && self.archive_root.is_some()
    }

    fn requires_gap_fill(&self) -> bool {
        self.gap_fill
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableConfig {
    pub name: String,
    pub scale_factor: f32,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub elevation_correctable: bool,
    #[serde(default)]
    pub offset_correction: bool,
}

impl VariableConfig {
    pub fn new(name: impl Into<String>, scale_factor: f32, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scale_factor,
            unit: unit.into(),
            interpolation: Interpolation::Linear,
            elevation_correctable: false,
            offset_correction: false,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_offset_correction(mut self) -> Self {
        self.offset_correction = true;
        self
    }

    pub fn with_elevation_correction(mut self) -> Self {
        self.elevation_correctable = true;
        self
    }

    pub fn validate(&self) -> SeriesResult<()> {
        if self.name.is_empty() || self.name.contains(['/', '\\', '~']) {
            return Err(SeriesError::invalid_config(
                &self.name,
                "variable name must be non-empty and must not contain path separators or '~'",
            ));
        }
        if self.scale_factor.is_nan() || self.scale_factor <= 0.0 {
            return Err(SeriesError::invalid_config(&self.name, "scale_factor must be > 0"));
        }
        if let Interpolation::Hermite { bounds: Some((lo, hi)) } = self.interpolation {
            if lo > hi {
                return Err(SeriesError::invalid_config(&self.name, "hermite bounds are inverted"));
            }
        }
        Ok(())
    }
}

impl VariableDescriptor for VariableConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    fn is_elevation_correctable(&self) -> bool {
        self.elevation_correctable
    }

    fn requires_offset_correction(&self) -> bool {
        self.offset_correction
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesConfig {
    #[serde(default)]
    pub domains: Vec<DomainConfig>,
    #[serde(default)]
    pub variables: Vec<VariableConfig>,
}

impl SeriesConfig {
    /// Read, expand environment variables, parse and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> SeriesResult<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> SeriesResult<Self> {
        let expanded = shellexpand::env(content)
            .map_err(|e| SeriesError::invalid_config(&e.var_name, e.cause.to_string()))?;

        let mut config: SeriesConfig = serde_yaml::from_str(&expanded)?;
        for domain in &mut config.domains {
            domain.validate()?;
        }
        for variable in &config.variables {
            variable.validate()?;
        }

        tracing::debug!(
            domains = config.domains.len(),
            variables = config.variables.len(),
            "Loaded series configuration"
        );
        Ok(config)
    }

    pub fn domain(&self, name: &str) -> SeriesResult<&DomainConfig> {
        self.domains
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| SeriesError::UnknownDomain(name.to_string()))
    }

    pub fn variable(&self, name: &str) -> SeriesResult<&VariableConfig> {
        self.variables
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| SeriesError::UnknownVariable(name.to_string()))
    }
}
