//! Reader handles bound to one domain and location.

use std::sync::Arc;

use async_trait::async_trait;
use chunk_store::{DecodeScratch, ReadRequest, Splitter};
use series_common::{DomainDescriptor, TimeRange, VariableDescriptor};
use temporal::{fill_gaps, resample, SolarContext, SolarFactor};
use tracing::{debug, instrument};

use crate::error::{ReaderError, Result};

/// Extra native steps read on each side for domains that need gap filling, so
/// gaps at the window edges still see the samples after them.
pub const GAP_FILL_MARGIN: usize = 6;

/// A series together with the unit it is expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct DataAndUnit {
    pub data: Vec<f32>,
    pub unit: String,
}

impl DataAndUnit {
    pub fn new(data: Vec<f32>, unit: impl Into<String>) -> Self {
        Self {
            data,
            unit: unit.into(),
        }
    }

    pub fn has_missing(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }
}

/// Time-series access for one location of one domain.
///
/// Implementations return exactly `time.count` values, NaN where no data is
/// available.
#[async_trait]
pub trait TimeSeriesReader: Send + Sync {
    /// Name of the underlying domain, for logs.
    fn name(&self) -> &str;

    /// Read `variable` on the `time` grid.
    async fn get(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<DataAndUnit>;

    /// Hint that `get` will be called with these arguments soon.
    async fn prefetch(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<()>;
}

#[async_trait]
impl<T: TimeSeriesReader + ?Sized> TimeSeriesReader for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn get(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<DataAndUnit> {
        (**self).get(variable, time).await
    }

    async fn prefetch(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<()> {
        (**self).prefetch(variable, time).await
    }
}

/// Reads one location from a chunk store and brings the native series onto
/// the requested grid: gap filling for domains that need it, then resampling
/// with the variable's interpolation.
pub struct StoreReader<D> {
    splitter: Arc<Splitter<D>>,
    location: usize,
    level: usize,
    previous_run: usize,
    solar: Option<Arc<dyn SolarFactor + Send + Sync>>,
}

impl<D: DomainDescriptor + 'static> StoreReader<D> {
    pub fn new(splitter: Arc<Splitter<D>>, location: usize) -> Result<Self> {
        let domain = splitter.domain();
        if location >= domain.location_count() {
            return Err(ReaderError::LocationOutOfRange {
                domain: domain.name().to_string(),
                location,
                count: domain.location_count(),
            });
        }
        Ok(Self {
            splitter,
            location,
            level: 0,
            previous_run: 0,
            solar: None,
        })
    }

    pub fn at_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    /// Read the forecast run issued `days` days ago instead of the latest.
    pub fn with_previous_run(mut self, days: usize) -> Self {
        self.previous_run = days;
        self
    }

    /// Clear-sky factor used for solar interpolation.
    pub fn with_solar_factor(mut self, solar: Arc<dyn SolarFactor + Send + Sync>) -> Self {
        self.solar = Some(solar);
        self
    }

    pub fn location(&self) -> usize {
        self.location
    }

    /// Native window needed to produce `time` for `variable`.
    pub fn source_range(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> TimeRange {
        let domain = self.splitter.domain();
        let native = domain.dt_seconds();
        let gap_fill = domain.requires_gap_fill();
        if !gap_fill && time.dt_seconds == native && time.start.0.rem_euclid(native) == 0 {
            return *time;
        }
        let mut padding = variable.interpolation().padding();
        if gap_fill {
            padding += GAP_FILL_MARGIN;
        }
        time.for_interpolation_to(native).expand(padding)
    }

    fn request(&self, variable: &dyn VariableDescriptor, source: TimeRange) -> ReadRequest {
        ReadRequest::new(variable.name(), self.location..self.location + 1, source)
            .at_level(self.level)
            .at_previous_run(self.previous_run)
    }

    async fn read_native(&self, request: ReadRequest) -> Result<Vec<f32>> {
        let splitter = Arc::clone(&self.splitter);
        let data = tokio::task::spawn_blocking(move || {
            let mut scratch = DecodeScratch::new();
            splitter.read(&request, &mut scratch)
        })
        .await
        .map_err(ReaderError::join)??;
        Ok(data)
    }
}

#[async_trait]
impl<D: DomainDescriptor + 'static> TimeSeriesReader for StoreReader<D> {
    fn name(&self) -> &str {
        self.splitter.domain().name()
    }

    #[instrument(skip_all, fields(domain = self.name(), variable = variable.name(), location = self.location))]
    async fn get(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<DataAndUnit> {
        let source = self.source_range(variable, time);
        let mut series = self.read_native(self.request(variable, source)).await?;

        let interpolation = variable.interpolation();
        let solar = self
            .solar
            .as_deref()
            .map(|factor| SolarContext::new(factor, self.location));

        if self.splitter.domain().requires_gap_fill() {
            let filled = fill_gaps(&mut series, &source, interpolation, solar)?;
            debug!(filled, "Gap filled native series");
        }

        let data = resample(
            &series,
            &source,
            time,
            interpolation,
            variable.scale_factor(),
            solar,
        )?;
        Ok(DataAndUnit::new(data, variable.unit()))
    }

    async fn prefetch(&self, variable: &dyn VariableDescriptor, time: &TimeRange) -> Result<()> {
        let source = self.source_range(variable, time);
        let request = self.request(variable, source);
        let splitter = Arc::clone(&self.splitter);
        tokio::task::spawn_blocking(move || splitter.prefetch(&request))
            .await
            .map_err(ReaderError::join)
    }
}
