//! Reads and writes spanning the master, yearly and chunk tiers of one domain.

mod read;
mod update;

pub use update::{UpdateOptions, UpdateSummary};

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use series_common::{DomainDescriptor, TimeRange};
use tracing::{debug, warn};

use crate::cache::FileHandleCache;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::file::ChunkFile;
use crate::index::Tier;

/// A read of one variable over a location range at one level.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadRequest {
    pub variable: String,
    pub locations: Range<usize>,
    pub level: usize,
    pub time: TimeRange,
    /// 0 for the current run, `n` for the run `n` days ago.
    pub previous_run: usize,
}

impl ReadRequest {
    pub fn new(variable: impl Into<String>, locations: Range<usize>, time: TimeRange) -> Self {
        Self {
            variable: variable.into(),
            locations,
            level: 0,
            time,
            previous_run: 0,
        }
    }

    pub fn at_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn at_previous_run(mut self, previous_run: usize) -> Self {
        self.previous_run = previous_run;
        self
    }

    /// Values in the output: locations x time steps.
    pub fn output_len(&self) -> usize {
        self.locations.len() * self.time.count
    }

    fn validate<D: DomainDescriptor + ?Sized>(&self, domain: &D) -> Result<()> {
        if self.level > 0 && self.locations.len() > 1 {
            return Err(StoreError::invalid_request(
                "a read may select several locations or a level above 0, not both",
            ));
        }
        if self.locations.end > domain.location_count() || self.locations.start > self.locations.end {
            return Err(StoreError::invalid_request(format!(
                "locations {:?} outside domain {} with {} locations",
                self.locations,
                domain.name(),
                domain.location_count()
            )));
        }
        if self.level >= domain.levels() {
            return Err(StoreError::invalid_request(format!(
                "level {} outside domain {} with {} levels",
                self.level,
                domain.name(),
                domain.levels()
            )));
        }
        if self.time.dt_seconds != domain.dt_seconds() {
            return Err(StoreError::invalid_request(format!(
                "time step {}s does not match native step {}s of domain {}",
                self.time.dt_seconds,
                domain.dt_seconds(),
                domain.name()
            )));
        }
        Ok(())
    }
}

/// Splits reads and writes of one domain across its store units.
pub struct Splitter<D> {
    domain: D,
    config: StoreConfig,
    cache: Arc<FileHandleCache>,
}

impl<D: DomainDescriptor> Splitter<D> {
    /// Splitter with its own handle cache sized from `config`.
    pub fn new(domain: D, config: StoreConfig) -> Self {
        let cache = Arc::new(FileHandleCache::new(
            config.handle_cache_entries,
            config.revalidate_after(),
        ));
        Self::with_cache(domain, config, cache)
    }

    /// Splitter sharing a process-wide handle cache.
    pub fn with_cache(domain: D, config: StoreConfig, cache: Arc<FileHandleCache>) -> Self {
        Self {
            domain,
            config,
            cache,
        }
    }

    pub fn domain(&self) -> &D {
        &self.domain
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<FileHandleCache> {
        &self.cache
    }

    /// Open a unit and check it against the domain. Units with a different
    /// location count or too few levels are skipped.
    fn open_checked(
        &self,
        tier: Tier,
        path: &Path,
        level: usize,
    ) -> Result<Option<(Arc<ChunkFile>, usize)>> {
        let Some(file) = self.cache.get(path)? else {
            debug!(tier = %tier, path = %path.display(), "Store unit absent");
            return Ok(None);
        };
        if file.locations() != self.domain.location_count() {
            warn!(
                tier = %tier,
                path = %path.display(),
                file_locations = file.locations(),
                domain_locations = self.domain.location_count(),
                "Skipping store unit with mismatched location count"
            );
            return Ok(None);
        }
        if level >= file.levels() {
            debug!(
                tier = %tier,
                path = %path.display(),
                level,
                file_levels = file.levels(),
                "Store unit lacks requested level"
            );
            return Ok(None);
        }
        let n_time = file.n_time();
        Ok(Some((file, n_time)))
    }
}
