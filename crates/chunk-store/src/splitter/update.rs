//! Read-modify-write update of chunk files, including previous-run snapshots.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;

use series_common::{DomainDescriptor, TimeRange};
use tracing::{debug, info, instrument, warn};

use super::Splitter;
use crate::error::{Result, StoreError};
use crate::file::ChunkFile;
use crate::format::{DecodeScratch, Layout};
use crate::index::{chunk_indices, chunk_path, intersect, Intersection};
use crate::writer::ChunkFileWriter;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOptions {
    /// Incoming steps excluded from the current run (e.g. a spin-up step).
    pub skip_first: usize,
    /// Leave the current run untouched and only roll previous-run snapshots.
    pub only_previous_runs: bool,
    /// Quantisation factor of newly written files.
    pub scale_factor: f32,
    /// Maintain `_previous_day<n>` snapshots.
    pub keep_previous_runs: bool,
}

impl UpdateOptions {
    pub fn new(scale_factor: f32) -> Self {
        Self {
            skip_first: 0,
            only_previous_runs: false,
            scale_factor,
            keep_previous_runs: false,
        }
    }

    pub fn with_previous_runs(mut self) -> Self {
        self.keep_previous_runs = true;
        self
    }

    pub fn skipping_first(mut self, steps: usize) -> Self {
        self.skip_first = steps;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub files_written: usize,
    pub batches: usize,
    pub snapshots: usize,
    pub paths: Vec<PathBuf>,
}

/// One chunk file being rewritten.
struct Target {
    writer: ChunkFileWriter,
    existing: Option<Arc<ChunkFile>>,
    intersection: Intersection,
}

impl<D: DomainDescriptor> Splitter<D> {
    /// Number of snapshots an update of `time` maintains, including the current run.
    pub fn snapshot_count(&self, time: &TimeRange, options: &UpdateOptions) -> usize {
        if !options.keep_previous_runs {
            return 1;
        }
        let days = time.count as i64 * time.dt_seconds / SECONDS_PER_DAY;
        (days.max(1) as usize).min(self.config.max_previous_runs)
    }

    /// Rows handed to the supplier per batch, a multiple of the block height.
    pub fn batch_rows(&self) -> usize {
        let n_time = self.domain.n_time_per_file().max(1);
        let cl = self.domain.chunk_locations().max(1);
        let rows = self.domain.location_count() * self.domain.levels();
        let batch = self.config.write_buffer_bytes / 4 / n_time / cl * cl;
        batch.max(cl).min(rows.max(1))
    }

    /// Merge a new series into the chunk files.
    ///
    /// `supply(rows)` returns `rows.len() x time.count` values for the rows
    /// (`location * levels + level`) of one batch. NaN means "no new data" and
    /// keeps whatever the file already holds. Every touched file is rewritten
    /// to a temp file and renamed over the original only after all batches
    /// succeeded; on error the previous versions stay in place.
    #[instrument(skip_all, fields(domain = self.domain.name(), variable = %variable, time = %time))]
    pub fn update<F>(
        &self,
        variable: &str,
        time: &TimeRange,
        options: &UpdateOptions,
        mut supply: F,
    ) -> Result<UpdateSummary>
    where
        F: FnMut(Range<usize>) -> Result<Vec<f32>>,
    {
        if time.dt_seconds != self.domain.dt_seconds() {
            return Err(StoreError::invalid_request(format!(
                "time step {}s does not match native step {}s",
                time.dt_seconds,
                self.domain.dt_seconds()
            )));
        }
        if options.scale_factor.is_nan() || options.scale_factor <= 0.0 {
            return Err(StoreError::invalid_request("scale_factor must be > 0"));
        }

        let mut summary = UpdateSummary::default();
        if time.is_empty() {
            return Ok(summary);
        }

        let snapshots = self.snapshot_count(time, options);
        let mut targets = self.open_targets(variable, time, options, snapshots)?;
        summary.snapshots = snapshots;
        if targets.is_empty() {
            return Ok(summary);
        }

        let n_rows = self.domain.location_count() * self.domain.levels();
        let batch = self.batch_rows();
        let n_time_file = self.domain.n_time_per_file();
        let mut scratch = DecodeScratch::new();
        let mut buffer = Vec::new();

        for row_start in (0..n_rows).step_by(batch) {
            let rows = row_start..(row_start + batch).min(n_rows);
            let data = supply(rows.clone())?;
            let expected = rows.len() * time.count;
            if data.len() != expected {
                return Err(StoreError::ShapeMismatch {
                    expected,
                    actual: data.len(),
                });
            }

            for target in &mut targets {
                buffer.clear();
                buffer.resize(rows.len() * n_time_file, f32::NAN);
                if let Some(existing) = &target.existing {
                    existing.read_rows(rows.clone(), 0..n_time_file, &mut scratch, |row, values| {
                        let offset = (row - rows.start) * n_time_file;
                        buffer[offset..offset + n_time_file].copy_from_slice(values);
                    })?;
                }

                let file = &target.intersection.file;
                let array = &target.intersection.array;
                for r in 0..rows.len() {
                    let incoming = &data[r * time.count + array.start..r * time.count + array.end];
                    let merged = &mut buffer[r * n_time_file + file.start..r * n_time_file + file.end];
                    for (dst, &src) in merged.iter_mut().zip(incoming) {
                        if !src.is_nan() {
                            *dst = src;
                        }
                    }
                }
                target.writer.write_rows(&buffer)?;
            }
            summary.batches += 1;
        }

        for target in targets {
            let path = target.writer.finish()?;
            self.cache.invalidate(&path);
            info!(path = %path.display(), "Published chunk file");
            summary.paths.push(path);
            summary.files_written += 1;
        }

        Ok(summary)
    }

    /// Convenience wrapper for a series already in memory, laid out
    /// `rows x time.count`.
    pub fn update_from_series(
        &self,
        variable: &str,
        time: &TimeRange,
        options: &UpdateOptions,
        series: &[f32],
    ) -> Result<UpdateSummary> {
        let n_rows = self.domain.location_count() * self.domain.levels();
        if series.len() != n_rows * time.count {
            return Err(StoreError::ShapeMismatch {
                expected: n_rows * time.count,
                actual: series.len(),
            });
        }
        self.update(variable, time, options, |rows| {
            Ok(series[rows.start * time.count..rows.end * time.count].to_vec())
        })
    }

    fn open_targets(
        &self,
        variable: &str,
        time: &TimeRange,
        options: &UpdateOptions,
        snapshots: usize,
    ) -> Result<Vec<Target>> {
        let domain = &self.domain;
        let n_time_file = domain.n_time_per_file();
        let layout = Layout::grid(domain.ny(), domain.nx(), domain.levels(), n_time_file);
        let full = time.to_index_range();

        let mut targets = Vec::new();
        for snapshot in 0..snapshots {
            if snapshot == 0 && options.only_previous_runs {
                continue;
            }
            let skip = if snapshot == 0 {
                options.skip_first
            } else {
                (snapshot as i64 * SECONDS_PER_DAY / time.dt_seconds) as usize
            };
            if skip >= time.count {
                continue;
            }
            let remaining = full.start + skip as i64..full.end;

            for chunk in chunk_indices(&remaining, n_time_file) {
                let file_start = chunk * n_time_file as i64;
                let Some(hit) = intersect(remaining.clone(), file_start..file_start + n_time_file as i64)
                else {
                    continue;
                };
                let intersection = Intersection {
                    file: hit.file,
                    array: hit.array.start + skip..hit.array.end + skip,
                };

                let path = chunk_path(domain.storage_root(), variable, chunk, snapshot);
                let existing = self.existing_file(&path, &layout)?;
                let writer = ChunkFileWriter::create(
                    &path,
                    layout.clone(),
                    domain.chunk_locations(),
                    options.scale_factor,
                    self.config.compression_level,
                )?;
                debug!(
                    path = %path.display(),
                    snapshot,
                    merge_existing = existing.is_some(),
                    "Opened update target"
                );
                targets.push(Target {
                    writer,
                    existing,
                    intersection,
                });
            }
        }
        Ok(targets)
    }

    /// Current version of a chunk, if it exists and matches the layout being written.
    fn existing_file(&self, path: &std::path::Path, layout: &Layout) -> Result<Option<Arc<ChunkFile>>> {
        let Some(file) = self.cache.get(path)? else {
            return Ok(None);
        };
        let current = file.layout();
        if current.rows() != layout.rows() || current.n_time != layout.n_time {
            warn!(
                path = %path.display(),
                shape = ?current.shape,
                expected = ?layout.shape,
                "Existing chunk has a different shape, overwriting with NaN background"
            );
            return Ok(None);
        }
        Ok(Some(file))
    }
}
