//! Index-time arithmetic and tier resolution.
//!
//! All ranges here are in index time (`timestamp / dt`) at the domain's
//! native cadence. A query is answered by the master file first, then yearly
//! files, then chunk files; each tier that contributes moves the start of the
//! remaining range forward so later tiers never overwrite earlier ones.

use std::ops::Range;
use std::path::{Path, PathBuf};

use series_common::{DomainDescriptor, TimeRange, Timestamp};

use crate::error::Result;

/// Overlap of a query with one store unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intersection {
    /// Time indices inside the file.
    pub file: Range<usize>,
    /// Time indices inside the caller's output array.
    pub array: Range<usize>,
}

impl Intersection {
    pub fn len(&self) -> usize {
        self.file.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file.is_empty()
    }

    fn shifted(mut self, by: usize) -> Self {
        self.array = self.array.start + by..self.array.end + by;
        self
    }
}

/// Clip `query` against a file covering `file`. Empty overlaps are `None`.
pub fn intersect(query: Range<i64>, file: Range<i64>) -> Option<Intersection> {
    let file_len = file.end - file.start;
    let query_len = query.end - query.start;
    let file_lower = (query.start - file.start).max(0);
    let file_upper = (query.end - file.start).min(file_len);
    if file_upper <= file_lower {
        return None;
    }
    let array_lower = (file.start - query.start).max(0);
    let array_upper = (file.end - query.start).min(query_len);
    Some(Intersection {
        file: file_lower as usize..file_upper as usize,
        array: array_lower as usize..array_upper as usize,
    })
}

/// Storage tier of a store unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    Master,
    Year(i32),
    Chunk(i64),
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Master => write!(f, "master"),
            Tier::Year(y) => write!(f, "year_{y}"),
            Tier::Chunk(c) => write!(f, "chunk_{c}"),
        }
    }
}

/// `<storage_root>/<variable>/chunk_<i>.om`, or the `_previous_day<n>`
/// directory for older runs.
pub fn chunk_path(storage_root: &Path, variable: &str, chunk: i64, previous_run: usize) -> PathBuf {
    let dir = if previous_run == 0 {
        variable.to_string()
    } else {
        format!("{variable}_previous_day{previous_run}")
    };
    storage_root.join(dir).join(format!("chunk_{chunk}.om"))
}

pub fn year_path(archive_root: &Path, variable: &str, year: i32) -> PathBuf {
    archive_root.join(variable).join(format!("year_{year}.om"))
}

pub fn master_path(archive_root: &Path, variable: &str) -> PathBuf {
    archive_root.join(variable).join("master_0.om")
}

/// Chunk indices touched by an index range.
pub fn chunk_indices(range: &Range<i64>, n_time_per_file: usize) -> Range<i64> {
    if range.is_empty() {
        return 0..0;
    }
    let n = n_time_per_file as i64;
    range.start.div_euclid(n)..(range.end - 1).div_euclid(n) + 1
}

/// Index range of calendar year `year` at cadence `dt_seconds`.
pub fn year_index_range(year: i32, dt_seconds: i64) -> Option<Range<i64>> {
    let start = Timestamp::year_start(year)?.0;
    let end = Timestamp::year_start(year + 1)?.0;
    Some(ceil_div(start, dt_seconds)..ceil_div(end, dt_seconds))
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -((-a).div_euclid(b))
}

fn year_of_index(index: i64, dt_seconds: i64) -> i32 {
    Timestamp(index * dt_seconds).components().year
}

/// One contributing store unit.
#[derive(Debug, Clone)]
pub struct TierRead<H> {
    pub tier: Tier,
    pub path: PathBuf,
    pub handle: H,
    pub intersection: Intersection,
}

/// Resolve which store units answer `query`.
///
/// `open(tier, path)` returns the handle and its number of time steps, or
/// `None` when the unit is absent or unusable. Array ranges in the result are
/// relative to `query.start`. Only the chunk tier is consulted for previous
/// runs.
pub fn resolve_tiers<D, H, F>(
    query: &TimeRange,
    domain: &D,
    variable: &str,
    previous_run: usize,
    mut open: F,
) -> Result<Vec<TierRead<H>>>
where
    D: DomainDescriptor + ?Sized,
    F: FnMut(Tier, &Path) -> Result<Option<(H, usize)>>,
{
    let dt = domain.dt_seconds();
    let full = query.to_index_range();
    let mut start = full.start;
    let end = full.end;
    let mut reads = Vec::new();

    if previous_run == 0 {
        if let (Some(archive), Some(master)) = (domain.archive_root(), domain.master_time_range()) {
            let master_idx = master.to_index_range();
            if intersect(start..end, master_idx.clone()).is_some() {
                let path = master_path(archive, variable);
                let opened = open(Tier::Master, &path)?;
                contribute(
                    &mut reads,
                    &mut start,
                    full.start,
                    end,
                    Tier::Master,
                    path,
                    master_idx.start,
                    opened,
                );
            }
        }

        if let (true, Some(archive)) = (domain.has_yearly_files(), domain.archive_root()) {
            if start < end {
                let first = year_of_index(start, dt);
                let last = year_of_index(end - 1, dt);
                for year in first..=last {
                    if start >= end {
                        break;
                    }
                    let Some(range) = year_index_range(year, dt) else {
                        continue;
                    };
                    if intersect(start..end, range.clone()).is_none() {
                        continue;
                    }
                    let path = year_path(archive, variable, year);
                    let opened = open(Tier::Year(year), &path)?;
                    contribute(
                        &mut reads,
                        &mut start,
                        full.start,
                        end,
                        Tier::Year(year),
                        path,
                        range.start,
                        opened,
                    );
                }
            }
        }
    }

    let n_time_per_file = domain.n_time_per_file();
    for chunk in chunk_indices(&(start..end), n_time_per_file) {
        let path = chunk_path(domain.storage_root(), variable, chunk, previous_run);
        let opened = open(Tier::Chunk(chunk), &path)?;
        contribute(
            &mut reads,
            &mut start,
            full.start,
            end,
            Tier::Chunk(chunk),
            path,
            chunk * n_time_per_file as i64,
            opened,
        );
    }

    Ok(reads)
}

/// Record an opened unit's overlap with the remaining range. Archive tiers
/// move `start` past what they cover.
#[allow(clippy::too_many_arguments)]
fn contribute<H>(
    reads: &mut Vec<TierRead<H>>,
    start: &mut i64,
    query_start: i64,
    end: i64,
    tier: Tier,
    path: PathBuf,
    file_start: i64,
    opened: Option<(H, usize)>,
) {
    let Some((handle, n_time)) = opened else {
        return;
    };
    let file_range = file_start..file_start + n_time as i64;
    let Some(hit) = intersect(*start..end, file_range.clone()) else {
        return;
    };
    let intersection = hit.shifted((*start - query_start) as usize);
    if !matches!(tier, Tier::Chunk(_)) {
        *start = (*start).max(file_range.end);
    }
    reads.push(TierRead {
        tier,
        path,
        handle,
        intersection,
    });
}
