//! Domain (weather model grid) descriptors.

use std::path::Path;

use crate::time::TimeRange;

/// Default number of locations per compressed block for a given chunk length.
pub fn default_chunk_locations(n_time_per_file: usize) -> usize {
    (3072 / n_time_per_file.max(1)).max(6)
}

/// Describes the grid, cadence and storage paths of one model domain.
pub trait DomainDescriptor: Send + Sync {
    fn name(&self) -> &str;

    fn nx(&self) -> usize;

    fn ny(&self) -> usize;

    /// Vertical levels stored per location. Surface-only domains have 1.
    fn levels(&self) -> usize {
        1
    }

    /// Native cadence.
    fn dt_seconds(&self) -> i64;

    /// Root directory of chunk files.
    fn storage_root(&self) -> &Path;

    /// Root directory of yearly and master files, if this domain keeps an archive.
    fn archive_root(&self) -> Option<&Path> {
        None
    }

    /// Time steps per chunk file.
    fn n_time_per_file(&self) -> usize;

    /// Locations per compressed block.
    fn chunk_locations(&self) -> usize {
        default_chunk_locations(self.n_time_per_file())
    }

    /// Time window covered by the master file, at the native cadence.
    fn master_time_range(&self) -> Option<TimeRange> {
        None
    }

    /// Whether yearly archive files exist for this domain.
    fn has_yearly_files(&self) -> bool {
        false
    }

    /// Whether the native series has irregular gaps (e.g. hourly turning
    /// into 3-hourly later in the forecast) that readers should fill.
    fn requires_gap_fill(&self) -> bool {
        false
    }

    fn location_count(&self) -> usize {
        self.nx() * self.ny()
    }
}

impl<T: DomainDescriptor + ?Sized> DomainDescriptor for &T {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn nx(&self) -> usize {
        (**self).nx()
    }
    fn ny(&self) -> usize {
        (**self).ny()
    }
    fn levels(&self) -> usize {
        (**self).levels()
    }
    fn dt_seconds(&self) -> i64 {
        (**self).dt_seconds()
    }
    fn storage_root(&self) -> &Path {
        (**self).storage_root()
    }
    fn archive_root(&self) -> Option<&Path> {
        (**self).archive_root()
    }
    fn n_time_per_file(&self) -> usize {
        (**self).n_time_per_file()
    }
    fn chunk_locations(&self) -> usize {
        (**self).chunk_locations()
    }
    fn master_time_range(&self) -> Option<TimeRange> {
        (**self).master_time_range()
    }
    fn has_yearly_files(&self) -> bool {
        (**self).has_yearly_files()
    }
    fn requires_gap_fill(&self) -> bool {
        (**self).requires_gap_fill()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chunk_locations() {
        assert_eq!(default_chunk_locations(24), 128);
        assert_eq!(default_chunk_locations(1000), 6);
        assert_eq!(default_chunk_locations(512), 6);
        assert_eq!(default_chunk_locations(256), 12);
        assert_eq!(default_chunk_locations(0), 3072);
    }
}
