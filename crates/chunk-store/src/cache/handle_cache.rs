//! LRU cache of opened chunk files with time-based revalidation.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::CacheStats;
use crate::error::{Result, StoreError};
use crate::file::ChunkFile;

/// What a path pointed to when it was opened. A writer publishing a new
/// version changes at least one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileIdentity {
    /// Stat `path`. `Ok(None)` if it does not exist.
    pub fn of(path: &Path) -> Result<Option<Self>> {
        match std::fs::metadata(path) {
            Ok(meta) => Ok(Some(Self {
                len: meta.len(),
                modified: meta.modified().ok(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

struct CachedHandle {
    /// `None` caches the absence of the file.
    file: Option<Arc<ChunkFile>>,
    identity: Option<FileIdentity>,
    checked_at: Instant,
}

/// Shared cache of opened chunk files keyed by path.
///
/// Entries younger than `revalidate_after` are returned as-is. Older entries
/// are checked against the file's current [`FileIdentity`] and reopened if a
/// new version was published. Missing files are cached too, so hot paths
/// without a year or master tier do not stat on every read.
pub struct FileHandleCache {
    entries: Mutex<LruCache<PathBuf, CachedHandle>>,
    revalidate_after: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    reopens: AtomicU64,
}

impl FileHandleCache {
    pub fn new(capacity: usize, revalidate_after: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            revalidate_after,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            reopens: AtomicU64::new(0),
        }
    }

    /// Get the file at `path`, opening it on a miss. `Ok(None)` if absent.
    pub fn get(&self, path: &Path) -> Result<Option<Arc<ChunkFile>>> {
        let now = Instant::now();
        let cached = {
            let mut entries = self.entries.lock();
            entries
                .get(path)
                .map(|h| (h.file.clone(), h.identity, h.checked_at))
        };

        match cached {
            Some((file, _, checked_at)) if now.duration_since(checked_at) < self.revalidate_after => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(file);
            }
            Some((file, identity, _)) => {
                let current = FileIdentity::of(path)?;
                if current == identity {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    if let Some(entry) = self.entries.lock().peek_mut(path) {
                        entry.checked_at = now;
                    }
                    return Ok(file);
                }
                debug!(path = %path.display(), "Chunk file changed on disk, reopening");
                self.reopens.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }

        let (file, identity) = Self::open(path)?;
        self.insert(
            path,
            CachedHandle {
                file: file.clone(),
                identity,
                checked_at: now,
            },
        );
        Ok(file)
    }

    fn open(path: &Path) -> Result<(Option<Arc<ChunkFile>>, Option<FileIdentity>)> {
        let Some(identity) = FileIdentity::of(path)? else {
            return Ok((None, None));
        };
        match ChunkFile::open(path) {
            Ok(file) => Ok((Some(Arc::new(file)), Some(identity))),
            // removed between stat and open
            Err(e) if e.is_not_found() => Ok((None, None)),
            Err(e) => Err(e),
        }
    }

    fn insert(&self, path: &Path, handle: CachedHandle) {
        let mut entries = self.entries.lock();
        if let Some((evicted, _)) = entries.push(path.to_path_buf(), handle) {
            if evicted != path {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Forget `path`, e.g. after publishing a new version of it.
    pub fn invalidate(&self, path: &Path) {
        self.entries.lock().pop(path);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
            reopens: self.reopens.load(Ordering::Relaxed),
        }
    }
}

impl Default for FileHandleCache {
    fn default() -> Self {
        Self::new(1024, Duration::from_secs(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Layout;
    use crate::writer::write_file;

    fn write(path: &Path, values: &[f32]) {
        write_file(path, Layout::flat(1, values.len()), 1, 10.0, 1, values).unwrap();
    }

    #[test]
    fn test_hit_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_0.om");
        write(&path, &[1.0, 2.0]);

        let cache = FileHandleCache::new(4, Duration::from_secs(60));
        assert!(cache.get(&path).unwrap().is_some());
        assert!(cache.get(&path).unwrap().is_some());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_absent_file_is_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.om");
        let cache = FileHandleCache::new(4, Duration::from_secs(60));
        assert!(cache.get(&path).unwrap().is_none());
        assert!(cache.get(&path).unwrap().is_none());
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_revalidate_picks_up_new_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_0.om");
        let cache = FileHandleCache::new(4, Duration::ZERO);

        assert!(cache.get(&path).unwrap().is_none());
        write(&path, &[1.0, 2.0, 3.0]);
        let file = cache.get(&path).unwrap().unwrap();
        assert_eq!(file.n_time(), 3);
        assert_eq!(cache.stats().reopens, 1);

        // same identity: no reopen
        assert!(cache.get(&path).unwrap().is_some());
        assert_eq!(cache.stats().reopens, 1);
    }

    #[test]
    fn test_invalidate_and_eviction() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileHandleCache::new(2, Duration::from_secs(60));
        for i in 0..3 {
            let path = dir.path().join(format!("chunk_{i}.om"));
            write(&path, &[i as f32]);
            cache.get(&path).unwrap();
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 1);

        cache.invalidate(&dir.path().join("chunk_2.om"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk_0.om");
        std::fs::write(&path, b"definitely not a chunk file").unwrap();
        let cache = FileHandleCache::default();
        assert!(matches!(
            cache.get(&path),
            Err(StoreError::InvalidHeader { .. })
        ));
    }
}
