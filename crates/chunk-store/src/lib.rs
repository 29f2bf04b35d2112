//! Compressed time-series storage.
//!
//! Data of one variable in one domain is stored as dense `[rows x time]`
//! arrays in three tiers:
//!
//! - **chunk** files covering a fixed window of `n_time_per_file` steps,
//!   plus rolling `_previous_day<n>` snapshots of older runs
//! - **year** files covering one calendar year
//! - **master** file covering the consolidated archive
//!
//! Files are immutable. Updates write `~<name>` next to the target and rename
//! it into place, so readers never observe a half-written file.
//!
//! # Example
//!
//! ```no_run
//! use chunk_store::{DecodeScratch, ReadRequest, Splitter, StoreConfig};
//! use series_common::{DomainConfig, TimeRange, Timestamp};
//!
//! let domain = DomainConfig::new("icon_d2", 1215, 746, 3600, "/data/icon_d2", 48);
//! let splitter = Splitter::new(domain, StoreConfig::from_env());
//! let time = TimeRange::new(Timestamp::ymd(2024, 6, 1).unwrap(), 3600, 24);
//! let request = ReadRequest::new("temperature_2m", 1000..1001, time);
//! splitter.prefetch(&request);
//! let values = splitter.read(&request, &mut DecodeScratch::new())?;
//! # Ok::<(), chunk_store::StoreError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod file;
pub mod format;
pub mod index;
pub mod purge;
pub mod splitter;
pub mod writer;

pub use cache::{CacheStats, FileHandleCache, FileIdentity};
pub use config::{StoreConfig, MAX_PREVIOUS_RUNS};
pub use error::{Result, StoreError};
pub use file::ChunkFile;
pub use format::{DecodeScratch, FileHeader, Layout};
pub use index::{intersect, resolve_tiers, Intersection, Tier, TierRead};
pub use purge::{find_stale_temp_files, purge_stale_temp_files};
pub use splitter::{ReadRequest, Splitter, UpdateOptions, UpdateSummary};
pub use writer::{temp_path_for, write_file, ChunkFileWriter};
