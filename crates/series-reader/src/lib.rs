//! Request-scoped time-series readers.
//!
//! A [`StoreReader`] binds a chunk-store domain to one location and returns
//! series on any requested time grid. Readers of several domains covering the
//! same location are combined with [`get_mixed`] or a [`ReaderMixer`], the
//! highest-resolution reader taking priority.
//!
//! ```no_run
//! # async fn example() -> series_reader::Result<()> {
//! use std::sync::Arc;
//!
//! use chunk_store::{Splitter, StoreConfig};
//! use series_common::{SeriesConfig, TimeRange, Timestamp};
//! use series_reader::{get_mixed, StoreReader};
//!
//! let config = SeriesConfig::load("series.yaml").expect("config");
//! let mut readers = Vec::new();
//! for name in ["global", "regional"] {
//!     let domain = config.domain(name).expect("domain").clone();
//!     let splitter = Arc::new(Splitter::new(domain, StoreConfig::default()));
//!     readers.push(StoreReader::new(splitter, 1234)?);
//! }
//!
//! let variable = config.variable("temperature_2m").expect("variable");
//! let time = TimeRange::new(Timestamp::ymd(2024, 1, 1).expect("date"), 900, 96);
//! let series = get_mixed(&readers, variable, &time).await?;
//! println!("{} values in {}", series.data.len(), series.unit);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod mixer;
pub mod reader;

pub use error::{ReaderError, Result};
pub use mixer::{get_mixed, ReaderMixer};
pub use reader::{DataAndUnit, StoreReader, TimeSeriesReader, GAP_FILL_MARGIN};
