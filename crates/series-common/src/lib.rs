//! Shared types for the weather time-series engine.
//!
//! - [`time`]: timestamps, regular time ranges and index-time conversion
//! - [`variable`]: variable descriptors and interpolation kinds
//! - [`domain`]: model domain descriptors (grid, cadence, storage paths)
//! - [`config`]: YAML-loadable implementations of the descriptors

pub mod config;
pub mod domain;
pub mod error;
pub mod time;
pub mod variable;

pub use config::{DomainConfig, MasterRangeConfig, SeriesConfig, VariableConfig};
pub use domain::{default_chunk_locations, DomainDescriptor};
pub use error::{SeriesError, SeriesResult};
pub use time::{DateComponents, TimeRange, Timestamp};
pub use variable::{Interpolation, VariableDescriptor};
