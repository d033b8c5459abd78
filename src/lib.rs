//! voxrange - incremental data-range tracking for volumetric datasets
//!
//! This library lets a viewer progressively discover the minimum and
//! maximum values of a large, possibly disk-backed, N-dimensional dataset
//! without ever reading the whole dataset up front. The running `(min,
//! max)` is always conservatively correct for whatever portion of the data
//! has actually been read, and repeated reads of already-seen regions cost
//! nothing in bookkeeping.
//!
//! # High-level API
//!
//! ```ignore
//! use voxrange::{AccessSpec, MemorySource, RangeEngine};
//!
//! let engine = RangeEngine::new(MemorySource::new(volume))?;
//! engine.on_range_changed(|range| println!("range is now {range}"));
//!
//! // Data comes straight from the source; the engine tracks on the side
//! // which regions it has already scanned for min/max.
//! let slice = engine.read(&[AccessSpec::All, AccessSpec::All, AccessSpec::Index(5)])?;
//! let range = engine.data_range();
//! ```
//!
//! For large disk-backed datasets use [`RangeEngine::deferred`], which
//! moves all bookkeeping onto a background worker task.

pub mod aggregate;
pub mod coverage;
pub mod engine;
pub mod logging;
pub mod planner;
pub mod region;
pub mod source;

pub use coverage::{CoverageStore, DataRange};
pub use engine::{EngineError, EngineStatsSnapshot, RangeDaemon, RangeEngine, UpdateMode};
pub use planner::{calc_expansion, collapse_expansions, Expansion};
pub use region::{AccessError, AccessSpec, IndexRange, Overlap, SliceRegion, VolumeShape};
pub use source::{DtypeKind, MemorySource, SourceError, VolumeSource};

/// Version of the voxrange library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
