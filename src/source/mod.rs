//! The backing data source boundary.
//!
//! The coverage engine never owns or caches dataset contents; it only reads
//! rectilinear regions from a [`VolumeSource`] and, when the consumer uses
//! writes, writes through to it. The source may be disk-backed, remote or
//! in-memory; the engine only assumes that reading a small region is cheap
//! relative to reading the whole dataset.

mod memory;

use ndarray::ArrayD;
use thiserror::Error;

use crate::coverage::DataRange;
use crate::region::IndexRange;

pub use memory::MemorySource;

/// Broad element-type classification of a source.
///
/// Only used to decide whether NaN/Inf screening is meaningful when folding
/// value ranges: integer data cannot contain non-finite values, so its range
/// computation degenerates to a plain min/max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeKind {
    Integer,
    Floating,
    Complex,
    Structured,
}

impl DtypeKind {
    /// True when elements of this kind may be NaN or infinite.
    pub fn may_contain_non_finite(&self) -> bool {
        matches!(self, DtypeKind::Floating | DtypeKind::Complex)
    }
}

/// Failures surfaced by a backing source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Underlying I/O failed (read, seek, decompression).
    #[error("source I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The source does not support writes.
    #[error("source is read-only")]
    WriteUnsupported,

    /// A region or value buffer does not match the source's shape.
    #[error("region does not match source shape: {0}")]
    ShapeMismatch(String),

    /// Any other source-specific failure.
    #[error("source failed: {0}")]
    Failed(String),
}

/// An externally-owned N-dimensional array the engine tracks range
/// information about.
///
/// `read_region`/`write_region` address the source's *full* shape, padding
/// axes included; the engine performs the real-dimension translation before
/// calling. Writes must be all-or-nothing per call: no partial write may be
/// visible after a failure.
pub trait VolumeSource: Send + Sync {
    /// The full shape of the dataset.
    fn shape(&self) -> Vec<usize>;

    /// Element-type classification, per [`DtypeKind`].
    fn dtype(&self) -> DtypeKind;

    /// Read an arbitrary rectilinear region, one range per axis of
    /// [`VolumeSource::shape`].
    fn read_region(&self, region: &[IndexRange]) -> Result<ArrayD<f64>, SourceError>;

    /// Write `values` into the given region. Optional capability; the
    /// default declines.
    fn write_region(
        &self,
        _region: &[IndexRange],
        _values: &ArrayD<f64>,
    ) -> Result<(), SourceError> {
        Err(SourceError::WriteUnsupported)
    }

    /// An optional, possibly stale, externally supplied `(min, max)`,
    /// a file-header calibration field, for example. Used only to seed the
    /// aggregate range before any data has been scanned.
    fn calibration_hint(&self) -> Option<DataRange> {
        None
    }
}
