//! Error type for access-specification normalization.

use thiserror::Error;

/// Errors raised while normalizing an access specification against an
/// attached dataset shape.
///
/// These are always raised synchronously, before any I/O is attempted, and
/// invalid accesses are never silently clamped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The access has the wrong number of axes for the dataset.
    #[error("access has {got} axes but the dataset has {expected} real dimensions")]
    DimensionMismatch { expected: usize, got: usize },

    /// A single index lies outside the dimension's extent.
    #[error("index {index} out of bounds for dimension {dim} of extent {extent}")]
    OutOfBounds {
        dim: usize,
        index: usize,
        extent: usize,
    },

    /// A range is inverted or exceeds the dimension's extent.
    #[error("range {start}..{end} invalid for dimension {dim} of extent {extent}")]
    InvalidRange {
        dim: usize,
        start: usize,
        end: usize,
        extent: usize,
    },

    /// The dataset shape has no dimensions or a zero extent.
    #[error("dataset shape {0:?} has no addressable elements")]
    EmptyShape(Vec<usize>),
}
