//! The `(min, max)` value range and its tolerant comparison.

use std::fmt;

/// Relative tolerance used when deciding whether a recomputed range
/// actually changed. Representable-but-insignificant float noise must not
/// produce spurious change notifications.
const RANGE_TOLERANCE: f64 = 1e-12;

/// A closed `[min, max]` value range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRange {
    pub min: f64,
    pub max: f64,
}

impl DataRange {
    /// Create a range from its endpoints.
    pub fn new(min: f64, max: f64) -> Self {
        debug_assert!(min <= max, "inverted data range {}..{}", min, max);
        Self { min, max }
    }

    /// A degenerate range holding a single value.
    pub fn point(value: f64) -> Self {
        Self::new(value, value)
    }

    /// Widen this range to include `value`.
    pub fn include(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// The smallest range containing both inputs.
    pub fn union(self, other: DataRange) -> DataRange {
        DataRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Approximate equality within [`RANGE_TOLERANCE`] relative to the
    /// larger endpoint magnitude.
    pub fn approx_eq(&self, other: &DataRange) -> bool {
        approx_eq(self.min, other.min) && approx_eq(self.max, other.max)
    }
}

impl fmt::Display for DataRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Tolerant float comparison used for change detection.
pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= RANGE_TOLERANCE * a.abs().max(b.abs()).max(1.0)
}

/// Tolerant comparison of optional ranges: two unknowns are equal, an
/// unknown never equals a known range.
pub(crate) fn approx_eq_opt(a: Option<DataRange>, b: Option<DataRange>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.approx_eq(&b),
        _ => false,
    }
}
