//! Access specification normalization.
//!
//! Consumers describe reads and writes with a small closed set of per-axis
//! selections. [`bounds_of_access`] validates one selection per real
//! dimension against the attached shape and produces the canonical
//! [`SliceRegion`] the rest of the engine operates on.

use super::error::AccessError;
use super::shape::VolumeShape;
use super::slice::{IndexRange, SliceRegion};

/// One per-axis selection in an access description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSpec {
    /// A single index along the axis.
    Index(usize),
    /// A half-open `[start, end)` range along the axis.
    Range(usize, usize),
    /// The whole axis.
    All,
    /// A selection that does not reduce to a rectangle (a mask, a fancy
    /// index list). No rectilinear expansion can represent it precisely,
    /// so it conservatively widens to the whole axis.
    NonRectilinear,
}

/// Normalize an access description into a canonical [`SliceRegion`].
///
/// The description must carry exactly one selection per real dimension
/// (padding axes are addressed implicitly). Out-of-bounds indices and
/// inverted ranges are rejected, never clamped.
pub fn bounds_of_access(
    access: &[AccessSpec],
    shape: &VolumeShape,
) -> Result<SliceRegion, AccessError> {
    if access.len() != shape.ndim_real() {
        return Err(AccessError::DimensionMismatch {
            expected: shape.ndim_real(),
            got: access.len(),
        });
    }

    let mut ranges = Vec::with_capacity(access.len());
    for (dim, selection) in access.iter().enumerate() {
        let extent = shape.full_shape()[dim];
        let range = match *selection {
            AccessSpec::Index(i) => {
                if i >= extent {
                    return Err(AccessError::OutOfBounds {
                        dim,
                        index: i,
                        extent,
                    });
                }
                IndexRange::new(i, i + 1)
            }
            AccessSpec::Range(start, end) => {
                if start > end || end > extent {
                    return Err(AccessError::InvalidRange {
                        dim,
                        start,
                        end,
                        extent,
                    });
                }
                IndexRange::new(start, end)
            }
            AccessSpec::All | AccessSpec::NonRectilinear => IndexRange::new(0, extent),
        };
        ranges.push(range);
    }

    let units = ranges.pop().expect("ndim_real is at least one");
    Ok(SliceRegion::new(ranges, units))
}
