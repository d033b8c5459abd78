//! Dataset shape normalization.
//!
//! A [`VolumeShape`] splits the backing source's full shape into the real
//! dimensions addressed by accesses and trailing size-1 padding dimensions.
//! The last real dimension is the unit axis: the granularity at which
//! coverage and range are tracked independently (volume index for 4D data,
//! slice index for 3D, vector index for 2D).

use super::error::AccessError;
use super::slice::{IndexRange, SliceRegion};

/// Real dimensions are kept at a minimum of this many axes before trailing
/// size-1 axes count as padding.
const MIN_REAL_DIMS: usize = 3;

/// Normalized dataset shape: spatial dimensions, unit axis and padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeShape {
    full: Vec<usize>,
    real: usize,
}

impl VolumeShape {
    /// Normalize a raw source shape.
    ///
    /// Trailing size-1 axes collapse into padding, but at least
    /// `min(ndim, 3)` real dimensions are kept. Returns an error for an
    /// empty shape or any zero extent.
    pub fn new(shape: &[usize]) -> Result<Self, AccessError> {
        if shape.is_empty() || shape.iter().any(|&e| e == 0) {
            return Err(AccessError::EmptyShape(shape.to_vec()));
        }
        let mut real = shape.len();
        while real > MIN_REAL_DIMS && shape[real - 1] == 1 {
            real -= 1;
        }
        Ok(Self {
            full: shape.to_vec(),
            real,
        })
    }

    /// The source's full shape, padding included.
    pub fn full_shape(&self) -> &[usize] {
        &self.full
    }

    /// Number of real (non-padding) dimensions, unit axis included.
    pub fn ndim_real(&self) -> usize {
        self.real
    }

    /// Number of spatial dimensions (real dimensions minus the unit axis).
    pub fn spatial_dims(&self) -> usize {
        self.real - 1
    }

    /// Extents of the spatial dimensions.
    pub fn spatial_extents(&self) -> &[usize] {
        &self.full[..self.spatial_dims()]
    }

    /// Number of units along the unit axis.
    pub fn units(&self) -> usize {
        self.full[self.spatial_dims()]
    }

    /// Number of trailing padding dimensions (always size 1, always covered).
    pub fn padding(&self) -> usize {
        self.full.len() - self.real
    }

    /// The whole spatial footprint as per-dimension ranges.
    pub fn full_spatial_region(&self) -> Vec<IndexRange> {
        self.spatial_extents()
            .iter()
            .map(|&e| IndexRange::new(0, e))
            .collect()
    }

    /// Translate spatial extents plus a unit range into index ranges over
    /// the source's full shape, appending `0..1` for each padding axis.
    pub fn full_ranges(&self, spatial: &[IndexRange], units: IndexRange) -> Vec<IndexRange> {
        debug_assert_eq!(spatial.len(), self.spatial_dims());
        let mut ranges = Vec::with_capacity(self.full.len());
        ranges.extend_from_slice(spatial);
        ranges.push(units);
        ranges.extend(std::iter::repeat(IndexRange::new(0, 1)).take(self.padding()));
        ranges
    }

    /// Inverse of [`VolumeShape::full_ranges`]: strip padding axes and
    /// split the unit range back out of full-shape index ranges.
    pub fn region_from_ranges(&self, ranges: &[IndexRange]) -> SliceRegion {
        debug_assert_eq!(ranges.len(), self.full.len());
        SliceRegion::new(
            ranges[..self.spatial_dims()].to_vec(),
            ranges[self.spatial_dims()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: usize, end: usize) -> IndexRange {
        IndexRange::new(start, end)
    }

    #[test]
    fn test_cube_treats_last_axis_as_units() {
        let shape = VolumeShape::new(&[10, 10, 10]).unwrap();
        assert_eq!(shape.ndim_real(), 3);
        assert_eq!(shape.spatial_dims(), 2);
        assert_eq!(shape.spatial_extents(), &[10, 10]);
        assert_eq!(shape.units(), 10);
        assert_eq!(shape.padding(), 0);
    }

    #[test]
    fn test_four_dimensional_volumes() {
        let shape = VolumeShape::new(&[5, 5, 5, 3]).unwrap();
        assert_eq!(shape.spatial_dims(), 3);
        assert_eq!(shape.units(), 3);
        assert_eq!(shape.padding(), 0);
    }

    #[test]
    fn test_trailing_singletons_collapse_to_padding() {
        let shape = VolumeShape::new(&[10, 10, 10, 1, 1]).unwrap();
        assert_eq!(shape.ndim_real(), 3);
        assert_eq!(shape.spatial_dims(), 2);
        assert_eq!(shape.units(), 10);
        assert_eq!(shape.padding(), 2);
    }

    #[test]
    fn test_minimum_three_real_dims_kept() {
        // The trailing 1 stays real: we never collapse below three axes.
        let shape = VolumeShape::new(&[10, 10, 1]).unwrap();
        assert_eq!(shape.ndim_real(), 3);
        assert_eq!(shape.units(), 1);
        assert_eq!(shape.padding(), 0);
    }

    #[test]
    fn test_two_dimensional_per_vector() {
        let shape = VolumeShape::new(&[8, 6]).unwrap();
        assert_eq!(shape.ndim_real(), 2);
        assert_eq!(shape.spatial_dims(), 1);
        assert_eq!(shape.spatial_extents(), &[8]);
        assert_eq!(shape.units(), 6);
    }

    #[test]
    fn test_empty_and_zero_shapes_rejected() {
        assert!(matches!(
            VolumeShape::new(&[]),
            Err(AccessError::EmptyShape(_))
        ));
        assert!(matches!(
            VolumeShape::new(&[4, 0, 2]),
            Err(AccessError::EmptyShape(_))
        ));
    }

    #[test]
    fn test_full_ranges_appends_padding() {
        let shape = VolumeShape::new(&[10, 12, 4, 1]).unwrap();
        let ranges = shape.full_ranges(
            &[IndexRange::new(2, 5), IndexRange::new(0, 12)],
            IndexRange::new(1, 2),
        );
        assert_eq!(
            ranges,
            vec![
                IndexRange::new(2, 5),
                IndexRange::new(0, 12),
                IndexRange::new(1, 2),
                IndexRange::new(0, 1),
            ]
        );
    }

    #[test]
    fn test_region_round_trips_through_full_ranges() {
        let shape = VolumeShape::new(&[10, 12, 4, 1]).unwrap();
        let spatial = vec![r(2, 5), r(0, 12)];
        let units = r(1, 2);
        let full = shape.full_ranges(&spatial, units);
        let region = shape.region_from_ranges(&full);
        assert_eq!(region.spatial, spatial);
        assert_eq!(region.units, units);
    }

    #[test]
    fn test_full_spatial_region() {
        let shape = VolumeShape::new(&[10, 12, 4]).unwrap();
        assert_eq!(
            shape.full_spatial_region(),
            vec![IndexRange::new(0, 10), IndexRange::new(0, 12)]
        );
    }
}
