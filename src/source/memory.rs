//! In-memory reference source.

use std::sync::RwLock;

use ndarray::{ArrayD, SliceInfoElem};

use super::{DtypeKind, SourceError, VolumeSource};
use crate::coverage::DataRange;
use crate::region::IndexRange;

/// A [`VolumeSource`] backed by an owned in-memory array.
///
/// Serves as the reference implementation for tests and for consumers whose
/// data already lives in memory. Writes are validated up front so a failed
/// call leaves the array untouched.
pub struct MemorySource {
    data: RwLock<ArrayD<f64>>,
    dtype: DtypeKind,
    hint: Option<DataRange>,
}

impl MemorySource {
    /// Wrap an array as a floating-point source.
    pub fn new(data: ArrayD<f64>) -> Self {
        Self::with_dtype(data, DtypeKind::Floating)
    }

    /// Wrap an array with an explicit dtype classification.
    pub fn with_dtype(data: ArrayD<f64>, dtype: DtypeKind) -> Self {
        Self {
            data: RwLock::new(data),
            dtype,
            hint: None,
        }
    }

    /// Attach a calibration hint, as a file header would carry.
    pub fn with_hint(mut self, hint: DataRange) -> Self {
        self.hint = Some(hint);
        self
    }

    fn slice_elems(&self, region: &[IndexRange]) -> Result<Vec<SliceInfoElem>, SourceError> {
        let shape = self.shape();
        if region.len() != shape.len() {
            return Err(SourceError::ShapeMismatch(format!(
                "region has {} axes, source has {}",
                region.len(),
                shape.len()
            )));
        }
        for (axis, (range, &extent)) in region.iter().zip(shape.iter()).enumerate() {
            if range.start > range.end || range.end > extent {
                return Err(SourceError::ShapeMismatch(format!(
                    "range {} exceeds extent {} on axis {}",
                    range, extent, axis
                )));
            }
        }
        Ok(region
            .iter()
            .map(|r| SliceInfoElem::Slice {
                start: r.start as isize,
                end: Some(r.end as isize),
                step: 1,
            })
            .collect())
    }
}

impl VolumeSource for MemorySource {
    fn shape(&self) -> Vec<usize> {
        self.data.read().expect("source lock poisoned").shape().to_vec()
    }

    fn dtype(&self) -> DtypeKind {
        self.dtype
    }

    fn read_region(&self, region: &[IndexRange]) -> Result<ArrayD<f64>, SourceError> {
        let elems = self.slice_elems(region)?;
        let data = self.data.read().expect("source lock poisoned");
        Ok(data.slice(elems.as_slice()).to_owned())
    }

    fn write_region(&self, region: &[IndexRange], values: &ArrayD<f64>) -> Result<(), SourceError> {
        let elems = self.slice_elems(region)?;
        let expected: Vec<usize> = region.iter().map(IndexRange::len).collect();
        if values.shape() != expected.as_slice() {
            return Err(SourceError::ShapeMismatch(format!(
                "values have shape {:?}, region expects {:?}",
                values.shape(),
                expected
            )));
        }
        let mut data = self.data.write().expect("source lock poisoned");
        data.slice_mut(elems.as_slice()).assign(values);
        Ok(())
    }

    fn calibration_hint(&self) -> Option<DataRange> {
        self.hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn r(start: usize, end: usize) -> IndexRange {
        IndexRange::new(start, end)
    }

    fn source() -> MemorySource {
        // 4x4 array with values 0..16 row-major.
        let data =
            ArrayD::from_shape_vec(IxDyn(&[4, 4]), (0..16).map(f64::from).collect()).unwrap();
        MemorySource::new(data)
    }

    #[test]
    fn test_read_region() {
        let src = source();
        let sub = src.read_region(&[r(1, 3), r(0, 2)]).unwrap();
        assert_eq!(sub.shape(), &[2, 2]);
        assert_eq!(sub.iter().copied().collect::<Vec<_>>(), vec![4.0, 5.0, 8.0, 9.0]);
    }

    #[test]
    fn test_read_rejects_out_of_bounds() {
        let src = source();
        assert!(matches!(
            src.read_region(&[r(0, 5), r(0, 4)]),
            Err(SourceError::ShapeMismatch(_))
        ));
        assert!(matches!(
            src.read_region(&[r(0, 4)]),
            Err(SourceError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_write_region_round_trip() {
        let src = source();
        let values = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![-1.0, -2.0, -3.0, -4.0]).unwrap();
        src.write_region(&[r(0, 2), r(2, 4)], &values).unwrap();
        let back = src.read_region(&[r(0, 2), r(2, 4)]).unwrap();
        assert_eq!(back, values);
        // Neighbouring data untouched.
        let other = src.read_region(&[r(0, 1), r(0, 1)]).unwrap();
        assert_eq!(other[[0, 0]], 0.0);
    }

    #[test]
    fn test_write_is_all_or_nothing_on_bad_shape() {
        let src = source();
        let values = ArrayD::from_shape_vec(IxDyn(&[3, 2]), vec![9.0; 6]).unwrap();
        assert!(src.write_region(&[r(0, 2), r(2, 4)], &values).is_err());
        let back = src.read_region(&[r(0, 2), r(2, 4)]).unwrap();
        assert_eq!(back.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 6.0, 7.0]);
    }

    #[test]
    fn test_hint_round_trip() {
        let src = source().with_hint(DataRange::new(0.0, 15.0));
        assert_eq!(src.calibration_hint(), Some(DataRange::new(0.0, 15.0)));
    }
}
