//! Per-unit coverage and range storage.
//!
//! The store owns, for every unit along the unit axis, the rectilinear
//! region already scanned for min/max purposes and the running `(min, max)`
//! over that region. `None` encodes "nothing known yet" on both sides.
//! Coverage only grows, except through [`CoverageStore::invalidate_units`]
//! after a write that overlaps existing coverage.

use tracing::debug;

use super::range::{approx_eq_opt, DataRange};
use crate::region::{classify_unit, contains, IndexRange, Overlap, SliceRegion, VolumeShape};

/// Coverage, per-unit ranges and the aggregate range for one dataset.
#[derive(Debug)]
pub struct CoverageStore {
    shape: VolumeShape,
    /// Scanned region per unit, `None` until the unit is first touched.
    coverage: Vec<Option<Vec<IndexRange>>>,
    /// Known `(min, max)` per unit. `Some` implies non-empty coverage;
    /// the converse does not hold (a scanned region may hold no finite
    /// values at all).
    ranges: Vec<Option<DataRange>>,
    /// Externally supplied seed range. Never shrunk by computation: the
    /// stored aggregate is always `union(hint, computed so far)`.
    hint: Option<DataRange>,
    aggregate: Option<DataRange>,
    covered: bool,
}

impl CoverageStore {
    /// Allocate an all-unknown store for a freshly attached dataset.
    pub fn new(shape: VolumeShape, hint: Option<DataRange>) -> Self {
        let units = shape.units();
        Self {
            shape,
            coverage: vec![None; units],
            ranges: vec![None; units],
            hint,
            aggregate: hint,
            covered: false,
        }
    }

    /// Drop all coverage knowledge and reseed the aggregate with `hint`.
    pub fn reset(&mut self, hint: Option<DataRange>) {
        debug!(units = self.shape.units(), ?hint, "coverage store reset");
        self.coverage.fill(None);
        self.ranges.fill(None);
        self.hint = hint;
        self.aggregate = hint;
        self.covered = false;
    }

    /// The normalized dataset shape this store tracks.
    pub fn shape(&self) -> &VolumeShape {
        &self.shape
    }

    /// A copy of one unit's coverage. Callers cannot mutate the store
    /// through the returned value.
    pub fn unit_coverage(&self, unit: usize) -> Option<Vec<IndexRange>> {
        self.coverage.get(unit).cloned().flatten()
    }

    pub(crate) fn unit_coverage_ref(&self, unit: usize) -> Option<&[IndexRange]> {
        self.coverage.get(unit).and_then(|c| c.as_deref())
    }

    /// One unit's known `(min, max)`, if any finite value has been seen.
    pub fn unit_range(&self, unit: usize) -> Option<DataRange> {
        self.ranges.get(unit).copied().flatten()
    }

    /// Replace one unit's coverage. Aggregator use only.
    pub(crate) fn set_unit_coverage(&mut self, unit: usize, coverage: Vec<IndexRange>) {
        debug_assert_eq!(coverage.len(), self.shape.spatial_dims());
        self.coverage[unit] = Some(coverage);
    }

    /// Replace one unit's range. Aggregator use only.
    pub(crate) fn set_unit_range(&mut self, unit: usize, range: DataRange) {
        self.ranges[unit] = Some(range);
    }

    /// Forget coverage and range for every unit in the half-open range.
    /// Used when a write overlaps existing coverage.
    pub fn invalidate_units(&mut self, units: IndexRange) {
        debug!(units = %units, "invalidating unit coverage");
        for unit in units.iter() {
            if let Some(slot) = self.coverage.get_mut(unit) {
                *slot = None;
            }
            if let Some(slot) = self.ranges.get_mut(unit) {
                *slot = None;
            }
        }
        self.covered = false;
    }

    /// True once every unit's coverage spans the full spatial extent.
    pub fn covered(&self) -> bool {
        self.covered
    }

    /// O(D·U) scan refreshing the covered flag.
    pub fn recompute_covered(&mut self) {
        let full = self.shape.full_spatial_region();
        self.covered = self
            .coverage
            .iter()
            .all(|cov| matches!(cov, Some(c) if contains(c, &full)));
    }

    /// The dataset-wide range: min/max over all known unit ranges, always
    /// unioned with the reset-time hint.
    pub fn aggregate(&self) -> Option<DataRange> {
        self.aggregate
    }

    /// Recompute the aggregate from the per-unit ranges. Returns `true`
    /// when it moved beyond the float-noise tolerance.
    pub(crate) fn recompute_aggregate(&mut self) -> bool {
        let mut computed: Option<DataRange> = self.hint;
        for range in self.ranges.iter().flatten() {
            computed = Some(match computed {
                Some(agg) => agg.union(*range),
                None => *range,
            });
        }
        let changed = !approx_eq_opt(self.aggregate, computed);
        self.aggregate = computed;
        changed
    }

    /// True iff every unit touched by `region` already contains the
    /// requested spatial extent. Unknown coverage always fails.
    pub fn is_fully_covered(&self, region: &SliceRegion) -> bool {
        if region.is_empty() {
            return true;
        }
        region.units.iter().all(|unit| {
            self.unit_coverage_ref(unit)
                .is_some_and(|cov| contains(cov, &region.spatial))
        })
    }

    /// Classify a region against coverage across all units it touches.
    ///
    /// Any partially-overlapping unit makes the whole access `Partial`;
    /// otherwise all-`None` stays `None`, all-`Full` stays `Full`, and a
    /// mixture of the two is `Partial`.
    pub fn classify_overlap(&self, region: &SliceRegion) -> Overlap {
        let mut saw_none = false;
        let mut saw_full = false;
        for unit in region.units.iter() {
            match classify_unit(self.unit_coverage_ref(unit), &region.spatial) {
                Overlap::Partial => return Overlap::Partial,
                Overlap::None => saw_none = true,
                Overlap::Full => saw_full = true,
            }
        }
        match (saw_none, saw_full) {
            (true, true) => Overlap::Partial,
            (false, true) => Overlap::Full,
            _ => Overlap::None,
        }
    }
}
