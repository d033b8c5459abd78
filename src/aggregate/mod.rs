//! Range aggregation.
//!
//! The aggregator executes a list of planned expansions: it reads each
//! expansion from the backing source, folds the finite min/max of the fresh
//! data into the per-unit running range, grows the unit's coverage, and
//! finally recomputes the aggregate range and the covered flag. It is the
//! only code that mutates the coverage store.

use ndarray::Axis;
use tracing::{debug, warn};

use crate::coverage::{CoverageStore, DataRange};
use crate::planner::Expansion;
use crate::region::expand_to_include;
use crate::source::{DtypeKind, SourceError, VolumeSource};

/// What one aggregation pass did.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    /// True when the aggregate range moved beyond the float tolerance.
    pub changed: bool,
    /// The source failure that aborted the pass, if any. A failed pass
    /// leaves the store exactly as it was.
    pub error: Option<SourceError>,
}

/// Execute `expansions` against `source`, folding results into `store`.
///
/// The pass is all-or-nothing: every expansion is read before anything is
/// folded, and a failed read aborts the pass with the store untouched. The
/// planned expansions jointly tile the grown coverage rectangle, so
/// applying only part of them would mark never-read filler regions
/// covered. A failed pass leaves coverage conservatively unknown; the next
/// access simply plans again. Malformed (empty) expansions are a
/// programmer error, asserted in debug builds and skipped in release
/// builds.
pub fn apply_expansions<S: VolumeSource>(
    store: &mut CoverageStore,
    expansions: &[Expansion],
    source: &S,
) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();
    let dtype = source.dtype();
    let unit_axis = Axis(store.shape().spatial_dims());

    // Read phase. One read per expansion, all of its units at once: this
    // is what collapsing adjacent-unit expansions buys us when the source
    // charges a fixed cost per call.
    let mut blocks = Vec::with_capacity(expansions.len());
    for expansion in expansions {
        debug_assert!(!expansion.is_empty(), "empty expansion reached aggregator");
        if expansion.is_empty() {
            continue;
        }
        let region = store.shape().full_ranges(&expansion.spatial, expansion.units);
        match source.read_region(&region) {
            Ok(data) => blocks.push((expansion, data)),
            Err(error) => {
                warn!(
                    units = %expansion.units,
                    error = %error,
                    "expansion read failed; pass aborted, coverage unchanged"
                );
                outcome.error = Some(error);
                return outcome;
            }
        }
    }

    // Fold phase. All reads succeeded; store mutation cannot half-apply.
    for (expansion, data) in blocks {
        for (offset, unit) in expansion.units.iter().enumerate() {
            let unit_data = data.index_axis(unit_axis, offset);
            if let Some(fresh) = finite_range(unit_data.iter().copied(), dtype) {
                let folded = match store.unit_range(unit) {
                    Some(existing) => existing.union(fresh),
                    None => fresh,
                };
                store.set_unit_range(unit, folded);
            }
            // No finite values is still valid, fully-scanned information:
            // coverage grows either way.
            let grown = expand_to_include(store.unit_coverage_ref(unit), &expansion.spatial);
            store.set_unit_coverage(unit, grown);
        }
    }

    outcome.changed = store.recompute_aggregate();
    store.recompute_covered();
    debug!(
        changed = outcome.changed,
        covered = store.covered(),
        aggregate = ?store.aggregate(),
        "aggregation pass complete"
    );
    outcome
}

/// The finite `(min, max)` of a freshly-read block, or `None` when it holds
/// no finite values at all.
///
/// Integer-kind sources cannot contain NaN/Inf, so the screen is skipped.
fn finite_range(values: impl Iterator<Item = f64>, dtype: DtypeKind) -> Option<DataRange> {
    let mut range: Option<DataRange> = None;
    let screen = dtype.may_contain_non_finite();
    for value in values {
        if screen && !value.is_finite() {
            continue;
        }
        match range.as_mut() {
            Some(range) => range.include(value),
            None => range = Some(DataRange::point(value)),
        }
    }
    range
}
