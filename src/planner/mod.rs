//! Expansion planning.
//!
//! Given a requested access region and the current coverage, the planner
//! computes the minimal set of additional rectilinear regions that must be
//! read from the backing source to extend coverage over the request. The
//! planner never reads data itself; it only produces [`Expansion`]s for the
//! aggregator to execute.
//!
//! Candidate expansions for one unit are built per required side of each
//! dimension and then pairwise de-overlapped so no volume is planned twice.
//! De-overlapping only ever shrinks a candidate; when two candidates
//! overlap in the interior of a dimension and neither contains the other
//! along the remaining dimensions, the overlap is left in place: a small
//! double-read costs redundant I/O but never incorrectness.

use tracing::trace;

use crate::coverage::CoverageStore;
use crate::region::{intersects, IndexRange, SliceRegion};

/// One rectilinear region that must be read to grow coverage, restricted to
/// a unit range.
///
/// The planner emits single-unit expansions; [`collapse_expansions`] may
/// widen the unit range when adjacent units need an identical spatial read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Half-open range of units this expansion reads.
    pub units: IndexRange,
    /// Extent along each spatial dimension.
    pub spatial: Vec<IndexRange>,
}

impl Expansion {
    /// True when the expansion addresses no indices.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() || self.spatial.iter().any(IndexRange::is_empty)
    }
}

/// Compute the expansions needed to bring coverage up to `region`.
///
/// Units never touched before expand by the full requested region; units
/// with prior coverage expand by the per-dimension required ranges only.
/// Units already containing the request produce nothing, so the call is
/// idempotent. Zero-volume requests plan nothing.
pub fn calc_expansion(region: &SliceRegion, store: &CoverageStore) -> Vec<Expansion> {
    if region.is_empty() {
        return Vec::new();
    }

    let mut expansions = Vec::new();
    for unit in region.units.iter() {
        let units = IndexRange::new(unit, unit + 1);
        match store.unit_coverage_ref(unit) {
            // Brand-new unit: nothing to avoid re-reading, take the whole
            // requested region.
            None => expansions.push(Expansion {
                units,
                spatial: region.spatial.clone(),
            }),
            Some(coverage) => {
                let mut candidates = unit_candidates(&region.spatial, coverage);
                resolve_overlaps(&mut candidates);
                for spatial in candidates {
                    let expansion = Expansion { units, spatial };
                    if !expansion.is_empty() {
                        expansions.push(expansion);
                    }
                }
            }
        }
    }
    trace!(region = %region, count = expansions.len(), "planned expansions");
    expansions
}

/// Build one candidate rectangle per required side of each dimension.
///
/// A candidate's extent along its own dimension is exactly the required
/// range; along every other dimension it is the union of existing coverage
/// and that dimension's required ranges (existing coverage alone when the
/// dimension needs nothing), so coverage plus candidates tile the union of
/// coverage and request.
fn unit_candidates(request: &[IndexRange], coverage: &[IndexRange]) -> Vec<Vec<IndexRange>> {
    let dims = request.len();
    let mut required: Vec<(usize, IndexRange)> = Vec::new();
    let mut has_required = vec![false; dims];
    for d in 0..dims {
        if request[d].start < coverage[d].start {
            required.push((d, IndexRange::new(request[d].start, coverage[d].start)));
            has_required[d] = true;
        }
        if request[d].end > coverage[d].end {
            required.push((d, IndexRange::new(coverage[d].end, request[d].end)));
            has_required[d] = true;
        }
    }

    required
        .iter()
        .map(|&(dx, range)| {
            (0..dims)
                .map(|dy| {
                    if dy == dx {
                        range
                    } else if has_required[dy] {
                        coverage[dy].span(&request[dy])
                    } else {
                        coverage[dy]
                    }
                })
                .collect()
        })
        .collect()
}

/// Pairwise de-overlap of one unit's candidates.
///
/// For each ordered pair, when one candidate contains the other along every
/// dimension but `dx`, the contained side's `dx` extent is shrunk until the
/// two no longer overlap. Shrinking only removes volume still covered by
/// the other candidate at that moment, so the union of all candidates is
/// preserved regardless of pair order.
fn resolve_overlaps(candidates: &mut [Vec<IndexRange>]) {
    let n = candidates.len();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let a = candidates[i].clone();
            if a.iter().any(IndexRange::is_empty)
                || candidates[j].iter().any(IndexRange::is_empty)
                || !intersects(&a, &candidates[j])
            {
                continue;
            }
            let dims = a.len();
            for dx in 0..dims {
                let contained_elsewhere =
                    (0..dims).filter(|&d| d != dx).all(|d| a[d].contains(&candidates[j][d]));
                if contained_elsewhere {
                    shrink(&mut candidates[j][dx], &a[dx]);
                    break;
                }
            }
        }
    }
}

/// Remove from `mine` the part overlapped by `other`, when the overlap
/// touches either end of `mine`. An interior overlap is left alone.
fn shrink(mine: &mut IndexRange, other: &IndexRange) {
    if !mine.intersects(other) {
        return;
    }
    let covers_low = other.start <= mine.start;
    let covers_high = other.end >= mine.end;
    match (covers_low, covers_high) {
        // Fully redundant candidate.
        (true, true) => mine.end = mine.start,
        (true, false) => mine.start = other.end,
        (false, true) => mine.end = other.start,
        (false, false) => {}
    }
}

/// Merge expansions with identical spatial extents whose unit ranges touch.
///
/// The backing source may charge a fixed per-call cost (decompression, a
/// seek), so reading three adjacent volumes in one call amortizes it.
/// Expansions whose spatial extents differ are never merged.
pub fn collapse_expansions(expansions: Vec<Expansion>) -> Vec<Expansion> {
    let mut groups: Vec<(Vec<IndexRange>, Vec<IndexRange>)> = Vec::new();
    for expansion in expansions {
        match groups.iter_mut().find(|(spatial, _)| *spatial == expansion.spatial) {
            Some((_, units)) => units.push(expansion.units),
            None => groups.push((expansion.spatial, vec![expansion.units])),
        }
    }

    let mut collapsed = Vec::new();
    for (spatial, mut units) in groups {
        units.sort_by_key(|u| u.start);
        let mut merged: Vec<IndexRange> = Vec::new();
        for range in units {
            match merged.last_mut() {
                Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
                _ => merged.push(range),
            }
        }
        collapsed.extend(merged.into_iter().map(|units| Expansion {
            units,
            spatial: spatial.clone(),
        }));
    }
    collapsed
}
