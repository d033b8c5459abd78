//! Pure operations on per-unit rectilinear coverage.
//!
//! A unit's coverage is `Option<&[IndexRange]>`: `None` means nothing is
//! known for that unit yet. These functions never mutate their inputs.

use super::slice::IndexRange;

/// How an access region relates to a unit's existing coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// No volume is shared with existing coverage.
    None,
    /// Some, but not all, of the region lies inside existing coverage.
    Partial,
    /// The region is wholly inside existing coverage.
    Full,
}

/// The smallest rectilinear region containing both the existing coverage
/// and the requested region, computed per dimension independently.
///
/// Unknown coverage adopts the region verbatim.
pub fn expand_to_include(existing: Option<&[IndexRange]>, region: &[IndexRange]) -> Vec<IndexRange> {
    match existing {
        None => region.to_vec(),
        Some(coverage) => {
            debug_assert_eq!(coverage.len(), region.len());
            coverage
                .iter()
                .zip(region.iter())
                .map(|(c, r)| c.span(r))
                .collect()
        }
    }
}

/// True when `region` lies entirely within `coverage` in every dimension.
///
/// Zero spatial dimensions contain vacuously (a unit of a 1-D dataset is
/// fully covered once it has been read at all).
pub fn contains(coverage: &[IndexRange], region: &[IndexRange]) -> bool {
    debug_assert_eq!(coverage.len(), region.len());
    coverage.iter().zip(region.iter()).all(|(c, r)| c.contains(r))
}

/// True when the two regions share volume in every dimension.
pub fn intersects(a: &[IndexRange], b: &[IndexRange]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).all(|(x, y)| x.intersects(y))
}

/// Classify how a spatial region relates to one unit's coverage.
pub fn classify_unit(coverage: Option<&[IndexRange]>, region: &[IndexRange]) -> Overlap {
    let Some(coverage) = coverage else {
        return Overlap::None;
    };
    if contains(coverage, region) {
        Overlap::Full
    } else if intersects(coverage, region) {
        Overlap::Partial
    } else {
        Overlap::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: usize, end: usize) -> IndexRange {
        IndexRange::new(start, end)
    }

    #[test]
    fn test_expand_unknown_adopts_region() {
        let region = vec![r(2, 5), r(0, 3)];
        assert_eq!(expand_to_include(None, &region), region);
    }

    #[test]
    fn test_expand_takes_per_dimension_span() {
        let coverage = vec![r(2, 5), r(4, 8)];
        let region = vec![r(0, 3), r(6, 10)];
        assert_eq!(
            expand_to_include(Some(&coverage), &region),
            vec![r(0, 5), r(4, 10)]
        );
    }

    #[test]
    fn test_contains_strict() {
        let coverage = vec![r(0, 10), r(2, 8)];
        assert!(contains(&coverage, &[r(3, 7), r(2, 8)]));
        assert!(!contains(&coverage, &[r(3, 7), r(1, 8)]));
    }

    #[test]
    fn test_contains_zero_dims_vacuous() {
        assert!(contains(&[], &[]));
    }

    #[test]
    fn test_classify_unknown_is_none() {
        assert_eq!(classify_unit(None, &[r(0, 5)]), Overlap::None);
    }

    #[test]
    fn test_classify_full() {
        let coverage = vec![r(0, 10), r(0, 10)];
        assert_eq!(
            classify_unit(Some(&coverage), &[r(2, 5), r(3, 4)]),
            Overlap::Full
        );
    }

    #[test]
    fn test_classify_partial() {
        let coverage = vec![r(0, 5), r(0, 5)];
        assert_eq!(
            classify_unit(Some(&coverage), &[r(3, 8), r(1, 4)]),
            Overlap::Partial
        );
    }

    #[test]
    fn test_classify_disjoint_in_one_dimension_is_none() {
        // Sharing extent in one dimension is not enough: regions only
        // overlap when they share volume in every dimension.
        let coverage = vec![r(0, 5), r(0, 5)];
        assert_eq!(
            classify_unit(Some(&coverage), &[r(5, 8), r(1, 4)]),
            Overlap::None
        );
    }
}
