//! Scanline boolean algebra on coverage values.
//!
//! Coverage is combined as fuzzy-logic values and deliberately left
//! unclamped: union adds, intersection multiplies, difference subtracts.
//! Results outside `[0, 1]` are passed through to the painter untouched.

use crate::float_line::FloatBoundaryLine;
use crate::int_line::IntegerRunLine;

/// Boolean operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    Union,
    Intersection,
    /// A minus B.
    Difference,
    SymmetricDifference,
}

impl BooleanOp {
    pub const ALL: [BooleanOp; 4] = [
        BooleanOp::Union,
        BooleanOp::Intersection,
        BooleanOp::Difference,
        BooleanOp::SymmetricDifference,
    ];

    /// Result of the operation when B is empty: whether A survives.
    #[inline]
    pub fn keeps_a(self) -> bool {
        !matches!(self, BooleanOp::Intersection)
    }

    /// Result of the operation when A is empty: whether B survives.
    #[inline]
    pub fn keeps_b(self) -> bool {
        matches!(self, BooleanOp::Union | BooleanOp::SymmetricDifference)
    }
}

// ============================================================================
// Coverage combination functions
// ============================================================================

/// Combine the coverage of two shapes at one point.
///
/// `None` means the point lies outside that shape's runs. Returns `None`
/// when the result has no run at this point.
#[inline]
pub fn combine_covers(op: BooleanOp, a: Option<f32>, b: Option<f32>) -> Option<f32> {
    match op {
        BooleanOp::Union => match (a, b) {
            (None, None) => None,
            _ => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
        },
        BooleanOp::Intersection => Some(a? * b?),
        BooleanOp::Difference => Some(a? - b.unwrap_or(0.0)),
        BooleanOp::SymmetricDifference => match (a, b) {
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            _ => None,
        },
    }
}

/// Combine two linear spans `(start value, end value)` over the same interval.
#[inline]
pub fn combine_span(op: BooleanOp, a: Option<(f32, f32)>, b: Option<(f32, f32)>) -> Option<(f32, f32)> {
    let v0 = combine_covers(op, a.map(|v| v.0), b.map(|v| v.0))?;
    let v1 = combine_covers(op, a.map(|v| v.1), b.map(|v| v.1))?;
    Some((v0, v1))
}

// ============================================================================
// Line-level drivers
// ============================================================================

/// Combine two flattened float lines into integer runs.
///
/// Both lines are resampled to pixel runs through the scratch lines, then
/// composed into `result`.
pub fn combine_float_lines(
    op: BooleanOp,
    a: &FloatBoundaryLine,
    b: &FloatBoundaryLine,
    scratch_a: &mut IntegerRunLine,
    scratch_b: &mut IntegerRunLine,
    result: &mut IntegerRunLine,
) {
    scratch_a.copy_from_float(a);
    scratch_b.copy_from_float(b);
    result.booleen(scratch_a, scratch_b, op);
}

/// Combine two shapes stored as one integer line per scanline.
///
/// Rows are matched by index; a row missing on one side counts as empty.
/// `result` is resized to the longer of the two inputs, reusing its lines.
pub fn combine_rows(op: BooleanOp, rows_a: &[IntegerRunLine], rows_b: &[IntegerRunLine], result: &mut Vec<IntegerRunLine>) {
    let n = rows_a.len().max(rows_b.len());
    result.resize_with(n, IntegerRunLine::new);
    let empty = IntegerRunLine::new();
    for (y, out) in result.iter_mut().enumerate() {
        let a = rows_a.get(y).unwrap_or(&empty);
        let b = rows_b.get(y).unwrap_or(&empty);
        out.booleen(a, b, op);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_adds_unclamped() {
        assert_eq!(combine_covers(BooleanOp::Union, Some(0.75), Some(0.5)), Some(1.25));
        assert_eq!(combine_covers(BooleanOp::Union, Some(0.75), None), Some(0.75));
        assert_eq!(combine_covers(BooleanOp::Union, None, None), None);
    }

    #[test]
    fn test_intersection_multiplies() {
        assert_eq!(combine_covers(BooleanOp::Intersection, Some(0.5), Some(0.5)), Some(0.25));
        assert_eq!(combine_covers(BooleanOp::Intersection, Some(0.5), None), None);
    }

    #[test]
    fn test_difference_can_go_negative() {
        assert_eq!(combine_covers(BooleanOp::Difference, Some(0.25), Some(0.75)), Some(-0.5));
        assert_eq!(combine_covers(BooleanOp::Difference, None, Some(0.75)), None);
        assert_eq!(combine_covers(BooleanOp::Difference, Some(0.25), None), Some(0.25));
    }

    #[test]
    fn test_symmetric_difference() {
        assert_eq!(combine_covers(BooleanOp::SymmetricDifference, Some(1.0), Some(1.0)), None);
        assert_eq!(combine_covers(BooleanOp::SymmetricDifference, None, Some(0.5)), Some(0.5));
        assert_eq!(combine_covers(BooleanOp::SymmetricDifference, Some(0.5), None), Some(0.5));
    }

    #[test]
    fn test_combine_span() {
        let r = combine_span(BooleanOp::Intersection, Some((0.5, 1.0)), Some((1.0, 0.5)));
        assert_eq!(r, Some((0.5, 0.5)));
        assert_eq!(combine_span(BooleanOp::Intersection, Some((0.5, 1.0)), None), None);
    }

    #[test]
    fn test_empty_side_rules() {
        assert!(BooleanOp::Union.keeps_a() && BooleanOp::Union.keeps_b());
        assert!(!BooleanOp::Intersection.keeps_a() && !BooleanOp::Intersection.keeps_b());
        assert!(BooleanOp::Difference.keeps_a() && !BooleanOp::Difference.keeps_b());
        assert!(BooleanOp::SymmetricDifference.keeps_a() && BooleanOp::SymmetricDifference.keeps_b());
    }

    #[test]
    fn test_combine_rows() {
        let mut a = vec![IntegerRunLine::new(), IntegerRunLine::new()];
        a[0].add_run(0, 4, 1.0, 1.0);
        a[1].add_run(2, 6, 1.0, 1.0);
        let mut b = vec![IntegerRunLine::new()];
        b[0].add_run(2, 8, 1.0, 1.0);

        let mut out = Vec::new();
        combine_rows(BooleanOp::Intersection, &a, &b, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].runs().len(), 1);
        assert_eq!((out[0].runs()[0].st, out[0].runs()[0].en), (2, 4));
        assert!(out[1].runs().is_empty());

        combine_rows(BooleanOp::Union, &a, &b, &mut out);
        assert_eq!(out[1].runs().len(), 1);
        assert_eq!((out[1].runs()[0].st, out[1].runs()[0].en), (2, 6));
    }

    #[test]
    fn test_combine_float_lines() {
        let mut a = FloatBoundaryLine::new();
        a.add_boundary(0.0, 1.0, 6.0, 1.0, None);
        a.flatten();
        let mut b = FloatBoundaryLine::new();
        b.add_boundary(4.0, 1.0, 10.0, 1.0, None);
        b.flatten();
        let mut sa = IntegerRunLine::new();
        let mut sb = IntegerRunLine::new();
        let mut out = IntegerRunLine::new();
        combine_float_lines(BooleanOp::Difference, &a, &b, &mut sa, &mut sb, &mut out);
        // [0,4) at 1.0 and [4,6) at 0.0
        assert_eq!(out.coverage_at(2.0), 1.0);
        assert_eq!(out.coverage_at(5.0), 0.0);
        assert_eq!(out.coverage_at(7.0), 0.0);
    }
}
