use scanline_coverage::scanline_boolean_algebra::{combine_float_lines, combine_rows};
use scanline_coverage::{BooleanOp, FloatBoundaryLine, IntegerRunLine};

fn line(runs: &[(i32, i32, f32, f32)]) -> IntegerRunLine {
    let mut l = IntegerRunLine::new();
    for &(st, en, vst, ven) in runs {
        l.add_run(st, en, vst, ven);
    }
    l
}

fn apply(a: &IntegerRunLine, b: &IntegerRunLine, op: BooleanOp) -> IntegerRunLine {
    let mut out = IntegerRunLine::new();
    out.booleen(a, b, op);
    out
}

fn samples() -> impl Iterator<Item = f64> {
    (-2..24).map(|x| x as f64 + 0.5)
}

#[test]
fn union_then_difference_restores_a_outside_b() {
    let a = line(&[(0, 6, 0.5, 0.5), (12, 16, 0.25, 0.25)]);
    let b = line(&[(4, 10, 0.75, 0.75)]);
    let restored = apply(&apply(&a, &b, BooleanOp::Union), &b, BooleanOp::Difference);

    for x in samples() {
        assert!((restored.coverage_at(x) - a.coverage_at(x)).abs() < 1e-6, "x = {x}");
    }
    // Where only B was present the leftover is an explicit zero run.
    assert_eq!(restored.coverage_at(8.0), 0.0);
    assert!(restored.runs().iter().any(|r| r.st == 6 && r.en == 10));
}

#[test]
fn intersection_is_pointwise_product() {
    let a = line(&[(0, 8, 0.0, 1.0), (10, 14, 0.5, 0.5)]);
    let b = line(&[(2, 12, 0.5, 0.5), (13, 20, 1.0, 1.0)]);
    let out = apply(&a, &b, BooleanOp::Intersection);

    for x in samples() {
        let expected = a.coverage_at(x) * b.coverage_at(x);
        assert!((out.coverage_at(x) - expected).abs() < 1e-6, "x = {x}");
    }
}

#[test]
fn symmetric_difference_matches_union_of_differences() {
    let a = line(&[(0, 6, 1.0, 1.0), (9, 15, 0.5, 0.5)]);
    let b = line(&[(4, 11, 0.75, 0.75), (14, 18, 1.0, 1.0)]);
    let sym = apply(&a, &b, BooleanOp::SymmetricDifference);
    let composed = apply(
        &apply(&a, &b, BooleanOp::Difference),
        &apply(&b, &a, BooleanOp::Difference),
        BooleanOp::Union,
    );

    for x in samples() {
        assert!((sym.coverage_at(x) - composed.coverage_at(x)).abs() < 1e-6, "x = {x}");
    }
}

#[test]
fn results_stay_sorted_and_disjoint() {
    let a = line(&[(0, 3, 1.0, 1.0), (5, 9, 0.2, 0.8), (11, 20, 0.6, 0.6)]);
    let b = line(&[(2, 6, 0.5, 0.5), (8, 12, 1.0, 0.0), (15, 16, 1.0, 1.0)]);
    for op in BooleanOp::ALL {
        let out = apply(&a, &b, op);
        for r in out.runs() {
            assert!(r.st < r.en, "{op:?}");
        }
        for w in out.runs().windows(2) {
            assert!(w[0].en <= w[1].st, "{op:?}");
        }
    }
}

#[test]
fn coverage_is_not_clamped() {
    let a = line(&[(0, 4, 0.75, 0.75)]);
    let b = line(&[(0, 4, 0.75, 0.75)]);
    assert_eq!(apply(&a, &b, BooleanOp::Union).coverage_at(1.0), 1.5);

    let small = line(&[(0, 4, 0.25, 0.25)]);
    assert_eq!(apply(&small, &a, BooleanOp::Difference).coverage_at(1.0), -0.5);
}

#[test]
fn float_lines_compose_through_integer_runs() {
    let mut a = FloatBoundaryLine::new();
    a.add_boundary(1.0, 1.0, 9.0, 1.0, None);
    a.flatten();
    let mut b = FloatBoundaryLine::new();
    b.add_boundary(3.5, 1.0, 6.5, 1.0, None);
    b.flatten();

    let mut sa = IntegerRunLine::new();
    let mut sb = IntegerRunLine::new();
    let mut out = IntegerRunLine::new();
    combine_float_lines(BooleanOp::Difference, &a, &b, &mut sa, &mut sb, &mut out);

    assert_eq!(out.coverage_at(2.0), 1.0);
    assert_eq!(out.coverage_at(3.0), 0.5);
    assert_eq!(out.coverage_at(5.0), 0.0);
    assert_eq!(out.coverage_at(6.0), 0.5);
    assert_eq!(out.coverage_at(8.0), 1.0);
}

#[test]
fn rows_compose_independently() {
    let a = vec![line(&[(0, 4, 1.0, 1.0)]), line(&[(2, 8, 0.5, 0.5)]), line(&[])];
    let b = vec![line(&[(2, 6, 1.0, 1.0)]), line(&[])];
    let mut out = Vec::new();
    combine_rows(BooleanOp::SymmetricDifference, &a, &b, &mut out);

    assert_eq!(out.len(), 3);
    let spans: Vec<(i32, i32)> = out[0].runs().iter().map(|r| (r.st, r.en)).collect();
    assert_eq!(spans, vec![(0, 2), (4, 6)]);
    assert_eq!(out[1].runs(), a[1].runs());
    assert!(out[2].is_empty());
}
