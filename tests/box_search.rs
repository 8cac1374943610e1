//! Robust-box searches on geometries small enough to check by hand.
//!
//! The running example pits expected tuple "2" = (0.4, 0.6) against a single
//! competitor "1" = (0.8, 0.3) at rank 1. The inequality row is (-0.4, 0.3),
//! so a box is robust iff `-0.4 * upper_1 + 0.3 * lower_2 >= 0` at its worst
//! vertex, and the maximum CUBE perimeter works out to exactly 1.0 (the box
//! [0, 0] x [0, 1]).

use rankbox::{
    BoundConstraint, Measure, QueryError, QueryOptions, Relation, Shape, Tuple, WhyNotQuery,
};

fn relation(rows: &[(&str, &[f64])]) -> Relation {
    let tuples = rows
        .iter()
        .map(|(id, attrs)| Tuple::new(*id, attrs.to_vec()).unwrap())
        .collect();
    Relation::new("test", tuples).unwrap()
}

fn pair_query(options: QueryOptions) -> WhyNotQuery {
    let rel = relation(&[("1", &[0.8, 0.3]), ("2", &[0.4, 0.6])]);
    let exp = rel.find("2").unwrap().clone();
    WhyNotQuery::new(&rel, vec![exp], &[1], options).unwrap()
}

fn precise() -> QueryOptions {
    QueryOptions {
        precise: true,
        ..QueryOptions::default()
    }
}

#[test]
fn cube_search_approaches_the_known_supremum() {
    let q = pair_query(QueryOptions::default());
    let b = q.best_box(Shape::Cube).unwrap();
    assert!(b.valid());
    // Sound from above, within the bisection tolerance from below.
    assert!(b.measure() <= 1.0 + 1e-9);
    assert!(b.measure() >= 1.0 - 0.01 - 1e-9);
    assert!((b.perimeter() - b.measure()).abs() < 1e-6);
}

#[test]
fn precise_cube_search_hits_the_supremum() {
    let q = pair_query(precise());
    let b = q.best_box(Shape::Cube).unwrap();
    assert!(b.valid());
    assert!((b.measure() - 1.0).abs() < 1e-6);
}

#[test]
fn every_vertex_of_the_box_keeps_the_rank() {
    let q = pair_query(QueryOptions::default());
    let b = q.best_box(Shape::Cube).unwrap();
    assert!(b.valid());

    let question = &q.questions()[0];
    let intervals = b.intervals();
    for mask in 0..(1u32 << intervals.len()) {
        let vertex: Vec<f64> = intervals
            .iter()
            .enumerate()
            .map(|(i, (lo, hi))| if mask & (1 << i) == 0 { *lo } else { *hi })
            .collect();
        assert!(question.rank_at(&vertex) <= 1, "vertex {vertex:?} breaks rank");
    }
}

#[test]
fn min_bound_shrinks_the_achievable_box() {
    // Forcing lower_1 >= 0.5 drags upper_1 up with it, which in turn forces
    // lower_2 >= 4/3 * upper_1. The optimum drops to 1/3.
    let mut q = pair_query(precise());
    q.add_constraint(BoundConstraint::min(0, 0.5));
    let b = q.best_box(Shape::Cube).unwrap();
    assert!(b.valid());
    assert!((b.measure() - 1.0 / 3.0).abs() < 1e-6);
    assert!(b.intervals()[0].0 >= 0.5 - 1e-9);
}

#[test]
fn out_of_range_constraint_is_rejected() {
    let mut q = pair_query(QueryOptions::default());
    q.add_constraint(BoundConstraint::space(5, 0.1));
    assert!(matches!(
        q.best_box(Shape::Cube),
        Err(QueryError::ConstraintOutOfRange { .. })
    ));
}

#[test]
fn triangle_fold_caps_the_free_attribute() {
    // With the second weight implied by 1 - w1, the single folded guard is
    // -0.7 * upper <= 0.3, so the interval can reach at most [0, 3/7].
    let q = pair_query(precise());
    let b = q.best_box(Shape::Triangle).unwrap();
    assert!(b.valid());
    assert_eq!(b.intervals().len(), 1);
    assert!((b.measure() - 3.0 / 7.0).abs() < 1e-6);
}

#[test]
fn pyramid_keeps_uppers_under_the_simplex() {
    let q = pair_query(precise());
    let b = q.best_box(Shape::Pyramid).unwrap();
    assert!(b.valid());
    let uppers: f64 = b.intervals().iter().map(|(_, hi)| hi).sum();
    assert!(uppers <= 1.0 + 1e-6);
    assert!((b.measure() - 1.0).abs() < 1e-6);
}

#[test]
fn generous_rank_admits_the_full_cube() {
    use rankbox::{DataDistribution, Generator};

    // Requesting the bottom rank leaves no guard to enforce, so the search
    // should recover (nearly) the whole [0, 1]^3 cube.
    let rel = Generator::new(10, 3)
        .generate(DataDistribution::Uniform, 42)
        .unwrap();
    let exp = rel.get(4).unwrap().clone();
    let q = WhyNotQuery::new(&rel, vec![exp], &[10], QueryOptions::default()).unwrap();

    let b = q.best_box(Shape::Cube).unwrap();
    assert!(b.valid());
    assert_eq!(b.intervals().len(), 3);
    assert!((b.measure() - 3.0).abs() <= 0.01 + 1e-6);
    assert!((b.perimeter() - b.measure()).abs() < 1e-6);
}

#[test]
fn volume_measure_reports_the_interval_product() {
    use rankbox::{DataDistribution, Generator};

    let rel = Generator::new(10, 3)
        .generate(DataDistribution::Uniform, 42)
        .unwrap();
    let exp = rel.get(4).unwrap().clone();
    let options = QueryOptions {
        measure: Measure::Volume,
        ..QueryOptions::default()
    };
    let q = WhyNotQuery::new(&rel, vec![exp], &[10], options).unwrap();

    let b = q.best_box(Shape::Cube).unwrap();
    // A perimeter near 3 forces every width near 1.
    assert!(b.measure() > 0.9);
    assert!((b.measure() - b.volume()).abs() < 1e-9);
}

#[test]
fn precise_volume_objective_is_unsupported() {
    let options = QueryOptions {
        precise: true,
        measure: Measure::Volume,
        ..QueryOptions::default()
    };
    let q = pair_query(options);
    assert!(matches!(
        q.best_box(Shape::Cube),
        Err(QueryError::Engine(_))
    ));
}
