//! Clustering approximator: compress `m` competitor inequalities into
//! `floor(m * ratio)` weighted representatives.
//!
//! Each representative is the coordinate-wise minimum of its cluster's
//! coefficient rows, carrying the cluster's total weight. Because every
//! encoder tests guards of the form `row · w >= rhs`, the minimum row is at
//! least as hard to satisfy as any member, so the compressed problem
//! under-approximates the true feasible region: it may miss answers but
//! never invents one.

use nalgebra::DVector;
use tracing::debug;

use crate::error::QueryError;
use crate::question::Inequality;

/// Squared distance from `row` to its nearest chosen seed.
fn nearest_seed_sq(row: &DVector<f64>, seeds: &[usize], rows: &[DVector<f64>]) -> f64 {
    seeds
        .iter()
        .map(|s| (row - &rows[*s]).norm_squared())
        .fold(f64::INFINITY, f64::min)
}

/// Farthest-point seeding followed by a single assignment pass: the first row
/// seeds the first centroid, each further centroid is the row farthest from
/// the seeds chosen so far, every row joins its nearest centroid, and each
/// non-empty cluster is collapsed to its coordinate-wise minimum. Seeding by
/// spread keeps well-separated row groups in distinct clusters no matter how
/// the input is ordered.
///
/// At `ratio = 1.0` the input is returned unchanged, so compression is exact
/// there by construction. Empty clusters are dropped; total weight is
/// preserved either way.
pub fn compress(inequalities: &[Inequality], ratio: f64) -> Result<Vec<Inequality>, QueryError> {
    if !(ratio > 0.0 && ratio <= 1.0) {
        return Err(QueryError::InvalidClusterRatio(ratio));
    }
    let m = inequalities.len();
    let c = ((m as f64 * ratio).floor() as usize).max(1);
    if c >= m {
        return Ok(inequalities.to_vec());
    }

    let rows: Vec<DVector<f64>> = inequalities
        .iter()
        .map(|ineq| DVector::from_row_slice(&ineq.coeffs))
        .collect();
    let mut seeds: Vec<usize> = Vec::with_capacity(c);
    seeds.push(0);
    while seeds.len() < c {
        let next = rows
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                let da = nearest_seed_sq(a, &seeds, &rows);
                let db = nearest_seed_sq(b, &seeds, &rows);
                da.partial_cmp(&db).expect("finite distances")
            })
            .map(|(i, _)| i)
            .expect("at least one row");
        seeds.push(next);
    }

    let dims = inequalities[0].coeffs.len();
    let mut reps: Vec<Inequality> = vec![
        Inequality {
            coeffs: vec![f64::INFINITY; dims],
            weight: 0.0,
        };
        c
    ];
    for (row, ineq) in rows.iter().zip(inequalities.iter()) {
        let nearest = seeds
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = (row - &rows[**a]).norm_squared();
                let db = (row - &rows[**b]).norm_squared();
                da.partial_cmp(&db).expect("finite distances")
            })
            .map(|(i, _)| i)
            .expect("at least one centroid");
        let rep = &mut reps[nearest];
        for (r, v) in rep.coeffs.iter_mut().zip(ineq.coeffs.iter()) {
            *r = r.min(*v);
        }
        rep.weight += ineq.weight;
    }
    reps.retain(|r| r.weight > 0.0);
    debug!(
        original = m,
        clusters = reps.len(),
        "compressed inequality set"
    );
    Ok(reps)
}
