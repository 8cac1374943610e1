//! Dominance preprocessing: partition competitors and extract the linear
//! inequality each true competitor contributes to the weight-search problem.
//!
//! Under any non-negative weighting, dominators always outrank the expected
//! tuple and dominatees never do, so both drop out of the search; they only
//! shift the rank budget: `k_used = requested_rank - num_dominators - 1`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::QueryError;
use crate::relation::{Dominance, Relation, Tuple};

/// One competitor's inequality: `expected - competitor` per ranking
/// attribute. A weight vector `w` lets the competitor outrank the expected
/// tuple iff `coeffs · w < 0`.
///
/// `weight` is 1.0 for a raw competitor; clustering replaces rows with
/// representatives whose weight is the cluster size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inequality {
    pub coeffs: Vec<f64>,
    pub weight: f64,
}

impl Inequality {
    pub fn unit(coeffs: Vec<f64>) -> Self {
        Self { coeffs, weight: 1.0 }
    }

    /// Evaluate `coeffs · w`.
    pub fn dot(&self, w: &[f64]) -> f64 {
        self.coeffs.iter().zip(w.iter()).map(|(c, x)| c * x).sum()
    }
}

/// One expected tuple bound to a relation's tuple set, with the competitor
/// partition and inequality rows computed once at setup.
///
/// Read-only afterward, except that clustering may irreversibly replace
/// `inequalities` with a smaller weighted set for the current query session.
#[derive(Debug, Clone)]
pub struct Question {
    expected: Tuple,
    requested_rank: usize,
    num_dominators: usize,
    num_dominatees: usize,
    num_competitors: usize,
    inequalities: Vec<Inequality>,
}

impl Question {
    /// Classify every tuple of `relation` against `expected` and collect the
    /// competitor inequalities.
    pub fn prepare(
        relation: &Relation,
        expected: Tuple,
        requested_rank: usize,
    ) -> Result<Self, QueryError> {
        if expected.arity() != relation.arity() {
            return Err(QueryError::ArityMismatch {
                id: expected.id().to_string(),
                found: expected.arity(),
                expected: relation.arity(),
            });
        }
        // The id match below must exclude exactly one tuple, or the
        // dominator/dominatee/competitor partition no longer accounts for the
        // whole relation.
        if relation.find(expected.id()).is_none() {
            return Err(QueryError::UnknownTuple {
                id: expected.id().to_string(),
            });
        }
        let mut num_dominators = 0;
        let mut num_dominatees = 0;
        let mut inequalities = Vec::new();
        for t in relation.tuples() {
            if t.id() == expected.id() {
                continue;
            }
            match expected.dominance(t) {
                Dominance::Dominates => num_dominatees += 1,
                Dominance::DominatedBy => num_dominators += 1,
                Dominance::Incomparable => {
                    let coeffs = expected
                        .attrs()
                        .iter()
                        .zip(t.attrs().iter())
                        .map(|(e, c)| e - c)
                        .collect();
                    inequalities.push(Inequality::unit(coeffs));
                }
            }
        }
        let num_competitors = inequalities.len();
        debug!(
            expected = expected.id(),
            num_dominators, num_dominatees, num_competitors, "prepared question"
        );
        Ok(Self {
            expected,
            requested_rank,
            num_dominators,
            num_dominatees,
            num_competitors,
            inequalities,
        })
    }

    pub fn expected(&self) -> &Tuple {
        &self.expected
    }

    pub fn requested_rank(&self) -> usize {
        self.requested_rank
    }

    pub fn num_dominators(&self) -> usize {
        self.num_dominators
    }

    pub fn num_dominatees(&self) -> usize {
        self.num_dominatees
    }

    /// Number of true competitors (before clustering).
    pub fn num_competitors(&self) -> usize {
        self.num_competitors
    }

    pub fn inequalities(&self) -> &[Inequality] {
        &self.inequalities
    }

    /// Rank budget left for competitors after dominators take their slots.
    /// Negative means the question is unsatisfiable under any weights.
    pub fn threshold(&self) -> i64 {
        self.requested_rank as i64 - self.num_dominators as i64 - 1
    }

    /// Whether dominators alone already exceed the requested rank.
    pub fn infeasible_by_preprocessing(&self) -> bool {
        self.threshold() < 0
    }

    /// Swap in a clustered inequality set. One-way for this session.
    pub(crate) fn replace_inequalities(&mut self, inequalities: Vec<Inequality>) {
        self.inequalities = inequalities;
    }

    /// Rank the expected tuple would obtain at the weight vector `w`:
    /// dominators always sit above, and each strictly violated competitor
    /// inequality adds its weight.
    pub fn rank_at(&self, w: &[f64]) -> usize {
        let beaten: f64 = self
            .inequalities
            .iter()
            .filter(|ineq| ineq.dot(w) < -1e-9)
            .map(|ineq| ineq.weight)
            .sum();
        self.num_dominators + beaten.round() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(rows: &[(&str, &[f64])]) -> Relation {
        let tuples = rows
            .iter()
            .map(|(id, attrs)| Tuple::new(*id, attrs.to_vec()).unwrap())
            .collect();
        Relation::new("test", tuples).unwrap()
    }

    #[test]
    fn partition_counts_sum_to_relation_size() {
        let relation = rel(&[
            ("1", &[0.9, 0.9]),
            ("2", &[0.1, 0.1]),
            ("3", &[0.8, 0.2]),
            ("4", &[0.2, 0.8]),
            ("5", &[0.5, 0.5]),
        ]);
        let expected = relation.find("5").unwrap().clone();
        let q = Question::prepare(&relation, expected, 3).unwrap();
        assert_eq!(q.num_dominators(), 1);
        assert_eq!(q.num_dominatees(), 1);
        assert_eq!(q.num_competitors(), 2);
        assert_eq!(
            q.num_dominators() + q.num_dominatees() + q.num_competitors() + 1,
            relation.len()
        );
        assert_eq!(q.threshold(), 1);
    }

    #[test]
    fn dominated_tuples_contribute_no_inequality() {
        let relation = rel(&[("1", &[0.9, 0.9]), ("2", &[0.1, 0.1]), ("3", &[0.5, 0.5])]);
        let expected = relation.find("3").unwrap().clone();
        let q = Question::prepare(&relation, expected, 2).unwrap();
        // "1" dominates, "2" is dominated: neither appears as a row.
        assert!(q.inequalities().is_empty());
    }

    #[test]
    fn inequality_is_expected_minus_competitor() {
        let relation = rel(&[("1", &[0.8, 0.2]), ("2", &[0.3, 0.6])]);
        let expected = relation.find("2").unwrap().clone();
        let q = Question::prepare(&relation, expected, 1).unwrap();
        assert_eq!(q.inequalities().len(), 1);
        let row = &q.inequalities()[0].coeffs;
        assert!((row[0] - (0.3 - 0.8)).abs() < 1e-12);
        assert!((row[1] - (0.6 - 0.2)).abs() < 1e-12);
    }

    #[test]
    fn foreign_expected_tuple_is_rejected() {
        // A value-identical tuple under an unknown id would slip into the
        // competitor set as a zero row; reject it instead.
        let relation = rel(&[("1", &[0.8, 0.2]), ("2", &[0.2, 0.8])]);
        let outsider = Tuple::new("9", vec![0.2, 0.8]).unwrap();
        let err = Question::prepare(&relation, outsider, 1);
        assert!(matches!(err, Err(QueryError::UnknownTuple { .. })));
    }

    #[test]
    fn negative_threshold_flags_preprocessing_infeasibility() {
        let relation = rel(&[("1", &[0.9, 0.9]), ("2", &[0.5, 0.5]), ("3", &[0.1, 0.1])]);
        let expected = relation.find("2").unwrap().clone();
        let q = Question::prepare(&relation, expected, 1).unwrap();
        assert_eq!(q.num_dominators(), 1);
        assert!(q.infeasible_by_preprocessing());
    }

    #[test]
    fn rank_at_counts_weighted_violations() {
        let relation = rel(&[("1", &[0.8, 0.2]), ("2", &[0.2, 0.8]), ("3", &[0.5, 0.5])]);
        let expected = relation.find("3").unwrap().clone();
        let q = Question::prepare(&relation, expected, 1).unwrap();
        // Heavy weight on attribute 1 lets "1" win but not "2".
        assert_eq!(q.rank_at(&[1.0, 0.0]), 2);
        // Balanced weights tie everything: no strict violation.
        assert_eq!(q.rank_at(&[0.5, 0.5]), 1);
    }

    #[test]
    fn rank_at_always_counts_dominators() {
        let relation = rel(&[("1", &[0.9, 0.9]), ("2", &[0.8, 0.1]), ("3", &[0.5, 0.5])]);
        let expected = relation.find("3").unwrap().clone();
        let q = Question::prepare(&relation, expected, 2).unwrap();
        // "1" dominates unconditionally; "2" only wins under attribute-1 weight.
        assert_eq!(q.rank_at(&[0.5, 0.5]), 2);
        assert_eq!(q.rank_at(&[1.0, 0.0]), 3);
    }
}
