//! Satisfiability encoder: does any weight vector keep the expected
//! tuple(s) within their rank budgets?
//!
//! Weights live on the simplex (`Σw = 1`, `w ≥ 0`), which pins scale without
//! excluding any ranking. Each competitor inequality becomes a guard
//! `row · w ≥ 0` ("competitor does not beat the expected tuple"); a question
//! is answered by requiring guard weight of at least
//! `num_competitors − k_used` to hold simultaneously.

use crate::question::Question;
use crate::system::{CardinalityGroup, Cmp, Guard, LinExpr, System};

/// Build the indicator system for one or more questions over a shared weight
/// vector of `arity` attributes.
///
/// Callers must have handled `threshold() < 0` questions already; this
/// encoder assumes every question still has a non-negative rank budget.
pub fn satisfiability_system(questions: &[Question], arity: usize) -> System {
    let mut sys = System::new();
    for _ in 0..arity {
        sys.add_var(0.0, 1.0);
    }
    let mut sum = LinExpr::new();
    for i in 0..arity {
        sum.push(i, 1.0);
    }
    sys.add_constraint(sum, Cmp::Eq, 1.0);

    for q in questions {
        let guards = q
            .inequalities()
            .iter()
            .map(|ineq| {
                let mut expr = LinExpr::new();
                for (j, c) in ineq.coeffs.iter().enumerate() {
                    expr.push(j, *c);
                }
                Guard { expr, rhs: 0.0 }
            })
            .collect();
        let weights = q.inequalities().iter().map(|i| i.weight).collect();
        sys.add_group(CardinalityGroup {
            guards,
            weights,
            required: q.num_competitors() as f64 - q.threshold() as f64,
        });
    }
    sys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation::{Relation, Tuple};

    fn question(rows: &[(&str, &[f64])], expected: &str, rank: usize) -> Question {
        let tuples = rows
            .iter()
            .map(|(id, attrs)| Tuple::new(*id, attrs.to_vec()).unwrap())
            .collect();
        let relation = Relation::new("t", tuples).unwrap();
        let exp = relation.find(expected).unwrap().clone();
        Question::prepare(&relation, exp, rank).unwrap()
    }

    #[test]
    fn one_variable_per_attribute_plus_simplex() {
        let q = question(&[("1", &[0.8, 0.2]), ("2", &[0.2, 0.8])], "2", 1);
        let sys = satisfiability_system(&[q], 2);
        assert_eq!(sys.vars.len(), 2);
        assert_eq!(sys.constraints.len(), 1);
        assert!(matches!(sys.constraints[0].cmp, Cmp::Eq));
    }

    #[test]
    fn group_requires_all_but_k_guards() {
        let q = question(
            &[
                ("1", &[0.8, 0.2]),
                ("2", &[0.7, 0.3]),
                ("3", &[0.2, 0.8]),
                ("4", &[0.3, 0.6]),
            ],
            "4",
            2,
        );
        // 3 competitors, no dominators: k_used = 1, so 2 guards must hold.
        let sys = satisfiability_system(&[q], 2);
        assert_eq!(sys.groups.len(), 1);
        assert_eq!(sys.groups[0].guards.len(), 3);
        assert!((sys.groups[0].required - 2.0).abs() < 1e-12);
    }
}
