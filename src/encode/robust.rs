//! Box-robustness encoder.
//!
//! A guard `c · w >= rhs` holds for every `w` in a box iff it holds at the
//! single worst-case vertex chosen independently per attribute: the lower
//! bound where the coefficient is non-negative, the upper bound where it is
//! negative. Substituting bound variables accordingly turns a robustness
//! question over `2^n` vertices into one linear guard over the `2n` bound
//! variables.
//!
//! Variable layout: index `2i` is the lower bound of free attribute `i`,
//! index `2i + 1` its upper bound.

use crate::error::QueryError;
use crate::geometry::{BoundConstraint, BoundKind, Shape};
use crate::question::Question;
use crate::system::{CardinalityGroup, Cmp, Guard, LinExpr, QuantifiedGroup, System};

/// Declare the `2 * used` bound variables with `0 <= lower <= upper <= 1`.
fn bound_vars(sys: &mut System, used: usize) {
    for i in 0..used {
        sys.add_var(0.0, 1.0); // lower
        sys.add_var(0.0, 1.0); // upper
        let mut width = LinExpr::new();
        width.push(2 * i + 1, 1.0);
        width.push(2 * i, -1.0);
        sys.add_constraint(width, Cmp::Ge, 0.0);
    }
}

/// Translate the user's flexible constraints onto the bound variables.
fn apply_flexible(
    sys: &mut System,
    flex: &[BoundConstraint],
    used: usize,
) -> Result<(), QueryError> {
    for c in flex {
        if c.attribute >= used {
            return Err(QueryError::ConstraintOutOfRange {
                attribute: c.attribute,
                available: used,
            });
        }
        let mut expr = LinExpr::new();
        let (cmp, rhs) = match c.kind {
            BoundKind::Min => {
                expr.push(2 * c.attribute, 1.0);
                (Cmp::Ge, c.value)
            }
            BoundKind::Max => {
                expr.push(2 * c.attribute + 1, 1.0);
                (Cmp::Le, c.value)
            }
            BoundKind::Space => {
                expr.push(2 * c.attribute + 1, 1.0);
                expr.push(2 * c.attribute, -1.0);
                (Cmp::Ge, c.value)
            }
        };
        sys.add_constraint(expr, cmp, rhs);
    }
    Ok(())
}

/// Worst-case-vertex substitution of one coefficient row over the bound
/// variables.
fn substituted_guard(coeffs: &[f64], rhs: f64) -> Guard {
    let mut expr = LinExpr::new();
    for (j, c) in coeffs.iter().enumerate() {
        let var = if *c >= 0.0 { 2 * j } else { 2 * j + 1 };
        expr.push(var, *c);
    }
    Guard { expr, rhs }
}

fn robustness_group(q: &Question, shape: Shape, used: usize) -> CardinalityGroup {
    let guards = q
        .inequalities()
        .iter()
        .map(|ineq| match shape {
            Shape::Triangle => {
                // The last weight is implied by 1 - Σw: fold its coefficient
                // into the others and the right-hand side.
                let c_last = ineq.coeffs[used];
                let folded: Vec<f64> =
                    ineq.coeffs[..used].iter().map(|c| c - c_last).collect();
                substituted_guard(&folded, -c_last)
            }
            Shape::Pyramid | Shape::Cube => substituted_guard(&ineq.coeffs, 0.0),
        })
        .collect();
    CardinalityGroup {
        guards,
        weights: q.inequalities().iter().map(|i| i.weight).collect(),
        required: q.num_competitors() as f64 - q.threshold() as f64,
    }
}

/// Build the box-robustness system for the chosen weight-space shape.
///
/// Assumes every question passed preprocessing (`threshold() >= 0`).
pub fn box_system(
    questions: &[Question],
    arity: usize,
    shape: Shape,
    flex: &[BoundConstraint],
) -> Result<System, QueryError> {
    let used = shape.used_attributes(arity);
    let mut sys = System::new();
    bound_vars(&mut sys, used);

    if matches!(shape, Shape::Triangle | Shape::Pyramid) {
        // Upper bounds jointly under the simplex; CUBE needs only the
        // per-variable caps already on the bounds.
        let mut uppers = LinExpr::new();
        for i in 0..used {
            uppers.push(2 * i + 1, 1.0);
        }
        sys.add_constraint(uppers, Cmp::Le, 1.0);
    }

    for q in questions {
        sys.add_group(robustness_group(q, shape, used));
    }
    apply_flexible(&mut sys, flex, used)?;
    Ok(sys)
}

/// Direct CUBE encoding: instead of worst-case-vertex substitution, assert
/// that every point inside the box keeps each question within its rank
/// budget, as a universally-quantified implication. Only the SMT family can
/// discharge this.
pub fn quantified_cube_system(
    questions: &[Question],
    arity: usize,
    flex: &[BoundConstraint],
) -> Result<System, QueryError> {
    let mut sys = System::new();
    bound_vars(&mut sys, arity);

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
        sys.quantified.push(QuantifiedGroup {
            dims: arity,
            guards,
            weights: q.inequalities().iter().map(|i| i.weight).collect(),
            max_violated: q.threshold() as f64,
        });
    }
    apply_flexible(&mut sys, flex, arity)?;
    Ok(sys)
}

/// Total box perimeter `Σ (upper_i - lower_i)` over `used` free attributes.
pub fn perimeter_expr(used: usize) -> LinExpr {
    let mut expr = LinExpr::new();
    for i in 0..used {
        expr.push(2 * i + 1, 1.0);
        expr.push(2 * i, -1.0);
    }
    expr
}
