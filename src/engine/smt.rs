//! Quantified-SMT engine family, backed by the `z3` crate.
//!
//! Cardinality groups become pseudo-boolean "at most k violated" constraints;
//! quantified groups become a universally-quantified implication over the
//! point variables, which is what makes the direct CUBE encoding possible.
//! This family answers feasibility only; objective optimization is handled by
//! the binary-search driver on top.

use std::time::Duration;

use z3::ast::{forall_const, Ast, Bool, Real};
use z3::{Config, Context, Params, SatResult, Solver};

use crate::engine::{EngineError, SolveEngine, SolveOutcome};
use crate::system::{Cmp, Guard, LinExpr, System};

const ENGINE: &str = "smt";

/// Strictness margin: a guard counts as violated once its expression drops
/// below `rhs` by more than this.
const GUARD_EPS_NUM: i32 = 1;
const GUARD_EPS_DEN: i32 = 100_000;

/// Coefficients are encoded as rationals with five decimal digits.
const COEFF_DEN: i32 = 100_000;

#[derive(Debug, Default)]
pub struct SmtEngine;

impl SmtEngine {
    pub fn new() -> Self {
        Self
    }
}

fn rational<'c>(ctx: &'c Context, v: f64) -> Real<'c> {
    Real::from_real(ctx, (v * COEFF_DEN as f64).round() as i32, COEFF_DEN)
}

fn linear<'c>(ctx: &'c Context, expr: &LinExpr, vars: &[Real<'c>]) -> Real<'c> {
    let mut sum = Real::from_real(ctx, 0, 1);
    for (v, c) in &expr.terms {
        let term = Real::mul(ctx, &[&rational(ctx, *c), &vars[*v]]);
        sum = Real::add(ctx, &[&sum, &term]);
    }
    sum
}

/// "At most `max_violated` total weight of these guards is violated", read
/// over the supplied variable vector.
fn violation_budget<'c>(
    ctx: &'c Context,
    guards: &[Guard],
    weights: &[f64],
    max_violated: f64,
    vars: &[Real<'c>],
) -> Bool<'c> {
    let eps = Real::from_real(ctx, GUARD_EPS_NUM, GUARD_EPS_DEN);
    let violated: Vec<Bool<'c>> = guards
        .iter()
        .map(|g| {
            let lhs = Real::sub(ctx, &[&linear(ctx, &g.expr, vars), &eps]);
            lhs.le(&rational(ctx, g.rhs))
        })
        .collect();
    let weighted: Vec<(&Bool<'c>, i32)> = violated
        .iter()
        .zip(weights.iter())
        .map(|(b, w)| (b, w.round() as i32))
        .collect();
    Bool::pb_le(ctx, &weighted, max_violated.round() as i32)
}

impl SolveEngine for SmtEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn check(
        &self,
        system: &System,
        budget: Option<Duration>,
    ) -> Result<SolveOutcome, EngineError> {
        let cfg = Config::new();
        let ctx = Context::new(&cfg);
        let solver = Solver::new(&ctx);
        if let Some(b) = budget {
            let mut params = Params::new(&ctx);
            params.set_u32("timeout", b.as_millis().min(u32::MAX as u128) as u32);
            solver.set_params(&params);
        }

        let vars: Vec<Real> = (0..system.vars.len())
            .map(|i| Real::new_const(&ctx, format!("v{i}")))
            .collect();
        for (x, b) in vars.iter().zip(system.vars.iter()) {
            solver.assert(&x.ge(&rational(&ctx, b.lower)));
            solver.assert(&x.le(&rational(&ctx, b.upper)));
        }
        for c in &system.constraints {
            let lhs = linear(&ctx, &c.expr, &vars);
            let rhs = rational(&ctx, c.rhs);
            solver.assert(&match c.cmp {
                Cmp::Le => lhs.le(&rhs),
                Cmp::Ge => lhs.ge(&rhs),
                Cmp::Eq => lhs._eq(&rhs),
            });
        }
        for group in &system.groups {
            let max_violated = group.total_weight() - group.required;
            solver.assert(&violation_budget(
                &ctx,
                &group.guards,
                &group.weights,
                max_violated,
                &vars,
            ));
        }
        for group in &system.quantified {
            let ys: Vec<Real> = (0..group.dims)
                .map(|j| Real::new_const(&ctx, format!("y{j}")))
                .collect();
            let mut membership = Bool::from_bool(&ctx, true);
            for (j, y) in ys.iter().enumerate() {
                membership = Bool::and(
                    &ctx,
                    &[&membership, &y.ge(&vars[2 * j]), &y.le(&vars[2 * j + 1])],
                );
            }
            let budget_holds = violation_budget(
                &ctx,
                &group.guards,
                &group.weights,
                group.max_violated,
                &ys,
            );
            let bounds: Vec<&dyn Ast> = ys.iter().map(|y| y as &dyn Ast).collect();
            solver.assert(&forall_const(
                &ctx,
                &bounds,
                &[],
                &membership.implies(&budget_holds),
            ));
        }

        match solver.check() {
            SatResult::Sat => {
                let model = solver.get_model().ok_or_else(|| EngineError::Backend {
                    engine: ENGINE,
                    message: "satisfiable but no model available".to_string(),
                })?;
                let witness = vars
                    .iter()
                    .map(|x| {
                        model
                            .eval(x, true)
                            .and_then(|r| r.as_real())
                            .map(|(num, den)| num as f64 / den as f64)
                            .ok_or_else(|| EngineError::Backend {
                                engine: ENGINE,
                                message: "model value is not rational".to_string(),
                            })
                    })
                    .collect::<Result<Vec<f64>, _>>()?;
                Ok(SolveOutcome::Feasible {
                    witness,
                    objective: None,
                })
            }
            SatResult::Unsat => Ok(SolveOutcome::Infeasible),
            SatResult::Unknown => Ok(SolveOutcome::Timeout),
        }
    }

    fn maximize(
        &self,
        _system: &System,
        _objective: &LinExpr,
        _budget: Option<Duration>,
    ) -> Result<SolveOutcome, EngineError> {
        Err(EngineError::Unsupported {
            engine: ENGINE,
            capability: "direct objective optimization (use binary search)",
        })
    }
}
