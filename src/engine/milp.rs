//! MILP-style engine family.
//!
//! The LP work is delegated to `good_lp` (microlp backend); the indicator /
//! cardinality layer is resolved by branch-and-bound over guard selections:
//! a guard is either enforced as a hard linear constraint or left free, and
//! a subtree is pruned as soon as its LP relaxation goes infeasible or the
//! remaining guard weight cannot reach the group's requirement. This is the
//! same search a MILP backend would run on binary indicator variables.

use std::time::{Duration, Instant};

use good_lp::{constraint, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable};
use tracing::trace;

use crate::engine::{EngineError, SolveEngine, SolveOutcome};
use crate::system::{Cmp, LinExpr, LinearConstraint, System};

const ENGINE: &str = "milp";

/// Slack when comparing accumulated guard weights.
const WEIGHT_EPS: f64 = 1e-9;

/// Pure-Rust MILP-style engine. Stateless; every call owns its own model.
#[derive(Debug, Default)]
pub struct MilpEngine;

impl MilpEngine {
    pub fn new() -> Self {
        Self
    }
}

enum Search {
    Found(Vec<f64>),
    Exhausted,
    TimedOut,
}

struct Ctx<'a> {
    system: &'a System,
    /// Guard enforcements accumulated along the current search path.
    extra: Vec<LinearConstraint>,
    deadline: Option<Instant>,
}

impl Ctx<'_> {
    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

impl SolveEngine for MilpEngine {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn check(
        &self,
        system: &System,
        budget: Option<Duration>,
    ) -> Result<SolveOutcome, EngineError> {
        if !system.quantified.is_empty() {
            return Err(EngineError::Unsupported {
                engine: ENGINE,
                capability: "universally-quantified groups",
            });
        }
        let mut ctx = Ctx {
            system,
            extra: Vec::new(),
            deadline: budget.map(|b| Instant::now() + b),
        };
        Ok(match self.search_groups(0, &mut ctx)? {
            Search::Found(witness) => SolveOutcome::Feasible {
                witness,
                objective: None,
            },
            Search::Exhausted => SolveOutcome::Infeasible,
            Search::TimedOut => SolveOutcome::Timeout,
        })
    }

    fn maximize(
        &self,
        system: &System,
        objective: &LinExpr,
        budget: Option<Duration>,
    ) -> Result<SolveOutcome, EngineError> {
        if !system.quantified.is_empty() {
            return Err(EngineError::Unsupported {
                engine: ENGINE,
                capability: "universally-quantified groups",
            });
        }
        let mut ctx = Ctx {
            system,
            extra: Vec::new(),
            deadline: budget.map(|b| Instant::now() + b),
        };
        let mut best: Option<(f64, Vec<f64>)> = None;
        let timed_out = self.max_groups(0, &mut ctx, objective, &mut best)?;
        Ok(if timed_out {
            // Direct optimization under a blown budget is inconclusive, even
            // when an incumbent exists.
            SolveOutcome::Timeout
        } else {
            match best {
                Some((value, witness)) => SolveOutcome::Feasible {
                    witness,
                    objective: Some(value),
                },
                None => SolveOutcome::Infeasible,
            }
        })
    }
}

impl MilpEngine {
    /// Feasibility search over guard selections, group by group.
    fn search_groups(&self, g: usize, ctx: &mut Ctx<'_>) -> Result<Search, EngineError> {
        let system = ctx.system;
        if g == system.groups.len() {
            return Ok(match self.solve_lp(ctx, None)? {
                Some((witness, _)) => Search::Found(witness),
                None => Search::Exhausted,
            });
        }
        self.select(g, 0, system.groups[g].required, ctx)
    }

    /// Choose which guards of group `g` to enforce, starting at `idx`, until
    /// `needed` total weight is covered.
    fn select(
        &self,
        g: usize,
        idx: usize,
        needed: f64,
        ctx: &mut Ctx<'_>,
    ) -> Result<Search, EngineError> {
        if needed <= WEIGHT_EPS {
            return self.search_groups(g + 1, ctx);
        }
        if ctx.expired() {
            return Ok(Search::TimedOut);
        }
        let system = ctx.system;
        let group = &system.groups[g];
        let remaining: f64 = group.weights[idx..].iter().sum();
        if remaining + WEIGHT_EPS < needed {
            return Ok(Search::Exhausted);
        }
        let weight = group.weights[idx];
        let enforced = LinearConstraint {
            expr: group.guards[idx].expr.clone(),
            cmp: Cmp::Ge,
            rhs: group.guards[idx].rhs,
        };

        // Branch 1: enforce guard `idx`, pruning on LP infeasibility.
        ctx.extra.push(enforced);
        let outcome = if self.solve_lp(ctx, None)?.is_some() {
            self.select(g, idx + 1, needed - weight, ctx)?
        } else {
            trace!(group = g, guard = idx, "pruned infeasible guard branch");
            Search::Exhausted
        };
        ctx.extra.pop();
        if !matches!(outcome, Search::Exhausted) {
            return Ok(outcome);
        }

        // Branch 2: leave guard `idx` free.
        self.select(g, idx + 1, needed, ctx)
    }

    /// Maximization twin of [`Self::search_groups`]. Returns whether the
    /// budget expired.
    fn max_groups(
        &self,
        g: usize,
        ctx: &mut Ctx<'_>,
        objective: &LinExpr,
        best: &mut Option<(f64, Vec<f64>)>,
    ) -> Result<bool, EngineError> {
        let system = ctx.system;
        if g == system.groups.len() {
            if let Some((witness, value)) = self.solve_lp(ctx, Some(objective))? {
                if best.as_ref().is_none_or(|(b, _)| value > *b) {
                    *best = Some((value, witness));
                }
            }
            return Ok(false);
        }
        self.max_select(g, 0, system.groups[g].required, ctx, objective, best)
    }

    fn max_select(
        &self,
        g: usize,
        idx: usize,
        needed: f64,
        ctx: &mut Ctx<'_>,
        objective: &LinExpr,
        best: &mut Option<(f64, Vec<f64>)>,
    ) -> Result<bool, EngineError> {
        if needed <= WEIGHT_EPS {
            return self.max_groups(g + 1, ctx, objective, best);
        }
        if ctx.expired() {
            return Ok(true);
        }
        let system = ctx.system;
        let group = &system.groups[g];
        let remaining: f64 = group.weights[idx..].iter().sum();
        if remaining + WEIGHT_EPS < needed {
            return Ok(false);
        }
        let weight = group.weights[idx];
        let enforced = LinearConstraint {
            expr: group.guards[idx].expr.clone(),
            cmp: Cmp::Ge,
            rhs: group.guards[idx].rhs,
        };

        ctx.extra.push(enforced);
        // Bound: the LP relaxation of the partial selection caps every leaf
        // below it; prune when it cannot beat the incumbent.
        let promising = match self.solve_lp(ctx, Some(objective))? {
            Some((_, upper)) => best.as_ref().is_none_or(|(b, _)| upper > *b + WEIGHT_EPS),
            None => false,
        };
        let mut timed_out = false;
        if promising {
            timed_out = self.max_select(g, idx + 1, needed - weight, ctx, objective, best)?;
        }
        ctx.extra.pop();
        if timed_out {
            return Ok(true);
        }

        self.max_select(g, idx + 1, needed, ctx, objective, best)
    }

    /// Solve one LP over the base system plus the enforced guards. Returns
    /// `None` on infeasibility, otherwise the witness and objective value.
    fn solve_lp(
        &self,
        ctx: &Ctx<'_>,
        objective: Option<&LinExpr>,
    ) -> Result<Option<(Vec<f64>, f64)>, EngineError> {
        let system = ctx.system;
        let mut vars = ProblemVariables::new();
        let handles: Vec<Variable> = system
            .vars
            .iter()
            .map(|b| vars.add(variable().min(b.lower).max(b.upper)))
            .collect();
        let mut obj = Expression::default();
        if let Some(o) = objective {
            for (v, c) in &o.terms {
                obj += *c * handles[*v];
            }
        }
        let mut model = vars.maximise(obj).using(good_lp::microlp);
        for c in system.constraints.iter().chain(ctx.extra.iter()) {
            let mut expr = Expression::default();
            for (v, k) in &c.expr.terms {
                expr += *k * handles[*v];
            }
            model = model.with(match c.cmp {
                Cmp::Le => constraint::leq(expr, c.rhs),
                Cmp::Ge => constraint::geq(expr, c.rhs),
                Cmp::Eq => constraint::eq(expr, c.rhs),
            });
        }
        match model.solve() {
            Ok(solution) => {
                let witness: Vec<f64> = handles.iter().map(|v| solution.value(*v)).collect();
                let value = objective.map_or(0.0, |o| o.eval(&witness));
                Ok(Some((witness, value)))
            }
            Err(ResolutionError::Infeasible) => Ok(None),
            Err(e) => Err(EngineError::Backend {
                engine: ENGINE,
                message: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{CardinalityGroup, Guard};

    fn expr(terms: &[(usize, f64)]) -> LinExpr {
        LinExpr {
            terms: terms.to_vec(),
        }
    }

    fn simplex_system(n: usize) -> System {
        let mut sys = System::new();
        for _ in 0..n {
            sys.add_var(0.0, 1.0);
        }
        let sum = expr(&(0..n).map(|i| (i, 1.0)).collect::<Vec<_>>());
        sys.add_constraint(sum, Cmp::Eq, 1.0);
        sys
    }

    #[test]
    fn plain_simplex_is_feasible() {
        let sys = simplex_system(3);
        let engine = MilpEngine::new();
        let out = engine.check(&sys, None).unwrap();
        let w = out.witness().expect("feasible");
        let total: f64 = w.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cardinality_group_selects_a_feasible_subset() {
        // Guards x0 - x1 >= 0 and x1 - x0 >= 0 conflict away from the
        // diagonal; requiring one of the two must stay feasible.
        let mut sys = simplex_system(2);
        sys.add_group(CardinalityGroup {
            guards: vec![
                Guard {
                    expr: expr(&[(0, 1.0), (1, -1.0)]),
                    rhs: 0.5,
                },
                Guard {
                    expr: expr(&[(0, -1.0), (1, 1.0)]),
                    rhs: 0.5,
                },
            ],
            weights: vec![1.0, 1.0],
            required: 1.0,
        });
        let engine = MilpEngine::new();
        assert!(engine.check(&sys, None).unwrap().witness().is_some());
    }

    #[test]
    fn impossible_requirement_is_infeasible() {
        // Both guards cannot hold at once on the simplex.
        let mut sys = simplex_system(2);
        sys.add_group(CardinalityGroup {
            guards: vec![
                Guard {
                    expr: expr(&[(0, 1.0), (1, -1.0)]),
                    rhs: 0.5,
                },
                Guard {
                    expr: expr(&[(0, -1.0), (1, 1.0)]),
                    rhs: 0.5,
                },
            ],
            weights: vec![1.0, 1.0],
            required: 2.0,
        });
        let engine = MilpEngine::new();
        assert!(matches!(
            engine.check(&sys, None).unwrap(),
            SolveOutcome::Infeasible
        ));
    }

    #[test]
    fn maximize_reports_objective_value() {
        let mut sys = System::new();
        sys.add_var(0.0, 1.0);
        sys.add_var(0.0, 1.0);
        sys.add_constraint(expr(&[(0, 1.0), (1, 1.0)]), Cmp::Le, 1.5);
        let engine = MilpEngine::new();
        let out = engine
            .maximize(&sys, &expr(&[(0, 1.0), (1, 1.0)]), None)
            .unwrap();
        match out {
            SolveOutcome::Feasible { objective, .. } => {
                assert!((objective.unwrap() - 1.5).abs() < 1e-6);
            }
            other => panic!("expected feasible, got {other:?}"),
        }
    }

    #[test]
    fn quantified_groups_are_unsupported() {
        let mut sys = simplex_system(2);
        sys.quantified.push(crate::system::QuantifiedGroup {
            dims: 1,
            guards: vec![],
            weights: vec![],
            max_violated: 0.0,
        });
        let engine = MilpEngine::new();
        assert!(matches!(
            engine.check(&sys, None),
            Err(EngineError::Unsupported { .. })
        ));
    }
}
