//! Box optimization drivers.
//!
//! The box measure is monotone in feasibility: shrinking a box only relaxes
//! the robustness guards. That licenses a binary search on the total
//! perimeter (pin it with an equality, check feasibility, narrow the
//! bracket) instead of asking the engine to optimize, which matters for
//! engine families without a usable objective (quantified encodings) or with
//! expensive ones. A `precise` caller can instead maximize the perimeter
//! directly on families that support linear objectives.

use std::time::Duration;

use tracing::debug;

use crate::encode::perimeter_expr;
use crate::engine::{EngineError, SolveEngine, SolveOutcome};
use crate::geometry::{Measure, WeightBox};
use crate::system::{Cmp, System};

/// Bracket width below which the search stops.
const TOLERANCE: f64 = 0.01;
/// Perimeters below this are numerically indistinguishable from the empty box.
const FLOOR: f64 = 1e-5;
/// Backed off from the theoretical ceiling to keep the first probe feasible
/// in principle.
const SEED_EPS: f64 = 1e-8;

/// Minimum perimeter accepted from direct optimization, guarding against the
/// degenerate point box.
const NON_ZERO: f64 = 1e-5;

fn box_from_witness(witness: &[f64], used: usize, measure: Measure, perimeter: f64) -> WeightBox {
    let intervals: Vec<(f64, f64)> = (0..used)
        .map(|i| (witness[2 * i], witness[2 * i + 1]))
        .collect();
    let value = match measure {
        Measure::Perimeter => perimeter,
        Measure::Volume => intervals.iter().map(|(lo, hi)| hi - lo).product(),
    };
    WeightBox::new(value, intervals)
}

/// Converge on the maximum feasible perimeter by bisection.
///
/// Feasible probes raise the lower bracket; infeasible probes and timeouts
/// both lower the upper bracket, so a timeout can only shrink the answer,
/// never inflate it. Returns the last feasible box, or the invalid box when
/// no probe ever succeeded.
pub fn binary_search_box(
    engine: &dyn SolveEngine,
    system: &System,
    used: usize,
    ceiling: f64,
    measure: Measure,
    budget: Option<Duration>,
) -> Result<WeightBox, EngineError> {
    let perimeter = perimeter_expr(used);
    let mut low = 0.0_f64;
    let mut high = ceiling;
    let mut probe = high - SEED_EPS;
    let mut best = WeightBox::invalid();

    loop {
        if high - low < TOLERANCE || high < FLOOR {
            break;
        }
        let mut pinned = system.clone();
        pinned.add_constraint(perimeter.clone(), Cmp::Eq, probe);
        match engine.check(&pinned, budget)? {
            SolveOutcome::Feasible { witness, .. } => {
                debug!(probe, "feasible");
                best = box_from_witness(&witness, used, measure, probe);
                low = probe;
            }
            SolveOutcome::Infeasible => {
                debug!(probe, "infeasible");
                high = probe;
            }
            SolveOutcome::Timeout => {
                debug!(probe, "timeout, shrinking upper bracket");
                high = probe;
            }
        }
        probe = low + (high - low) / 2.0;
    }
    Ok(best)
}

/// Result of the `precise` direct-optimization path.
#[derive(Debug)]
pub enum DirectOutcome {
    Found(WeightBox),
    Infeasible,
    /// Budget ran out; unlike binary search, a direct answer cannot be
    /// salvaged from a partial run.
    Inconclusive,
}

/// Maximize the perimeter directly, with a floor keeping the empty box out
/// of the feasible set.
pub fn maximize_perimeter_box(
    engine: &dyn SolveEngine,
    system: &System,
    used: usize,
    measure: Measure,
    budget: Option<Duration>,
) -> Result<DirectOutcome, EngineError> {
    let perimeter = perimeter_expr(used);
    let mut guarded = system.clone();
    guarded.add_constraint(perimeter.clone(), Cmp::Ge, NON_ZERO);
    match engine.maximize(&guarded, &perimeter, budget)? {
        SolveOutcome::Feasible {
            witness,
            objective,
        } => {
            let value = objective.unwrap_or_else(|| perimeter.eval(&witness));
            Ok(DirectOutcome::Found(box_from_witness(
                &witness, used, measure, value,
            )))
        }
        SolveOutcome::Infeasible => Ok(DirectOutcome::Infeasible),
        SolveOutcome::Timeout => Ok(DirectOutcome::Inconclusive),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MilpEngine;
    use crate::system::LinExpr;

    /// One attribute, bounds free in [0,1]: the maximum width is 1.
    fn free_interval_system() -> System {
        let mut sys = System::new();
        sys.add_var(0.0, 1.0);
        sys.add_var(0.0, 1.0);
        let mut width = LinExpr::new();
        width.push(1, 1.0);
        width.push(0, -1.0);
        sys.add_constraint(width, Cmp::Ge, 0.0);
        sys
    }

    #[test]
    fn binary_search_converges_from_below() {
        let engine = MilpEngine::new();
        let sys = free_interval_system();
        let b = binary_search_box(&engine, &sys, 1, 1.0, Measure::Perimeter, None).unwrap();
        assert!(b.valid());
        // Sound (never above the supremum 1.0) and within tolerance of it.
        assert!(b.measure() <= 1.0 + 1e-9);
        assert!(b.measure() >= 1.0 - TOLERANCE - 1e-9);
        assert!((b.perimeter() - b.measure()).abs() < 1e-6);
    }

    #[test]
    fn infeasible_system_yields_invalid_box() {
        let engine = MilpEngine::new();
        let mut sys = free_interval_system();
        // Force an empty widthless interval.
        let mut width = LinExpr::new();
        width.push(1, 1.0);
        width.push(0, -1.0);
        sys.add_constraint(width, Cmp::Le, 0.0);
        let b = binary_search_box(&engine, &sys, 1, 1.0, Measure::Perimeter, None).unwrap();
        assert!(!b.valid());
    }

    #[test]
    fn direct_optimization_matches_binary_search() {
        let engine = MilpEngine::new();
        let sys = free_interval_system();
        match maximize_perimeter_box(&engine, &sys, 1, Measure::Perimeter, None).unwrap() {
            DirectOutcome::Found(b) => {
                assert!((b.measure() - 1.0).abs() < 1e-6);
            }
            other => panic!("expected a box, got {other:?}"),
        }
    }
}
