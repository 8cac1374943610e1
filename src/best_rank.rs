//! Best-rank baseline: branch-and-bound over the hyperplane arrangement.
//!
//! Weight space is case-split along each competitor's hyperplane
//! `row · w = 0`. A breadth-first queue explores nodes that pin a prefix of
//! competitors to "win" (`>= 0`) or "lose" (`<= 0`); dead regions are pruned
//! by a feasibility check, and feasible witnesses are scored to tighten the
//! best rank seen. Exhaustive and exponential; kept as a comparator for the
//! polynomial-size encodings, not as the primary algorithm.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use crate::engine::{EngineError, SolveEngine, SolveOutcome};
use crate::question::Question;
use crate::system::{Cmp, LinExpr, System};

/// Arrangement-tree node. Nodes are immutable and arena-indexed; a node
/// stores only its parent link and the single newly decided inequality, so
/// sibling branches share their decision prefix structurally instead of
/// deep-copying it.
#[derive(Debug, Clone, Copy)]
struct Node {
    parent: Option<usize>,
    /// `(inequality index, forced to win)`; `None` only at the root.
    decision: Option<(usize, bool)>,
    /// Index of the next undecided inequality.
    next: usize,
}

/// Collect the decision chain of `node` by walking parent links.
fn decisions(arena: &[Node], mut node: usize) -> Vec<(usize, bool)> {
    let mut out = Vec::new();
    loop {
        let n = &arena[node];
        if let Some(d) = n.decision {
            out.push(d);
        }
        match n.parent {
            Some(p) => node = p,
            None => break,
        }
    }
    out
}

fn node_system(question: &Question, arity: usize, chain: &[(usize, bool)]) -> System {
    let mut sys = System::new();
    for _ in 0..arity {
        sys.add_var(0.0, 1.0);
    }
    let mut sum = LinExpr::new();
    for i in 0..arity {
        sum.push(i, 1.0);
    }
    sys.add_constraint(sum, Cmp::Eq, 1.0);
    for (idx, win) in chain {
        let mut expr = LinExpr::new();
        for (j, c) in question.inequalities()[*idx].coeffs.iter().enumerate() {
            expr.push(j, *c);
        }
        sys.add_constraint(expr, if *win { Cmp::Ge } else { Cmp::Le }, 0.0);
    }
    sys
}

/// Minimum rank achievable for one question across all weight vectors.
///
/// Returns `num_dominators + num_competitors + 1` when no explored region
/// improves on the default. Timed-out regions are discarded, which can only
/// make the reported rank pessimistic, never too good.
pub fn best_rank(
    engine: &dyn SolveEngine,
    question: &Question,
    arity: usize,
    budget: Option<Duration>,
) -> Result<usize, EngineError> {
    let m = question.inequalities().len();
    // Dominators outrank the expected tuple under every weighting.
    let floor = question.num_dominators() + 1;
    let mut best = question.num_dominators() + question.num_competitors() + 1;

    let mut arena = vec![Node {
        parent: None,
        decision: None,
        next: 0,
    }];
    let mut queue = VecDeque::from([0usize]);

    while let Some(id) = queue.pop_front() {
        let chain = decisions(&arena, id);
        let sys = node_system(question, arity, &chain);
        let witness = match engine.check(&sys, budget)? {
            SolveOutcome::Feasible { witness, .. } => witness,
            SolveOutcome::Infeasible => {
                trace!(node = id, "dead region");
                continue;
            }
            SolveOutcome::Timeout => {
                debug!(node = id, "region check timed out, discarding");
                continue;
            }
        };

        let rank = question.rank_at(&witness);
        if rank < best {
            debug!(node = id, rank, "improved best rank");
            best = rank;
            if best == floor {
                return Ok(best);
            }
        }

        let next = arena[id].next;
        if next < m {
            for win in [true, false] {
                arena.push(Node {
                    parent: Some(id),
                    decision: Some((next, win)),
                    next: next + 1,
                });
                queue.push_back(arena.len() - 1);
            }
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MilpEngine;
    use crate::relation::{Relation, Tuple};

    fn question(rows: &[(&str, &[f64])], expected: &str) -> Question {
        let tuples = rows
            .iter()
            .map(|(id, attrs)| Tuple::new(*id, attrs.to_vec()).unwrap())
            .collect();
        let relation = Relation::new("t", tuples).unwrap();
        let exp = relation.find(expected).unwrap().clone();
        Question::prepare(&relation, exp, 1).unwrap()
    }

    #[test]
    fn reachable_top_spot_is_found() {
        // "3" wins attribute 1 outright: rank 1 at w = (1, 0).
        let q = question(
            &[("1", &[0.6, 0.9]), ("2", &[0.5, 0.8]), ("3", &[0.9, 0.1])],
            "3",
        );
        let engine = MilpEngine::new();
        assert_eq!(best_rank(&engine, &q, 2, None).unwrap(), 1);
    }

    #[test]
    fn blocked_tuple_cannot_reach_rank_one() {
        // Beating "1" needs w2/w1 >= 10/9 while beating "2" needs the
        // reverse, so one competitor always stays ahead of "3".
        let q = question(
            &[
                ("1", &[1.0, 0.05]),
                ("2", &[0.05, 1.0]),
                ("3", &[0.5, 0.5]),
            ],
            "3",
        );
        let engine = MilpEngine::new();
        assert_eq!(best_rank(&engine, &q, 2, None).unwrap(), 2);
    }

    #[test]
    fn dominators_floor_the_achievable_rank() {
        // "1" dominates "3", so rank 2 is the best case even though "2"
        // falls behind under balanced weights.
        let q = question(
            &[("1", &[0.9, 0.9]), ("2", &[0.8, 0.1]), ("3", &[0.5, 0.5])],
            "3",
        );
        let engine = MilpEngine::new();
        assert_eq!(best_rank(&engine, &q, 2, None).unwrap(), 2);
    }
}
