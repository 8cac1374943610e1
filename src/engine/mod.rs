//! The solving-engine capability consumed by the encoders.
//!
//! Two engine families implement the same contract and are selected by
//! configuration: a MILP-style family that resolves indicator groups by
//! branch-and-bound over LP relaxations, and a quantified-SMT family (cargo
//! feature `smt`) that additionally discharges universally-quantified
//! encodings. Each call builds its backend model internally and releases it
//! on every exit path; nothing is shared across calls.

use std::time::Duration;

use thiserror::Error;

use crate::system::{LinExpr, System};

pub mod milp;
#[cfg(feature = "smt")]
pub mod smt;

pub use milp::MilpEngine;
#[cfg(feature = "smt")]
pub use smt::SmtEngine;

/// Which engine family a query should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// LP relaxations plus branch-and-bound on indicator selections.
    #[default]
    Milp,
    /// SMT with pseudo-boolean cardinality and quantifier support.
    #[cfg(feature = "smt")]
    Smt,
}

/// Instantiate the configured engine family.
pub fn engine_for(kind: EngineKind) -> Box<dyn SolveEngine> {
    match kind {
        EngineKind::Milp => Box::new(MilpEngine::new()),
        #[cfg(feature = "smt")]
        EngineKind::Smt => Box::new(SmtEngine::new()),
    }
}

/// Result of one engine call.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    /// A witness assignment, one value per declared variable, plus the
    /// objective value when one was optimized.
    Feasible {
        witness: Vec<f64>,
        objective: Option<f64>,
    },
    Infeasible,
    /// The wall-clock budget ran out before an answer was found.
    Timeout,
}

impl SolveOutcome {
    pub fn witness(&self) -> Option<&[f64]> {
        match self {
            SolveOutcome::Feasible { witness, .. } => Some(witness),
            _ => None,
        }
    }
}

/// Engine failures. Timeouts are an outcome, not an error.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The system asks for a capability this family does not provide (for
    /// example quantified groups on the MILP family, or quadratic
    /// objectives).
    #[error("{engine} does not support {capability}")]
    Unsupported {
        engine: &'static str,
        capability: &'static str,
    },

    /// Unexpected backend failure.
    #[error("{engine} backend failure: {message}")]
    Backend {
        engine: &'static str,
        message: String,
    },
}

/// Abstract solving capability: feasibility checks and linear maximization
/// over a [`System`], with an optional wall-clock budget.
pub trait SolveEngine {
    fn name(&self) -> &'static str;

    /// Decide feasibility of `system`, returning a witness when feasible.
    fn check(&self, system: &System, budget: Option<Duration>)
        -> Result<SolveOutcome, EngineError>;

    /// Maximize a linear objective over `system`.
    fn maximize(
        &self,
        system: &System,
        objective: &LinExpr,
        budget: Option<Duration>,
    ) -> Result<SolveOutcome, EngineError>;
}
