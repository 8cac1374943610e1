//! Solver-agnostic constraint system shared by the encoders and engines.
//!
//! A [`System`] is plain data: bounded continuous variables, linear
//! constraints, weighted cardinality groups (the indicator construction), and
//! at most one universally-quantified group for the direct CUBE encoding.
//! Engines consume it read-only; the optimizer clones it to pin measures.

/// Inclusive bounds of one continuous decision variable.
#[derive(Debug, Clone, Copy)]
pub struct VarBounds {
    pub lower: f64,
    pub upper: f64,
}

/// Sparse linear expression over the system's decision variables.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    /// `(variable index, coefficient)` pairs.
    pub terms: Vec<(usize, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, var: usize, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Evaluate against a full assignment.
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|(v, c)| c * values[*v]).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

/// `expr cmp rhs`, always enforced.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub expr: LinExpr,
    pub cmp: Cmp,
    pub rhs: f64,
}

/// One guarded inequality inside a cardinality group: satisfied iff
/// `expr >= rhs` holds.
#[derive(Debug, Clone)]
pub struct Guard {
    pub expr: LinExpr,
    pub rhs: f64,
}

/// The indicator construction: of the guards in this group, a subset with
/// total weight at least `required` must hold simultaneously.
///
/// Guard weights default to 1.0; clustering substitutes cluster sizes.
#[derive(Debug, Clone)]
pub struct CardinalityGroup {
    pub guards: Vec<Guard>,
    pub weights: Vec<f64>,
    pub required: f64,
}

impl CardinalityGroup {
    /// Total guard weight available.
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Universally-quantified variant of a cardinality group, used by the direct
/// CUBE encoding: for every point `y` with
/// `vars[2j] <= y_j <= vars[2j + 1]` for all `j < dims`, the total weight of
/// violated guards (each guard read over `y`, violated iff `expr(y) < rhs`)
/// must stay at or below `max_violated`.
///
/// Only the quantified-SMT engine family can discharge this.
#[derive(Debug, Clone)]
pub struct QuantifiedGroup {
    /// Number of point dimensions; guard variable index `j` refers to `y_j`.
    pub dims: usize,
    pub guards: Vec<Guard>,
    pub weights: Vec<f64>,
    pub max_violated: f64,
}

/// A complete feasibility problem handed to a [`crate::engine::SolveEngine`].
#[derive(Debug, Clone, Default)]
pub struct System {
    pub vars: Vec<VarBounds>,
    pub constraints: Vec<LinearConstraint>,
    pub groups: Vec<CardinalityGroup>,
    pub quantified: Vec<QuantifiedGroup>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable, returning its index.
    pub fn add_var(&mut self, lower: f64, upper: f64) -> usize {
        self.vars.push(VarBounds { lower, upper });
        self.vars.len() - 1
    }

    pub fn add_constraint(&mut self, expr: LinExpr, cmp: Cmp, rhs: f64) {
        self.constraints.push(LinearConstraint { expr, cmp, rhs });
    }

    pub fn add_group(&mut self, group: CardinalityGroup) {
        debug_assert_eq!(group.guards.len(), group.weights.len());
        self.groups.push(group);
    }
}
