//! Query orchestration: preprocessing, optional clustering, and the three
//! why-not-yet problems (satisfiability, box search, best rank) over a
//! configured solving engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::best_rank;
use crate::cluster;
use crate::encode::{box_system, quantified_cube_system, satisfiability_system};
use crate::engine::{engine_for, EngineError, EngineKind, SolveEngine, SolveOutcome};
use crate::error::QueryError;
use crate::geometry::{BoundConstraint, Measure, Shape, WeightBox};
use crate::optimize::{binary_search_box, maximize_perimeter_box, DirectOutcome};
use crate::question::Question;
use crate::relation::{Relation, Tuple};

/// Knobs for one why-not-yet query.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub engine: EngineKind,
    /// Compress competitor inequalities to `floor(m * ratio)` weighted
    /// representatives. `None` disables clustering.
    pub cluster_ratio: Option<f64>,
    /// Optimize the measure directly instead of binary-searching it.
    pub precise: bool,
    pub measure: Measure,
    /// Wall-clock budget per engine call.
    pub budget: Option<Duration>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            cluster_ratio: None,
            precise: false,
            measure: Measure::Perimeter,
            budget: None,
        }
    }
}

/// Answer to the satisfiability problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatAnswer {
    /// Some weight vector keeps every expected tuple within budget.
    Satisfiable { witness: Vec<f64> },
    Unsatisfiable,
}

impl SatAnswer {
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, SatAnswer::Satisfiable { .. })
    }
}

/// One why-not-yet query: expected tuples bound to a relation, flexible
/// bounds, and a configured engine. Questions are preprocessed (and, when
/// requested, clustered) once at construction and read-only afterward.
pub struct WhyNotQuery {
    arity: usize,
    questions: Vec<Question>,
    constraints: Vec<BoundConstraint>,
    engine: Box<dyn SolveEngine>,
    options: QueryOptions,
}

impl WhyNotQuery {
    /// Preprocess `expected` tuples (paired with their requested ranks)
    /// against `relation`.
    pub fn new(
        relation: &Relation,
        expected: Vec<Tuple>,
        requested_ranks: &[usize],
        options: QueryOptions,
    ) -> Result<Self, QueryError> {
        let engine = engine_for(options.engine);
        Self::with_engine(relation, expected, requested_ranks, options, engine)
    }

    /// Like [`WhyNotQuery::new`] but with a caller-supplied engine; the seam
    /// used by tests to observe (or forbid) engine calls.
    pub fn with_engine(
        relation: &Relation,
        expected: Vec<Tuple>,
        requested_ranks: &[usize],
        options: QueryOptions,
        engine: Box<dyn SolveEngine>,
    ) -> Result<Self, QueryError> {
        if expected.is_empty() {
            return Err(QueryError::NoExpectedTuples);
        }
        if expected.len() != requested_ranks.len() {
            return Err(QueryError::RankTargetMismatch {
                expected: expected.len(),
                found: requested_ranks.len(),
            });
        }
        let mut questions = Vec::with_capacity(expected.len());
        for (tuple, rank) in expected.into_iter().zip(requested_ranks.iter()) {
            questions.push(Question::prepare(relation, tuple, *rank)?);
        }
        if let Some(ratio) = options.cluster_ratio {
            for q in &mut questions {
                let compressed = cluster::compress(q.inequalities(), ratio)?;
                q.replace_inequalities(compressed);
            }
            info!(ratio, "applied cluster compression");
        }
        Ok(Self {
            arity: relation.arity(),
            questions,
            constraints: Vec::new(),
            engine,
            options,
        })
    }

    /// Attach one flexible bound; validated against the shape at solve time.
    pub fn add_constraint(&mut self, c: BoundConstraint) {
        self.constraints.push(c);
    }

    pub fn add_constraints(&mut self, list: impl IntoIterator<Item = BoundConstraint>) {
        self.constraints.extend(list);
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    fn infeasible_by_preprocessing(&self) -> bool {
        self.questions
            .iter()
            .any(Question::infeasible_by_preprocessing)
    }

    fn solver_error(&self, context: &str, source: EngineError) -> QueryError {
        QueryError::Solver {
            tuple_id: self
                .questions
                .first()
                .map(|q| q.expected().id().to_string())
                .unwrap_or_default(),
            context: context.to_string(),
            source,
        }
    }

    fn inconclusive(&self) -> QueryError {
        QueryError::Inconclusive {
            budget: self.options.budget.unwrap_or(Duration::ZERO),
        }
    }

    /// Does any weight vector rank every expected tuple within its budget?
    ///
    /// Dominator-only infeasibility short-circuits to `Unsatisfiable`
    /// without consulting the engine.
    pub fn satisfiable(&self) -> Result<SatAnswer, QueryError> {
        if self.infeasible_by_preprocessing() {
            info!("unsatisfiable by preprocessing, engine not consulted");
            return Ok(SatAnswer::Unsatisfiable);
        }
        let system = satisfiability_system(&self.questions, self.arity);
        match self
            .engine
            .check(&system, self.options.budget)
            .map_err(|e| self.solver_error("satisfiability", e))?
        {
            SolveOutcome::Feasible { witness, .. } => Ok(SatAnswer::Satisfiable { witness }),
            SolveOutcome::Infeasible => Ok(SatAnswer::Unsatisfiable),
            SolveOutcome::Timeout => Err(self.inconclusive()),
        }
    }

    /// Largest robust box under `shape`, or the invalid box when none
    /// exists.
    pub fn best_box(&self, shape: Shape) -> Result<WeightBox, QueryError> {
        if self.infeasible_by_preprocessing() {
            info!("unsatisfiable by preprocessing, engine not consulted");
            return Ok(WeightBox::invalid());
        }
        let system = box_system(&self.questions, self.arity, shape, &self.constraints)?;
        let used = shape.used_attributes(self.arity);
        let context = format!("box search ({shape:?})");

        if self.options.precise {
            if matches!(self.options.measure, Measure::Volume) {
                // The volume objective is quadratic; neither shipped engine
                // family optimizes it. Binary search still reports volume.
                return Err(QueryError::Engine(EngineError::Unsupported {
                    engine: self.engine.name(),
                    capability: "quadratic volume objectives",
                }));
            }
            return match maximize_perimeter_box(
                self.engine.as_ref(),
                &system,
                used,
                self.options.measure,
                self.options.budget,
            )
            .map_err(|e| self.solver_error(&context, e))?
            {
                DirectOutcome::Found(b) => Ok(b),
                DirectOutcome::Infeasible => Ok(WeightBox::invalid()),
                DirectOutcome::Inconclusive => Err(self.inconclusive()),
            };
        }

        binary_search_box(
            self.engine.as_ref(),
            &system,
            used,
            shape.perimeter_ceiling(self.arity),
            self.options.measure,
            self.options.budget,
        )
        .map_err(|e| self.solver_error(&context, e))
    }

    /// CUBE box via the direct universally-quantified encoding; requires an
    /// engine family with quantifier support.
    pub fn best_box_quantified(&self) -> Result<WeightBox, QueryError> {
        if self.infeasible_by_preprocessing() {
            return Ok(WeightBox::invalid());
        }
        let system = quantified_cube_system(&self.questions, self.arity, &self.constraints)?;
        binary_search_box(
            self.engine.as_ref(),
            &system,
            self.arity,
            Shape::Cube.perimeter_ceiling(self.arity),
            self.options.measure,
            self.options.budget,
        )
        .map_err(|e| self.solver_error("box search (quantified cube)", e))
    }

    /// Minimum achievable rank for the first expected tuple. Run without
    /// clustering for exact hyperplanes; under clustering the answer is
    /// relative to the representative inequalities.
    pub fn best_rank(&self) -> Result<usize, QueryError> {
        let question = &self.questions[0];
        best_rank::best_rank(
            self.engine.as_ref(),
            question,
            self.arity,
            self.options.budget,
        )
        .map_err(|e| self.solver_error("best rank", e))
    }
}
