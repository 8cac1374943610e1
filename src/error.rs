//! Error taxonomy for why-not-yet queries.
//!
//! Configuration problems fail fast before any engine call. Engine timeouts
//! on direct checks surface as [`QueryError::Inconclusive`], which is distinct
//! from an unsatisfiable answer. Preprocessing infeasibility (`k_used < 0`)
//! is not an error at all: it is reported as a negative answer.

use std::time::Duration;

use thiserror::Error;

use crate::engine::EngineError;

/// Errors that can occur while building or running a why-not-yet query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The relation contains no tuples.
    #[error("relation '{name}' is empty")]
    EmptyRelation { name: String },

    /// The relation's tuples carry no ranking attributes at all.
    #[error("relation '{name}' has no ranking attributes")]
    NoAttributes { name: String },

    /// A tuple disagrees with the relation's schema.
    #[error("tuple '{id}' has {found} attributes, expected {expected}")]
    ArityMismatch {
        id: String,
        found: usize,
        expected: usize,
    },

    /// An attribute value was NaN or infinite.
    #[error("tuple '{id}' has non-finite attribute value {value}")]
    NonFiniteAttribute { id: String, value: f64 },

    /// An ingestion record had no fields at all.
    #[error("empty ingestion record")]
    EmptyRecord,

    /// An attribute field failed to parse as floating point.
    #[error("tuple '{id}': attribute field '{field}' is not a number")]
    UnparsableAttribute { id: String, field: String },

    /// A query was built with no expected tuples at all.
    #[error("query has no expected tuples")]
    NoExpectedTuples,

    /// The expected tuple's identifier does not occur in the relation.
    #[error("expected tuple '{id}' is not in the relation")]
    UnknownTuple { id: String },

    /// The expected-tuple list and the rank-target list disagree in length.
    #[error("{expected} expected tuples but {found} rank targets")]
    RankTargetMismatch { expected: usize, found: usize },

    /// A flexible constraint names an attribute outside the free range of the
    /// chosen weight-space shape.
    #[error("flexible constraint targets attribute {attribute}, but only {available} are free")]
    ConstraintOutOfRange { attribute: usize, available: usize },

    /// Cluster compression ratio outside (0, 1].
    #[error("cluster ratio must lie in (0, 1], got {0}")]
    InvalidClusterRatio(f64),

    /// The engine ran out of its time budget on a direct check. Not a
    /// negative answer; the caller may retry with a larger budget.
    #[error("solver exceeded its time budget of {budget:?}; answer is inconclusive")]
    Inconclusive { budget: Duration },

    /// Unexpected engine failure, annotated with the question it was solving.
    /// Never retried.
    #[error("engine failure while solving for tuple '{tuple_id}' ({context}): {source}")]
    Solver {
        tuple_id: String,
        context: String,
        #[source]
        source: EngineError,
    },

    /// Engine failure outside the context of a single question.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
