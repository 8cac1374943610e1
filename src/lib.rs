#![forbid(unsafe_code)]

//! # rankbox
//!
//! Why-not-yet explanations for top-k ranking queries.
//!
//! Given tuples scored by an unknown non-negative linear weighting and an
//! expected tuple missing from the top k, rankbox answers three questions:
//!
//! - **satisfiability**: does any weight vector put the expected tuple(s)
//!   in the top k?
//! - **best rank**: what is the best rank achievable across all weights?
//! - **box**: what is the largest hyper-rectangle of weight vectors for
//!   which the top-k outcome is guaranteed everywhere inside?
//!
//! The pipeline: dominance preprocessing shrinks the competitor set and can
//! settle a question outright; an optional clustering pass compresses the
//! competitor inequalities into weighted conservative representatives; the
//! encoders translate the rank question into indicator constraint systems
//! (point-wise or robust over a whole box); and a binary search on the box
//! perimeter turns measure optimization into a feasibility loop. Solving is
//! delegated to a pluggable engine capability with a MILP-style family built
//! in and a quantified-SMT family behind the `smt` feature.

pub mod best_rank;
pub mod cluster;
pub mod encode;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod optimize;
pub mod query;
pub mod question;
pub mod relation;
pub mod synth;
pub mod system;

pub use engine::{EngineKind, SolveEngine, SolveOutcome};
pub use error::QueryError;
pub use geometry::{BoundConstraint, BoundKind, Measure, Shape, WeightBox};
pub use query::{QueryOptions, SatAnswer, WhyNotQuery};
pub use question::{Inequality, Question};
pub use relation::{Dominance, Relation, Tuple};
pub use synth::{DataDistribution, Generator};
