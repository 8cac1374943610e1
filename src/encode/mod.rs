//! Constraint-system encoders: the point-wise satisfiability encoding and
//! the box-robustness encodings over hyper-rectangles of weight vectors.

pub mod robust;
pub mod sat;

pub use robust::{box_system, perimeter_expr, quantified_cube_system};
pub use sat::satisfiability_system;
