//! Named matrices and sample attribute tables

mod dense;
mod kind;
mod matrix;
mod names;
mod sample_table;
mod sparse;

pub use dense::DenseMatrix;
pub use kind::{new_matrix, AnyMatrix, MatrixKind};
pub use matrix::NamedMatrix;
pub use names::NameIndex;
pub use sample_table::SampleTable;
pub use sparse::SparseMatrix;
