//! Matrix module: sparse matrix storage and traits.

pub mod sparse;
pub use sparse::{CsrMatrix, SparseMatrix};
