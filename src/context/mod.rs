//! Solver context/factory types.

pub mod ksp_context;
pub use ksp_context::KrylovContext;
