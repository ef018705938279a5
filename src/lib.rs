//! ellsolve: Krylov subspace solvers for discretized elliptic PDE systems
//!
//! This crate provides Conjugate Gradient and BiCGSTAB(l) iterative solvers
//! for large sparse linear systems A·u = b, together with the CSR assembly
//! and Poisson problem-setup collaborators that feed them. Operators enter
//! the solvers only through the [`MatVec`] trait; preconditioning is an
//! injectable hook defaulting to the identity.

pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod matrix;
pub mod preconditioner;
pub mod problem;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use config::*;
pub use context::*;
pub use core::*;
pub use error::*;
pub use matrix::*;
pub use preconditioner::*;
pub use problem::*;
pub use solver::*;
pub use utils::*;

// Re-export SolveStats at the crate root for convenience
pub use utils::convergence::SolveStats;
