//! Problem-setup collaborators that feed the solvers.

pub mod poisson;
pub use poisson::{DirichletValues, Grid2d, PoissonProblem};
