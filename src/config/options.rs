//! Solver selection & parameters.

use crate::utils::convergence::{DEFAULT_MAX_ITERS, DEFAULT_TOL};

/// Which Krylov method to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Conjugate Gradient (for SPD operators)
    Cg,
    /// BiConjugate Gradient Stabilized
    BiCgStab,
    /// BiCGSTAB(l) with configurable stabilization depth
    BiCgStabL,
}

/// Solver parameters with the conventional defaults (tol 1e-15, 5000
/// iterations).
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions<T> {
    pub kind: SolverKind,
    /// Convergence tolerance on the rms residual norm.
    pub tol: T,
    /// Iteration budget.
    pub max_iters: usize,
    /// Stabilization depth l for BiCGSTAB(l); ignored by the other methods.
    pub degree: usize,
}

impl<T: num_traits::Float + From<f64>> Default for SolverOptions<T> {
    fn default() -> Self {
        Self {
            kind: SolverKind::Cg,
            tol: DEFAULT_TOL.into(),
            max_iters: DEFAULT_MAX_ITERS,
            degree: 2,
        }
    }
}

impl<T: num_traits::Float + From<f64>> SolverOptions<T> {
    pub fn new(kind: SolverKind) -> Self {
        Self { kind, ..Self::default() }
    }

    pub fn with_tol(mut self, tol: T) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }
}
