//! Factory/context binding an operator to a configured Krylov solver.
//!
//! A `KrylovContext` owns the operator, an optional preconditioner, and the
//! solver options; `solve` dispatches to the configured method. This is the
//! intended entry point for callers that construct a solver once and reuse it
//! for several right-hand sides.

use crate::config::{SolverKind, SolverOptions};
use crate::core::traits::{Indexing, InnerProduct, MatVec};
use crate::error::Error;
use crate::preconditioner::Preconditioner;
use crate::solver::{BiCgStabLSolver, BiCgStabSolver, CgSolver, LinearSolver};
use crate::utils::convergence::SolveStats;

pub struct KrylovContext<M, V, T> {
    /// The system operator.
    pub a: M,
    /// Optional preconditioner; `None` is the identity.
    pub pc: Option<Box<dyn Preconditioner<M, V>>>,
    pub options: SolverOptions<T>,
}

impl<M, V, T> KrylovContext<M, V, T>
where
    M: MatVec<V> + Indexing,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + Clone + From<f64>,
{
    pub fn new(a: M, options: SolverOptions<T>) -> Self {
        Self { a, pc: None, options }
    }

    pub fn with_preconditioner(mut self, pc: Box<dyn Preconditioner<M, V>>) -> Self {
        self.pc = Some(pc);
        self
    }

    /// Solve A·x = b with the configured method.
    ///
    /// `x` holds the initial guess on entry and the approximate solution on
    /// return.
    pub fn solve(&mut self, b: &V, x: &mut V) -> Result<SolveStats<T>, Error> {
        let opts = &self.options;
        match opts.kind {
            SolverKind::Cg => {
                let mut solver = CgSolver::new(opts.tol, opts.max_iters);
                solver.solve(&self.a, self.pc.as_deref(), b, x)
            }
            SolverKind::BiCgStab => {
                let mut solver = BiCgStabSolver::new(opts.tol, opts.max_iters);
                solver.solve(&self.a, self.pc.as_deref(), b, x)
            }
            SolverKind::BiCgStabL => {
                let mut solver = BiCgStabLSolver::new(opts.degree, opts.tol, opts.max_iters);
                solver.solve(&self.a, self.pc.as_deref(), b, x)
            }
        }
    }
}
