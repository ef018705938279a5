//! Krylov solver interfaces.

use crate::core::traits::{Indexing, MatVec};
use crate::error::Error;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;
use num_traits::Float;

/// Common interface for the iterative solvers.
pub trait LinearSolver<M, V> {
    type Error;
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Solve A·x = b, writing the result into `x`.
    ///
    /// `x` holds the initial guess on entry and the approximate solution on
    /// return. `pc` is applied as M⁻¹ once per iteration; `None` is the
    /// identity. Returns the convergence outcome; numerical failures
    /// (breakdown, non-finite residual, budget exhaustion) are statuses on the
    /// outcome, not errors.
    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<Self::Scalar>, Self::Error>;
}

/// Check the solve preconditions: square-system dimensions agree, `tol > 0`,
/// `max_iters > 0`. Returns the system dimension.
pub(crate) fn validate_inputs<M, V, T>(
    a: &M,
    b: &V,
    x: &V,
    tol: T,
    max_iters: usize,
) -> Result<usize, Error>
where
    M: Indexing,
    V: AsRef<[T]>,
    T: Float,
{
    let n = a.nrows();
    if b.as_ref().len() != n || x.as_ref().len() != n {
        return Err(Error::InvalidArgument(format!(
            "dimension mismatch: operator is {}x{}, b has length {}, x has length {}",
            n,
            n,
            b.as_ref().len(),
            x.as_ref().len()
        )));
    }
    if !(tol > T::zero()) {
        return Err(Error::InvalidArgument("tol must be positive".into()));
    }
    if max_iters == 0 {
        return Err(Error::InvalidArgument("max_iters must be positive".into()));
    }
    Ok(n)
}

/// Apply the (left-)preconditioned operator: out = M⁻¹ (A v).
///
/// With `pc = None` this is a plain matvec and `scratch` is untouched.
pub(crate) fn apply_operator<M, V>(
    a: &M,
    pc: Option<&dyn Preconditioner<M, V>>,
    scratch: &mut V,
    v: &V,
    out: &mut V,
) -> Result<(), Error>
where
    M: MatVec<V>,
{
    match pc {
        Some(pc) => {
            a.matvec(v, scratch);
            pc.apply(scratch, out)
        }
        None => {
            a.matvec(v, out);
            Ok(())
        }
    }
}

pub mod cg;
pub use cg::CgSolver;

pub mod bicgstab;
pub use bicgstab::BiCgStabSolver;

pub mod bicgstab_l;
pub use bicgstab_l::BiCgStabLSolver;
