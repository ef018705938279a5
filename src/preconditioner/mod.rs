//! Preconditioner injection point for the iterative solvers.
//!
//! Only the hook is defined here: solvers take an `Option<&dyn
//! Preconditioner>` and treat `None` as the identity. Concrete
//! preconditioners (Jacobi, incomplete factorizations, ...) are supplied by
//! the caller.

use crate::error::Error;

/// An approximate inverse M⁻¹ ≈ A⁻¹, applied once per iteration.
pub trait Preconditioner<M, V> {
    /// Apply M⁻¹ to r, writing z = M⁻¹ r.
    fn apply(&self, r: &V, z: &mut V) -> Result<(), Error>;
    /// Optionally: setup/factorize from A.
    fn setup(&mut self, _a: &M) -> Result<(), Error> {
        Ok(())
    }
}
