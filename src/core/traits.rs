//! Core linear-algebra traits for ellsolve.

/// Linear operator applied to a vector: y ← A x.
///
/// This is the only place external sparsity or stencil structure enters the
/// solvers. Implementations must be deterministic and must not mutate through
/// `&self`; the cost of `matvec` is assumed to dominate an iteration.
pub trait MatVec<V> {
    /// Compute y = A · x.
    fn matvec(&self, x: &V, y: &mut V);
}

/// Inner products & norms.
pub trait InnerProduct<V> {
    /// Associated scalar type.
    type Scalar: Copy + PartialOrd + From<f64>;
    /// Compute dot(x, y).
    fn dot(&self, x: &V, y: &V) -> Self::Scalar;
    /// Compute ‖x‖₂.
    fn norm(&self, x: &V) -> Self::Scalar;
    /// Compute sqrt(dot(x, x) / n), the root-mean-square norm.
    ///
    /// Termination tests use this normalization so a tolerance keeps the same
    /// meaning across problem sizes.
    fn norm_rms(&self, x: &V) -> Self::Scalar;
}

/// Uniform indexing into operators and vectors (dense or sparse).
pub trait Indexing {
    /// Number of rows (or length for a vector).
    fn nrows(&self) -> usize;
}
