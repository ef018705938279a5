//! BiCGSTAB for general (nonsymmetric) operators (van der Vorst 2003 §7,
//! Saad §7.4.2).
//!
//! The degree-1 stabilized bi-conjugate gradient method. [`BiCgStabLSolver`]
//! with `l = 1` reproduces this iteration; larger `l` is more robust on
//! operators with complex eigenvalue pairs.
//!
//! [`BiCgStabLSolver`]: crate::solver::BiCgStabLSolver

use crate::core::traits::{Indexing, InnerProduct, MatVec};
use crate::error::Error;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, apply_operator, validate_inputs};
use crate::utils::convergence::{Convergence, ConvergenceStatus, SolveStats, Verdict, is_breakdown};

pub struct BiCgStabSolver<T> {
    pub conv: Convergence<T>,
    /// Optional per-iteration residual observer, called with (iteration, rms norm).
    pub monitor: Option<Box<dyn FnMut(usize, T)>>,
    pub residual_history: Vec<T>,
}

impl<T: num_traits::Float> BiCgStabSolver<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence { tol, max_iters }, monitor: None, residual_history: Vec::new() }
    }

    pub fn with_monitor<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, T) + 'static,
    {
        self.monitor = Some(Box::new(f));
        self
    }

    pub fn clear_history(&mut self) {
        self.residual_history.clear();
    }
}

impl<M, V, T> LinearSolver<M, V> for BiCgStabSolver<T>
where
    M: MatVec<V> + Indexing,
    (): InnerProduct<V, Scalar = T>,
    V: AsMut<[T]> + AsRef<[T]> + From<Vec<T>> + Clone,
    T: num_traits::Float + Clone + From<f64>,
{
    type Error = Error;
    type Scalar = T;

    fn solve(
        &mut self,
        a: &M,
        pc: Option<&dyn Preconditioner<M, V>>,
        b: &V,
        x: &mut V,
    ) -> Result<SolveStats<T>, Error> {
        let n = validate_inputs(a, b, x, self.conv.tol, self.conv.max_iters)?;
        let ip = ();
        let mut xk = x.as_ref().to_vec();
        let mut scratch = V::from(vec![T::zero(); n]);

        // r0 = M⁻¹ (b - A x0)
        let mut r = {
            let mut tmp = V::from(vec![T::zero(); n]);
            a.matvec(x, &mut tmp);
            let r_vec =
                tmp.as_ref().iter().zip(b.as_ref()).map(|(&ax, &bi)| bi - ax).collect::<Vec<_>>();
            V::from(r_vec)
        };
        if let Some(pc_ref) = pc {
            let mut z = V::from(vec![T::zero(); n]);
            pc_ref.apply(&r, &mut z)?;
            r = z;
        }

        // Shadow residual, fixed for the whole solve.
        let r_hat = r.clone();
        let r_hat_norm = ip.norm(&r_hat);

        let mut rho_prev = T::one();
        let mut alpha = T::one();
        let mut omega_prev = T::one();
        let mut v = V::from(vec![T::zero(); n]);
        let mut p = r.clone();
        let mut t = V::from(vec![T::zero(); n]);

        let mut res_norm = ip.norm_rms(&r);
        if let Some(m) = self.monitor.as_mut() {
            m(0, res_norm);
        }
        self.residual_history.push(res_norm);
        match self.conv.check(res_norm, 0) {
            Verdict::Converged => {
                return Ok(SolveStats {
                    status: ConvergenceStatus::Converged,
                    iterations: 0,
                    final_residual: res_norm,
                });
            }
            Verdict::NonFinite => {
                return Ok(SolveStats {
                    status: ConvergenceStatus::NonFinite,
                    iterations: 0,
                    final_residual: res_norm,
                });
            }
            _ => {}
        }

        for i in 1..=self.conv.max_iters {
            let rho = ip.dot(&r_hat, &r);
            if is_breakdown(rho, r_hat_norm * ip.norm(&r)) {
                *x = V::from(xk.clone());
                return Ok(SolveStats {
                    status: ConvergenceStatus::Breakdown,
                    iterations: i - 1,
                    final_residual: res_norm,
                });
            }
            let beta = if i == 1 {
                T::zero()
            } else {
                (rho / rho_prev) * (alpha / omega_prev)
            };
            // p = r + beta (p - omega v)
            for ((pj, rj), vj) in p.as_mut().iter_mut().zip(r.as_ref()).zip(v.as_ref()) {
                *pj = *rj + beta * (*pj - omega_prev * *vj);
            }
            // v = M⁻¹ A p
            apply_operator(a, pc, &mut scratch, &p, &mut v)?;
            let gam = ip.dot(&r_hat, &v);
            if is_breakdown(gam, r_hat_norm * ip.norm(&v)) {
                *x = V::from(xk.clone());
                return Ok(SolveStats {
                    status: ConvergenceStatus::Breakdown,
                    iterations: i - 1,
                    final_residual: res_norm,
                });
            }
            alpha = rho / gam;
            // s = r - alpha v (reusing r's storage)
            for (rj, vj) in r.as_mut().iter_mut().zip(v.as_ref()) {
                *rj = *rj - alpha * *vj;
            }
            let s_norm = ip.norm_rms(&r);
            match self.conv.check(s_norm, i) {
                Verdict::Converged | Verdict::NonFinite => {
                    for (xj, pj) in xk.iter_mut().zip(p.as_ref()) {
                        *xj = *xj + alpha * *pj;
                    }
                    if let Some(m) = self.monitor.as_mut() {
                        m(i, s_norm);
                    }
                    self.residual_history.push(s_norm);
                    let status = if s_norm.is_finite() {
                        ConvergenceStatus::Converged
                    } else {
                        ConvergenceStatus::NonFinite
                    };
                    *x = V::from(xk);
                    return Ok(SolveStats { status, iterations: i, final_residual: s_norm });
                }
                _ => {}
            }
            // t = M⁻¹ A s
            apply_operator(a, pc, &mut scratch, &r, &mut t)?;
            let t_dot_t = ip.dot(&t, &t);
            if t_dot_t == T::zero() {
                *x = V::from(xk.clone());
                return Ok(SolveStats {
                    status: ConvergenceStatus::Breakdown,
                    iterations: i - 1,
                    final_residual: res_norm,
                });
            }
            let omega = ip.dot(&t, &r) / t_dot_t;
            // x = x + alpha p + omega s
            for ((xj, pj), sj) in xk.iter_mut().zip(p.as_ref()).zip(r.as_ref()) {
                *xj = *xj + alpha * *pj + omega * *sj;
            }
            // r = s - omega t
            for (rj, tj) in r.as_mut().iter_mut().zip(t.as_ref()) {
                *rj = *rj - omega * *tj;
            }
            res_norm = ip.norm_rms(&r);
            if let Some(m) = self.monitor.as_mut() {
                m(i, res_norm);
            }
            self.residual_history.push(res_norm);
            match self.conv.check(res_norm, i) {
                Verdict::Converged => {
                    *x = V::from(xk.clone());
                    return Ok(SolveStats {
                        status: ConvergenceStatus::Converged,
                        iterations: i,
                        final_residual: res_norm,
                    });
                }
                Verdict::NonFinite => {
                    *x = V::from(xk.clone());
                    return Ok(SolveStats {
                        status: ConvergenceStatus::NonFinite,
                        iterations: i,
                        final_residual: res_norm,
                    });
                }
                Verdict::MaxIterationsExceeded => {
                    *x = V::from(xk.clone());
                    return Ok(SolveStats {
                        status: ConvergenceStatus::MaxIterationsExceeded,
                        iterations: i,
                        final_residual: res_norm,
                    });
                }
                Verdict::Continue => {}
            }
            // omega ≈ 0 leaves the next rho scaling degenerate
            if is_breakdown(omega, T::one()) {
                *x = V::from(xk.clone());
                return Ok(SolveStats {
                    status: ConvergenceStatus::Breakdown,
                    iterations: i,
                    final_residual: res_norm,
                });
            }
            rho_prev = rho;
            omega_prev = omega;
        }

        // The loop always returns at i == max_iters; kept for completeness.
        *x = V::from(xk);
        Ok(SolveStats {
            status: ConvergenceStatus::MaxIterationsExceeded,
            iterations: self.conv.max_iters,
            final_residual: res_norm,
        })
    }
}
