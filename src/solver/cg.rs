//! Conjugate Gradient for symmetric positive-definite operators (Saad §6.7,
//! van der Vorst 2003 Fig. 5.2).
//!
//! The operator is assumed SPD; this is a documented caller responsibility
//! and is not verified. Degenerate recurrence denominators (p·Ap, r·z) are
//! detected and reported as a `Breakdown` outcome instead of being divided
//! through.

use crate::core::traits::{Indexing, InnerProduct, MatVec};
use crate::error::Error;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, validate_inputs};
use crate::utils::convergence::{Convergence, ConvergenceStatus, SolveStats, Verdict, is_breakdown};

pub struct CgSolver<T> {
    pub conv: Convergence<T>,
    /// Optional per-iteration residual observer, called with (iteration, rms norm).
    pub monitor: Option<Box<dyn FnMut(usize, T)>>,
    pub residual_history: Vec<T>,
}

impl<T: Copy + num_traits::Float> CgSolver<T> {
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

impl<M, V, T> LinearSolver<M, V> for CgSolver<T>
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
        let mut x_vec = x.as_ref().to_vec();

        // r0 = b - A x0
        let mut r = {
            let mut tmp = V::from(vec![T::zero(); n]);
            a.matvec(x, &mut tmp);
            let r_vec =
                tmp.as_ref().iter().zip(b.as_ref()).map(|(&ax, &bi)| bi - ax).collect::<Vec<_>>();
            V::from(r_vec)
        };
        let mut z = V::from(vec![T::zero(); n]);
        if let Some(pc) = pc {
            pc.apply(&r, &mut z)?;
        } else {
            z.clone_from(&r);
        }
        let mut p = z.clone();
        let mut q = V::from(vec![T::zero(); n]);
        let mut rz = ip.dot(&r, &z);
        let mut rz_scale = ip.norm(&r) * ip.norm(&z);

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
            // q = A p; alpha = (r·z)/(p·q)
            a.matvec(&p, &mut q);
            let pq = ip.dot(&p, &q);
            if is_breakdown(pq, ip.norm(&p) * ip.norm(&q)) {
                *x = V::from(x_vec.clone());
                return Ok(SolveStats {
                    status: ConvergenceStatus::Breakdown,
                    iterations: i - 1,
                    final_residual: res_norm,
                });
            }
            let alpha = rz / pq;
            for (xj, pj) in x_vec.iter_mut().zip(p.as_ref()) {
                *xj = *xj + alpha * *pj;
            }
            for (rj, qj) in r.as_mut().iter_mut().zip(q.as_ref()) {
                *rj = *rj - alpha * *qj;
            }

            res_norm = ip.norm_rms(&r);
            if let Some(m) = self.monitor.as_mut() {
                m(i, res_norm);
            }
            self.residual_history.push(res_norm);
            // Terminate before touching z/p so the returned x matches the
            // residual that passed the test.
            match self.conv.check(res_norm, i) {
                Verdict::Converged => {
                    *x = V::from(x_vec.clone());
                    return Ok(SolveStats {
                        status: ConvergenceStatus::Converged,
                        iterations: i,
                        final_residual: res_norm,
                    });
                }
                Verdict::NonFinite => {
                    *x = V::from(x_vec.clone());
                    return Ok(SolveStats {
                        status: ConvergenceStatus::NonFinite,
                        iterations: i,
                        final_residual: res_norm,
                    });
                }
                Verdict::MaxIterationsExceeded => {
                    *x = V::from(x_vec.clone());
                    return Ok(SolveStats {
                        status: ConvergenceStatus::MaxIterationsExceeded,
                        iterations: i,
                        final_residual: res_norm,
                    });
                }
                Verdict::Continue => {}
            }

            // z = M⁻¹ r; beta = (r·z)_new / (r·z)_old
            if let Some(pc) = pc {
                pc.apply(&r, &mut z)?;
            } else {
                z.clone_from(&r);
            }
            let rz_new = ip.dot(&r, &z);
            if is_breakdown(rz, rz_scale) {
                *x = V::from(x_vec.clone());
                return Ok(SolveStats {
                    status: ConvergenceStatus::Breakdown,
                    iterations: i,
                    final_residual: res_norm,
                });
            }
            let beta = rz_new / rz;
            for (pj, zj) in p.as_mut().iter_mut().zip(z.as_ref()) {
                *pj = *zj + beta * *pj;
            }
            rz = rz_new;
            rz_scale = ip.norm(&r) * ip.norm(&z);
        }

        // The loop always returns at i == max_iters; kept for completeness.
        *x = V::from(x_vec);
        Ok(SolveStats {
            status: ConvergenceStatus::MaxIterationsExceeded,
            iterations: self.conv.max_iters,
            final_residual: res_norm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MatVec;

    // Simple dense matrix type for testing
    #[derive(Clone)]
    struct DenseMat {
        data: Vec<Vec<f64>>,
    }
    impl MatVec<Vec<f64>> for DenseMat {
        fn matvec(&self, x: &Vec<f64>, y: &mut Vec<f64>) {
            for (i, row) in self.data.iter().enumerate() {
                y[i] = row.iter().zip(x.iter()).map(|(a, b)| a * b).sum();
            }
        }
    }
    impl Indexing for DenseMat {
        fn nrows(&self) -> usize {
            self.data.len()
        }
    }

    struct DiagPc {
        inv_diag: Vec<f64>,
    }
    impl Preconditioner<DenseMat, Vec<f64>> for DiagPc {
        fn apply(&self, r: &Vec<f64>, z: &mut Vec<f64>) -> Result<(), Error> {
            for i in 0..r.len() {
                z[i] = self.inv_diag[i] * r[i];
            }
            Ok(())
        }
    }

    #[test]
    fn cg_solves_simple_spd() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = CgSolver::new(1e-10, 20);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        let expected = vec![0.09090909090909091, 0.6363636363636364];
        let tol = 1e-8;
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < tol, "xi = {}, expected = {}", xi, ei);
        }
        assert!(stats.converged(), "CG did not converge");
    }

    #[test]
    fn cg_identity_converges_in_one_iteration() {
        let a = DenseMat {
            data: vec![
                vec![1.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0],
                vec![0.0, 0.0, 1.0],
            ],
        };
        let b = vec![1.0, -2.0, 0.5];
        let mut x = vec![0.0; 3];
        let mut solver = CgSolver::new(1e-12, 10);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert_eq!(stats.status, ConvergenceStatus::Converged);
        assert_eq!(stats.iterations, 1);
        for (xi, bi) in x.iter().zip(b.iter()) {
            assert!((xi - bi).abs() < 1e-14);
        }
    }

    #[test]
    fn cg_zero_rhs_zero_guess() {
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![0.0, 0.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = CgSolver::new(1e-12, 10);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert_eq!(stats.status, ConvergenceStatus::Converged);
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.final_residual, 0.0);
    }

    #[test]
    fn cg_reports_max_iterations() {
        // 1D Laplacian, budget too small to converge
        let n = 50;
        let mut data = vec![vec![0.0; n]; n];
        for i in 0..n {
            data[i][i] = 2.0;
            if i > 0 {
                data[i][i - 1] = -1.0;
                data[i - 1][i] = -1.0;
            }
        }
        let a = DenseMat { data };
        let b = vec![1.0; n];
        let mut x = vec![0.0; n];
        let mut solver = CgSolver::new(1e-14, 3);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert_eq!(stats.status, ConvergenceStatus::MaxIterationsExceeded);
        assert_eq!(stats.iterations, 3);
    }

    #[test]
    fn cg_breakdown_on_indefinite_operator() {
        // p·Ap = 0 on the first step: the alpha denominator vanishes
        let a = DenseMat { data: vec![vec![1.0, 0.0], vec![0.0, -1.0]] };
        let b = vec![1.0, 1.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = CgSolver::new(1e-12, 10);
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        assert_eq!(stats.status, ConvergenceStatus::Breakdown);
        assert_eq!(stats.iterations, 0);
        assert!(stats.final_residual.is_finite());
    }

    #[test]
    fn cg_rejects_bad_arguments() {
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![1.0, 2.0, 3.0];
        let mut x = vec![0.0, 0.0];
        let mut solver = CgSolver::new(1e-10, 20);
        assert!(matches!(
            solver.solve(&a, None, &b, &mut x),
            Err(Error::InvalidArgument(_))
        ));

        let b = vec![1.0, 2.0];
        let mut solver = CgSolver::new(-1.0, 20);
        assert!(matches!(
            solver.solve(&a, None, &b, &mut x),
            Err(Error::InvalidArgument(_))
        ));
        let mut solver = CgSolver::new(1e-10, 0);
        assert!(matches!(
            solver.solve(&a, None, &b, &mut x),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn cg_preconditioner_hook_is_applied() {
        // Diagonal system with diagonal preconditioner: converges in one step
        let a = DenseMat {
            data: vec![
                vec![4.0, 0.0, 0.0],
                vec![0.0, 2.0, 0.0],
                vec![0.0, 0.0, 8.0],
            ],
        };
        let pc = DiagPc { inv_diag: vec![0.25, 0.5, 0.125] };
        let b = vec![4.0, 4.0, 4.0];
        let mut x = vec![0.0; 3];
        let mut solver = CgSolver::new(1e-12, 10);
        let stats = solver.solve(&a, Some(&pc), &b, &mut x).unwrap();
        assert_eq!(stats.status, ConvergenceStatus::Converged);
        assert_eq!(stats.iterations, 1);
        let expected = vec![1.0, 2.0, 0.5];
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < 1e-12);
        }
    }

    #[test]
    fn cg_monitor_sees_every_iteration() {
        use std::cell::RefCell;
        use std::rc::Rc;
        let a = DenseMat { data: vec![vec![4.0, 1.0], vec![1.0, 3.0]] };
        let b = vec![1.0, 2.0];
        let mut x = vec![0.0, 0.0];
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_in = Rc::clone(&seen);
        let mut solver = CgSolver::new(1e-10, 20)
            .with_monitor(move |i, res| seen_in.borrow_mut().push((i, res)));
        let stats = solver.solve(&a, None, &b, &mut x).unwrap();
        let seen = seen.borrow();
        assert_eq!(seen.len(), stats.iterations + 1);
        assert_eq!(seen[0].0, 0);
        assert_eq!(seen.last().unwrap().0, stats.iterations);
        assert_eq!(solver.residual_history.len(), stats.iterations + 1);
    }
}
