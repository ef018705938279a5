//! Tests for the iterative solvers against direct solves on random matrices.
//!
//! Verifies that CG and BiCGSTAB(l) reproduce direct (LU) solutions on small
//! random systems, that CG meets the finite-termination bound on a
//! well-conditioned SPD system, and that the failure outcomes (non-finite
//! residuals, exhausted budgets) are reported as statuses rather than
//! panics.

use approx::assert_abs_diff_eq;
use ellsolve::solver::{BiCgStabLSolver, CgSolver, LinearSolver};
use ellsolve::utils::convergence::ConvergenceStatus;
use faer::Mat;
use faer::linalg::solvers::SolveCore;
use rand::Rng;

/// Random well-conditioned SPD matrix `A = MᵀM/n + I` and right-hand side.
fn random_spd(n: usize) -> (Mat<f64>, Vec<f64>) {
    let mut rng = rand::thread_rng();
    let data: Vec<f64> = (0..n * n).map(|_| rng.r#gen()).collect();
    let m = Mat::from_fn(n, n, |i, j| data[j * n + i]);
    let m_t = m.transpose();
    let mtm = &m_t * &m;
    let a = Mat::from_fn(n, n, |i, j| {
        mtm[(i, j)] / n as f64 + if i == j { 1.0 } else { 0.0 }
    });
    let b: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    (a, b)
}

fn random_diag_dominant(n: usize) -> (Mat<f64>, Vec<f64>) {
    let mut rng = rand::thread_rng();
    let data: Vec<f64> = (0..n * n).map(|_| rng.r#gen()).collect();
    let a = Mat::from_fn(n, n, |i, j| {
        data[j * n + i] + if i == j { n as f64 } else { 0.0 }
    });
    let b: Vec<f64> = (0..n).map(|_| rng.r#gen()).collect();
    (a, b)
}

fn direct_solve(a: &Mat<f64>, b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut x = b.to_vec();
    let lus = faer::linalg::solvers::FullPivLu::new(a.as_ref());
    let x_mat = faer::MatMut::from_column_major_slice_mut(&mut x, n, 1);
    lus.solve_in_place_with_conj(faer::Conj::No, x_mat);
    x
}

fn rms_residual(a: &Mat<f64>, x: &[f64], b: &[f64]) -> f64 {
    let n = b.len();
    let mut sum = 0.0;
    for i in 0..n {
        let mut ax = 0.0;
        for j in 0..n {
            ax += a[(i, j)] * x[j];
        }
        sum += (b[i] - ax) * (b[i] - ax);
    }
    (sum / n as f64).sqrt()
}

#[test]
fn cg_converges_within_n_iterations_on_spd() {
    let n = 100;
    let (a, b) = random_spd(n);
    let mut x = vec![0.0; n];
    let mut solver = CgSolver::new(1e-12, 1000);
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert_eq!(stats.status, ConvergenceStatus::Converged);
    assert!(
        stats.iterations <= n,
        "CG took {} iterations on an n = {} SPD system",
        stats.iterations,
        n
    );
}

#[test]
fn cg_vs_direct_on_spd() {
    let n = 10;
    let (a, b) = random_spd(n);
    let mut x_cg = vec![0.0; n];
    let mut solver = CgSolver::new(1e-12, 1000);
    let stats = solver.solve(&a, None, &b, &mut x_cg).unwrap();
    assert!(stats.converged());
    let x_direct = direct_solve(&a, &b);
    for i in 0..n {
        assert_abs_diff_eq!(x_cg[i], x_direct[i], epsilon = 1e-6);
    }
}

#[test]
fn bicgstab_l_vs_direct_on_nonsymmetric() {
    let n = 10;
    let (a, b) = random_diag_dominant(n);
    for l in [1, 2, 4] {
        let mut x_it = vec![0.0; n];
        let mut solver = BiCgStabLSolver::new(l, 1e-12, 1000);
        let stats = solver.solve(&a, None, &b, &mut x_it).unwrap();
        assert!(stats.converged(), "l = {l}: {stats:?}");
        let x_direct = direct_solve(&a, &b);
        for i in 0..n {
            assert_abs_diff_eq!(x_it[i], x_direct[i], epsilon = 1e-6);
        }
    }
}

#[test]
fn converged_solutions_satisfy_residual_bound() {
    // status Converged guarantees ‖A·u − b‖_rms ≤ tol
    let tol = 1e-8;
    let n = 30;
    let (a, b) = random_spd(n);
    let mut x = vec![0.0; n];
    let mut solver = CgSolver::new(tol, 1000);
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert!(stats.converged());
    assert!(rms_residual(&a, &x, &b) <= tol);

    let (a, b) = random_diag_dominant(n);
    let mut x = vec![0.0; n];
    let mut solver = BiCgStabLSolver::new(2, tol, 1000);
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert!(stats.converged());
    assert!(rms_residual(&a, &x, &b) <= tol);
}

#[test]
fn max_iterations_returns_best_iterate() {
    let n = 40;
    let (a, b) = random_spd(n);
    let mut x = vec![0.0; n];
    let mut solver = CgSolver::new(1e-15, 2);
    let stats = solver.solve(&a, None, &b, &mut x).unwrap();
    assert_eq!(stats.status, ConvergenceStatus::MaxIterationsExceeded);
    assert_eq!(stats.iterations, 2);
    // two CG steps still improve on the zero initial guess
    let b_rms = (b.iter().map(|bi| bi * bi).sum::<f64>() / n as f64).sqrt();
    assert!(rms_residual(&a, &x, &b) < b_rms);
    assert_abs_diff_eq!(rms_residual(&a, &x, &b), stats.final_residual, epsilon = 1e-10);
}

#[test]
fn nan_operator_entries_report_nonfinite() {
    let n = 4;
    let mut a = Mat::from_fn(n, n, |i, j| if i == j { 2.0 } else { 0.0 });
    a[(1, 2)] = f64::NAN;
    let b = vec![1.0; n];
    for (name, stats) in [
        (
            "cg",
            CgSolver::new(1e-12, 50).solve(&a, None, &b, &mut vec![0.0; n]).unwrap(),
        ),
        (
            "bicgstab(2)",
            BiCgStabLSolver::new(2, 1e-12, 50)
                .solve(&a, None, &b, &mut vec![0.0; n])
                .unwrap(),
        ),
    ] {
        assert_eq!(stats.status, ConvergenceStatus::NonFinite, "{name}");
        assert!(stats.iterations <= 1, "{name} kept iterating on NaN");
    }
}
