//! Thick-restart symmetric Lanczos eigensolver.
//!
//! This module implements the restarted-Krylov primitive the driver invokes:
//! given a matrix-vector callback for a symmetric operator, compute its k
//! extremal eigenpairs. The algorithm builds an orthonormal Krylov basis with
//! full reorthogonalization, projects the operator onto it, diagonalizes the
//! small projected matrix, and restarts from the best Ritz vectors until the
//! wanted pairs converge or the restart budget runs out.
//!
//! Full reorthogonalization (a two-pass Gram-Schmidt sweep per step) costs
//! O(nm) per iteration but is what keeps the computed basis orthonormal in
//! floating point; without it, Lanczos famously produces spurious duplicate
//! eigenvalues. The basis dimension m stays small (on the order of twice the
//! number of wanted pairs), so the m×m dense eigendecomposition per cycle is
//! negligible next to the matrix-vector products.
//!
//! The callback works on plain `f64` slices in host memory. Everything about
//! tensors, precision, and device placement happens on the other side of the
//! adapter in [`crate::solvers`]; this module is purely numerical.

use crate::error::{EigenError, EigenErrorKind};
use faer::{linalg::matmul::matmul, Accum, Mat, Par, Side};
use rand::Rng;

/// Selection criterion for which extremal eigenpairs to report.
///
/// Matches the four ARPACK-style modes: largest/smallest, by magnitude or by
/// algebraic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Which {
    /// Largest magnitude, |θ| descending.
    #[default]
    LargestMagnitude,
    /// Smallest magnitude, |θ| ascending.
    SmallestMagnitude,
    /// Largest algebraic value, θ descending.
    LargestAlgebraic,
    /// Smallest algebraic value, θ ascending.
    SmallestAlgebraic,
}

/// Relative threshold below which a residual norm is treated as a breakdown,
/// i.e. the Krylov subspace has become invariant.
const BREAKDOWN_RELATIVE: f64 = 1e-12;

/// Attempts made to re-seed the iteration with a random direction after a
/// breakdown before giving up on expanding the basis further.
const RESEED_ATTEMPTS: usize = 3;

/// Computes k extremal eigenpairs of a symmetric operator given only its
/// action on vectors.
///
/// # Arguments
/// * `matvec`: callback computing `A·x` for the implicit symmetric operator.
/// * `n`: dimension of the operator.
/// * `k`: number of eigenpairs to compute. Must satisfy `1 <= k < n`.
/// * `which`: selection criterion for the wanted pairs.
/// * `max_restarts`: restart-cycle budget; exhausting it is a terminal
///   non-convergence failure.
/// * `tol`: relative residual tolerance, scaled by the largest Ritz value
///   magnitude. A non-positive value falls back to machine epsilon.
/// * `ncv`: working-subspace dimension m. Must satisfy `k < ncv <= n`.
/// * `v0`: starting vector, normalized internally. Must be nonzero.
/// * `rng`: random source for re-seeding after a breakdown.
///
/// # Returns
/// `(eigenvalues, eigenvectors)` with eigenvalues ordered most-extremal-first
/// per `which`, and eigenvectors as the columns of an n×k matrix, column i
/// pairing with eigenvalue i. The caller is responsible for any layout
/// change; this function returns the solver-native column orientation.
///
/// Errors from `matvec` propagate unchanged; a single failed application
/// aborts the computation.
#[allow(clippy::too_many_arguments)]
pub fn restarted_lanczos<F, R>(
    mut matvec: F,
    n: usize,
    k: usize,
    which: Which,
    max_restarts: usize,
    tol: f64,
    ncv: usize,
    v0: &[f64],
    rng: &mut R,
) -> Result<(Vec<f64>, Mat<f64>), EigenError>
where
    F: FnMut(&[f64]) -> Result<Vec<f64>, EigenError>,
    R: Rng,
{
    debug_assert!(k >= 1 && k < n, "caller must validate 1 <= k < n");
    debug_assert!(k < ncv && ncv <= n, "caller must validate k < ncv <= n");
    debug_assert_eq!(v0.len(), n);

    let m = ncv;
    let budget = max_restarts.max(1);

    // Basis vectors live in the columns of `v`; the projected matrix
    // T = Vᵀ A V is kept dense and symmetric. After a thick restart T is an
    // arrowhead rather than tridiagonal, and a dense m×m store handles both
    // forms uniformly.
    let mut v = Mat::<f64>::zeros(n, m);
    let mut t = Mat::<f64>::zeros(m, m);

    let v0_norm = norm(v0);
    if v0_norm <= 0.0 || !v0_norm.is_finite() {
        return Err(EigenErrorKind::InvalidParameter(
            "initial vector must be nonzero and finite".to_string(),
        )
        .into());
    }
    for i in 0..n {
        v[(i, 0)] = v0[i] / v0_norm;
    }

    // `basis_len` counts the columns of `v` holding valid orthonormal
    // vectors; `filled` counts the columns whose matrix-vector product has
    // been taken, i.e. whose column of T is known.
    let mut basis_len = 1usize;
    let mut filled = 0usize;

    // Running magnitude of the projected matrix, used to scale the breakdown
    // threshold.
    let mut op_scale = 1.0f64;

    let mut last_converged = 0usize;

    for restart in 0..budget {
        // --- Expansion: grow the basis towards m columns. ---
        let mut beta_res = 0.0f64;
        let mut residual_dir: Option<Vec<f64>> = None;

        while filled < m && filled < basis_len {
            let j = filled;
            let x: Vec<f64> = (0..n).map(|i| v[(i, j)]).collect();
            let mut w = matvec(&x)?;
            if w.len() != n {
                return Err(EigenErrorKind::DimensionMismatch {
                    expected: n,
                    actual: w.len(),
                }
                .into());
            }

            // Project against every existing basis vector (columns 0..=j).
            // The first-pass coefficients are exactly the entries of T's
            // column j; the second pass is the classical Gram-Schmidt
            // correction, whose coefficients are folded into T as well.
            for pass in 0..2 {
                for i in 0..basis_len {
                    let h = col_dot(&v, i, &w);
                    for (row, wv) in w.iter_mut().enumerate() {
                        *wv -= h * v[(row, i)];
                    }
                    let updated = if pass == 0 { h } else { t[(i, j)] + h };
                    t[(i, j)] = updated;
                    t[(j, i)] = updated;
                    op_scale = op_scale.max(updated.abs());
                }
            }

            filled += 1;
            let beta = norm(&w);
            let broke_down = beta <= BREAKDOWN_RELATIVE * op_scale;

            if filled == m {
                // The remainder of the final column is the residual; it seeds
                // the next cycle's restart. A vanishing residual means the
                // subspace is invariant and every Ritz pair in it is exact.
                if !broke_down {
                    beta_res = beta;
                    residual_dir = Some(w.iter().map(|wv| wv / beta).collect());
                }
                break;
            }

            if broke_down {
                // Invariant subspace before reaching m: re-seed with a random
                // direction orthogonal to the current basis so the iteration
                // can keep enlarging the subspace.
                match reseed(&v, basis_len, n, rng) {
                    Some(fresh) => {
                        set_column(&mut v, basis_len, &fresh);
                        basis_len += 1;
                    }
                    None => break,
                }
            } else {
                let next: Vec<f64> = w.iter().map(|wv| wv / beta).collect();
                set_column(&mut v, basis_len, &next);
                basis_len += 1;
            }
        }

        let m_cycle = filled;

        // --- Rayleigh-Ritz: diagonalize the projected matrix. ---
        let t_sub = t.as_ref().get(0..m_cycle, 0..m_cycle);
        let evd = t_sub
            .self_adjoint_eigen(Side::Upper)
            .map_err(|e| EigenError::from(EigenErrorKind::Evd(e)))?;
        let s = evd.U();
        let diag = evd.S();
        let thetas: Vec<f64> = (0..m_cycle).map(|i| diag[i]).collect();

        let order = selection_order(&thetas, which);
        let n_wanted = k.min(m_cycle);
        let wanted = &order[..n_wanted];

        // Residual bound for Ritz pair i: ‖A x_i − θ_i x_i‖ = β_m |s_{m,i}|,
        // a consequence of A V_m = V_m T_m + β_m v_res e_mᵀ.
        let spectral_scale = thetas
            .iter()
            .fold(0.0f64, |acc, th| acc.max(th.abs()))
            .max(f64::MIN_POSITIVE);
        let effective_tol = if tol > 0.0 { tol } else { f64::EPSILON };
        let threshold = effective_tol * spectral_scale;
        let converged = wanted
            .iter()
            .filter(|&&i| beta_res * s[(m_cycle - 1, i)].abs() <= threshold)
            .count();
        last_converged = converged;

        if converged == k && n_wanted == k {
            // Assemble the Ritz vectors X = V S_wanted in one explicit matmul
            // into a pre-allocated destination, avoiding temporaries.
            let s_sel = Mat::from_fn(m_cycle, k, |i, col| s[(i, wanted[col])]);
            let mut x = Mat::<f64>::zeros(n, k);
            matmul(
                x.as_mut(),
                Accum::Replace,
                v.as_ref().get(.., 0..m_cycle),
                s_sel.as_ref(),
                1.0,
                Par::Seq,
            );
            let values: Vec<f64> = wanted.iter().map(|&i| thetas[i]).collect();
            return Ok((values, x));
        }

        if restart + 1 == budget {
            break;
        }

        // --- Thick restart. ---
        // Keep the wanted Ritz vectors plus half of the remaining subspace;
        // the extra vectors act as a deflation buffer and speed up
        // convergence of the wanted set.
        let spare = m_cycle.saturating_sub(n_wanted);
        let l = (n_wanted + spare / 2).min(m_cycle.saturating_sub(1)).max(1);
        let keep = &order[..l];

        let s_keep = Mat::from_fn(m_cycle, l, |i, col| s[(i, keep[col])]);
        let mut x_keep = Mat::<f64>::zeros(n, l);
        matmul(
            x_keep.as_mut(),
            Accum::Replace,
            v.as_ref().get(.., 0..m_cycle),
            s_keep.as_ref(),
            1.0,
            Par::Seq,
        );

        v = Mat::zeros(n, m);
        t = Mat::zeros(m, m);
        for col in 0..l {
            for row in 0..n {
                v[(row, col)] = x_keep[(row, col)];
            }
            t[(col, col)] = thetas[keep[col]];
        }

        // The coupling between the kept Ritz vectors and the residual vector
        // (the arrowhead row of the restarted T) is recovered automatically
        // when the residual column's matrix-vector product is taken, since
        // x_iᵀ A v_res = β_m s_{m,i} in exact arithmetic.
        let next_dir = match residual_dir {
            Some(dir) => Some(dir),
            None => reseed(&v, l, n, rng),
        };
        match next_dir {
            Some(dir) => {
                set_column(&mut v, l, &dir);
                basis_len = l + 1;
            }
            None => basis_len = l,
        }
        filled = l;
    }

    Err(EigenErrorKind::NonConvergence {
        requested: k,
        converged: last_converged,
        restarts: budget,
    }
    .into())
}

/// Euclidean norm of a host vector.
fn norm(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Dot product of basis column `col` with a host vector.
fn col_dot(v: &Mat<f64>, col: usize, w: &[f64]) -> f64 {
    w.iter().enumerate().map(|(i, wv)| v[(i, col)] * wv).sum()
}

/// Writes a host vector into basis column `col`.
fn set_column(v: &mut Mat<f64>, col: usize, values: &[f64]) {
    for (row, val) in values.iter().enumerate() {
        v[(row, col)] = *val;
    }
}

/// Draws a random direction and orthogonalizes it against the first
/// `basis_len` columns of `v`. Returns `None` if no independent direction can
/// be found, which only happens when the basis already spans the whole space.
fn reseed<R: Rng>(v: &Mat<f64>, basis_len: usize, n: usize, rng: &mut R) -> Option<Vec<f64>> {
    for _ in 0..RESEED_ATTEMPTS {
        let mut w: Vec<f64> = (0..n).map(|_| rng.random::<f64>() - 0.5).collect();
        for _pass in 0..2 {
            for col in 0..basis_len {
                let h = col_dot(v, col, &w);
                for (row, wv) in w.iter_mut().enumerate() {
                    *wv -= h * v[(row, col)];
                }
            }
        }
        let beta = norm(&w);
        if beta > 1e-8 {
            for wv in w.iter_mut() {
                *wv /= beta;
            }
            return Some(w);
        }
    }
    None
}

/// Index permutation ordering Ritz values most-extremal-first per `which`.
fn selection_order(thetas: &[f64], which: Which) -> Vec<usize> {
    let mut order: Vec<usize> = (0..thetas.len()).collect();
    match which {
        Which::LargestMagnitude => {
            order.sort_by(|&a, &b| thetas[b].abs().total_cmp(&thetas[a].abs()))
        }
        Which::SmallestMagnitude => {
            order.sort_by(|&a, &b| thetas[a].abs().total_cmp(&thetas[b].abs()))
        }
        Which::LargestAlgebraic => order.sort_by(|&a, &b| thetas[b].total_cmp(&thetas[a])),
        Which::SmallestAlgebraic => order.sort_by(|&a, &b| thetas[a].total_cmp(&thetas[b])),
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn diag_matvec(diag: Vec<f64>) -> impl FnMut(&[f64]) -> Result<Vec<f64>, EigenError> {
        move |x: &[f64]| Ok(x.iter().zip(diag.iter()).map(|(v, d)| v * d).collect())
    }

    fn seeded_start(n: usize, rng: &mut StdRng) -> Vec<f64> {
        (0..n).map(|_| rng.random::<f64>()).collect()
    }

    #[test]
    fn test_selection_order_modes() {
        let thetas = vec![-5.0, -1.0, 2.0, 10.0];
        assert_eq!(selection_order(&thetas, Which::LargestMagnitude)[0], 3);
        assert_eq!(selection_order(&thetas, Which::SmallestMagnitude)[0], 1);
        assert_eq!(selection_order(&thetas, Which::LargestAlgebraic)[0], 3);
        assert_eq!(selection_order(&thetas, Which::SmallestAlgebraic)[0], 0);
    }

    #[test]
    fn test_diagonal_dominant_pairs() {
        let n = 50;
        let diag: Vec<f64> = (1..=n).map(|i| i as f64).collect();
        let mut rng = StdRng::seed_from_u64(7);
        let v0 = seeded_start(n, &mut rng);
        let (vals, vecs) = restarted_lanczos(
            diag_matvec(diag),
            n,
            3,
            Which::LargestMagnitude,
            300,
            1e-8,
            12,
            &v0,
            &mut rng,
        )
        .unwrap();
        assert_eq!(vals.len(), 3);
        assert_eq!(vecs.nrows(), n);
        assert_eq!(vecs.ncols(), 3);
        assert!((vals[0] - 50.0).abs() < 1e-5);
        assert!((vals[1] - 49.0).abs() < 1e-5);
        assert!((vals[2] - 48.0).abs() < 1e-5);
        // The dominant Ritz vector concentrates on the last coordinate.
        assert!(vecs[(n - 1, 0)].abs() > 0.99);
    }

    #[test]
    fn test_identity_breaks_down_and_still_converges() {
        let n = 10;
        let mut rng = StdRng::seed_from_u64(3);
        let v0 = seeded_start(n, &mut rng);
        let (vals, vecs) = restarted_lanczos(
            diag_matvec(vec![4.0; n]),
            n,
            3,
            Which::LargestMagnitude,
            20,
            1e-6,
            6,
            &v0,
            &mut rng,
        )
        .unwrap();
        assert_eq!(vals.len(), 3);
        for val in vals {
            assert!((val - 4.0).abs() < 1e-8);
        }
        // Eigenvectors stay orthonormal despite the repeated re-seeding.
        for col in 0..3 {
            let norm_sq: f64 = (0..n).map(|i| vecs[(i, col)] * vecs[(i, col)]).sum();
            assert!((norm_sq - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn test_smallest_algebraic_on_indefinite_spectrum() {
        let n = 30;
        let diag: Vec<f64> = (0..n).map(|i| i as f64 - 15.0).collect();
        let mut rng = StdRng::seed_from_u64(11);
        let v0 = seeded_start(n, &mut rng);
        let (vals, _) = restarted_lanczos(
            diag_matvec(diag),
            n,
            2,
            Which::SmallestAlgebraic,
            300,
            1e-8,
            10,
            &v0,
            &mut rng,
        )
        .unwrap();
        assert!((vals[0] + 15.0).abs() < 1e-5);
        assert!((vals[1] + 14.0).abs() < 1e-5);
    }

    #[test]
    fn test_matvec_error_propagates() {
        let mut rng = StdRng::seed_from_u64(1);
        let v0 = vec![1.0; 8];
        let failing = |_x: &[f64]| -> Result<Vec<f64>, EigenError> {
            Err(crate::error::EigenErrorKind::InvalidParameter("boom".to_string()).into())
        };
        let result = restarted_lanczos(
            failing,
            8,
            2,
            Which::LargestMagnitude,
            10,
            1e-6,
            5,
            &v0,
            &mut rng,
        );
        assert!(result.unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_zero_start_vector_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let v0 = vec![0.0; 8];
        let result = restarted_lanczos(
            diag_matvec((1..=8).map(|i| i as f64).collect()),
            8,
            2,
            Which::LargestMagnitude,
            10,
            1e-6,
            5,
            &v0,
            &mut rng,
        );
        assert!(result.unwrap_err().is_invalid_parameter());
    }

    #[test]
    fn test_nonconvergence_reports_budget() {
        // A tough clustered spectrum with a tiny subspace and a single
        // restart cannot converge three pairs to 1e-14.
        let n = 200;
        let diag: Vec<f64> = (0..n).map(|i| 1.0 + 1e-6 * i as f64).collect();
        let mut rng = StdRng::seed_from_u64(5);
        let v0 = seeded_start(n, &mut rng);
        let result = restarted_lanczos(
            diag_matvec(diag),
            n,
            3,
            Which::SmallestMagnitude,
            1,
            1e-14,
            4,
            &v0,
            &mut rng,
        );
        assert!(result.unwrap_err().is_non_convergence());
    }
}
