//! This module provides the high-level API for computing the top-k eigenpairs
//! of an implicit symmetric operator.
//!
//! [`compute_top_eigenpairs`] is the single entry point: it validates and
//! derives the solver configuration from the problem size, wraps the
//! caller's [`ImplicitOperator`] in an adapter that crosses the
//! array/tensor boundary through the [`crate::bridge`], invokes the
//! thick-restart Lanczos kernel, and reshapes the result into the caller's
//! one-eigenvector-per-row convention.
//!
//! The computation is request-scoped: every call constructs its own adapter
//! and vectors, shares nothing with concurrent calls, and blocks until the
//! solver converges, exhausts its restart budget, or fails. The only
//! caller-owned object is the operator itself, which is never mutated.

use crate::{
    algorithms::restarted::{restarted_lanczos, Which},
    bridge::{self, Placement, Precision, Tensor},
    error::{EigenError, EigenErrorKind},
    operator::ImplicitOperator,
};
use faer::Mat;
use rand::Rng;

/// Configuration for one top-k eigenpair computation.
///
/// The defaults mirror the conventional settings for Hessian spectrum
/// estimation: ten pairs, largest magnitude first, twenty restart cycles,
/// relative tolerance 1e-6, subspace dimension derived from the problem.
#[derive(Debug, Clone)]
pub struct LanczosOptions {
    /// Number of eigenvalue/eigenvector pairs to compute.
    pub num_eigenthings: usize,
    /// Selection criterion for the wanted pairs.
    pub which: Which,
    /// Maximum number of restart cycles before giving up.
    pub max_steps: usize,
    /// Relative residual tolerance; the stopping criterion.
    pub tol: f64,
    /// Working-subspace dimension (number of Lanczos vectors). When `None`,
    /// derived as `min(2 * num_eigenthings, size - 1)`.
    pub num_lanczos_vectors: Option<usize>,
    /// Starting vector for the iteration. When `None`, a uniformly random
    /// vector is drawn from the supplied random source. A supplied tensor is
    /// converted to host form first.
    pub init_vec: Option<Tensor>,
    /// Compute placement for the tensors handed to the operator.
    pub placement: Placement,
    /// Numeric precision for the tensors handed to the operator. Under
    /// [`Precision::Half`], operator inputs and outputs are truncated to
    /// 16-bit floats, as is the initial vector.
    pub precision: Precision,
}

impl Default for LanczosOptions {
    fn default() -> Self {
        Self {
            num_eigenthings: 10,
            which: Which::LargestMagnitude,
            max_steps: 20,
            tol: 1e-6,
            num_lanczos_vectors: None,
            init_vec: None,
            placement: Placement::Host,
            precision: Precision::Full,
        }
    }
}

/// Computes the top-k eigenpairs of an implicit symmetric operator, drawing
/// any needed randomness from the process-wide generator.
///
/// See [`compute_top_eigenpairs_with_rng`] for the full contract; this
/// convenience form is equivalent with `rand::rng()` as the random source.
pub fn compute_top_eigenpairs<O: ImplicitOperator>(
    operator: &O,
    options: &LanczosOptions,
) -> Result<(Vec<f64>, Mat<f64>), EigenError> {
    compute_top_eigenpairs_with_rng(operator, options, &mut rand::rng())
}

/// Computes the top-k eigenpairs of an implicit symmetric operator with an
/// injected random source, for reproducible runs.
///
/// # Returns
/// `(eigenvalues, eigenvectors)`: k eigenvalues ordered most-extremal-first
/// per the selection criterion, and a k×n matrix whose row i is the
/// eigenvector paired with eigenvalue i. Row orientation is deliberate: the
/// solver's native layout is one eigenvector per column, and this function
/// transposes it into the caller's convention.
///
/// # Errors
/// * invalid declared operator shape — detected before any `apply` call;
/// * invalid `num_eigenthings`/`num_lanczos_vectors` for the problem size;
/// * any failure raised by the operator's `apply`, propagated unchanged;
/// * non-convergence within the restart budget. No retries in any case.
pub fn compute_top_eigenpairs_with_rng<O, R>(
    operator: &O,
    options: &LanczosOptions,
    rng: &mut R,
) -> Result<(Vec<f64>, Mat<f64>), EigenError>
where
    O: ImplicitOperator,
    R: Rng,
{
    let shape = operator.shape();
    let size = shape
        .leading_dim()
        .ok_or(EigenErrorKind::InvalidOperatorShape { shape })?;

    let k = options.num_eigenthings;
    if k == 0 || k >= size {
        return Err(EigenErrorKind::InvalidParameter(format!(
            "num_eigenthings must satisfy 1 <= k < operator size, got k={k} for size {size}"
        ))
        .into());
    }

    let ncv = match options.num_lanczos_vectors {
        Some(ncv) => ncv,
        None => (2 * k).min(size - 1),
    };
    if ncv <= k || ncv > size - 1 {
        return Err(EigenErrorKind::InvalidParameter(format!(
            "num_lanczos_vectors must satisfy k < ncv <= size - 1, got ncv={ncv} \
             for k={k} and size {size}"
        ))
        .into());
    }
    if ncv < 2 * k {
        log::warn!(
            "number of lanczos vectors ({ncv}) should usually be >= 2*num_eigenthings ({}); \
             convergence may be slow or unreliable",
            2 * k
        );
    }

    // Prepare the starting vector: supplied tensors come back through the
    // bridge, a missing one is drawn uniformly at random, and either way it
    // sees the same precision policy as every iteration vector.
    let mut init_vec = match &options.init_vec {
        Some(tensor) => {
            let host = bridge::to_host_form(tensor, Precision::Full);
            if host.len() != size {
                return Err(EigenErrorKind::DimensionMismatch {
                    expected: size,
                    actual: host.len(),
                }
                .into());
            }
            host
        }
        None => (0..size).map(|_| rng.random::<f64>()).collect(),
    };
    bridge::apply_precision(&mut init_vec, options.precision);

    // The operator adapter: one matrix-vector product per invocation,
    // crossing the array/tensor boundary in both directions. Operator
    // failures propagate unchanged as the error source.
    let precision = options.precision;
    let placement = options.placement;
    let matvec = |x: &[f64]| -> Result<Vec<f64>, EigenError> {
        let input = bridge::to_operator_form(x, precision, placement);
        let output = operator
            .apply(&input)
            .map_err(|e| EigenError::from(EigenErrorKind::OperatorApplication(e)))?;
        Ok(bridge::to_host_form(&output, precision))
    };

    let (eigenvalues, eigenvectors) = restarted_lanczos(
        matvec,
        size,
        k,
        options.which,
        options.max_steps,
        options.tol,
        ncv,
        &init_vec,
        rng,
    )?;

    // The kernel returns eigenvectors one per column; callers expect one per
    // row, so transpose into an owned k×n matrix.
    let eigenvectors = eigenvectors.as_ref().transpose().to_owned();
    Ok((eigenvalues, eigenvectors))
}
