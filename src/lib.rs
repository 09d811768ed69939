//! Top-k eigenpairs of large implicit symmetric operators.
//!
//! This crate computes the dominant eigenvalues and eigenvectors of a linear
//! operator that is never materialized as a matrix, only exposed through its
//! action on vectors. The motivating operator is a neural-network Hessian:
//! its size is the number of model parameters, potentially in the millions,
//! but Hessian-vector products are cheap through automatic differentiation.
//! Repeated application of the operator is therefore the only primitive the
//! solver relies on.
//!
//! Built on the [`faer`] linear algebra framework for the dense kernels, the
//! solver is a thick-restart symmetric Lanczos iteration with full
//! reorthogonalization ([`algorithms::restarted`]). Around it sits the part
//! that makes the crate useful in practice: the driver in [`solvers`] that
//! adapts an [`operator::ImplicitOperator`] to the solver's host-array
//! calling convention. The driver sits at a precision/placement boundary —
//! the solver works on `f64` arrays in host memory, while operators may
//! evaluate on reduced-precision, accelerator-resident tensors — and every
//! iteration crosses that boundary twice through the [`bridge`].
//!
//! ## Example
//!
//! Computing the two dominant eigenpairs of a small explicit matrix standing
//! in for an implicit operator:
//!
//! ```rust
//! use faer::Mat;
//! use hessian_eigenthings::{compute_top_eigenpairs, DenseOperator, LanczosOptions};
//!
//! // A symmetric matrix with a known spectrum.
//! let a = Mat::from_fn(6, 6, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
//! let operator = DenseOperator::new(a);
//!
//! let options = LanczosOptions {
//!     num_eigenthings: 2,
//!     max_steps: 100,
//!     tol: 1e-9,
//!     ..LanczosOptions::default()
//! };
//! let (eigenvalues, eigenvectors) = compute_top_eigenpairs(&operator, &options).unwrap();
//!
//! assert!((eigenvalues[0] - 6.0).abs() < 1e-6);
//! assert!((eigenvalues[1] - 5.0).abs() < 1e-6);
//! // One eigenvector per row, each of length 6.
//! assert_eq!(eigenvectors.nrows(), 2);
//! assert_eq!(eigenvectors.ncols(), 6);
//! ```
//!
//! ## Scope
//!
//! The crate deliberately does not construct Hessian-vector products: plug
//! autograd code in through [`operator::MatVecOperator`] or a custom
//! [`operator::ImplicitOperator`] implementation. There is no concurrency in
//! the calling contract either — matrix-vector products are issued strictly
//! sequentially, so operators may hold non-reentrant state across calls.

// Declare the modules that form the crate's API structure.
pub mod algorithms;
pub mod bridge;
pub mod error;
pub mod operator;
pub mod solvers;

// Re-export the main API for convenient access.
pub use algorithms::restarted::Which;
pub use bridge::{Placement, Precision, Tensor};
pub use error::EigenError;
pub use operator::{DenseOperator, ImplicitOperator, MatVecOperator, OperatorShape};
pub use solvers::{compute_top_eigenpairs, compute_top_eigenpairs_with_rng, LanczosOptions};
