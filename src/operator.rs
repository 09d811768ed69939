//! This module defines the core abstraction for implicit linear operators.
//!
//! The eigensolver never needs the entries of the matrix it diagonalizes;
//! its only primitive is the matrix-vector product. That observation allows
//! the driver to accept any object that can perform this action, which is
//! essential here: the motivating operator is a neural-network Hessian whose
//! explicit representation (parameters × parameters) is intractable, and
//! which is only available as an autograd-backed Hessian-vector product.
//!
//! The contract is deliberately narrow: a declared dimensionality and one
//! `apply` operation on [`Tensor`] values. Operators own their evaluation
//! strategy, including precision and device staging; the driver only promises
//! to hand them tensors tagged with the configured [`crate::bridge::Precision`]
//! and [`crate::bridge::Placement`] and to read the result back through the
//! bridge.

use crate::bridge::Tensor;
use faer::{Mat, MatRef};

/// Declared dimensionality of an implicit operator.
///
/// Mirrors the two conventions callers use in practice: a bare size, or a
/// matrix shape whose leading dimension is taken as the operator's square
/// size. A leading dimension of zero is unusable and is rejected before any
/// solver work begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorShape {
    /// A single dimension; the operator is `Dim(n)` square.
    Dim(usize),
    /// A (rows, cols) pair; the first element is used as the square size.
    Matrix(usize, usize),
}

impl OperatorShape {
    /// The square size implied by the shape, or `None` if it is unusable.
    pub fn leading_dim(&self) -> Option<usize> {
        let n = match *self {
            OperatorShape::Dim(n) => n,
            OperatorShape::Matrix(rows, _) => rows,
        };
        (n > 0).then_some(n)
    }
}

/// A symmetric linear operator accessible only through its action on vectors.
///
/// Implementations must be square and symmetric; the restarted Lanczos
/// solver relies on symmetry and will silently produce wrong answers for
/// non-symmetric operators. The driver never mutates an operator, only
/// invokes `apply`, and issues applications strictly sequentially: no two
/// `apply` calls for the same computation overlap, so implementations may
/// hold non-reentrant state (computational graphs, staging buffers) across
/// calls.
pub trait ImplicitOperator {
    /// The operator's declared dimensionality.
    fn shape(&self) -> OperatorShape;

    /// Applies the operator to a vector once.
    ///
    /// The input tensor carries the precision and placement the computation
    /// was configured with. The output must have the same length as the
    /// input. Any error returned here aborts the whole eigenpair computation;
    /// the driver does not retry.
    fn apply(&self, input: &Tensor) -> anyhow::Result<Tensor>;
}

/// An explicit in-memory symmetric matrix, the verification workhorse.
///
/// This variant exists for testing and for problems small enough to
/// materialize; the interesting operators are matrix-free.
pub struct DenseOperator {
    matrix: Mat<f64>,
}

impl DenseOperator {
    /// Wraps a square symmetric matrix.
    ///
    /// # Panics
    ///
    /// Panics if the matrix is not square. Symmetry is the caller's
    /// responsibility and is not verified element-wise.
    pub fn new(matrix: Mat<f64>) -> Self {
        assert_eq!(
            matrix.nrows(),
            matrix.ncols(),
            "DenseOperator requires a square matrix, got {}x{}.",
            matrix.nrows(),
            matrix.ncols(),
        );
        Self { matrix }
    }

    /// Builds the operator from a diagonal, a convenient way to construct
    /// problems with a known spectrum.
    pub fn from_diagonal(diag: &[f64]) -> Self {
        let n = diag.len();
        Self::new(Mat::from_fn(n, n, |i, j| if i == j { diag[i] } else { 0.0 }))
    }

    /// A view of the wrapped matrix.
    pub fn matrix(&self) -> MatRef<'_, f64> {
        self.matrix.as_ref()
    }
}

impl ImplicitOperator for DenseOperator {
    fn shape(&self) -> OperatorShape {
        OperatorShape::Matrix(self.matrix.nrows(), self.matrix.ncols())
    }

    fn apply(&self, input: &Tensor) -> anyhow::Result<Tensor> {
        let x = input.to_f64_vec();
        anyhow::ensure!(
            x.len() == self.matrix.ncols(),
            "dense operator of size {} applied to vector of length {}",
            self.matrix.ncols(),
            x.len(),
        );
        let x_mat = Mat::from_fn(x.len(), 1, |i, _| x[i]);
        let y = &self.matrix * &x_mat;
        let out: Vec<f64> = (0..y.nrows()).map(|i| y[(i, 0)]).collect();
        // Preserve the caller's precision and placement tags on the result.
        Ok(Tensor::from_f64_with(
            &out,
            input.precision(),
            input.placement(),
        ))
    }
}

/// A matrix-free operator defined by a closure.
///
/// This is the seam where a Hessian-vector product plugs in: autograd code
/// computes `H·v` however it likes, and this wrapper only carries the size
/// and forwards the buffer. The closure works on widened `f64` values; the
/// wrapper restores the configured precision and placement on the way out.
pub struct MatVecOperator<F> {
    size: usize,
    matvec: F,
}

impl<F> MatVecOperator<F>
where
    F: Fn(&[f64]) -> anyhow::Result<Vec<f64>>,
{
    pub fn new(size: usize, matvec: F) -> Self {
        Self { size, matvec }
    }
}

impl<F> ImplicitOperator for MatVecOperator<F>
where
    F: Fn(&[f64]) -> anyhow::Result<Vec<f64>>,
{
    fn shape(&self) -> OperatorShape {
        OperatorShape::Dim(self.size)
    }

    fn apply(&self, input: &Tensor) -> anyhow::Result<Tensor> {
        let x = input.to_f64_vec();
        let out = (self.matvec)(&x)?;
        Ok(Tensor::from_f64_with(
            &out,
            input.precision(),
            input.placement(),
        ))
    }
}

// Unit tests to verify the operator abstraction and its concrete variants.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{Placement, Precision};
    use faer::mat;

    #[test]
    fn test_leading_dim_resolution() {
        assert_eq!(OperatorShape::Dim(5).leading_dim(), Some(5));
        assert_eq!(OperatorShape::Matrix(7, 7).leading_dim(), Some(7));
        assert_eq!(OperatorShape::Dim(0).leading_dim(), None);
        assert_eq!(OperatorShape::Matrix(0, 3).leading_dim(), None);
    }

    #[test]
    fn test_dense_operator_matches_direct_product() {
        let matrix: Mat<f64> = mat![[2.0, -1.0, 0.0], [-1.0, 2.0, -1.0], [0.0, -1.0, 2.0]];
        let op = DenseOperator::new(matrix.clone());

        let x = Tensor::from_f64(vec![1.0, 2.0, 3.0]);
        let y = op.apply(&x).unwrap();

        let x_mat = mat![[1.0], [2.0], [3.0]];
        let expected = &matrix * &x_mat;
        let y_vals = y.to_f64_vec();
        for i in 0..3 {
            assert_eq!(y_vals[i], expected[(i, 0)]);
        }
    }

    #[test]
    fn test_dense_operator_preserves_tensor_tags() {
        let op = DenseOperator::from_diagonal(&[1.0, 2.0]);
        let x = Tensor::from_f64_with(&[1.0, 1.0], Precision::Half, Placement::Accelerator);
        let y = op.apply(&x).unwrap();
        assert_eq!(y.precision(), Precision::Half);
        assert_eq!(y.placement(), Placement::Accelerator);
    }

    #[test]
    fn test_dense_operator_rejects_bad_length() {
        let op = DenseOperator::from_diagonal(&[1.0, 2.0]);
        let x = Tensor::from_f64(vec![1.0, 2.0, 3.0]);
        assert!(op.apply(&x).is_err());
    }

    #[test]
    fn test_matvec_operator_forwards_closure() {
        let op = MatVecOperator::new(3, |x: &[f64]| Ok(x.iter().map(|v| 3.0 * v).collect()));
        assert_eq!(op.shape(), OperatorShape::Dim(3));
        let y = op.apply(&Tensor::from_f64(vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(y.to_f64_vec(), vec![3.0, 6.0, 9.0]);
    }

    #[test]
    #[should_panic(expected = "DenseOperator requires a square matrix")]
    fn test_dense_operator_rejects_non_square() {
        let matrix: Mat<f64> = Mat::zeros(2, 3);
        DenseOperator::new(matrix);
    }
}
