//! Precision and placement bridge between the solver's host arrays and the
//! operator's tensor representation.
//!
//! The restarted Lanczos driver works on plain `f64` slices in host memory.
//! Implicit operators (Hessian-vector products in particular) consume and
//! produce [`Tensor`] values, which carry two orthogonal tags: a numeric
//! [`Precision`] and a compute [`Placement`]. Every solver iteration crosses
//! this boundary twice, once per direction, so the conversions here must be
//! cheap and must lose information only where the configuration explicitly
//! asks for it (half precision truncates mantissa bits by design).
//!
//! The bridge is a stateless conversion utility: it knows nothing about the
//! solver or about the operator's mathematics. The four conversion paths are
//! spelled out as an explicit match over `(Precision, Placement)` rather than
//! inspected at runtime, so each path is individually visible and testable.

use half::f16;

/// Numeric precision of a tensor's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 64-bit floating point, matching the solver's host arrays.
    #[default]
    Full,
    /// 16-bit floating point (`half::f16`). Trades mantissa bits for memory
    /// and throughput on operators that evaluate in reduced precision.
    Half,
}

/// Compute placement of a tensor's storage.
///
/// The crate's own reference operators evaluate on the host; the tag is
/// carried through every conversion so that an accelerator-backed operator
/// implementation can honor it when staging its own buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    #[default]
    Host,
    Accelerator,
}

/// Storage backing a [`Tensor`], one variant per precision.
#[derive(Debug, Clone, PartialEq)]
enum TensorData {
    F64(Vec<f64>),
    F16(Vec<f16>),
}

/// A one-dimensional numeric buffer in the operator's native representation.
///
/// Iteration vectors exist transiently: the solver creates one host array per
/// matrix-vector product request, the bridge converts it to a `Tensor`, the
/// operator consumes it, and the result is converted back and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: TensorData,
    placement: Placement,
}

impl Tensor {
    /// Builds a full-precision, host-resident tensor from `f64` values.
    pub fn from_f64(values: Vec<f64>) -> Self {
        Self {
            data: TensorData::F64(values),
            placement: Placement::Host,
        }
    }

    /// Builds a half-precision, host-resident tensor, truncating each value
    /// to the nearest representable `f16`.
    pub fn from_f64_half(values: &[f64]) -> Self {
        Self {
            data: TensorData::F16(values.iter().map(|&v| f16::from_f64(v)).collect()),
            placement: Placement::Host,
        }
    }

    /// Number of elements in the buffer.
    pub fn len(&self) -> usize {
        match &self.data {
            TensorData::F64(v) => v.len(),
            TensorData::F16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The precision of the underlying storage.
    pub fn precision(&self) -> Precision {
        match &self.data {
            TensorData::F64(_) => Precision::Full,
            TensorData::F16(_) => Precision::Half,
        }
    }

    /// The declared compute placement of the buffer.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Retags the tensor as residing on the given placement.
    ///
    /// For the host-backed storage used here this is a tag move, not a copy;
    /// operators backed by real accelerator memory perform their own staging
    /// keyed off this tag.
    pub fn to_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Widens the buffer to an `f64` vector regardless of storage precision.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            TensorData::F64(v) => v.clone(),
            TensorData::F16(v) => v.iter().map(|&h| f64::from(h)).collect(),
        }
    }

    /// Maps the buffer element-wise in `f64`, producing a tensor with the
    /// same precision and placement as `self`. This is the building block the
    /// crate's reference operators use to preserve the caller's dtype.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        let mapped = match &self.data {
            TensorData::F64(v) => TensorData::F64(v.iter().map(|&x| f(x)).collect()),
            TensorData::F16(v) => {
                TensorData::F16(v.iter().map(|&x| f16::from_f64(f(f64::from(x)))).collect())
            }
        };
        Self {
            data: mapped,
            placement: self.placement,
        }
    }

    /// Builds a tensor from `f64` values with the given precision and
    /// placement tags.
    pub fn from_f64_with(values: &[f64], precision: Precision, placement: Placement) -> Self {
        let tensor = match precision {
            Precision::Full => Self::from_f64(values.to_vec()),
            Precision::Half => Self::from_f64_half(values),
        };
        tensor.to_placement(placement)
    }
}

/// Converts a solver-side host array into the operator's tensor form.
///
/// Precision is applied before placement; the order is an internal detail and
/// is not observable outside this module.
pub fn to_operator_form(values: &[f64], precision: Precision, placement: Placement) -> Tensor {
    match (precision, placement) {
        (Precision::Full, Placement::Host) => Tensor::from_f64(values.to_vec()),
        (Precision::Full, Placement::Accelerator) => {
            Tensor::from_f64(values.to_vec()).to_placement(Placement::Accelerator)
        }
        (Precision::Half, Placement::Host) => Tensor::from_f64_half(values),
        (Precision::Half, Placement::Accelerator) => {
            Tensor::from_f64_half(values).to_placement(Placement::Accelerator)
        }
    }
}

/// Converts an operator-side tensor back into a solver-side host array.
///
/// If `precision` is [`Precision::Half`], the values are first truncated to
/// `f16`, matching the configured operator dtype even when an operator
/// returned a wider buffer.
pub fn to_host_form(tensor: &Tensor, precision: Precision) -> Vec<f64> {
    match precision {
        Precision::Full => tensor.to_f64_vec(),
        Precision::Half => tensor
            .to_f64_vec()
            .into_iter()
            .map(|v| f64::from(f16::from_f64(v)))
            .collect(),
    }
}

/// Applies the configured precision to a host array without changing its
/// representation. Used on the initial vector so it sees the same truncation
/// as every iteration vector.
pub fn apply_precision(values: &mut [f64], precision: Precision) {
    if precision == Precision::Half {
        for v in values.iter_mut() {
            *v = f64::from(f16::from_f64(*v));
        }
    }
}
