//! Numerical kernels underlying the public solver API.
//!
//! The only kernel at present is the thick-restart symmetric Lanczos
//! eigensolver in [`restarted`]. It is kept separate from the orchestration
//! layer ([`crate::solvers`]) so that the boundary the driver is built
//! around stays visible: the kernel consumes a host-array matrix-vector
//! callback and knows nothing about tensors, precision, or placement.

pub mod restarted;
