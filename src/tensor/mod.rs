//! Dense tensors and element precisions
//!
//! Kernels operate on `ndarray` views generic over [`Element`]; the
//! runtime-typed [`DenseTensor`] carries a closed set of precisions
//! (f16, bf16, f32, f64) for callers that only know the type at runtime.

mod dense;
mod element;

pub use dense::DenseTensor;
pub use element::{DType, Element};
