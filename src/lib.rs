//! # Cuantizar: Linear Fake-Quantization Engine
//!
//! Cuantizar simulates signed integer quantization in floating point: values
//! are clipped to a scale, snapped to a `bit_length`-bit grid and mapped back,
//! so downstream computation sees quantization error without leaving float.
//!
//! ## Architecture
//!
//! - **tensor**: Runtime-typed dense tensors (f16, bf16, f32, f64)
//! - **quant**: Abs-max observers, moving-average scale tracking, quantize and
//!   dequantize transforms, and the `QuantizeLinear`/`DequantizeLinear`
//!   operators
//! - **config**: Declarative YAML configuration
//!
//! ## Example
//!
//! ```
//! use cuantizar::quant::{MovingAverageState, QuantizeLinear, QuantizeLinearAttrs};
//! use ndarray::{arr1, ArrayD, IxDyn};
//!
//! let op = QuantizeLinear::new(QuantizeLinearAttrs::default())?;
//! let x = arr1(&[0.5f32, -1.0, 2.0]).into_dyn();
//! let unused_scale = ArrayD::<f32>::zeros(IxDyn(&[1]));
//! let mut tracker = MovingAverageState::new();
//!
//! let (y, out_scale) = op.forward(x.view(), unused_scale.view(), Some(&mut tracker))?;
//! assert_eq!(y.shape(), x.shape());
//! assert_eq!(out_scale.map(|s| s[0]), Some(2.0));
//! # Ok::<(), cuantizar::Error>(())
//! ```

pub mod config;
pub mod quant;
pub mod tensor;

pub mod error;

// Re-export commonly used types
pub use error::{Error, Result};
pub use quant::{
    DequantizeLinear, DequantizeLinearAttrs, MovingAverageState, QuantAxis, QuantizeLinear,
    QuantizeLinearAttrs, RoundType,
};
pub use tensor::{DType, DenseTensor, Element};
