//! Error types for Cuantizar

use crate::tensor::DType;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Scale size mismatch on quant axis {axis}: expected {expected} values \
         (dimension of X along the axis), got {got}"
    )]
    ChannelScaleMismatch {
        axis: usize,
        expected: usize,
        got: usize,
    },

    #[error("Scale size mismatch for per-tensor quantization: expected {expected}, got {got}")]
    ScaleSizeMismatch { expected: usize, got: usize },

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Invalid quant axis {axis} for tensor of rank {rank}")]
    InvalidAxis { axis: i64, rank: usize },

    #[error("In {op}, data type {dtype} for scale/output is not supported")]
    UnsupportedDType { op: &'static str, dtype: DType },

    #[error("DType mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    #[error("Missing input: {0}")]
    MissingInput(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
