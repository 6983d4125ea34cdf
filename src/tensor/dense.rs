//! Runtime-typed dense tensor

use super::{DType, Element};
use crate::error::{Error, Result};
use half::{bf16, f16};
use ndarray::{ArrayD, ArrayViewD, IxDyn};

/// Dense row-major tensor whose element type is known only at runtime
#[derive(Clone, Debug, PartialEq)]
pub enum DenseTensor {
    F16(ArrayD<f16>),
    BF16(ArrayD<bf16>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

impl DenseTensor {
    /// Wrap an owned array
    pub fn from_array<T: Element>(array: ArrayD<T>) -> Self {
        T::into_tensor(array)
    }

    /// Create a tensor from a shape and row-major data
    pub fn from_shape_vec<T: Element>(shape: &[usize], data: Vec<T>) -> Result<Self> {
        let len = data.len();
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| Error::ShapeMismatch {
            expected: shape.to_vec(),
            got: vec![len],
        })?;
        Ok(T::into_tensor(array))
    }

    /// Create a one-element tensor of shape `[1]`
    pub fn scalar<T: Element>(value: T) -> Self {
        T::into_tensor(ArrayD::from_elem(IxDyn(&[1]), value))
    }

    /// Element precision
    pub fn dtype(&self) -> DType {
        match self {
            Self::F16(_) => DType::F16,
            Self::BF16(_) => DType::BF16,
            Self::F32(_) => DType::F32,
            Self::F64(_) => DType::F64,
        }
    }

    /// Tensor shape
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::F16(a) => a.shape(),
            Self::BF16(a) => a.shape(),
            Self::F32(a) => a.shape(),
            Self::F64(a) => a.shape(),
        }
    }

    /// Number of elements
    pub fn numel(&self) -> usize {
        self.shape().iter().product()
    }

    /// Borrow the underlying array if it holds `T`
    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::array(self)
    }

    /// Borrow a view of the underlying array, failing on a precision mismatch
    pub fn view<T: Element>(&self) -> Result<ArrayViewD<'_, T>> {
        T::array(self)
            .map(ArrayD::view)
            .ok_or(Error::DTypeMismatch {
                expected: T::DTYPE,
                got: self.dtype(),
            })
    }

    /// Numeric cast of every element to `T` (a value conversion, never a
    /// reinterpretation of the bits)
    pub fn cast<T: Element>(&self) -> ArrayD<T> {
        match self {
            Self::F16(a) => cast_array(a),
            Self::BF16(a) => cast_array(a),
            Self::F32(a) => cast_array(a),
            Self::F64(a) => cast_array(a),
        }
    }

    /// Numeric cast to the precision named by `dtype`
    pub fn cast_to(&self, dtype: DType) -> Self {
        match dtype {
            DType::F16 => Self::F16(self.cast()),
            DType::BF16 => Self::BF16(self.cast()),
            DType::F32 => Self::F32(self.cast()),
            DType::F64 => Self::F64(self.cast()),
        }
    }

    /// Elements converted to `f64`, row-major
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.cast::<f64>().iter().copied().collect()
    }
}

fn cast_array<S: Element, D: Element>(array: &ArrayD<S>) -> ArrayD<D> {
    array.mapv(D::cast_from)
}
