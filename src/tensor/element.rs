//! Element types and their runtime precision tags

use super::DenseTensor;
use half::{bf16, f16};
use ndarray::ArrayD;
use num_traits::{Float, NumCast};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime precision tag of a tensor's elements
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// IEEE 754 half precision
    F16,
    /// Brain float (storage and casting only)
    BF16,
    /// IEEE 754 single precision
    F32,
    /// IEEE 754 double precision
    F64,
}

impl DType {
    /// Size of one element in bytes
    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::F16 | Self::BF16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Whether the quantize/dequantize kernels accept this precision
    pub fn is_quantizable(self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F16 => "float16",
            Self::BF16 => "bfloat16",
            Self::F32 => "float32",
            Self::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Floating-point element stored in a [`DenseTensor`]
///
/// All kernels are generic over this trait; runtime dispatch selects the
/// concrete type from a [`DType`].
pub trait Element:
    Float + Default + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Runtime tag for this element type
    const DTYPE: DType;

    /// Wrap an owned array into the matching tensor variant
    fn into_tensor(array: ArrayD<Self>) -> DenseTensor;

    /// Borrow the array if the tensor holds this element type
    fn array(tensor: &DenseTensor) -> Option<&ArrayD<Self>>;

    /// Numeric conversion from `f64`
    fn from_f64_lossy(value: f64) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::nan)
    }

    /// Numeric conversion to `f64`
    fn to_f64_lossy(self) -> f64 {
        self.to_f64().unwrap_or(f64::NAN)
    }

    /// Numeric conversion from another element type
    fn cast_from<E: Element>(value: E) -> Self {
        <Self as NumCast>::from(value).unwrap_or_else(Self::nan)
    }
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const DTYPE: DType = DType::$variant;

            fn into_tensor(array: ArrayD<Self>) -> DenseTensor {
                DenseTensor::$variant(array)
            }

            fn array(tensor: &DenseTensor) -> Option<&ArrayD<Self>> {
                match tensor {
                    DenseTensor::$variant(array) => Some(array),
                    _ => None,
                }
            }
        }
    };
}

impl_element!(f16, F16);
impl_element!(bf16, BF16);
impl_element!(f32, F32);
impl_element!(f64, F64);
