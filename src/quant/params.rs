//! Quantization parameters: bit width, rounding policy, quantization axis,
//! and the operator attributes built from them.

use crate::error::{Error, Result};
use crate::tensor::Element;
use num_traits::Float;
use serde::{Deserialize, Deserializer, Serialize};

/// Smallest supported bit width (`bin_cnt = 1`)
pub const MIN_BIT_LENGTH: u32 = 2;
/// Largest bit width whose grid fits in an `i32`
pub const MAX_BIT_LENGTH: u32 = 31;

/// Positive half-width of the signed integer grid for `bit_length` bits
///
/// `bin_cnt = 2^(bit_length-1) - 1`; the full grid is `[-bin_cnt-1, bin_cnt]`.
pub fn bin_cnt(bit_length: u32) -> Result<i32> {
    if !(MIN_BIT_LENGTH..=MAX_BIT_LENGTH).contains(&bit_length) {
        return Err(Error::InvalidParameter(format!(
            "bit_length must be in [{MIN_BIT_LENGTH}, {MAX_BIT_LENGTH}], got {bit_length}"
        )));
    }
    Ok(((1i64 << (bit_length - 1)) - 1) as i32)
}

/// Rounding policy applied when snapping to the integer grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    /// Round half to even (banker's rounding), attribute code 0
    #[default]
    TiesToEven,
    /// Round half away from zero, attribute code 1
    TiesAwayFromZero,
}

impl RoundType {
    /// Integer attribute code
    pub fn code(self) -> i32 {
        match self {
            Self::TiesToEven => 0,
            Self::TiesAwayFromZero => 1,
        }
    }

    /// Round `v` to an integral value under this policy
    #[inline]
    pub fn round<T: Float>(self, v: T) -> T {
        match self {
            Self::TiesToEven => round_half_to_even(v),
            Self::TiesAwayFromZero => v.round(),
        }
    }
}

impl TryFrom<i32> for RoundType {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::TiesToEven),
            1 => Ok(Self::TiesAwayFromZero),
            other => Err(Error::InvalidParameter(format!(
                "round_type must be 0 (ties to even) or 1 (ties away from zero), got {other}"
            ))),
        }
    }
}

/// Accept either the integer attribute code or the snake_case name.
impl<'de> Deserialize<'de> for RoundType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum CodeOrName {
            Code(i32),
            Name(String),
        }

        match CodeOrName::deserialize(deserializer)? {
            CodeOrName::Code(code) => RoundType::try_from(code).map_err(serde::de::Error::custom),
            CodeOrName::Name(name) => match name.to_lowercase().as_str() {
                "ties_to_even" => Ok(Self::TiesToEven),
                "ties_away_from_zero" => Ok(Self::TiesAwayFromZero),
                other => Err(serde::de::Error::custom(format!(
                    "expected 'ties_to_even' or 'ties_away_from_zero', got '{other}'"
                ))),
            },
        }
    }
}

#[inline]
fn round_half_to_even<T: Float>(v: T) -> T {
    let one = T::one();
    let two = one + one;
    let half = one / two;

    let lower = v.floor();
    let diff = v - lower;
    if diff < half {
        lower
    } else if diff > half {
        lower + one
    } else if lower % two == T::zero() {
        lower
    } else {
        lower + one
    }
}

/// Scale granularity resolved against a concrete tensor rank
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuantAxis {
    /// One scale for the whole tensor
    PerTensor,
    /// One scale per index along this axis
    Channel(usize),
}

impl QuantAxis {
    /// Attribute value meaning "whole tensor"
    pub const PER_TENSOR_ATTR: i64 = -1;

    /// Resolve an integer attribute: any negative value selects the whole
    /// tensor, otherwise the axis must be below `rank`.
    pub fn from_attr(axis: i64, rank: usize) -> Result<Self> {
        if axis < 0 {
            return Ok(Self::PerTensor);
        }
        let index = usize::try_from(axis).map_err(|_| Error::InvalidAxis { axis, rank })?;
        if index >= rank {
            return Err(Error::InvalidAxis { axis, rank });
        }
        Ok(Self::Channel(index))
    }

    /// Integer attribute value
    pub fn to_attr(self) -> i64 {
        match self {
            Self::PerTensor => Self::PER_TENSOR_ATTR,
            Self::Channel(axis) => axis as i64,
        }
    }

    pub fn is_per_tensor(self) -> bool {
        self == Self::PerTensor
    }
}

fn default_bit_length() -> u32 {
    8
}

fn default_quant_axis() -> i64 {
    QuantAxis::PER_TENSOR_ATTR
}

fn default_moving_rate() -> f32 {
    0.9
}

/// Attributes of the quantize call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantizeLinearAttrs {
    /// Bit width of the simulated integer grid
    #[serde(default = "default_bit_length")]
    pub bit_length: u32,
    /// Rounding policy
    #[serde(default)]
    pub round_type: RoundType,
    /// Quantization axis, negative for the whole tensor
    #[serde(default = "default_quant_axis")]
    pub quant_axis: i64,
    /// Inference mode: use the provided scale instead of observing one
    #[serde(default)]
    pub is_test: bool,
    /// Collect statistics but pass the input through unchanged
    #[serde(default)]
    pub only_observer: bool,
    /// Decay of the moving-average tracker, in (0, 1)
    #[serde(default = "default_moving_rate")]
    pub moving_rate: f32,
}

impl Default for QuantizeLinearAttrs {
    fn default() -> Self {
        Self {
            bit_length: default_bit_length(),
            round_type: RoundType::default(),
            quant_axis: default_quant_axis(),
            is_test: false,
            only_observer: false,
            moving_rate: default_moving_rate(),
        }
    }
}

impl QuantizeLinearAttrs {
    /// Check bit width and moving rate
    pub fn validate(&self) -> Result<()> {
        bin_cnt(self.bit_length)?;
        if !(self.moving_rate > 0.0 && self.moving_rate < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "moving_rate must be in (0, 1), got {}",
                self.moving_rate
            )));
        }
        Ok(())
    }
}

/// Attributes of the dequantize call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DequantizeLinearAttrs {
    #[serde(default = "default_bit_length")]
    pub bit_length: u32,
    #[serde(default = "default_quant_axis")]
    pub quant_axis: i64,
    #[serde(default)]
    pub only_observer: bool,
}

impl Default for DequantizeLinearAttrs {
    fn default() -> Self {
        Self {
            bit_length: default_bit_length(),
            quant_axis: default_quant_axis(),
            only_observer: false,
        }
    }
}

impl DequantizeLinearAttrs {
    /// Check bit width
    pub fn validate(&self) -> Result<()> {
        bin_cnt(self.bit_length).map(|_| ())
    }
}

pub(crate) fn ensure_quantizable<T: Element>(op: &'static str) -> Result<()> {
    if T::DTYPE.is_quantizable() {
        Ok(())
    } else {
        Err(Error::UnsupportedDType {
            op,
            dtype: T::DTYPE,
        })
    }
}

/// `bin_cnt` in the element precision; fails when the grid does not fit
/// (f16 tops out at 65504, so 17 bits and wider overflow to infinity)
pub(crate) fn grid_bound<T: Element>(bin_cnt: i32) -> Result<T> {
    let bound = T::from_f64_lossy(f64::from(bin_cnt));
    if bound.is_finite() {
        Ok(bound)
    } else {
        Err(Error::InvalidParameter(format!(
            "bin_cnt {bin_cnt} is not representable in {}",
            T::DTYPE
        )))
    }
}

/// Operator-level check of the grid against the element precision, run
/// before any output is written.
pub(crate) fn ensure_grid_fits<T: Element>(bit_length: u32, bin_cnt: i32) -> Result<()> {
    grid_bound::<T>(bin_cnt).map(|_| ()).map_err(|_| {
        Error::InvalidParameter(format!(
            "bit_length {bit_length} is too wide for {}: bin_cnt {bin_cnt} overflows",
            T::DTYPE
        ))
    })
}

pub(crate) fn ensure_same_shape(expected: &[usize], got: &[usize]) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        })
    }
}

/// Per-channel precondition: one scale per index along `axis`.
pub(crate) fn ensure_channel_scale(shape: &[usize], axis: usize, scale_len: usize) -> Result<()> {
    let expected = *shape.get(axis).ok_or(Error::InvalidAxis {
        axis: axis as i64,
        rank: shape.len(),
    })?;
    if scale_len != expected {
        return Err(Error::ChannelScaleMismatch {
            axis,
            expected,
            got: scale_len,
        });
    }
    Ok(())
}

/// Extract the single value of a per-tensor scale.
pub(crate) fn scalar_scale<T: Element>(scale: &ndarray::ArrayViewD<'_, T>) -> Result<T> {
    if scale.len() != 1 {
        return Err(Error::ScaleSizeMismatch {
            expected: 1,
            got: scale.len(),
        });
    }
    scale.iter().next().copied().ok_or(Error::ScaleSizeMismatch {
        expected: 1,
        got: 0,
    })
}
