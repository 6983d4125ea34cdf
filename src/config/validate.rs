//! Configuration validation

use super::schema::QuantSpec;
use crate::quant::{MAX_BIT_LENGTH, MIN_BIT_LENGTH};

/// Validation error type
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid {section} bit_length: {bits} (must be in [2, 31])")]
    InvalidBitLength { section: &'static str, bits: u32 },

    #[error("Invalid moving_rate: {0} (must be in (0, 1))")]
    InvalidMovingRate(f32),

    #[error("bit_length mismatch: quantize uses {quantize}, dequantize uses {dequantize}")]
    BitLengthMismatch { quantize: u32, dequantize: u32 },
}

/// Validate a quantization specification
///
/// Checks:
/// - Bit widths are in the supported range
/// - The moving rate is strictly between 0 and 1
/// - Both operators share one integer grid
pub fn validate_config(spec: &QuantSpec) -> Result<(), ValidationError> {
    let bit_range = MIN_BIT_LENGTH..=MAX_BIT_LENGTH;

    if !bit_range.contains(&spec.quantize.bit_length) {
        return Err(ValidationError::InvalidBitLength {
            section: "quantize",
            bits: spec.quantize.bit_length,
        });
    }

    if !bit_range.contains(&spec.dequantize.bit_length) {
        return Err(ValidationError::InvalidBitLength {
            section: "dequantize",
            bits: spec.dequantize.bit_length,
        });
    }

    let rate = spec.quantize.moving_rate;
    if !(rate > 0.0 && rate < 1.0) {
        return Err(ValidationError::InvalidMovingRate(rate));
    }

    if spec.quantize.bit_length != spec.dequantize.bit_length {
        return Err(ValidationError::BitLengthMismatch {
            quantize: spec.quantize.bit_length,
            dequantize: spec.dequantize.bit_length,
        });
    }

    Ok(())
}
