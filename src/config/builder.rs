//! Build quantization operators from configuration

use super::schema::QuantSpec;
use crate::error::Result;
use crate::quant::{DequantizeLinear, QuantizeLinear};

/// Build the quantize operator
pub fn build_quantize(spec: &QuantSpec) -> Result<QuantizeLinear> {
    QuantizeLinear::new(spec.quantize.clone())
}

/// Build the dequantize operator
pub fn build_dequantize(spec: &QuantSpec) -> Result<DequantizeLinear> {
    DequantizeLinear::new(spec.dequantize.clone())
}

/// Build both operators of the pair
pub fn build_operators(spec: &QuantSpec) -> Result<(QuantizeLinear, DequantizeLinear)> {
    Ok((build_quantize(spec)?, build_dequantize(spec)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default_pair() {
        let (quant, dequant) = build_operators(&QuantSpec::default()).unwrap();
        assert_eq!(quant.bin_cnt(), 127);
        assert_eq!(dequant.max_range(), 127);
    }

    #[test]
    fn test_build_propagates_attr_errors() {
        let mut spec = QuantSpec::default();
        spec.quantize.moving_rate = 2.0;
        assert!(build_quantize(&spec).is_err());
        assert!(build_dequantize(&spec).is_ok());
    }
}
