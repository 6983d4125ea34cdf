//! YAML schema for quantize/dequantize operator configuration

use crate::quant::{DequantizeLinearAttrs, QuantizeLinearAttrs};
use serde::{Deserialize, Serialize};

/// Attributes of a quantize/dequantize operator pair
///
/// Both sections are optional in YAML; a missing section takes the operator
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantSpec {
    /// Quantize operator attributes
    #[serde(default)]
    pub quantize: QuantizeLinearAttrs,

    /// Dequantize operator attributes
    #[serde(default)]
    pub dequantize: DequantizeLinearAttrs,
}
