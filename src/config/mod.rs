//! Declarative YAML configuration
//!
//! Operator attributes for a quantize/dequantize pair, loaded from YAML.
//!
//! # Example
//!
//! ```yaml
//! quantize:
//!   bit_length: 8
//!   round_type: ties_to_even   # or the attribute code 0 / 1
//!   quant_axis: -1             # negative = whole tensor
//!   is_test: false
//!   only_observer: false
//!   moving_rate: 0.9
//!
//! dequantize:
//!   bit_length: 8
//!   quant_axis: -1
//! ```

mod builder;
mod load;
mod schema;
mod validate;


pub use builder::{build_dequantize, build_operators, build_quantize};
pub use load::{load_config, parse_config, to_yaml};
pub use schema::QuantSpec;
pub use validate::{validate_config, ValidationError};
