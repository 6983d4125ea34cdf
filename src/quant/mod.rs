//! Linear fake quantization
//!
//! Simulates signed `bit_length`-bit symmetric quantization in floating
//! point:
//! - Abs-max observers, per tensor and per channel
//! - Moving-average scale tracking for training
//! - Quantize (clip, scale, round, rescale) and dequantize transforms
//! - `QuantizeLinear` / `DequantizeLinear` operators that choose among them
//! - Error analysis of a reconstruction

mod abs_max;
mod dequantize;
mod dequantize_linear;
mod error_analysis;
mod fake_quantize;
mod moving_average;
mod params;
mod quantize_linear;

pub use abs_max::{find_abs_max, find_channel_abs_max};
pub use dequantize::{channel_dequantize, dequantize};
pub use dequantize_linear::DequantizeLinear;
pub use error_analysis::{
    analyze_error, error_within_bounds, quantization_step, theoretical_max_error,
    theoretical_sqnr, QuantErrorStats,
};
pub use fake_quantize::{
    channel_clip_and_fake_quant, clamp_scale, clip_and_fake_quant, fake_quant_value, SCALE_EPSILON,
};
pub use moving_average::{
    find_moving_average_abs_max, steady_state_weight, MovingAverageState, MovingAverageUpdate,
};
pub use params::{
    bin_cnt, DequantizeLinearAttrs, QuantAxis, QuantizeLinearAttrs, RoundType, MAX_BIT_LENGTH,
    MIN_BIT_LENGTH,
};
pub use quantize_linear::{QuantizeLinear, QuantizeOutputs};
