//! Dequantize transforms
//!
//! Maps values on the quantized grid back to the original range:
//! `out = in * scale / max_range`, with `max_range = bin_cnt`. Rounding in
//! the forward pass is lossy, so this recovers the grid point, not the
//! original value.

use super::params::{ensure_channel_scale, ensure_same_shape};
use crate::error::Result;
use crate::tensor::Element;
use ndarray::{ArrayView1, ArrayViewD, ArrayViewMutD, Axis, Zip};
use rayon::prelude::*;

/// Per-tensor dequantization with a single scale
pub fn dequantize<T: Element>(
    x: ArrayViewD<'_, T>,
    scale: T,
    max_range: T,
    mut out: ArrayViewMutD<'_, T>,
) -> Result<()> {
    ensure_same_shape(x.shape(), out.shape())?;
    Zip::from(&mut out)
        .and(&x)
        .par_for_each(|o, &v| *o = v * scale / max_range);
    Ok(())
}

/// Per-channel dequantization: element `i` uses `scales[c]` where `c` is its
/// coordinate along `quant_axis`
///
/// Fails without touching `out` when `scales.len() != x.shape()[quant_axis]`.
pub fn channel_dequantize<T: Element>(
    x: ArrayViewD<'_, T>,
    scales: ArrayView1<'_, T>,
    max_range: T,
    quant_axis: usize,
    mut out: ArrayViewMutD<'_, T>,
) -> Result<()> {
    ensure_channel_scale(x.shape(), quant_axis, scales.len())?;
    ensure_same_shape(x.shape(), out.shape())?;

    let scales: Vec<T> = scales.to_vec();
    out.axis_iter_mut(Axis(quant_axis))
        .into_par_iter()
        .zip(x.axis_iter(Axis(quant_axis)).into_par_iter())
        .zip(scales.par_iter())
        .for_each(|((mut out_channel, x_channel), &s)| {
            Zip::from(&mut out_channel)
                .and(&x_channel)
                .for_each(|o, &v| *o = v * s / max_range);
        });
    Ok(())
}
