//! Abs-max observers
//!
//! Parallel max |x| reductions over a whole tensor or over each slice along
//! a quantization axis. Floating max is commutative and associative, so the
//! result does not depend on how rayon splits the work.

use crate::error::{Error, Result};
use crate::tensor::Element;
use ndarray::{Array1, ArrayViewD, Axis};
use rayon::prelude::*;

/// Maximum absolute value over every element of `x`
///
/// Returns zero for an empty or all-zero tensor. NaN elements are ignored.
pub fn find_abs_max<T: Element>(x: ArrayViewD<'_, T>) -> T {
    x.into_par_iter()
        .map(|v| v.abs())
        .reduce(T::zero, |a, b| a.max(b))
}

/// Maximum absolute value of each slice along `quant_axis`
///
/// Entry `c` of the result is the max |x| over all elements whose
/// coordinate along `quant_axis` equals `c`.
pub fn find_channel_abs_max<T: Element>(
    x: ArrayViewD<'_, T>,
    quant_axis: usize,
) -> Result<Array1<T>> {
    if quant_axis >= x.ndim() {
        return Err(Error::InvalidAxis {
            axis: quant_axis as i64,
            rank: x.ndim(),
        });
    }

    let maxes: Vec<T> = x
        .axis_iter(Axis(quant_axis))
        .into_par_iter()
        .map(|channel| channel.fold(T::zero(), |m, v| m.max(v.abs())))
        .collect();

    Ok(Array1::from(maxes))
}
