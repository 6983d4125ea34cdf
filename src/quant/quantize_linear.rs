//! Quantize call: picks observer, tracker and transform per invocation
//!
//! | is_test | quant_axis | only_observer | action                                   |
//! |---------|------------|---------------|------------------------------------------|
//! | false   | whole      | false         | abs-max → moving average → quantize      |
//! | false   | whole      | true          | abs-max → moving average → copy          |
//! | true    | whole      | false         | quantize with the given scale            |
//! | true    | whole      | true          | copy                                     |
//! | false   | axis       | false         | channel abs-max → channel quantize       |
//! | false   | axis       | true          | channel abs-max → copy                   |
//! | true    | axis       | false         | channel quantize with the given scales   |
//! | true    | axis       | true          | copy                                     |
//!
//! Per-channel training uses the abs-max of the current call directly as the
//! scale; only per-tensor training smooths it with the moving average.

use super::abs_max::{find_abs_max, find_channel_abs_max};
use super::fake_quantize::{channel_clip_and_fake_quant, clip_and_fake_quant};
use super::moving_average::{find_moving_average_abs_max, MovingAverageState};
use super::params::{
    bin_cnt, ensure_grid_fits, ensure_quantizable, ensure_same_shape, scalar_scale, QuantAxis,
    QuantizeLinearAttrs,
};
use crate::error::{Error, Result};
use crate::tensor::{DType, DenseTensor, Element};
use half::f16;
use ndarray::{Array1, ArrayD, ArrayViewD, ArrayViewMutD};
use tracing::debug;

const OP_NAME: &str = "QuantizeLinear";

/// Statistics produced by a quantize call besides `Y`
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizeOutputs<T> {
    /// Observed scale: one entry per-tensor, one per channel per-channel.
    /// Present only in training mode.
    pub out_scale: Option<Array1<T>>,
    /// Updated `(accum, state)`; present only in per-tensor training mode.
    pub moving_average: Option<MovingAverageState<T>>,
}

impl<T> Default for QuantizeOutputs<T> {
    fn default() -> Self {
        Self {
            out_scale: None,
            moving_average: None,
        }
    }
}

/// Quantize operator configured with its attributes
#[derive(Clone, Debug)]
pub struct QuantizeLinear {
    attrs: QuantizeLinearAttrs,
    bin_cnt: i32,
}

impl QuantizeLinear {
    /// Validate the attributes and build the operator
    pub fn new(attrs: QuantizeLinearAttrs) -> Result<Self> {
        attrs.validate()?;
        let bin_cnt = bin_cnt(attrs.bit_length)?;
        Ok(Self { attrs, bin_cnt })
    }

    pub fn attrs(&self) -> &QuantizeLinearAttrs {
        &self.attrs
    }

    /// Positive half-width of the integer grid
    pub fn bin_cnt(&self) -> i32 {
        self.bin_cnt
    }

    /// Run one quantize call on borrowed buffers
    ///
    /// * `x` - input, read only
    /// * `scale` - fixed scale (one value, or one per channel); read only in
    ///   inference mode and ignored in training mode
    /// * `moving_average` - previous `(accum, state)`; required in per-tensor
    ///   training mode, ignored otherwise
    /// * `y` - output, same shape as `x`, fully overwritten
    ///
    /// All preconditions are checked before `y` is written.
    pub fn compute<T: Element>(
        &self,
        x: ArrayViewD<'_, T>,
        scale: ArrayViewD<'_, T>,
        moving_average: Option<&MovingAverageState<T>>,
        mut y: ArrayViewMutD<'_, T>,
    ) -> Result<QuantizeOutputs<T>> {
        ensure_quantizable::<T>(OP_NAME)?;
        ensure_grid_fits::<T>(self.attrs.bit_length, self.bin_cnt)?;
        ensure_same_shape(x.shape(), y.shape())?;

        let axis = QuantAxis::from_attr(self.attrs.quant_axis, x.ndim())?;
        let is_test = self.attrs.is_test;
        let only_observer = self.attrs.only_observer;
        let round_type = self.attrs.round_type;
        debug!(
            ?axis,
            is_test,
            only_observer,
            bit_length = self.attrs.bit_length,
            numel = x.len(),
            "quantize_linear dispatch"
        );

        match (axis, is_test) {
            (QuantAxis::PerTensor, false) => {
                let prev = moving_average.ok_or(Error::MissingInput("InAccum/InState"))?;
                let cur = find_abs_max(x.view());
                let update = find_moving_average_abs_max(prev, cur, self.attrs.moving_rate);
                debug!(
                    abs_max = cur.to_f64_lossy(),
                    scale = update.out_scale.to_f64_lossy(),
                    "observed per-tensor scale"
                );

                if only_observer {
                    y.assign(&x);
                } else {
                    clip_and_fake_quant(x, update.out_scale, self.bin_cnt, round_type, y)?;
                }
                Ok(QuantizeOutputs {
                    out_scale: Some(Array1::from_elem(1, update.out_scale)),
                    moving_average: Some(update.state),
                })
            }
            (QuantAxis::PerTensor, true) => {
                if only_observer {
                    y.assign(&x);
                } else {
                    let s = scalar_scale(&scale)?;
                    clip_and_fake_quant(x, s, self.bin_cnt, round_type, y)?;
                }
                Ok(QuantizeOutputs::default())
            }
            (QuantAxis::Channel(quant_axis), false) => {
                let out_scale = find_channel_abs_max(x.view(), quant_axis)?;
                debug!(
                    quant_axis,
                    channels = out_scale.len(),
                    "observed per-channel scales"
                );

                if only_observer {
                    y.assign(&x);
                } else {
                    channel_clip_and_fake_quant(
                        x,
                        out_scale.view(),
                        self.bin_cnt,
                        round_type,
                        quant_axis,
                        y,
                    )?;
                }
                Ok(QuantizeOutputs {
                    out_scale: Some(out_scale),
                    moving_average: None,
                })
            }
            (QuantAxis::Channel(quant_axis), true) => {
                if only_observer {
                    y.assign(&x);
                } else {
                    let scales: Array1<T> = scale.iter().copied().collect();
                    channel_clip_and_fake_quant(
                        x,
                        scales.view(),
                        self.bin_cnt,
                        round_type,
                        quant_axis,
                        y,
                    )?;
                }
                Ok(QuantizeOutputs::default())
            }
        }
    }

    /// Allocate `Y`, run the call, and store the new `(accum, state)` back
    /// into `moving_average` when the call produced one
    ///
    /// Returns `Y` and the observed scale (training mode only).
    pub fn forward<T: Element>(
        &self,
        x: ArrayViewD<'_, T>,
        scale: ArrayViewD<'_, T>,
        moving_average: Option<&mut MovingAverageState<T>>,
    ) -> Result<(ArrayD<T>, Option<Array1<T>>)> {
        let mut y = ArrayD::zeros(x.raw_dim());
        let outputs = self.compute(x, scale, moving_average.as_deref(), y.view_mut())?;
        if let (Some(slot), Some(updated)) = (moving_average, outputs.moving_average) {
            *slot = updated;
        }
        Ok((y, outputs.out_scale))
    }

    /// Runtime-typed entry point
    ///
    /// `x` and `scale` must share a precision. The tracker is stored in `f64`
    /// and converted to the tensor precision for the duration of the call.
    pub fn forward_dense(
        &self,
        x: &DenseTensor,
        scale: &DenseTensor,
        moving_average: Option<&mut MovingAverageState<f64>>,
    ) -> Result<(DenseTensor, Option<DenseTensor>)> {
        match x.dtype() {
            DType::F64 => self.forward_dense_impl::<f64>(x, scale, moving_average),
            DType::F32 => self.forward_dense_impl::<f32>(x, scale, moving_average),
            DType::F16 => self.forward_dense_impl::<f16>(x, scale, moving_average),
            dtype => Err(Error::UnsupportedDType {
                op: OP_NAME,
                dtype,
            }),
        }
    }

    fn forward_dense_impl<T: Element>(
        &self,
        x: &DenseTensor,
        scale: &DenseTensor,
        moving_average: Option<&mut MovingAverageState<f64>>,
    ) -> Result<(DenseTensor, Option<DenseTensor>)> {
        let x_view = x.view::<T>()?;
        let scale_view = scale.view::<T>()?;

        let prev = moving_average
            .as_deref()
            .map(MovingAverageState::cast::<T>);
        let mut y = ArrayD::zeros(x_view.raw_dim());
        let outputs = self.compute(x_view, scale_view, prev.as_ref(), y.view_mut())?;
        // write back only when the call produced new accumulators
        if let (Some(slot), Some(updated)) = (moving_average, outputs.moving_average) {
            *slot = updated.cast();
        }

        Ok((
            T::into_tensor(y),
            outputs.out_scale.map(|s| T::into_tensor(s.into_dyn())),
        ))
    }
}
