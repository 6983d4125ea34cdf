//! Dequantize call
//!
//! The precision of the computation and of `Y` follows the precision of the
//! scale, not of `X`: integer-valued inputs stored in any float precision are
//! first cast to the scale's precision.

use super::dequantize::{channel_dequantize, dequantize};
use super::params::{
    bin_cnt, ensure_grid_fits, ensure_quantizable, ensure_same_shape, scalar_scale,
    DequantizeLinearAttrs, QuantAxis,
};
use crate::error::{Error, Result};
use crate::tensor::{DType, DenseTensor, Element};
use half::f16;
use ndarray::{Array1, ArrayD, ArrayViewD, ArrayViewMutD};
use tracing::debug;

const OP_NAME: &str = "DequantizeLinear";

/// Dequantize operator configured with its attributes
#[derive(Clone, Debug)]
pub struct DequantizeLinear {
    attrs: DequantizeLinearAttrs,
    max_range: i32,
}

impl DequantizeLinear {
    /// Validate the attributes and build the operator
    pub fn new(attrs: DequantizeLinearAttrs) -> Result<Self> {
        attrs.validate()?;
        let max_range = bin_cnt(attrs.bit_length)?;
        Ok(Self { attrs, max_range })
    }

    pub fn attrs(&self) -> &DequantizeLinearAttrs {
        &self.attrs
    }

    /// Divisor applied after multiplying by the scale (`bin_cnt`)
    pub fn max_range(&self) -> i32 {
        self.max_range
    }

    /// Dequantize `x` with `scale`, dispatching on the scale's precision
    ///
    /// Supported precisions are float64, float32 and float16; anything else
    /// fails with [`Error::UnsupportedDType`] naming the precision.
    pub fn compute(&self, x: &DenseTensor, scale: &DenseTensor) -> Result<DenseTensor> {
        match scale.dtype() {
            DType::F64 => self.compute_as::<f64>(x, scale),
            DType::F32 => self.compute_as::<f32>(x, scale),
            DType::F16 => self.compute_as::<f16>(x, scale),
            dtype => Err(Error::UnsupportedDType {
                op: OP_NAME,
                dtype,
            }),
        }
    }

    fn compute_as<D: Element>(&self, x: &DenseTensor, scale: &DenseTensor) -> Result<DenseTensor> {
        let scale = scale.view::<D>()?;
        if x.dtype() != D::DTYPE {
            debug!(from = %x.dtype(), to = %D::DTYPE, "casting dequantize input to scale precision");
        }
        let x = x.cast::<D>();

        let mut y = ArrayD::zeros(x.raw_dim());
        self.compute_typed(x.view(), scale, y.view_mut())?;
        Ok(D::into_tensor(y))
    }

    /// Dequantize already-cast buffers
    ///
    /// `y` must have the shape of `x`; it is fully overwritten.
    pub fn compute_typed<D: Element>(
        &self,
        x: ArrayViewD<'_, D>,
        scale: ArrayViewD<'_, D>,
        mut y: ArrayViewMutD<'_, D>,
    ) -> Result<()> {
        ensure_quantizable::<D>(OP_NAME)?;
        ensure_same_shape(x.shape(), y.shape())?;

        // the copy does not consult quant_axis
        if self.attrs.only_observer {
            y.assign(&x);
            return Ok(());
        }

        ensure_grid_fits::<D>(self.attrs.bit_length, self.max_range)?;
        let max_range = D::from_f64_lossy(f64::from(self.max_range));
        let axis = QuantAxis::from_attr(self.attrs.quant_axis, x.ndim())?;
        match axis {
            QuantAxis::PerTensor => {
                let s = scalar_scale(&scale)?;
                dequantize(x, s, max_range, y)
            }
            QuantAxis::Channel(quant_axis) => {
                let scales: Array1<D> = scale.iter().copied().collect();
                channel_dequantize(x, scales.view(), max_range, quant_axis, y)
            }
        }
    }
}
