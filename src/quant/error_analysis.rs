//! Quantization error analysis
//!
//! Compares an original tensor with its fake-quantized reconstruction:
//! - Error statistics (MSE, MAE, max error, SQNR)
//! - Grid step and the half-step bound on in-range values
//! - Theoretical SQNR for uniform quantization

use super::params::{bin_cnt, ensure_same_shape};
use crate::error::Result;
use crate::tensor::Element;
use ndarray::{ArrayViewD, Zip};
use serde::{Deserialize, Serialize};

/// Error statistics for one original/reconstructed pair
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantErrorStats {
    /// Mean Squared Error
    pub mse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Maximum absolute error
    pub max_error: f64,
    /// Signal-to-Quantization-Noise Ratio (SQNR) in dB
    pub sqnr_db: f64,
    /// Number of samples
    pub num_samples: usize,
}

impl QuantErrorStats {
    /// Root Mean Squared Error
    pub fn rmse(&self) -> f64 {
        self.mse.sqrt()
    }
}

/// Error statistics of `reconstructed` against `original`
///
/// Accumulates in `f64` whatever the element precision. An empty input yields
/// all-zero statistics; a reconstruction with no error has infinite SQNR.
pub fn analyze_error<T: Element>(
    original: ArrayViewD<'_, T>,
    reconstructed: ArrayViewD<'_, T>,
) -> Result<QuantErrorStats> {
    ensure_same_shape(original.shape(), reconstructed.shape())?;
    let n = original.len();
    if n == 0 {
        return Ok(QuantErrorStats::default());
    }

    let mut sq_sum = 0.0f64;
    let mut abs_sum = 0.0f64;
    let mut max_error = 0.0f64;
    let mut signal = 0.0f64;
    Zip::from(&original).and(&reconstructed).for_each(|&o, &r| {
        let o = o.to_f64_lossy();
        let err = (o - r.to_f64_lossy()).abs();
        sq_sum += err * err;
        abs_sum += err;
        max_error = max_error.max(err);
        signal += o * o;
    });

    let mse = sq_sum / n as f64;
    let signal_power = signal / n as f64;
    // SQNR = 10 * log10(signal_power / noise_power)
    let sqnr_db = if mse > 1e-20 {
        10.0 * (signal_power / mse).log10()
    } else {
        f64::INFINITY
    };

    Ok(QuantErrorStats {
        mse,
        mae: abs_sum / n as f64,
        max_error,
        sqnr_db,
        num_samples: n,
    })
}

/// Distance between adjacent grid points: `scale / bin_cnt`
pub fn quantization_step(scale: f64, bit_length: u32) -> Result<f64> {
    Ok(scale / f64::from(bin_cnt(bit_length)?))
}

/// Largest error for values inside `[-scale, scale]`: half a grid step
pub fn theoretical_max_error(scale: f64, bit_length: u32) -> Result<f64> {
    Ok(quantization_step(scale, bit_length)? / 2.0)
}

/// Expected SQNR for `bits`-bit uniform quantization: 6.02 * b + 1.76 dB
pub fn theoretical_sqnr(bits: u32) -> f64 {
    6.02 * f64::from(bits) + 1.76
}

/// Check the observed max error against the half-step bound
pub fn error_within_bounds(
    stats: &QuantErrorStats,
    scale: f64,
    bit_length: u32,
    tolerance: f64,
) -> Result<bool> {
    let bound = theoretical_max_error(scale, bit_length)?;
    Ok(stats.max_error <= bound * (1.0 + tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::quant::fake_quantize::clip_and_fake_quant;
    use crate::quant::params::RoundType;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, Array, ArrayD};
    use proptest::prelude::*;

    #[test]
    fn test_identical_inputs() {
        let x = arr1(&[1.0f32, -2.0, 3.0]).into_dyn();
        let stats = analyze_error(x.view(), x.view()).unwrap();
        assert_eq!(stats.mse, 0.0);
        assert_eq!(stats.max_error, 0.0);
        assert!(stats.sqnr_db.is_infinite());
        assert_eq!(stats.num_samples, 3);
    }

    #[test]
    fn test_known_errors() {
        let original = arr1(&[1.0f64, 2.0, 3.0, 4.0]).into_dyn();
        let recon = arr1(&[1.5f64, 2.0, 2.0, 4.0]).into_dyn();
        let stats = analyze_error(original.view(), recon.view()).unwrap();
        assert_abs_diff_eq!(stats.mse, (0.25 + 1.0) / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.mae, 1.5 / 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.max_error, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(stats.rmse(), stats.mse.sqrt(), epsilon = 1e-12);
        let expected_sqnr = 10.0 * ((30.0 / 4.0) / stats.mse).log10();
        assert_abs_diff_eq!(stats.sqnr_db, expected_sqnr, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let x = ArrayD::<f32>::zeros(ndarray::IxDyn(&[0]));
        let stats = analyze_error(x.view(), x.view()).unwrap();
        assert_eq!(stats, QuantErrorStats::default());
    }

    #[test]
    fn test_shape_mismatch() {
        let a = arr1(&[1.0f32, 2.0]).into_dyn();
        let b = arr1(&[1.0f32]).into_dyn();
        assert!(matches!(
            analyze_error(a.view(), b.view()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_quantization_step() {
        assert_abs_diff_eq!(quantization_step(127.0, 8).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(theoretical_max_error(127.0, 8).unwrap(), 0.5, epsilon = 1e-12);
        assert!(quantization_step(1.0, 1).is_err());
    }

    #[test]
    fn test_theoretical_sqnr() {
        assert_abs_diff_eq!(theoretical_sqnr(8), 49.92, epsilon = 1e-9);
        assert!(theoretical_sqnr(16) > theoretical_sqnr(8));
    }

    #[test]
    fn test_fake_quant_error_more_bits_is_smaller() {
        let x = Array::linspace(-1.0f64, 1.0, 257).into_dyn();
        let mut mses = Vec::new();
        for bits in [4u32, 8, 12] {
            let mut y = ArrayD::zeros(x.raw_dim());
            clip_and_fake_quant(
                x.view(),
                1.0,
                bin_cnt(bits).unwrap(),
                RoundType::TiesToEven,
                y.view_mut(),
            )
            .unwrap();
            let stats = analyze_error(x.view(), y.view()).unwrap();
            assert!(error_within_bounds(&stats, 1.0, bits, 1e-9).unwrap());
            mses.push(stats.mse);
        }
        assert!(mses[0] > mses[1] && mses[1] > mses[2]);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(100))]

        /// In-range values are reconstructed within half a grid step
        #[test]
        fn prop_in_range_error_bounded(
            values in prop::collection::vec(-4.0f64..4.0, 1..128),
            bits in 2u32..16,
        ) {
            let x = Array::from_vec(values).into_dyn();
            let mut y = ArrayD::zeros(x.raw_dim());
            clip_and_fake_quant(x.view(), 4.0, bin_cnt(bits).unwrap(), RoundType::TiesToEven, y.view_mut()).unwrap();
            let stats = analyze_error(x.view(), y.view()).unwrap();
            prop_assert!(error_within_bounds(&stats, 4.0, bits, 1e-9).unwrap());
            prop_assert!(stats.mae <= stats.max_error + 1e-15);
        }
    }
}
