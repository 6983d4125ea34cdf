//! Clip-and-fake-quantize transforms
//!
//! Snaps every element onto the signed grid implied by its scale while
//! keeping the floating storage type:
//!
//! ```text
//! s   = max(scale, SCALE_EPSILON)
//! v   = clip(x, -s, s) / s * bin_cnt
//! q   = clamp(round(v), -bin_cnt - 1, bin_cnt)
//! out = q * s / bin_cnt
//! ```
//!
//! The output has at most `2 * bin_cnt + 1` distinct values in `[-s, s]`.

use super::params::{ensure_channel_scale, ensure_same_shape, grid_bound, RoundType};
use crate::error::Result;
use crate::tensor::Element;
use ndarray::{ArrayView1, ArrayViewD, ArrayViewMutD, Axis, Zip};
use rayon::prelude::*;
use tracing::debug;

/// Floor applied to scales before they are used as divisors
pub const SCALE_EPSILON: f64 = 1e-6;

/// Clamp a scale to the positive floor; NaN and negative scales also map to
/// the floor.
#[inline]
pub fn clamp_scale<T: Element>(scale: T) -> T {
    let eps = T::from_f64_lossy(SCALE_EPSILON);
    if scale > eps {
        scale
    } else {
        eps
    }
}

/// Fake-quantize one value against an already clamped scale
///
/// NaN inputs pass through unchanged.
#[inline]
pub fn fake_quant_value<T: Element>(x: T, s: T, bin_cnt: T, round_type: RoundType) -> T {
    if x.is_nan() {
        return x;
    }
    let clipped = x.max(-s).min(s);
    let v = clipped / s * bin_cnt;
    let q = round_type
        .round(v)
        .max(-bin_cnt - T::one())
        .min(bin_cnt);
    q * s / bin_cnt
}

/// Per-tensor transform: one scale for every element of `x`
///
/// `out` must have the same shape as `x`; it is fully overwritten.
pub fn clip_and_fake_quant<T: Element>(
    x: ArrayViewD<'_, T>,
    scale: T,
    bin_cnt: i32,
    round_type: RoundType,
    mut out: ArrayViewMutD<'_, T>,
) -> Result<()> {
    ensure_same_shape(x.shape(), out.shape())?;

    let s = clamp_scale(scale);
    if s != scale {
        debug!(
            scale = scale.to_f64_lossy(),
            floor = SCALE_EPSILON,
            "quantization scale clamped to floor"
        );
    }
    let bin = grid_bound::<T>(bin_cnt)?;

    Zip::from(&mut out)
        .and(&x)
        .par_for_each(|o, &v| *o = fake_quant_value(v, s, bin, round_type));
    Ok(())
}

/// Per-channel transform: element `i` uses `scales[c]` where `c` is its
/// coordinate along `quant_axis`
///
/// Fails without touching `out` when `scales.len() != x.shape()[quant_axis]`.
pub fn channel_clip_and_fake_quant<T: Element>(
    x: ArrayViewD<'_, T>,
    scales: ArrayView1<'_, T>,
    bin_cnt: i32,
    round_type: RoundType,
    quant_axis: usize,
    mut out: ArrayViewMutD<'_, T>,
) -> Result<()> {
    ensure_channel_scale(x.shape(), quant_axis, scales.len())?;
    ensure_same_shape(x.shape(), out.shape())?;

    let clamped: Vec<T> = scales.iter().map(|&s| clamp_scale(s)).collect();
    let floored = scales
        .iter()
        .zip(&clamped)
        .filter(|(raw, s)| *raw != *s)
        .count();
    if floored > 0 {
        debug!(
            channels = floored,
            floor = SCALE_EPSILON,
            "channel scales clamped to floor"
        );
    }
    let bin = grid_bound::<T>(bin_cnt)?;

    out.axis_iter_mut(Axis(quant_axis))
        .into_par_iter()
        .zip(x.axis_iter(Axis(quant_axis)).into_par_iter())
        .zip(clamped.par_iter())
        .for_each(|((mut out_channel, x_channel), &s)| {
            Zip::from(&mut out_channel)
                .and(&x_channel)
                .for_each(|o, &v| *o = fake_quant_value(v, s, bin, round_type));
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::quant::params::bin_cnt;
    use approx::assert_abs_diff_eq;
    use half::f16;
    use ndarray::{arr1, arr2, Array, ArrayD, IxDyn};
    use proptest::prelude::*;

    fn quantize_vec(values: &[f32], scale: f32, bits: u32, rt: RoundType) -> Vec<f32> {
        let x = Array::from_vec(values.to_vec()).into_dyn();
        let mut out = ArrayD::zeros(x.raw_dim());
        clip_and_fake_quant(x.view(), scale, bin_cnt(bits).unwrap(), rt, out.view_mut()).unwrap();
        out.iter().copied().collect()
    }

    #[test]
    fn test_grid_points_are_fixed() {
        // with scale == bin_cnt the grid is the integers
        let out = quantize_vec(&[-127.0, -3.0, 0.0, 5.0, 127.0], 127.0, 8, RoundType::TiesToEven);
        assert_eq!(out, vec![-127.0, -3.0, 0.0, 5.0, 127.0]);
    }

    #[test]
    fn test_clipping_to_scale() {
        let out = quantize_vec(&[-10.0, 10.0, 0.5], 1.0, 8, RoundType::TiesToEven);
        assert_abs_diff_eq!(out[0], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[2], 64.0 / 127.0, epsilon = 1e-6);
    }

    #[test]
    fn test_round_type_on_ties() {
        // 2 bits, scale 4: x = +-2 lands exactly on v = +-0.5
        let even = quantize_vec(&[2.0, -2.0, 1.0], 4.0, 2, RoundType::TiesToEven);
        assert_eq!(even, vec![0.0, 0.0, 0.0]);
        let away = quantize_vec(&[2.0, -2.0, 1.0], 4.0, 2, RoundType::TiesAwayFromZero);
        assert_eq!(away, vec![4.0, -4.0, 0.0]);
    }

    #[test]
    fn test_zero_scale_is_finite() {
        let out = quantize_vec(&[0.0, 1.0, -1.0], 0.0, 8, RoundType::TiesToEven);
        for v in &out {
            assert!(v.is_finite());
        }
        assert_eq!(out[0], 0.0);
        assert!(out[1].abs() <= 2.0 * SCALE_EPSILON as f32);
    }

    #[test]
    fn test_nan_scale_is_clamped() {
        let out = quantize_vec(&[0.5], f32::NAN, 8, RoundType::TiesToEven);
        assert!(out[0].is_finite());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let x = ArrayD::<f32>::zeros(IxDyn(&[2, 3]));
        let mut out = ArrayD::<f32>::zeros(IxDyn(&[3, 2]));
        let err = clip_and_fake_quant(x.view(), 1.0, 127, RoundType::TiesToEven, out.view_mut())
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_f16_quantize() {
        let x = Array::from_vec(vec![f16::from_f32(0.3), f16::from_f32(-2.0)]).into_dyn();
        let mut out = ArrayD::from_elem(x.raw_dim(), f16::from_f32(9.0));
        clip_and_fake_quant(x.view(), f16::from_f32(1.0), 127, RoundType::TiesToEven, out.view_mut())
            .unwrap();
        assert_abs_diff_eq!(out[[0]].to_f32(), 38.0 / 127.0, epsilon = 2e-3);
        assert_abs_diff_eq!(out[[1]].to_f32(), -1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_channel_quantize_axis0() {
        let x = arr2(&[[0.5f32, -2.0], [0.5, -2.0]]).into_dyn();
        let scales = arr1(&[1.0f32, 4.0]);
        let mut out = ArrayD::zeros(x.raw_dim());
        channel_clip_and_fake_quant(x.view(), scales.view(), 127, RoundType::TiesToEven, 0, out.view_mut())
            .unwrap();
        // row 0 clips -2.0 to -1.0; row 1 keeps it on its grid
        assert_abs_diff_eq!(out[[0, 1]], -1.0, epsilon = 1e-6);
        // -2.0 / 4 * 127 = -63.5 is a tie and rounds to the even -64
        assert_abs_diff_eq!(out[[1, 1]], -64.0 * 4.0 / 127.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[0, 0]], 64.0 / 127.0, epsilon = 1e-6);
        assert_abs_diff_eq!(out[[1, 0]], (0.5f32 / 4.0 * 127.0).round() * 4.0 / 127.0, epsilon = 1e-6);
    }

    #[test]
    fn test_channel_quantize_middle_axis() {
        let x = Array::from_elem((4, 3, 5), 10.0f64).into_dyn();
        let scales = arr1(&[1.0, 2.0, 3.0]);
        let mut out = ArrayD::zeros(x.raw_dim());
        channel_clip_and_fake_quant(x.view(), scales.view(), 127, RoundType::TiesToEven, 1, out.view_mut())
            .unwrap();
        for ((_, c, _), &v) in out.view().into_dimensionality::<ndarray::Ix3>().unwrap().indexed_iter() {
            assert_abs_diff_eq!(v, (c + 1) as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_channel_scale_length_rejected_without_writing() {
        let x = Array::from_elem((4, 3, 5), 1.0f32).into_dyn();
        let scales = arr1(&[1.0f32, 1.0]);
        let mut out = ArrayD::from_elem(x.raw_dim(), -7.0f32);
        let err = channel_clip_and_fake_quant(x.view(), scales.view(), 127, RoundType::TiesToEven, 1, out.view_mut())
            .unwrap_err();
        match err {
            Error::ChannelScaleMismatch {
                axis,
                expected,
                got,
            } => {
                assert_eq!((axis, expected, got), (1, 3, 2));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(out.iter().all(|&v| v == -7.0));
    }

    #[test]
    fn test_channel_zero_scale_is_finite() {
        let x = arr2(&[[0.0f32, 0.0], [1.0, -1.0]]).into_dyn();
        let scales = arr1(&[0.0f32, 1.0]);
        let mut out = ArrayD::zeros(x.raw_dim());
        channel_clip_and_fake_quant(x.view(), scales.view(), 127, RoundType::TiesToEven, 0, out.view_mut())
            .unwrap();
        assert!(out.iter().all(|v| v.is_finite()));
        assert_eq!(out[[0, 0]], 0.0);
    }

    #[test]
    fn test_nan_input_propagates() {
        let out = quantize_vec(&[f32::NAN, 0.5], 2.0, 8, RoundType::TiesToEven);
        assert!(out[0].is_nan());
        assert_abs_diff_eq!(out[1], 32.0 * 2.0 / 127.0, epsilon = 1e-6);

        let x = arr2(&[[f64::NAN, -1.0], [0.25, f64::NAN]]).into_dyn();
        let scales = arr1(&[1.0, 1.0]);
        let mut out = ArrayD::zeros(x.raw_dim());
        channel_clip_and_fake_quant(x.view(), scales.view(), 127, RoundType::TiesToEven, 0, out.view_mut())
            .unwrap();
        assert!(out[[0, 0]].is_nan());
        assert!(out[[1, 1]].is_nan());
        assert_abs_diff_eq!(out[[0, 1]], -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_f16_grid_overflow_rejected_without_writing() {
        let x = Array::from_vec(vec![f16::from_f32(0.0), f16::from_f32(0.5)]).into_dyn();
        let sentinel = f16::from_f32(9.0);
        let mut out = ArrayD::from_elem(x.raw_dim(), sentinel);
        let err = clip_and_fake_quant(
            x.view(),
            f16::from_f32(1.0),
            bin_cnt(17).unwrap(),
            RoundType::TiesToEven,
            out.view_mut(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(out.iter().all(|&v| v == sentinel));

        let x2 = Array::from_shape_vec((1, 2), x.iter().copied().collect())
            .unwrap()
            .into_dyn();
        let scales = Array::from_vec(vec![f16::from_f32(1.0)]);
        let mut out = ArrayD::from_elem(x2.raw_dim(), sentinel);
        assert!(channel_clip_and_fake_quant(
            x2.view(),
            scales.view(),
            bin_cnt(17).unwrap(),
            RoundType::TiesToEven,
            0,
            out.view_mut(),
        )
        .is_err());
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(200))]

        /// Output stays inside [-s, s] and on the grid s / bin_cnt
        #[test]
        fn prop_output_on_grid_and_bounded(
            values in prop::collection::vec(-100.0f64..100.0, 1..64),
            scale in 0.01f64..50.0,
            bits in 2u32..9,
        ) {
            let bins = bin_cnt(bits).unwrap();
            let x = Array::from_vec(values).into_dyn();
            let mut out = ArrayD::zeros(x.raw_dim());
            clip_and_fake_quant(x.view(), scale, bins, RoundType::TiesToEven, out.view_mut()).unwrap();

            let step = scale / f64::from(bins);
            for &v in out.iter() {
                prop_assert!(v.abs() <= scale * (1.0 + 1e-12));
                let q = v / step;
                prop_assert!((q - q.round()).abs() < 1e-6, "{} is off the grid", v);
            }
        }

        /// Quantization error inside the range is at most half a step
        #[test]
        fn prop_error_within_half_step(
            values in prop::collection::vec(-1.0f64..1.0, 1..64),
            bits in 2u32..12,
        ) {
            let bins = bin_cnt(bits).unwrap();
            let x = Array::from_vec(values).into_dyn();
            let mut out = ArrayD::zeros(x.raw_dim());
            clip_and_fake_quant(x.view(), 1.0, bins, RoundType::TiesAwayFromZero, out.view_mut()).unwrap();
            let half_step = 0.5 / f64::from(bins);
            for (&o, &i) in out.iter().zip(x.iter()) {
                prop_assert!((o - i).abs() <= half_step + 1e-12);
            }
        }

        /// Fake quantization is idempotent
        #[test]
        fn prop_idempotent(
            values in prop::collection::vec(-10.0f64..10.0, 1..64),
            scale in 0.1f64..10.0,
        ) {
            let x = Array::from_vec(values).into_dyn();
            let mut once = ArrayD::zeros(x.raw_dim());
            clip_and_fake_quant(x.view(), scale, 127, RoundType::TiesToEven, once.view_mut()).unwrap();
            let mut twice = ArrayD::zeros(x.raw_dim());
            clip_and_fake_quant(once.view(), scale, 127, RoundType::TiesToEven, twice.view_mut()).unwrap();
            for (&a, &b) in once.iter().zip(twice.iter()) {
                prop_assert!((a - b).abs() < 1e-9);
            }
        }
    }
}
