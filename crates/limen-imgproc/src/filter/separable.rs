use limen_tensor::Tensor;

use super::kernels;
use crate::error::ThresholdError;
use crate::padding::PaddingMode;
use crate::parallel;

/// Standard deviations below this are treated as no smoothing.
const SIGMA_EPSILON: f64 = 1e-15;

/// Default truncation of gaussian kernels, in standard deviations.
pub const GAUSSIAN_TRUNCATE: f64 = 4.0;

/// Correlate a tensor with a 1-D kernel along one axis.
///
/// The kernel is centered at `kernel.len() / 2`; positions that fall outside the
/// tensor are resolved by `mode`.
///
/// # Arguments
///
/// * `src` - The input tensor.
/// * `axis` - The axis to filter along.
/// * `kernel` - The kernel weights.
/// * `mode` - The border handling.
///
/// # Errors
///
/// Returns [`ThresholdError::InvalidAxis`] if `axis >= N`.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::filter::correlate1d;
/// use limen_imgproc::padding::PaddingMode;
///
/// let src = Tensor::<f64, 1>::from_shape_vec([4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// let dst = correlate1d(&src, 0, &[1.0, 1.0, 1.0], PaddingMode::Constant(0.0)).unwrap();
/// assert_eq!(dst.as_slice(), &[3.0, 6.0, 9.0, 7.0]);
/// ```
pub fn correlate1d<const N: usize>(
    src: &Tensor<f64, N>,
    axis: usize,
    kernel: &[f64],
    mode: PaddingMode,
) -> Result<Tensor<f64, N>, ThresholdError> {
    if axis >= N {
        return Err(ThresholdError::InvalidAxis { axis, ndim: N });
    }

    let len = src.shape[axis];
    let stride = src.strides[axis];
    let half = (kernel.len() / 2) as isize;
    let cval = mode.constant_value();
    let src_data = src.as_slice();

    let mut dst = Tensor::<f64, N>::zeros(src.shape);

    parallel::execute_indexed(dst.as_slice_mut(), |offset, out| {
        let i = (offset / stride) % len;
        let line = offset - i * stride;
        *out = kernel
            .iter()
            .enumerate()
            .map(|(j, &w)| {
                let pos = i as isize + j as isize - half;
                let v = match mode.map_index(pos, len) {
                    Some(p) => src_data[line + p * stride],
                    None => cval,
                };
                w * v
            })
            .sum();
    });

    Ok(dst)
}

/// A separable N-D filter applied as one 1-D correlation per axis.
///
/// Axes without a kernel are left untouched.
struct SeparableFilter<const N: usize> {
    kernels: [Option<Vec<f64>>; N],
}

impl<const N: usize> SeparableFilter<N> {
    fn apply(
        &self,
        src: &Tensor<f64, N>,
        mode: PaddingMode,
    ) -> Result<Tensor<f64, N>, ThresholdError> {
        let mut dst = src.clone();
        for (axis, kernel) in self.kernels.iter().enumerate() {
            if let Some(kernel) = kernel {
                dst = correlate1d(&dst, axis, kernel, mode)?;
            }
        }
        Ok(dst)
    }
}

/// Resolve a per-axis parameter given as one value or one value per axis.
fn per_axis<T: Copy, const N: usize>(values: &[T]) -> Option<[T; N]> {
    match values.len() {
        1 => Some([values[0]; N]),
        n if n == N => {
            let mut out = [values[0]; N];
            out.copy_from_slice(values);
            Some(out)
        }
        _ => None,
    }
}

/// Smooth a tensor with a gaussian kernel.
///
/// # Arguments
///
/// * `src` - The input tensor.
/// * `sigma` - The standard deviation, one value or one per axis.
/// * `mode` - The border handling.
///
/// Kernels are truncated at [`GAUSSIAN_TRUNCATE`] standard deviations; axes with
/// a vanishing sigma are not filtered.
///
/// # Errors
///
/// Returns [`ThresholdError::ShapeMismatch`] if `sigma` has neither one nor `N`
/// values.
pub fn gaussian_filter<const N: usize>(
    src: &Tensor<f64, N>,
    sigma: &[f64],
    mode: PaddingMode,
) -> Result<Tensor<f64, N>, ThresholdError> {
    let sigma: [f64; N] = per_axis(sigma)
        .ok_or_else(|| ThresholdError::shape_mismatch(&[N], &[sigma.len()]))?;

    let kernels = sigma.map(|s| {
        (s > SIGMA_EPSILON).then(|| kernels::gaussian_kernel_1d(s, GAUSSIAN_TRUNCATE))
    });

    SeparableFilter { kernels }.apply(src, mode)
}

/// Replace every element by the mean of its box neighbourhood.
///
/// # Arguments
///
/// * `src` - The input tensor.
/// * `size` - The box extent, one value or one per axis.
/// * `mode` - The border handling.
///
/// # Errors
///
/// Returns [`ThresholdError::ShapeMismatch`] if `size` has neither one nor `N`
/// values.
pub fn uniform_filter<const N: usize>(
    src: &Tensor<f64, N>,
    size: &[usize],
    mode: PaddingMode,
) -> Result<Tensor<f64, N>, ThresholdError> {
    let size: [usize; N] =
        per_axis(size).ok_or_else(|| ThresholdError::shape_mismatch(&[N], &[size.len()]))?;

    let kernels = size.map(|s| (s > 1).then(|| kernels::box_kernel_1d(s)));

    SeparableFilter { kernels }.apply(src, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use limen_tensor::Tensor2;

    #[test]
    fn test_correlate1d_modes() -> Result<(), ThresholdError> {
        let src = Tensor::<f64, 1>::from_shape_vec([4], vec![1.0, 2.0, 3.0, 4.0])?;
        let k = [1.0, 1.0, 1.0];

        let dst = correlate1d(&src, 0, &k, PaddingMode::Reflect)?;
        assert_eq!(dst.as_slice(), &[4.0, 6.0, 9.0, 11.0]);

        let dst = correlate1d(&src, 0, &k, PaddingMode::Reflect101)?;
        assert_eq!(dst.as_slice(), &[5.0, 6.0, 9.0, 10.0]);

        let dst = correlate1d(&src, 0, &k, PaddingMode::Wrap)?;
        assert_eq!(dst.as_slice(), &[7.0, 6.0, 9.0, 8.0]);

        let dst = correlate1d(&src, 0, &k, PaddingMode::Constant(10.0))?;
        assert_eq!(dst.as_slice(), &[13.0, 6.0, 9.0, 17.0]);
        Ok(())
    }

    #[test]
    fn test_correlate1d_axis() -> Result<(), ThresholdError> {
        let src = Tensor2::<f64>::from_shape_vec([2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let dst = correlate1d(&src, 0, &[1.0, 1.0, 0.0], PaddingMode::Replicate)?;
        assert_eq!(dst.as_slice(), &[2.0, 4.0, 6.0, 5.0, 7.0, 9.0]);

        assert_eq!(
            correlate1d(&src, 2, &[1.0], PaddingMode::Replicate),
            Err(ThresholdError::InvalidAxis { axis: 2, ndim: 2 })
        );
        Ok(())
    }

    #[test]
    fn test_uniform_filter_constant_image() -> Result<(), ThresholdError> {
        let src = Tensor2::<f64>::from_shape_val([5, 6], 3.5);
        let dst = uniform_filter(&src, &[3, 5], PaddingMode::Reflect)?;
        dst.iter().for_each(|&v| assert_relative_eq!(v, 3.5, epsilon = 1e-12));
        Ok(())
    }

    #[test]
    fn test_gaussian_filter_preserves_mass() -> Result<(), ThresholdError> {
        let mut src = Tensor2::<f64>::zeros([21, 21]);
        if let Some(v) = src.get_mut([10, 10]) {
            *v = 1.0;
        }
        let dst = gaussian_filter(&src, &[1.5], PaddingMode::Constant(0.0))?;
        assert_relative_eq!(dst.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(*dst.get_unchecked([9, 10]), *dst.get_unchecked([10, 9]));
        assert!(dst.get_unchecked([10, 10]) > dst.get_unchecked([10, 11]));
        Ok(())
    }

    #[test]
    fn test_gaussian_filter_zero_sigma_axis() -> Result<(), ThresholdError> {
        let src = Tensor2::<f64>::from_shape_fn([4, 4], |[i, j]| (i * 4 + j) as f64);
        let dst = gaussian_filter(&src, &[0.0, 0.0], PaddingMode::Reflect)?;
        assert_eq!(dst, src);

        assert!(matches!(
            gaussian_filter(&src, &[1.0, 1.0, 1.0], PaddingMode::Reflect),
            Err(ThresholdError::ShapeMismatch { .. })
        ));
        Ok(())
    }
}
