use limen_tensor::{Pixel, Tensor, TensorError};

use crate::error::ThresholdError;
use crate::parallel;

/// Compute the summed-area table of an N-dimensional tensor.
///
/// The output has one more element than `src` along every axis. Element `i` holds
/// the sum of all source elements whose indices are strictly less than `i` on every
/// axis, so the first hyperplane along each axis is zero. Sums are always
/// accumulated in `f64`; NaN and infinite values propagate.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::integral::integral_image;
///
/// let src = Tensor::<u8, 2>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
/// let sat = integral_image(&src).unwrap();
/// assert_eq!(sat.shape, [3, 3]);
/// assert_eq!(sat.as_slice(), &[0.0, 0.0, 0.0, 0.0, 1.0, 3.0, 0.0, 4.0, 10.0]);
/// ```
pub fn integral_image<T: Pixel, const N: usize>(
    src: &Tensor<T, N>,
) -> Result<Tensor<f64, N>, ThresholdError> {
    let mut shape = src.shape;
    shape.iter_mut().for_each(|d| *d += 1);

    let mut dst = Tensor::<f64, N>::zeros(shape);
    let dst_strides = dst.strides;
    let src_data = src.as_slice();

    // copy the source behind the leading zero hyperplanes
    parallel::execute_indexed(dst.as_slice_mut(), |offset, out| {
        let mut rem = offset;
        let mut src_offset = 0;
        for axis in 0..N {
            let i = rem / dst_strides[axis];
            rem %= dst_strides[axis];
            if i == 0 {
                return;
            }
            src_offset += (i - 1) * src.strides[axis];
        }
        *out = src_data[src_offset].as_f64();
    });

    for axis in 0..N {
        cumsum_axis(&mut dst, axis)?;
    }

    Ok(dst)
}

/// In-place inclusive prefix sum along one axis.
///
/// The tensor is viewed as `[outer, len, inner]`; every outer block is independent.
fn cumsum_axis<const N: usize>(t: &mut Tensor<f64, N>, axis: usize) -> Result<(), ThresholdError> {
    let len = t.shape[axis];
    let inner = t.strides[axis];
    if len < 2 || t.is_empty() {
        return Ok(());
    }

    parallel::execute_chunks(
        t.as_slice_mut(),
        len * inner,
        |_, block| {
            for j in 1..len {
                let (prev, cur) = block.split_at_mut(j * inner);
                let prev = &prev[(j - 1) * inner..];
                cur[..inner]
                    .iter_mut()
                    .zip(prev)
                    .for_each(|(c, p)| *c += *p);
            }
        },
    )?;

    Ok(())
}

/// A sparse correlation kernel made of signed corner taps.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseKernel<const N: usize> {
    /// The dense extent of the kernel.
    pub shape: [usize; N],
    /// The `(offset, weight)` taps of the kernel.
    pub corners: Vec<([usize; N], f64)>,
}

impl<const N: usize> SparseKernel<N> {
    /// Create a sparse kernel from its dense shape and non-zero taps.
    ///
    /// # Errors
    ///
    /// Returns an error if a tap lies outside the kernel shape.
    pub fn new(shape: [usize; N], corners: Vec<([usize; N], f64)>) -> Result<Self, TensorError> {
        for (offset, _) in corners.iter() {
            if let Some((&i, &size)) = offset.iter().zip(shape.iter()).find(|(i, s)| *i >= *s) {
                return Err(TensorError::index_out_of_bounds(i, size));
            }
        }
        Ok(Self { shape, corners })
    }

    /// The inclusion-exclusion kernel that turns an integral image into window sums.
    ///
    /// The kernel has shape `window + 1` and one tap at each of the `2^N` corners of
    /// the window. A corner with `k` far coordinates weighs `+1` when `k` and `N`
    /// have the same parity and `-1` otherwise.
    pub fn window_sum(window: [usize; N]) -> Self {
        let mut shape = window;
        shape.iter_mut().for_each(|d| *d += 1);

        let corners = (0..1usize << N)
            .map(|mask| {
                let mut offset = [0; N];
                let mut far = 0;
                for (axis, o) in offset.iter_mut().enumerate() {
                    if (mask >> (N - 1 - axis)) & 1 == 1 {
                        *o = window[axis];
                        far += 1;
                    }
                }
                let sign = if far % 2 == N % 2 { 1.0 } else { -1.0 };
                (offset, sign)
            })
            .collect();

        Self { shape, corners }
    }
}

/// Correlate a tensor with a sparse kernel in valid mode.
///
/// `out[p] = Σ weight_c * src[p + offset_c]` over the taps of `kernel`. The output
/// has shape `src.shape - kernel.shape + 1`.
///
/// # Errors
///
/// Returns [`TensorError::DimensionMismatch`] if the kernel is larger than `src`
/// along any axis.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::integral::{correlate_sparse, integral_image, SparseKernel};
///
/// let src = Tensor::<f64, 1>::from_shape_vec([5], vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
/// let sat = integral_image(&src).unwrap();
/// let sums = correlate_sparse(&sat, &SparseKernel::window_sum([3])).unwrap();
/// assert_eq!(sums.as_slice(), &[6.0, 9.0, 12.0]);
/// ```
pub fn correlate_sparse<const N: usize>(
    src: &Tensor<f64, N>,
    kernel: &SparseKernel<N>,
) -> Result<Tensor<f64, N>, ThresholdError> {
    if src.shape.iter().zip(kernel.shape).any(|(&s, k)| k > s || k == 0) {
        return Err(TensorError::dimension_mismatch(
            "kernel must not be larger than the correlated tensor",
            &kernel.shape,
            &src.shape,
        )
        .into());
    }

    let mut out_shape = src.shape;
    for (d, k) in out_shape.iter_mut().zip(kernel.shape) {
        *d = *d + 1 - k;
    }

    let taps: Vec<(usize, f64)> = kernel
        .corners
        .iter()
        .map(|(offset, w)| (src.get_iter_offset_unchecked(*offset), *w))
        .collect();

    let mut dst = Tensor::<f64, N>::zeros(out_shape);
    let dst_strides = dst.strides;
    let src_data = src.as_slice();

    parallel::execute_indexed(dst.as_slice_mut(), |offset, out| {
        let mut rem = offset;
        let mut base = 0;
        for axis in 0..N {
            base += (rem / dst_strides[axis]) * src.strides[axis];
            rem %= dst_strides[axis];
        }
        *out = taps.iter().map(|&(t, w)| w * src_data[base + t]).sum();
    });

    Ok(dst)
}
