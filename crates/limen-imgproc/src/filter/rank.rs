use limen_tensor::Tensor;

use crate::error::ThresholdError;
use crate::padding::PaddingMode;
use crate::parallel;

/// Replace every element by the median of its box neighbourhood.
///
/// For footprints with an even number of elements the upper of the two middle
/// values is taken. NaN values order after every number.
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
/// values and [`ThresholdError::InvalidWindowSize`] if any extent is zero.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::filter::median_filter;
/// use limen_imgproc::padding::PaddingMode;
///
/// let src = Tensor::<f64, 1>::from_shape_vec([5], vec![1.0, 9.0, 2.0, 3.0, 8.0]).unwrap();
/// let dst = median_filter(&src, &[3], PaddingMode::Replicate).unwrap();
/// assert_eq!(dst.as_slice(), &[1.0, 2.0, 3.0, 3.0, 8.0]);
/// ```
pub fn median_filter<const N: usize>(
    src: &Tensor<f64, N>,
    size: &[usize],
    mode: PaddingMode,
) -> Result<Tensor<f64, N>, ThresholdError> {
    let size: [usize; N] = match size.len() {
        1 => [size[0]; N],
        n if n == N => {
            let mut out = [0; N];
            out.copy_from_slice(size);
            out
        }
        _ => return Err(ThresholdError::shape_mismatch(&[N], &[size.len()])),
    };
    if size.contains(&0) {
        return Err(ThresholdError::InvalidWindowSize(size.to_vec()));
    }

    // footprint offsets relative to the center element
    let footprint = Tensor::<(), N>::from_shape_val(size, ());
    let offsets: Vec<[isize; N]> = (0..footprint.numel())
        .map(|i| {
            let idx = footprint.get_index_unchecked(i);
            let mut off = [0isize; N];
            for axis in 0..N {
                off[axis] = idx[axis] as isize - (size[axis] / 2) as isize;
            }
            off
        })
        .collect();
    let rank = offsets.len() / 2;
    let cval = mode.constant_value();
    let src_data = src.as_slice();

    let mut dst = Tensor::<f64, N>::zeros(src.shape);

    parallel::execute_indexed(dst.as_slice_mut(), |offset, out| {
        let center = src.get_index_unchecked(offset);
        let mut values: Vec<f64> = offsets
            .iter()
            .map(|off| {
                let mut src_offset = 0;
                for axis in 0..N {
                    let pos = center[axis] as isize + off[axis];
                    match mode.map_index(pos, src.shape[axis]) {
                        Some(p) => src_offset += p * src.strides[axis],
                        None => return cval,
                    }
                }
                src_data[src_offset]
            })
            .collect();
        let (_, median, _) = values.select_nth_unstable_by(rank, |a, b| a.total_cmp(b));
        *out = *median;
    });

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use limen_tensor::Tensor2;

    #[test]
    fn test_median_filter_removes_impulse() -> Result<(), ThresholdError> {
        let mut src = Tensor2::<f64>::from_shape_val([5, 5], 1.0);
        if let Some(v) = src.get_mut([2, 2]) {
            *v = 100.0;
        }
        let dst = median_filter(&src, &[3], PaddingMode::Reflect)?;
        assert!(dst.iter().all(|&v| v == 1.0));
        Ok(())
    }

    #[test]
    fn test_median_filter_anisotropic() -> Result<(), ThresholdError> {
        let src = Tensor2::<f64>::from_shape_vec(
            [2, 4],
            vec![3.0, 0.0, 2.0, 1.0, 9.0, 5.0, 7.0, 1.0],
        )?;
        // a 1x3 footprint only mixes values along rows
        let dst = median_filter(&src, &[1, 3], PaddingMode::Reflect)?;
        assert_eq!(dst.as_slice(), &[3.0, 2.0, 1.0, 1.0, 9.0, 7.0, 5.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_median_filter_constant_border() -> Result<(), ThresholdError> {
        let src = Tensor::<f64, 1>::from_shape_vec([3], vec![5.0, 5.0, 5.0])?;
        let dst = median_filter(&src, &[5], PaddingMode::Constant(-1.0))?;
        assert_eq!(dst.as_slice(), &[5.0, 5.0, 5.0]);
        // the border outweighs the signal once it fills most of the footprint
        let dst = median_filter(&src, &[7], PaddingMode::Constant(-1.0))?;
        assert_eq!(dst.as_slice(), &[-1.0, -1.0, -1.0]);
        Ok(())
    }

    #[test]
    fn test_median_filter_invalid_size() {
        let src = Tensor2::<f64>::zeros([2, 2]);
        assert_eq!(
            median_filter(&src, &[0], PaddingMode::Reflect),
            Err(ThresholdError::InvalidWindowSize(vec![0, 0]))
        );
    }
}
