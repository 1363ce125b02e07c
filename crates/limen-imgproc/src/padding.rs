use limen_tensor::{Tensor, TensorError};

use crate::error::ThresholdError;
use crate::parallel;

/// A border type for the spatial padding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaddingMode {
    /// This border type fills the border with a single, constant value.
    ///
    /// Example: ...d c b a | 0 0 0 0...
    Constant(f64),

    /// This border type takes the outermost element and repeats it into the padded region.
    ///
    /// Example: ...d c b a | a a a a...
    Replicate,

    /// This border type reflects the values at the boundary, starting with the element 'next' to the edge.
    ///
    /// Example: ...d c b a | b c d e...
    Reflect101,

    /// This border type reflects the values at the boundary, starting with the edge element itself.
    ///
    /// Example: ...d c b a | a b c d...
    #[default]
    Reflect,

    /// This border type wraps the content from the opposite side to fill the border.
    ///
    /// Example: ...d c b a | w x y z...
    Wrap,
}

impl PaddingMode {
    #[inline]
    fn reflect(i: isize, len: usize) -> usize {
        if len == 1 {
            return 0;
        }
        let period = 2 * len as isize;
        let i = i.rem_euclid(period);
        if i < len as isize {
            i as usize
        } else {
            (period - i - 1) as usize
        }
    }

    #[inline]
    fn reflect101(i: isize, len: usize) -> usize {
        if len == 1 {
            return 0;
        }
        let period = 2 * len as isize - 2;
        let i = i.rem_euclid(period);
        if i < len as isize {
            i as usize
        } else {
            (period - i) as usize
        }
    }

    /// Maps index `i` to a valid index i.e. within `[0, len)` according to the padding mode.
    ///
    /// - `Replicate`: clamp to edge
    /// - `Reflect`: mirror including edge
    /// - `Reflect101`: mirror excluding edge
    /// - `Wrap`: circular wrap
    /// - `Constant`: `None` outside the valid range
    ///
    /// Returns `None` when the index falls in a constant border or `len` is zero.
    #[inline]
    pub fn map_index(&self, i: isize, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        if (0..len as isize).contains(&i) {
            return Some(i as usize);
        }
        match self {
            PaddingMode::Constant(_) => None,
            PaddingMode::Replicate => Some(i.clamp(0, len as isize - 1) as usize),
            PaddingMode::Reflect => Some(Self::reflect(i, len)),
            PaddingMode::Reflect101 => Some(Self::reflect101(i, len)),
            PaddingMode::Wrap => Some(i.rem_euclid(len as isize) as usize),
        }
    }

    /// The fill value of a constant border, zero for every other mode.
    #[inline]
    pub fn constant_value(&self) -> f64 {
        match self {
            PaddingMode::Constant(v) => *v,
            _ => 0.0,
        }
    }
}

/// Pads an N-dimensional tensor along every axis.
///
/// # Arguments
///
/// * `src` - The tensor to pad.
/// * `pad_width` - The `(before, after)` number of elements to add per axis.
/// * `mode` - The border handling, see [`PaddingMode`].
///
/// # Errors
///
/// Returns [`TensorError::CastError`] if a constant border value cannot be
/// represented in `T`.
///
/// # Example
///
/// ```rust
/// use limen_tensor::Tensor;
/// use limen_imgproc::padding::{pad, PaddingMode};
///
/// let src = Tensor::<u8, 1>::from_shape_vec([4], vec![1, 2, 3, 4]).unwrap();
/// let dst = pad(&src, [(2, 2)], PaddingMode::Reflect101).unwrap();
/// assert_eq!(dst.as_slice(), &[3, 2, 1, 2, 3, 4, 3, 2]);
/// ```
pub fn pad<T, const N: usize>(
    src: &Tensor<T, N>,
    pad_width: [(usize, usize); N],
    mode: PaddingMode,
) -> Result<Tensor<T, N>, ThresholdError>
where
    T: Copy + Default + Send + Sync + num_traits::NumCast,
{
    let fill: T = match mode {
        PaddingMode::Constant(v) => {
            <T as num_traits::NumCast>::from(v).ok_or(TensorError::CastError)?
        }
        _ => T::default(),
    };

    let mut new_shape = src.shape;
    for (dim, (before, after)) in new_shape.iter_mut().zip(pad_width) {
        *dim += before + after;
    }

    let mut dst = Tensor::<T, N>::from_shape_val(new_shape, fill);
    if src.is_empty() {
        return Ok(dst);
    }

    let dst_strides = dst.strides;
    let src_data = src.as_slice();

    parallel::execute_indexed(
        dst.as_slice_mut(),
        |offset, out| {
            let mut rem = offset;
            let mut src_offset = 0;
            for axis in 0..N {
                let i = (rem / dst_strides[axis]) as isize - pad_width[axis].0 as isize;
                rem %= dst_strides[axis];
                match mode.map_index(i, src.shape[axis]) {
                    Some(j) => src_offset += j * src.strides[axis],
                    None => return,
                }
            }
            *out = src_data[src_offset];
        },
    );

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use limen_tensor::Tensor2;

    fn make_src_2x2() -> Result<Tensor2<u8>, TensorError> {
        Tensor2::from_shape_vec([2, 2], vec![1, 2, 3, 4])
    }

    #[test]
    fn test_map_index() {
        let len = 4;
        let reflect: Vec<_> = (-3..7)
            .map(|i| PaddingMode::Reflect.map_index(i, len))
            .collect::<Option<_>>()
            .unwrap_or_default();
        assert_eq!(reflect, vec![2, 1, 0, 0, 1, 2, 3, 3, 2, 1]);

        let reflect101: Vec<_> = (-3..7)
            .map(|i| PaddingMode::Reflect101.map_index(i, len))
            .collect::<Option<_>>()
            .unwrap_or_default();
        assert_eq!(reflect101, vec![3, 2, 1, 0, 1, 2, 3, 2, 1, 0]);

        let wrap: Vec<_> = (-3..7)
            .map(|i| PaddingMode::Wrap.map_index(i, len))
            .collect::<Option<_>>()
            .unwrap_or_default();
        assert_eq!(wrap, vec![1, 2, 3, 0, 1, 2, 3, 0, 1, 2]);

        assert_eq!(PaddingMode::Replicate.map_index(-5, len), Some(0));
        assert_eq!(PaddingMode::Constant(0.0).map_index(-1, len), None);
        assert_eq!(PaddingMode::Constant(0.0).map_index(2, len), Some(2));
        assert_eq!(PaddingMode::Reflect.map_index(0, 0), None);
    }

    #[test]
    fn test_pad_constant() -> Result<(), ThresholdError> {
        let src = make_src_2x2()?;
        let dst = pad(&src, [(1, 1), (1, 1)], PaddingMode::Constant(9.0))?;
        assert_eq!(dst.shape, [4, 4]);
        assert_eq!(
            dst.as_slice(),
            &[
                9, 9, 9, 9,
                9, 1, 2, 9,
                9, 3, 4, 9,
                9, 9, 9, 9,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_pad_constant_not_representable() -> Result<(), ThresholdError> {
        let src = make_src_2x2()?;
        let res = pad(&src, [(1, 1), (1, 1)], PaddingMode::Constant(-1.0));
        assert_eq!(res, Err(ThresholdError::Tensor(TensorError::CastError)));
        Ok(())
    }

    #[test]
    fn test_pad_replicate() -> Result<(), ThresholdError> {
        let src = make_src_2x2()?;
        let dst = pad(&src, [(1, 1), (1, 1)], PaddingMode::Replicate)?;
        assert_eq!(
            dst.as_slice(),
            &[
                1, 1, 2, 2,
                1, 1, 2, 2,
                3, 3, 4, 4,
                3, 3, 4, 4,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_pad_reflect101() -> Result<(), ThresholdError> {
        let src = make_src_2x2()?;
        let dst = pad(&src, [(1, 1), (1, 1)], PaddingMode::Reflect101)?;
        assert_eq!(
            dst.as_slice(),
            &[
                4, 3, 4, 3,
                2, 1, 2, 1,
                4, 3, 4, 3,
                2, 1, 2, 1,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_pad_wrap_asymmetric() -> Result<(), ThresholdError> {
        let src = make_src_2x2()?;
        let dst = pad(&src, [(0, 1), (2, 0)], PaddingMode::Wrap)?;
        assert_eq!(dst.shape, [3, 4]);
        assert_eq!(
            dst.as_slice(),
            &[
                1, 2, 1, 2,
                3, 4, 3, 4,
                1, 2, 1, 2,
            ]
        );
        Ok(())
    }

    #[test]
    fn test_pad_larger_than_tensor() -> Result<(), ThresholdError> {
        let src = Tensor::<f32, 3>::from_shape_val([1, 1, 1], 7.0);
        let dst = pad(&src, [(2, 2), (3, 1), (0, 4)], PaddingMode::Reflect)?;
        assert_eq!(dst.shape, [5, 5, 5]);
        assert!(dst.iter().all(|&v| v == 7.0));
        Ok(())
    }
}
