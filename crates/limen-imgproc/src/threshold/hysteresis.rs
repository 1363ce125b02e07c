use limen_tensor::{Pixel, Tensor};

use crate::error::ThresholdError;
use crate::label::label;
use crate::parallel;

/// A threshold level, shared by every pixel or given per pixel.
#[derive(Debug, Clone, Copy)]
pub enum Level<'a, const N: usize> {
    /// The same level everywhere.
    Scalar(f64),
    /// One level per pixel, shaped like the image.
    PerPixel(&'a Tensor<f64, N>),
}

impl<const N: usize> Level<'_, N> {
    #[inline]
    fn at(&self, offset: usize) -> f64 {
        match self {
            Level::Scalar(v) => *v,
            Level::PerPixel(t) => t.as_slice()[offset],
        }
    }

    fn check_shape(&self, shape: [usize; N]) -> Result<(), ThresholdError> {
        match self {
            Level::PerPixel(t) if t.shape != shape => {
                Err(ThresholdError::shape_mismatch(&shape, &t.shape))
            }
            _ => Ok(()),
        }
    }
}

impl<const N: usize> From<f64> for Level<'_, N> {
    fn from(v: f64) -> Self {
        Level::Scalar(v)
    }
}

impl<'a, const N: usize> From<&'a Tensor<f64, N>> for Level<'a, N> {
    fn from(t: &'a Tensor<f64, N>) -> Self {
        Level::PerPixel(t)
    }
}

/// Apply hysteresis thresholding to an image.
///
/// Pixels above `high` are foreground, and so are pixels above `low` that are
/// connected to one of them through other pixels above `low`. Connectivity is
/// face to face. Wherever `low` exceeds `high` it is lowered to `high`.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `low` - The lower threshold.
/// * `high` - The upper threshold.
///
/// # Returns
///
/// The foreground mask.
///
/// # Errors
///
/// Returns [`ThresholdError::ShapeMismatch`] if a per-pixel level is not shaped
/// like the image.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::{apply_hysteresis_threshold, Level};
///
/// let image = Tensor::<u8, 1>::from_shape_vec([5], vec![3, 1, 2, 3, 2]).unwrap();
/// let mask = apply_hysteresis_threshold(&image, Level::Scalar(1.5), Level::Scalar(2.5)).unwrap();
/// assert_eq!(mask.as_slice(), &[true, false, true, true, true]);
/// ```
pub fn apply_hysteresis_threshold<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    low: Level<'_, N>,
    high: Level<'_, N>,
) -> Result<Tensor<bool, N>, ThresholdError> {
    low.check_shape(image.shape)?;
    high.check_shape(image.shape)?;

    let src = image.as_slice();

    let mut mask_low = Tensor::<bool, N>::from_shape_val(image.shape, false);
    parallel::execute_indexed(mask_low.as_slice_mut(), |i, m| {
        let (l, h) = (low.at(i), high.at(i));
        let l = if l > h { h } else { l };
        *m = src[i].as_f64() > l;
    });

    let mut mask_high = vec![false; image.numel()];
    parallel::execute_indexed(&mut mask_high, |i, m| {
        *m = src[i].as_f64() > high.at(i);
    });

    let (labels, count) = label(&mask_low, 1)?;
    log::debug!("hysteresis: {count} candidate regions");

    // a region survives if any of its pixels is above the high threshold
    let mut keep = vec![false; count + 1];
    for (&l, &h) in labels.iter().zip(mask_high.iter()) {
        if h {
            keep[l as usize] = true;
        }
    }
    keep[0] = false;

    Ok(labels.map(|&l| keep[l as usize]))
}
