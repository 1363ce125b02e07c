//! Threshold selection
//!
//! Global methods pick one intensity for the whole image, either from its
//! histogram or by iterating on the samples. Local methods compute one threshold
//! per pixel from a neighbourhood statistic.

use limen_tensor::{Pixel, Tensor};

use crate::error::ThresholdError;
use crate::histogram::{histogram, Histogram, HistogramSource};

/// Histogram based global thresholds.
mod global;
pub use global::*;

/// Hysteresis thresholding.
mod hysteresis;
pub use hysteresis::*;

/// Minimum cross-entropy thresholding.
mod li;
pub use li::*;

/// Local adaptive thresholds.
mod local;
pub use local::*;

/// The data a global threshold is selected from.
#[derive(Debug, Clone, Copy)]
pub enum ThresholdInput<'a, T, const N: usize> {
    /// An image whose histogram is computed on demand.
    Image(&'a Tensor<T, N>),
    /// A precomputed histogram, trimmed of its empty ends before use.
    Histogram(&'a Histogram),
}

impl<'a, T: Pixel, const N: usize> ThresholdInput<'a, T, N> {
    /// The image, if one was given.
    pub fn image(&self) -> Option<&'a Tensor<T, N>> {
        match *self {
            ThresholdInput::Image(image) => Some(image),
            ThresholdInput::Histogram(_) => None,
        }
    }

    /// Resolve the input into a histogram with non-empty first and last bins.
    pub(crate) fn histogram(&self, nbins: usize, normalize: bool) -> Result<Histogram, ThresholdError> {
        match self {
            ThresholdInput::Image(image) => histogram(
                image.as_slice(),
                nbins,
                HistogramSource::Image,
                normalize,
            ),
            ThresholdInput::Histogram(hist) => {
                if hist.counts.len() != hist.bin_centers.len() {
                    return Err(ThresholdError::shape_mismatch(
                        &[hist.counts.len()],
                        &[hist.bin_centers.len()],
                    ));
                }
                let trimmed = hist.trimmed();
                if trimmed.is_empty() {
                    return Err(ThresholdError::EmptyHistogram);
                }
                Ok(trimmed)
            }
        }
    }
}

impl<'a, T, const N: usize> From<&'a Tensor<T, N>> for ThresholdInput<'a, T, N> {
    fn from(image: &'a Tensor<T, N>) -> Self {
        ThresholdInput::Image(image)
    }
}

impl<'a, T, const N: usize> From<&'a Histogram> for ThresholdInput<'a, T, N> {
    fn from(hist: &'a Histogram) -> Self {
        ThresholdInput::Histogram(hist)
    }
}

/// Resolve window sizes into one odd extent per axis.
///
/// A single value is broadcast to every axis.
///
/// # Errors
///
/// Returns [`ThresholdError::WindowDimensionMismatch`] if `window` has neither one
/// nor `N` values and [`ThresholdError::InvalidWindowSize`] if any extent is even
/// or zero.
///
/// # Example
///
/// ```
/// use limen_imgproc::threshold::resolve_window;
///
/// assert_eq!(resolve_window::<3>(&[5]).unwrap(), [5, 5, 5]);
/// assert_eq!(resolve_window::<2>(&[1, 7]).unwrap(), [1, 7]);
/// assert!(resolve_window::<2>(&[4]).is_err());
/// ```
pub fn resolve_window<const N: usize>(window: &[usize]) -> Result<[usize; N], ThresholdError> {
    let resolved: [usize; N] = match window.len() {
        1 => [window[0]; N],
        n if n == N => {
            let mut out = [0; N];
            out.copy_from_slice(window);
            out
        }
        _ => {
            return Err(ThresholdError::WindowDimensionMismatch {
                window: window.to_vec(),
                ndim: N,
            })
        }
    };

    if resolved.iter().any(|&w| w == 0 || w % 2 == 0) {
        return Err(ThresholdError::InvalidWindowSize(resolved.to_vec()));
    }

    Ok(resolved)
}

/// Warn when an image looks like it carries color channels.
pub(crate) fn warn_if_rgb<T, const N: usize>(image: &Tensor<T, N>, method: &str) {
    if N > 2 && matches!(image.shape[N - 1], 3 | 4) {
        log::warn!(
            "{method} is expected to work correctly only for grayscale images; \
             image shape {:?} looks like that of an RGB image",
            image.shape
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_window() -> Result<(), ThresholdError> {
        assert_eq!(resolve_window::<2>(&[15])?, [15, 15]);
        assert_eq!(resolve_window::<3>(&[1, 5, 5])?, [1, 5, 5]);

        assert_eq!(
            resolve_window::<2>(&[3, 4]),
            Err(ThresholdError::InvalidWindowSize(vec![3, 4]))
        );
        assert_eq!(
            resolve_window::<2>(&[0]),
            Err(ThresholdError::InvalidWindowSize(vec![0, 0]))
        );
        assert_eq!(
            resolve_window::<2>(&[3, 3, 3]),
            Err(ThresholdError::WindowDimensionMismatch {
                window: vec![3, 3, 3],
                ndim: 2
            })
        );
        assert!(resolve_window::<2>(&[]).is_err());
        Ok(())
    }

    #[test]
    fn test_histogram_input_is_trimmed() -> Result<(), ThresholdError> {
        let hist = Histogram::from_counts(vec![0.0, 2.0, 0.0, 1.0, 0.0]);
        let input = ThresholdInput::<u8, 2>::Histogram(&hist);
        assert!(input.image().is_none());
        let resolved = input.histogram(256, false)?;
        assert_eq!(resolved.counts, vec![2.0, 0.0, 1.0]);
        assert_eq!(resolved.bin_centers, vec![1.0, 2.0, 3.0]);

        let empty = Histogram::from_counts(vec![0.0; 4]);
        assert_eq!(
            ThresholdInput::<u8, 2>::Histogram(&empty).histogram(256, false),
            Err(ThresholdError::EmptyHistogram)
        );
        Ok(())
    }
}
