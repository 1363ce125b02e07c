use std::str::FromStr;

use limen_tensor::{FloatPixel, Pixel, Tensor};

use super::resolve_window;
use crate::error::ThresholdError;
use crate::filter::{gaussian_filter, median_filter, uniform_filter};
use crate::integral::{correlate_sparse, integral_image, SparseKernel};
use crate::padding::{pad, PaddingMode};
use crate::parallel;

/// Compute the local mean and standard deviation of every pixel.
///
/// The statistics are taken over a rectangular window centered on each pixel, with
/// the image mirrored at its borders (`d c b | a b c d`). Both fields come from two
/// integral images, so the cost does not depend on the window size.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `window` - Odd window extents, one value or one per axis.
///
/// # Returns
///
/// The `(mean, std)` fields, shaped like `image`. The standard deviation is never
/// negative.
///
/// # Errors
///
/// Returns an error if the window is even, zero or has the wrong number of values.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::mean_std;
///
/// let image = Tensor::<u8, 2>::from_shape_val([4, 5], 10);
/// let (mean, std) = mean_std(&image, &[3]).unwrap();
/// assert!(mean.iter().all(|&m| (m - 10.0).abs() < 1e-4));
/// assert!(std.iter().all(|&s| s.abs() < 1e-2));
/// ```
pub fn mean_std<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    window: &[usize],
) -> Result<(Tensor<T::Float, N>, Tensor<T::Float, N>), ThresholdError> {
    let window = resolve_window::<N>(window)?;

    let src = image.map(|&x| x.as_f64());
    let padded = pad(&src, window.map(|w| (w / 2, w / 2)), PaddingMode::Reflect101)?;

    // keep the integral images in f64, the sums are narrowed afterwards
    let integral = integral_image(&padded)?;
    let integral_sq = integral_image(&padded.map(|&x| x * x))?;

    let kernel = SparseKernel::window_sum(window);
    let sums = correlate_sparse(&integral, &kernel)?;
    let sums_sq = correlate_sparse(&integral_sq, &kernel)?;

    let total = window.iter().product::<usize>() as f64;
    let (sums, sums_sq) = (sums.as_slice(), sums_sq.as_slice());

    let mut mean = Tensor::<T::Float, N>::zeros(image.shape);
    parallel::execute_indexed(mean.as_slice_mut(), |i, m| {
        *m = <T::Float as FloatPixel>::from_f64(sums[i] / total);
    });

    let mut std = Tensor::<T::Float, N>::zeros(image.shape);
    parallel::execute_indexed(std.as_slice_mut(), |i, s| {
        let m = sums[i] / total;
        let variance = sums_sq[i] / total - m * m;
        // rounding can push the variance slightly below zero
        let variance = if variance < 0.0 { 0.0 } else { variance };
        *s = <T::Float as FloatPixel>::from_f64(variance.sqrt());
    });

    Ok((mean, std))
}

/// Combine two equally shaped fields element by element.
fn combine<F: FloatPixel, const N: usize>(
    a: &Tensor<F, N>,
    b: &Tensor<F, N>,
    op: impl Fn(F, F) -> F + Sync + Send,
) -> Result<Tensor<F, N>, ThresholdError> {
    let mut dst = Tensor::<F, N>::zeros(a.shape);
    let (a, b) = (a.as_slice(), b.as_slice());
    parallel::execute_indexed(dst.as_slice_mut(), |i, d| {
        *d = op(a[i], b[i]);
    });
    Ok(dst)
}

/// Applies Niblack local thresholding to an image.
///
/// The threshold of every pixel is `T = m - k * s`, where `m` and `s` are the mean
/// and standard deviation of its `window` neighbourhood.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `window` - Odd window extents, one value or one per axis.
/// * `k` - The weight of the standard deviation.
///
/// # Returns
///
/// The threshold field, shaped like `image`.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::threshold_niblack;
///
/// let image = Tensor::<f32, 2>::from_shape_fn([8, 8], |[i, j]| (i + j) as f32);
/// let thresh = threshold_niblack(&image, &[3], 0.2).unwrap();
/// assert_eq!(thresh.shape, image.shape);
/// ```
pub fn threshold_niblack<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    window: &[usize],
    k: f64,
) -> Result<Tensor<T::Float, N>, ThresholdError> {
    let (m, s) = mean_std(image, window)?;
    let k = <T::Float as FloatPixel>::from_f64(k);
    combine(&m, &s, |m, s| m - k * s)
}

/// Applies Sauvola local thresholding to an image.
///
/// The threshold of every pixel is `T = m * (1 + k * (s / R - 1))`, where `m` and
/// `s` are the mean and standard deviation of its `window` neighbourhood and `R`
/// is the dynamic range of the standard deviation.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `window` - Odd window extents, one value or one per axis.
/// * `k` - The weight of the normalized standard deviation.
/// * `r` - The dynamic range `R`, half the range of the pixel type if `None`.
///
/// # Returns
///
/// The threshold field, shaped like `image`.
pub fn threshold_sauvola<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    window: &[usize],
    k: f64,
    r: Option<f64>,
) -> Result<Tensor<T::Float, N>, ThresholdError> {
    let r = r.unwrap_or_else(|| {
        let (lo, hi) = T::dtype_range();
        0.5 * (hi - lo)
    });
    let (m, s) = mean_std(image, window)?;
    let one = <T::Float as FloatPixel>::from_f64(1.0);
    let k = <T::Float as FloatPixel>::from_f64(k);
    let r = <T::Float as FloatPixel>::from_f64(r);
    combine(&m, &s, |m, s| m * (one + k * (s / r - one)))
}

/// The neighbourhood statistic used by [`threshold_local`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocalMethod {
    /// Gaussian weighted mean.
    Gaussian {
        /// The standard deviation per axis, `(block - 1) / 6` if `None`.
        sigma: Option<Vec<f64>>,
    },
    /// Arithmetic mean of the block.
    Mean,
    /// Median of the block.
    Median,
    /// A user supplied statistic. Not supported.
    Generic,
}

impl Default for LocalMethod {
    fn default() -> Self {
        LocalMethod::Gaussian { sigma: None }
    }
}

impl FromStr for LocalMethod {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gaussian" => Ok(LocalMethod::Gaussian { sigma: None }),
            "mean" => Ok(LocalMethod::Mean),
            "median" => Ok(LocalMethod::Median),
            "generic" => Ok(LocalMethod::Generic),
            other => Err(ThresholdError::InvalidMethod(other.to_string())),
        }
    }
}

/// Parameters of [`threshold_local`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalThresholdParams {
    /// Odd block extents, one value or one per axis.
    pub block_size: Vec<usize>,
    /// The neighbourhood statistic.
    pub method: LocalMethod,
    /// Subtracted from the statistic to obtain the threshold.
    pub offset: f64,
    /// The border handling.
    pub mode: PaddingMode,
}

impl Default for LocalThresholdParams {
    fn default() -> Self {
        Self {
            block_size: vec![3],
            method: LocalMethod::default(),
            offset: 0.0,
            mode: PaddingMode::Reflect,
        }
    }
}

/// Compute a threshold mask image based on local pixel neighborhood.
///
/// The threshold of every pixel is a statistic of its block neighbourhood minus
/// `params.offset`.
///
/// # Errors
///
/// Returns an error if the block size is invalid and
/// [`ThresholdError::Unsupported`] for [`LocalMethod::Generic`].
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::{threshold_local, LocalMethod, LocalThresholdParams};
///
/// let image = Tensor::<u8, 2>::from_shape_fn([6, 6], |[i, j]| (10 * i + j) as u8);
/// let params = LocalThresholdParams {
///     block_size: vec![3],
///     method: "mean".parse().unwrap(),
///     ..Default::default()
/// };
/// let thresh = threshold_local(&image, &params).unwrap();
/// assert!((thresh.get([2, 2]).unwrap() - 22.0).abs() < 1e-4);
/// ```
pub fn threshold_local<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    params: &LocalThresholdParams,
) -> Result<Tensor<T::Float, N>, ThresholdError> {
    let block = resolve_window::<N>(&params.block_size)?;
    let src = image.map(|&x| x.as_f64());

    let filtered = match &params.method {
        LocalMethod::Generic => {
            return Err(ThresholdError::Unsupported(
                "the generic local threshold method is not implemented".to_string(),
            ))
        }
        LocalMethod::Gaussian { sigma } => {
            let sigma = sigma
                .clone()
                .unwrap_or_else(|| block.iter().map(|&b| (b - 1) as f64 / 6.0).collect());
            gaussian_filter(&src, &sigma, params.mode)?
        }
        LocalMethod::Mean => uniform_filter(&src, &block, params.mode)?,
        LocalMethod::Median => median_filter(&src, &block, params.mode)?,
    };

    let offset = params.offset;
    Ok(filtered.map(|&v| <T::Float as FloatPixel>::from_f64(v - offset)))
}
