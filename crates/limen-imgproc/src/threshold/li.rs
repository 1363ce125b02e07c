use std::fmt;

use limen_tensor::{Pixel, Tensor};

use crate::error::ThresholdError;
use crate::histogram::{histogram, unit_bin_edges, HistogramSource, MAX_UNIT_BINS};

/// Keeps the logarithms finite when a class mean is zero.
const LOG_EPSILON: f64 = 100.0 * f64::EPSILON;

/// How the first estimate of the Li iteration is chosen.
#[derive(Clone, Copy, Default)]
pub enum InitialGuess<'a> {
    /// The mean of the image.
    #[default]
    Mean,
    /// A fixed intensity, strictly between the image minimum and maximum.
    Fixed(f64),
    /// A function of the finite samples, shifted so that their minimum is zero.
    Seeded(&'a (dyn Fn(&[f64]) -> f64 + Sync)),
}

impl fmt::Debug for InitialGuess<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialGuess::Mean => write!(f, "Mean"),
            InitialGuess::Fixed(v) => f.debug_tuple("Fixed").field(v).finish(),
            InitialGuess::Seeded(_) => write!(f, "Seeded(<fn>)"),
        }
    }
}

/// Parameters of [`threshold_li`].
#[derive(Debug, Clone, Copy)]
pub struct LiParams<'a> {
    /// Stop once two estimates differ by less than this.
    ///
    /// Defaults to half the smallest gap between distinct intensities, or `0.5`
    /// for integer images. Zero is treated as unset.
    pub tolerance: Option<f64>,
    /// The first estimate.
    pub initial_guess: InitialGuess<'a>,
    /// Give up after this many iterations; `None` iterates without bound.
    pub max_iterations: Option<usize>,
}

impl Default for LiParams<'_> {
    fn default() -> Self {
        Self {
            tolerance: None,
            initial_guess: InitialGuess::Mean,
            max_iterations: Some(10_000),
        }
    }
}

/// Mean of the samples above `t` and of the remaining ones.
fn class_means(samples: &[f64], t: f64) -> (f64, f64) {
    let (mut fore, mut n_fore, mut back, mut n_back) = (0.0, 0usize, 0.0, 0usize);
    for &v in samples {
        if v > t {
            fore += v;
            n_fore += 1;
        } else {
            back += v;
            n_back += 1;
        }
    }
    (fore / n_fore as f64, back / n_back as f64)
}

/// Weighted mean of the bin centers above `t` and of the remaining ones.
fn class_means_weighted(counts: &[f64], centers: &[f64], t: f64) -> (f64, f64) {
    let (mut fore, mut w_fore, mut back, mut w_back) = (0.0, 0.0, 0.0, 0.0);
    for (&c, &b) in counts.iter().zip(centers) {
        if b > t {
            fore += c * b;
            w_fore += c;
        } else {
            back += c * b;
            w_back += c;
        }
    }
    (fore / w_fore, back / w_back)
}

/// Half of the smallest gap between two distinct values.
fn half_min_gap(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    sorted.dedup();
    sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min)
        / 2.0
}

/// Compute threshold value by Li's iterative Minimum Cross Entropy method.
///
/// The threshold `t` is refined with
/// `t = (mb - mf) / (ln(mb) - ln(mf))` where `mf` and `mb` are the mean
/// intensities above and below the current estimate, until it moves by less than
/// the tolerance.
///
/// NaN values are ignored. An image without any other value gives NaN, a constant
/// image gives its value and an image without finite values gives `0.0`.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `params` - Tolerance, first estimate and iteration budget.
/// * `callback` - Called with the first estimate and after every iteration with
///   the new estimate.
///
/// # Errors
///
/// Returns [`ThresholdError::InitialGuessOutOfRange`] for a fixed first estimate
/// outside the image range and [`ThresholdError::NotConverged`] once the
/// iteration budget is spent.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::{threshold_li, LiParams};
///
/// let image = Tensor::<u8, 1>::from_shape_vec([6], vec![10, 12, 11, 200, 210, 205]).unwrap();
/// let t = threshold_li(&image, &LiParams::default(), None).unwrap();
/// assert!(t > 12.0 && t < 200.0);
/// ```
pub fn threshold_li<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    params: &LiParams<'_>,
    mut callback: Option<&mut dyn FnMut(f64)>,
) -> Result<f64, ThresholdError> {
    let samples: Vec<f64> = image
        .iter()
        .map(|x| x.as_f64())
        .filter(|v| !v.is_nan())
        .collect();

    let Some(&first) = samples.first() else {
        return Ok(f64::NAN);
    };
    if samples.iter().all(|&v| v == first) {
        return Ok(first);
    }

    let samples: Vec<f64> = samples.into_iter().filter(|v| v.is_finite()).collect();
    if samples.is_empty() {
        return Ok(0.0);
    }

    let image_min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let shifted: Vec<f64> = samples.iter().map(|v| v - image_min).collect();
    let shifted_max = shifted.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if shifted_max == 0.0 {
        // a single finite level next to infinities
        return Ok(image_min);
    }

    let tolerance = match params.tolerance {
        Some(tol) if tol != 0.0 => tol,
        _ if T::is_integer() => 0.5,
        _ => half_min_gap(&shifted),
    };

    let mut t_next = match params.initial_guess {
        InitialGuess::Mean => shifted.iter().sum::<f64>() / shifted.len() as f64,
        InitialGuess::Seeded(f) => f(&shifted),
        InitialGuess::Fixed(guess) => {
            let t = guess - image_min;
            if !(0.0 < t && t < shifted_max) {
                return Err(ThresholdError::InitialGuessOutOfRange {
                    guess,
                    min: image_min,
                    max: shifted_max + image_min,
                });
            }
            t
        }
    };

    // narrow integer ranges iterate on their histogram instead of the samples
    let weighted = if T::is_integer() && shifted_max < MAX_UNIT_BINS as f64 {
        let nbins = shifted_max as usize + 1;
        let hist = histogram(image.as_slice(), nbins, HistogramSource::Image, false)?;
        let centers: Vec<f64> = hist.bin_centers.iter().map(|b| b - image_min).collect();
        Some((hist.counts, centers))
    } else {
        None
    };

    let mut t_curr = -2.0 * tolerance;
    if let Some(cb) = callback.as_deref_mut() {
        cb(t_next + image_min);
    }

    let mut iterations = 0;
    while (t_next - t_curr).abs() > tolerance {
        if params.max_iterations.is_some_and(|max| iterations >= max) {
            return Err(ThresholdError::NotConverged { iterations });
        }
        iterations += 1;

        t_curr = t_next;
        let (mean_fore, mean_back) = match &weighted {
            Some((counts, centers)) => class_means_weighted(counts, centers, t_curr),
            None => class_means(&shifted, t_curr),
        };

        t_next = (mean_back - mean_fore)
            / ((mean_back + LOG_EPSILON).ln() - (mean_fore + LOG_EPSILON).ln());

        log::debug!(
            "li iteration {iterations}: threshold {} -> {}",
            t_curr + image_min,
            t_next + image_min
        );

        if let Some(cb) = callback.as_deref_mut() {
            cb(t_next + image_min);
        }
    }

    Ok(t_next + image_min)
}

/// The cross-entropy between an image and its thresholded version.
///
/// This is the quantity minimized by [`threshold_li`]. The image is binned on
/// `bins` as a probability density; the classes are split at the first bin whose
/// center exceeds `threshold`.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `threshold` - The threshold to evaluate.
/// * `bins` - Increasing bin edges, unit bins over `0..=255` if `None`.
///
/// # Errors
///
/// Returns [`ThresholdError::InvalidHistogramBins`] if fewer than two edges are
/// given and [`ThresholdError::NoThresholdFound`] if no bin center exceeds
/// `threshold`.
pub fn cross_entropy<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    threshold: f64,
    bins: Option<&[f64]>,
) -> Result<f64, ThresholdError> {
    let default_edges;
    let edges = match bins {
        Some(edges) => edges,
        None => {
            default_edges = unit_bin_edges(0, 255);
            &default_edges
        }
    };
    if edges.len() < 2 {
        return Err(ThresholdError::InvalidHistogramBins(edges.len()));
    }
    let nbins = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[nbins]);

    let mut counts = vec![0.0; nbins];
    for v in image.iter().map(|x| x.as_f64()) {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let idx = edges.partition_point(|&e| e <= v).saturating_sub(1).min(nbins - 1);
        counts[idx] += 1.0;
    }

    let total: f64 = counts.iter().sum();
    let density: Vec<f64> = counts
        .iter()
        .zip(edges.windows(2))
        .map(|(&c, w)| c / (total * (w[1] - w[0])))
        .collect();
    let centers: Vec<f64> = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();

    let t = centers
        .iter()
        .position(|&c| c > threshold)
        .ok_or(ThresholdError::NoThresholdFound)?;

    let m0a: f64 = density[..t].iter().sum();
    let m0b: f64 = density[t..].iter().sum();
    let m1a: f64 = density[..t].iter().zip(&centers[..t]).map(|(d, c)| d * c).sum();
    let m1b: f64 = density[t..].iter().zip(&centers[t..]).map(|(d, c)| d * c).sum();

    Ok(-m1a * (m1a / m0a).ln() - m1b * (m1b / m0b).ln())
}
