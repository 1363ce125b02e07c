use limen_tensor::{Pixel, Tensor, Tensor1};

use super::{threshold_li, warn_if_rgb, LiParams, ThresholdInput};
use crate::error::ThresholdError;
use crate::filter::uniform_filter;
use crate::histogram::Histogram;
use crate::padding::PaddingMode;
use crate::parallel;

/// Default number of bins for float images.
pub const DEFAULT_NBINS: usize = 256;

/// Default smoothing budget of [`threshold_minimum`].
pub const DEFAULT_MINIMUM_ITERATIONS: usize = 10_000;

fn cumsum(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Cumulative sums taken from the last element backwards.
fn cumsum_rev(values: &[f64]) -> Vec<f64> {
    let mut out = cumsum(values.iter().rev().copied());
    out.reverse();
    out
}

/// Index of the first maximum, NaN entries are skipped.
fn argmax(values: impl IntoIterator<Item = f64>) -> Option<usize> {
    values
        .into_iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f64)>, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// The value of an image input whose pixels are all equal.
fn constant_value<T: Pixel, const N: usize>(input: &ThresholdInput<'_, T, N>) -> Option<f64> {
    let image = input.image()?;
    let first = *image.as_slice().first()?;
    image.iter().all(|&v| v == first).then(|| first.as_f64())
}

fn warn_rgb_input<T, const N: usize>(input: &ThresholdInput<'_, T, N>, method: &str)
where
    T: Pixel,
{
    if let Some(image) = input.image() {
        warn_if_rgb(image, method);
    }
}

/// Return threshold value based on Otsu's method.
///
/// The threshold maximizes the between-class variance of the two classes it
/// splits the histogram into.
///
/// # Arguments
///
/// * `input` - The image or a precomputed histogram.
/// * `nbins` - Number of bins for float images, ignored for integer images spanning at most
///   [`MAX_UNIT_BINS`](crate::histogram::MAX_UNIT_BINS) values.
///
/// # Returns
///
/// The upper threshold value: pixels above it are foreground. A constant image
/// returns its value.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::{threshold_otsu, ThresholdInput};
///
/// let image = Tensor::<u8, 1>::from_shape_vec([6], vec![10, 11, 12, 200, 201, 202]).unwrap();
/// let t = threshold_otsu(ThresholdInput::Image(&image), 256).unwrap();
/// assert!((12.0..200.0).contains(&t));
/// ```
pub fn threshold_otsu<T: Pixel, const N: usize>(
    input: ThresholdInput<'_, T, N>,
    nbins: usize,
) -> Result<f64, ThresholdError> {
    warn_rgb_input(&input, "threshold_otsu");
    if let Some(value) = constant_value(&input) {
        return Ok(value);
    }

    let Histogram {
        counts,
        bin_centers,
    } = input.histogram(nbins, false)?;
    if counts.len() == 1 {
        return Ok(bin_centers[0]);
    }

    let moments: Vec<f64> = counts.iter().zip(&bin_centers).map(|(c, b)| c * b).collect();
    let weight1 = cumsum(counts.iter().copied());
    let weight2 = cumsum_rev(&counts);
    let mean1: Vec<f64> = cumsum(moments.iter().copied())
        .iter()
        .zip(&weight1)
        .map(|(m, w)| m / w)
        .collect();
    let mean2: Vec<f64> = cumsum_rev(&moments)
        .iter()
        .zip(&weight2)
        .map(|(m, w)| m / w)
        .collect();

    let n = counts.len();
    let variance = (0..n - 1).map(|i| {
        let d = mean1[i] - mean2[i + 1];
        weight1[i] * weight2[i + 1] * d * d
    });

    let idx = argmax(variance).ok_or(ThresholdError::NoThresholdFound)?;
    Ok(bin_centers[idx])
}

/// Return threshold value based on Yen's method.
///
/// The threshold maximizes the entropic correlation of the two classes.
///
/// # Arguments
///
/// * `input` - The image or a precomputed histogram.
/// * `nbins` - Number of bins for float images, ignored for integer images spanning at most
///   [`MAX_UNIT_BINS`](crate::histogram::MAX_UNIT_BINS) values.
pub fn threshold_yen<T: Pixel, const N: usize>(
    input: ThresholdInput<'_, T, N>,
    nbins: usize,
) -> Result<f64, ThresholdError> {
    warn_rgb_input(&input, "threshold_yen");
    if let Some(value) = constant_value(&input) {
        return Ok(value);
    }

    let hist = input.histogram(nbins, false)?;
    if hist.len() == 1 {
        return Ok(hist.bin_centers[0]);
    }

    let pmf = hist.normalized().counts;
    let p1 = cumsum(pmf.iter().copied());
    let p1_sq = cumsum(pmf.iter().map(|p| p * p));
    let p2_sq = cumsum_rev(&pmf.iter().map(|p| p * p).collect::<Vec<_>>());

    let criterion = (0..pmf.len() - 1).map(|i| {
        let spread = p1[i] * (1.0 - p1[i]);
        ((p1_sq[i] * p2_sq[i + 1]).recip() * spread * spread).ln()
    });

    let idx = argmax(criterion).ok_or(ThresholdError::NoThresholdFound)?;
    Ok(hist.bin_centers[idx])
}

fn isodata_candidates(hist: &Histogram) -> Vec<f64> {
    let (counts, centers) = (&hist.counts, &hist.bin_centers);
    let n = counts.len();

    let csum_low = cumsum(counts.iter().copied());
    let total = csum_low[n - 1];
    let csum_intensity = cumsum(counts.iter().zip(centers).map(|(c, b)| c * b));
    let total_intensity = csum_intensity[n - 1];

    let bin_width = centers[1] - centers[0];

    (0..n - 1)
        .filter_map(|i| {
            let lower = csum_intensity[i] / csum_low[i];
            let higher = (total_intensity - csum_intensity[i]) / (total - csum_low[i]);
            let distance = (lower + higher) / 2.0 - centers[i];
            (0.0..bin_width).contains(&distance).then_some(centers[i])
        })
        .collect()
}

/// Return all threshold values found by the ISODATA method.
///
/// A threshold `t` qualifies when it lies within one bin below the midpoint of
/// the mean intensities on either side of it: `t = (mean(low) + mean(high)) / 2`
/// up to the bin width.
///
/// # Arguments
///
/// * `input` - The image or a precomputed histogram.
/// * `nbins` - Number of bins for float images, ignored for integer images spanning at most
///   [`MAX_UNIT_BINS`](crate::histogram::MAX_UNIT_BINS) values.
///
/// # Returns
///
/// Every qualifying bin center in increasing order, possibly none.
pub fn threshold_isodata_all<T: Pixel, const N: usize>(
    input: ThresholdInput<'_, T, N>,
    nbins: usize,
) -> Result<Vec<f64>, ThresholdError> {
    warn_rgb_input(&input, "threshold_isodata");
    if let Some(value) = constant_value(&input) {
        return Ok(vec![value]);
    }

    let hist = input.histogram(nbins, false)?;
    if hist.len() == 1 {
        return Ok(hist.bin_centers);
    }
    Ok(isodata_candidates(&hist))
}

/// Return threshold value based on the ISODATA method.
///
/// This is the lowest of the values returned by [`threshold_isodata_all`].
///
/// # Errors
///
/// Returns [`ThresholdError::NoThresholdFound`] if no bin qualifies.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::{threshold_isodata, ThresholdInput};
///
/// let image = Tensor::<u8, 1>::from_shape_vec([4], vec![10, 20, 200, 210]).unwrap();
/// let t = threshold_isodata(ThresholdInput::Image(&image), 256).unwrap();
/// assert_eq!(t, 110.0);
/// ```
pub fn threshold_isodata<T: Pixel, const N: usize>(
    input: ThresholdInput<'_, T, N>,
    nbins: usize,
) -> Result<f64, ThresholdError> {
    threshold_isodata_all(input, nbins)?
        .first()
        .copied()
        .ok_or(ThresholdError::NoThresholdFound)
}

/// Indices of the local maxima of a histogram, plateaus counted once.
fn find_local_maxima(hist: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    let mut rising = true;
    for i in 0..hist.len().saturating_sub(1) {
        if rising {
            if hist[i + 1] < hist[i] {
                rising = false;
                maxima.push(i);
            }
        } else if hist[i + 1] > hist[i] {
            rising = true;
        }
    }
    maxima
}

/// Return threshold value based on the minimum method.
///
/// The histogram is smoothed with a running mean of three bins until only two
/// maxima remain. The threshold is the minimum in between.
///
/// # Arguments
///
/// * `input` - The image or a precomputed histogram.
/// * `nbins` - Number of bins for float images, ignored for integer images spanning at most
///   [`MAX_UNIT_BINS`](crate::histogram::MAX_UNIT_BINS) values.
/// * `max_num_iter` - Maximum number of smoothing passes.
///
/// # Errors
///
/// Returns [`ThresholdError::MaximaNotFound`] if smoothing does not end with
/// exactly two maxima, and [`ThresholdError::NotConverged`] if it needed every
/// pass of the budget.
pub fn threshold_minimum<T: Pixel, const N: usize>(
    input: ThresholdInput<'_, T, N>,
    nbins: usize,
    max_num_iter: usize,
) -> Result<f64, ThresholdError> {
    warn_rgb_input(&input, "threshold_minimum");
    if max_num_iter == 0 {
        return Err(ThresholdError::NotConverged { iterations: 0 });
    }

    let hist = input.histogram(nbins, false)?;
    let mut smooth = Tensor1::from_shape_vec([hist.len()], hist.counts)?;

    let mut maxima = Vec::new();
    let mut iterations = 0;
    for counter in 0..max_num_iter {
        iterations = counter + 1;
        smooth = uniform_filter(&smooth, &[3], PaddingMode::Reflect)?;
        maxima = find_local_maxima(smooth.as_slice());
        if maxima.len() < 3 {
            break;
        }
    }

    log::debug!(
        "threshold_minimum: {} maxima after {iterations} smoothing passes",
        maxima.len()
    );

    let &[first, second] = maxima.as_slice() else {
        return Err(ThresholdError::MaximaNotFound);
    };
    if iterations == max_num_iter {
        return Err(ThresholdError::NotConverged { iterations });
    }

    let valley = &smooth.as_slice()[first..=second];
    let offset = valley
        .iter()
        .enumerate()
        .fold(0, |best, (i, &v)| if v < valley[best] { i } else { best });

    Ok(hist.bin_centers[first + offset])
}

/// Return threshold value based on the mean of grayscale values.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::threshold_mean;
///
/// let image = Tensor::<u8, 2>::from_shape_vec([2, 2], vec![1, 2, 1, 2]).unwrap();
/// assert_eq!(threshold_mean(&image).unwrap(), 1.5);
/// ```
pub fn threshold_mean<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
) -> Result<f64, ThresholdError> {
    let sum = parallel::map_reduce(
        image.as_slice(),
        || 0.0,
        |acc, x| acc + x.as_f64(),
        |a, b| a + b,
    );
    Ok(sum / image.numel() as f64)
}

/// Return threshold value based on the triangle algorithm.
///
/// A line is drawn from the histogram peak to the end of the longer tail; the
/// threshold is the bin of that tail farthest from the line.
///
/// # Arguments
///
/// * `image` - The input image.
/// * `nbins` - Number of bins for float images, ignored for integer images spanning at most
///   [`MAX_UNIT_BINS`](crate::histogram::MAX_UNIT_BINS) values.
pub fn threshold_triangle<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    nbins: usize,
) -> Result<f64, ThresholdError> {
    warn_if_rgb(image, "threshold_triangle");
    let Histogram {
        mut counts,
        bin_centers,
    } = ThresholdInput::Image(image).histogram(nbins, false)?;
    let n = counts.len();

    let mut arg_peak = argmax(counts.iter().copied()).ok_or(ThresholdError::EmptyHistogram)?;
    let peak_height = counts[arg_peak];
    let mut arg_low = counts
        .iter()
        .position(|&c| c > 0.0)
        .ok_or(ThresholdError::EmptyHistogram)?;
    let arg_high = counts.iter().rposition(|&c| c > 0.0).unwrap_or(arg_low);

    // work on the longer tail, which is on the left after flipping
    let flip = arg_peak - arg_low < arg_high - arg_peak;
    if flip {
        counts.reverse();
        arg_low = n - arg_high - 1;
        arg_peak = n - arg_peak - 1;
    }

    let width = arg_peak - arg_low;
    if width == 0 {
        return Ok(bin_centers[arg_peak]);
    }

    let norm = (peak_height * peak_height + (width * width) as f64).sqrt();
    let (peak_height, width_n) = (peak_height / norm, width as f64 / norm);

    let length = (0..width).map(|x| peak_height * x as f64 - width_n * counts[x + arg_low]);
    let mut level = argmax(length).ok_or(ThresholdError::NoThresholdFound)? + arg_low;

    if flip {
        level = n - level - 1;
    }

    Ok(bin_centers[level])
}

fn multiotsu_search(
    prob_sum: &[f64],
    moment_sum: &[f64],
    thresholds: usize,
) -> Vec<usize> {
    let nbins = prob_sum.len() - 1;

    // between class term of the bins `start..end`
    let class_term = |start: usize, end: usize| {
        let w = prob_sum[end] - prob_sum[start];
        let m = moment_sum[end] - moment_sum[start];
        if w > 0.0 {
            m * m / w
        } else {
            0.0
        }
    };

    let mut best = vec![0; thresholds];
    let mut best_score = f64::NEG_INFINITY;
    let mut current = vec![0; thresholds];

    // walk every increasing sequence of thresholds leaving each class one bin
    fn walk(
        depth: usize,
        start: usize,
        score: f64,
        nbins: usize,
        current: &mut [usize],
        visit: &mut dyn FnMut(&[usize], f64),
        class_term: &dyn Fn(usize, usize) -> f64,
    ) {
        let remaining = current.len() - depth;
        if remaining == 0 {
            visit(current, score + class_term(start, nbins));
            return;
        }
        for t in start..nbins - remaining {
            current[depth] = t;
            let term = class_term(start, t + 1);
            walk(depth + 1, t + 1, score + term, nbins, current, visit, class_term);
        }
    }

    let mut visit = |idx: &[usize], score: f64| {
        if score > best_score {
            best_score = score;
            best.copy_from_slice(idx);
        }
    };
    walk(0, 0, 0.0, nbins, &mut current, &mut visit, &class_term);

    best
}

/// Generate `classes - 1` threshold values to divide an image into classes.
///
/// The thresholds maximize the between-class variance, searched exhaustively
/// over every bin combination. The cost grows as `nbins^(classes - 1)`.
///
/// # Arguments
///
/// * `input` - The image or a precomputed histogram.
/// * `classes` - Number of classes, at least 2.
/// * `nbins` - Number of bins for float images, ignored for integer images spanning at most
///   [`MAX_UNIT_BINS`](crate::histogram::MAX_UNIT_BINS) values.
///
/// # Errors
///
/// Returns [`ThresholdError::InvalidClasses`] if `classes < 2` and
/// [`ThresholdError::TooFewLevels`] if the histogram has fewer non-empty bins
/// than `classes`.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_imgproc::threshold::{threshold_multiotsu, ThresholdInput};
///
/// let image = Tensor::<u8, 1>::from_shape_vec([6], vec![0, 1, 100, 101, 200, 201]).unwrap();
/// let t = threshold_multiotsu(ThresholdInput::Image(&image), 3, 256).unwrap();
/// assert_eq!(t, vec![1.0, 101.0]);
/// ```
pub fn threshold_multiotsu<T: Pixel, const N: usize>(
    input: ThresholdInput<'_, T, N>,
    classes: usize,
    nbins: usize,
) -> Result<Vec<f64>, ThresholdError> {
    if classes < 2 {
        return Err(ThresholdError::InvalidClasses(classes));
    }
    warn_rgb_input(&input, "threshold_multiotsu");

    let hist = input.histogram(nbins, false)?.normalized();

    let occupied: Vec<usize> = (0..hist.len()).filter(|&i| hist.counts[i] > 0.0).collect();
    if occupied.len() < classes {
        return Err(ThresholdError::TooFewLevels {
            levels: occupied.len(),
            classes,
        });
    }
    if occupied.len() == classes {
        return Ok(occupied[..classes - 1]
            .iter()
            .map(|&i| hist.bin_centers[i])
            .collect());
    }

    // prefix sums with a leading zero, moments weighted by bin index
    let prob_sum: Vec<f64> = std::iter::once(0.0)
        .chain(cumsum(hist.counts.iter().copied()))
        .collect();
    let moment_sum: Vec<f64> = std::iter::once(0.0)
        .chain(cumsum(
            hist.counts.iter().enumerate().map(|(i, p)| i as f64 * p),
        ))
        .collect();

    let indices = multiotsu_search(&prob_sum, &moment_sum, classes - 1);
    Ok(indices.iter().map(|&i| hist.bin_centers[i]).collect())
}

/// The global threshold selectors that need no parameter besides the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GlobalThresholdMethod {
    /// [`threshold_isodata`].
    Isodata,
    /// [`threshold_li`].
    Li,
    /// [`threshold_mean`].
    Mean,
    /// [`threshold_minimum`].
    Minimum,
    /// [`threshold_otsu`].
    Otsu,
    /// [`threshold_triangle`].
    Triangle,
    /// [`threshold_yen`].
    Yen,
}

impl GlobalThresholdMethod {
    /// Every method, in alphabetical order.
    pub const ALL: [GlobalThresholdMethod; 7] = [
        GlobalThresholdMethod::Isodata,
        GlobalThresholdMethod::Li,
        GlobalThresholdMethod::Mean,
        GlobalThresholdMethod::Minimum,
        GlobalThresholdMethod::Otsu,
        GlobalThresholdMethod::Triangle,
        GlobalThresholdMethod::Yen,
    ];

    /// The lower case name of the method.
    pub fn name(&self) -> &'static str {
        match self {
            GlobalThresholdMethod::Isodata => "isodata",
            GlobalThresholdMethod::Li => "li",
            GlobalThresholdMethod::Mean => "mean",
            GlobalThresholdMethod::Minimum => "minimum",
            GlobalThresholdMethod::Otsu => "otsu",
            GlobalThresholdMethod::Triangle => "triangle",
            GlobalThresholdMethod::Yen => "yen",
        }
    }

    /// Compute the threshold of `image` with the default parameters of the method.
    ///
    /// # Example
    ///
    /// ```
    /// use limen_tensor::Tensor;
    /// use limen_imgproc::threshold::GlobalThresholdMethod;
    ///
    /// let image = Tensor::<u8, 1>::from_shape_vec([4], vec![10, 20, 200, 210]).unwrap();
    /// for method in GlobalThresholdMethod::ALL {
    ///     if let Ok(t) = method.compute(&image) {
    ///         assert!((10.0..=210.0).contains(&t), "{}", method.name());
    ///     }
    /// }
    /// ```
    pub fn compute<T: Pixel, const N: usize>(
        &self,
        image: &Tensor<T, N>,
    ) -> Result<f64, ThresholdError> {
        let input = ThresholdInput::Image(image);
        match self {
            GlobalThresholdMethod::Isodata => threshold_isodata(input, DEFAULT_NBINS),
            GlobalThresholdMethod::Li => threshold_li(image, &LiParams::default(), None),
            GlobalThresholdMethod::Mean => threshold_mean(image),
            GlobalThresholdMethod::Minimum => {
                threshold_minimum(input, DEFAULT_NBINS, DEFAULT_MINIMUM_ITERATIONS)
            }
            GlobalThresholdMethod::Otsu => threshold_otsu(input, DEFAULT_NBINS),
            GlobalThresholdMethod::Triangle => threshold_triangle(image, DEFAULT_NBINS),
            GlobalThresholdMethod::Yen => threshold_yen(input, DEFAULT_NBINS),
        }
    }
}
