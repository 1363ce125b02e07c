use limen_tensor::{Pixel, PixelKind};
use num_traits::ToPrimitive;

use crate::error::ThresholdError;
use crate::parallel;

/// Integer ranges wider than this fall back to equal-width bins.
pub const MAX_UNIT_BINS: usize = 1 << 16;

/// Which value range the histogram bins span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HistogramSource {
    /// Span the observed minimum and maximum of the samples.
    #[default]
    Image,
    /// Span the full range of the sample type, see [`Pixel::dtype_range`].
    Dtype,
}

/// Intensity counts together with the value each bin stands for.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Histogram {
    /// The number of samples in each bin, or their fraction when normalized.
    pub counts: Vec<f64>,
    /// The intensity at the center of each bin.
    pub bin_centers: Vec<f64>,
}

impl Histogram {
    /// Create a histogram from counts and their bin centers.
    ///
    /// # Errors
    ///
    /// Returns an error if both vectors differ in length.
    pub fn new(counts: Vec<f64>, bin_centers: Vec<f64>) -> Result<Self, ThresholdError> {
        if counts.len() != bin_centers.len() {
            return Err(ThresholdError::shape_mismatch(
                &[counts.len()],
                &[bin_centers.len()],
            ));
        }
        Ok(Self {
            counts,
            bin_centers,
        })
    }

    /// Create a histogram whose bin centers are the bin indices `0, 1, 2, ...`.
    pub fn from_counts(counts: Vec<f64>) -> Self {
        let bin_centers = (0..counts.len()).map(|i| i as f64).collect();
        Self {
            counts,
            bin_centers,
        }
    }

    /// The number of bins.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if the histogram has no bins.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The sum of all counts.
    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Drop the empty bins at both ends of the histogram.
    pub fn trimmed(&self) -> Histogram {
        let start = self.counts.iter().position(|&c| c > 0.0);
        let end = self.counts.iter().rposition(|&c| c > 0.0);
        match (start, end) {
            (Some(start), Some(end)) => Histogram {
                counts: self.counts[start..=end].to_vec(),
                bin_centers: self.bin_centers[start..=end].to_vec(),
            },
            _ => Histogram::default(),
        }
    }

    /// Scale the counts so that they sum up to one.
    pub fn normalized(&self) -> Histogram {
        let total = self.total();
        Histogram {
            counts: self.counts.iter().map(|&c| c / total).collect(),
            bin_centers: self.bin_centers.clone(),
        }
    }
}

/// The edges of unit-width bins centered on every integer in `lo..=hi`.
///
/// With these edges every integer intensity falls into its own bin, e.g.
/// `unit_bin_edges(0, 255)` gives `-0.5, 0.5, ..., 255.5` for 8-bit images.
pub fn unit_bin_edges(lo: i64, hi: i64) -> Vec<f64> {
    if hi < lo {
        return Vec::new();
    }
    (lo..=hi + 1).map(|v| v as f64 - 0.5).collect()
}

/// Evenly spaced bin edges over `[lo, hi]`.
pub(crate) fn linspace_edges(lo: f64, hi: f64, nbins: usize) -> Vec<f64> {
    let step = (hi - lo) / nbins as f64;
    let mut edges: Vec<f64> = (0..=nbins).map(|i| lo + i as f64 * step).collect();
    if let Some(last) = edges.last_mut() {
        *last = hi;
    }
    edges
}

/// Locate the bin of `x` among evenly spaced `edges`, the last bin being closed.
#[inline]
pub(crate) fn bin_index(x: f64, edges: &[f64]) -> Option<usize> {
    let nbins = edges.len().checked_sub(1)?;
    let (lo, hi) = (edges[0], edges[nbins]);
    if nbins == 0 || !(lo..=hi).contains(&x) {
        return None;
    }
    let mut idx = (((x - lo) * nbins as f64 / (hi - lo)) as usize).min(nbins - 1);
    // floating point rounding can land one bin off
    if x < edges[idx] {
        idx = idx.saturating_sub(1);
    } else if idx + 1 < nbins && x >= edges[idx + 1] {
        idx += 1;
    }
    Some(idx)
}

/// The integer value range the bins of `samples` span.
fn integer_range<T: Pixel>(
    samples: &[T],
    source: HistogramSource,
) -> Result<(i128, i128), ThresholdError> {
    match source {
        HistogramSource::Image => {
            let (lo, hi) = samples
                .iter()
                .filter_map(|x| x.to_i128())
                .fold((i128::MAX, i128::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));
            if lo > hi {
                return Err(ThresholdError::EmptyHistogram);
            }
            Ok((lo, hi))
        }
        HistogramSource::Dtype => {
            let (lo, hi) = T::dtype_range();
            Ok((lo as i128, hi as i128))
        }
    }
}

fn integer_histogram<T: Pixel>(
    samples: &[T],
    lo: i128,
    hi: i128,
) -> Result<Histogram, ThresholdError> {
    let nbins = usize::try_from(hi - lo + 1)
        .map_err(|_| ThresholdError::InvalidHistogramBins(usize::MAX))?;

    let counts = parallel::map_reduce(
        samples,
        || vec![0.0f64; nbins],
        |mut acc, x| {
            if let Some(v) = x.to_i128() {
                if (lo..=hi).contains(&v) {
                    acc[(v - lo) as usize] += 1.0;
                }
            }
            acc
        },
        |mut a, b| {
            a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
            a
        },
    );

    let bin_centers = (0..nbins).map(|i| (lo + i as i128) as f64).collect();

    Ok(Histogram {
        counts,
        bin_centers,
    })
}

fn float_histogram<T: Pixel>(
    samples: &[T],
    nbins: usize,
    source: HistogramSource,
) -> Result<Histogram, ThresholdError> {
    if nbins == 0 {
        return Err(ThresholdError::InvalidHistogramBins(nbins));
    }

    let (lo, hi) = match source {
        HistogramSource::Image => {
            let (lo, hi) = samples
                .iter()
                .map(|x| x.as_f64())
                .filter(|v| v.is_finite())
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
            if lo > hi {
                return Err(ThresholdError::EmptyHistogram);
            }
            if lo == hi {
                (lo - 0.5, hi + 0.5)
            } else {
                (lo, hi)
            }
        }
        HistogramSource::Dtype => T::dtype_range(),
    };

    let edges = linspace_edges(lo, hi, nbins);

    let counts = parallel::map_reduce(
        samples,
        || vec![0.0f64; nbins],
        |mut acc, x| {
            if let Some(idx) = bin_index(x.as_f64(), &edges) {
                acc[idx] += 1.0;
            }
            acc
        },
        |mut a, b| {
            a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
            a
        },
    );

    let bin_centers = edges.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect();

    Ok(Histogram {
        counts,
        bin_centers,
    })
}

/// Compute the intensity histogram of a set of samples.
///
/// Integer samples get one bin per integer value and `nbins` is ignored, unless
/// they span more than `nbins.max(MAX_UNIT_BINS)` values. Float samples and wide
/// integer ranges are counted in `nbins` equal-width bins, ignoring non-finite
/// values.
///
/// # Arguments
///
/// * `samples` - The samples, typically the flattened image.
/// * `nbins` - The number of bins for float samples.
/// * `source` - Whether bins span the observed or the type's value range.
/// * `normalize` - Divide the counts by their sum.
///
/// # Errors
///
/// Returns [`ThresholdError::EmptyHistogram`] if there are no usable samples and
/// [`ThresholdError::InvalidHistogramBins`] if `nbins` is zero for float samples.
///
/// # Example
///
/// ```
/// use limen_imgproc::histogram::{histogram, HistogramSource};
///
/// let hist = histogram(&[2u8, 4, 4, 5], 256, HistogramSource::Image, false).unwrap();
/// assert_eq!(hist.counts, vec![1.0, 0.0, 2.0, 1.0]);
/// assert_eq!(hist.bin_centers, vec![2.0, 3.0, 4.0, 5.0]);
/// ```
pub fn histogram<T: Pixel>(
    samples: &[T],
    nbins: usize,
    source: HistogramSource,
    normalize: bool,
) -> Result<Histogram, ThresholdError> {
    if samples.is_empty() {
        return Err(ThresholdError::EmptyHistogram);
    }

    let hist = match T::KIND {
        PixelKind::Integer => {
            let (lo, hi) = integer_range(samples, source)?;
            if hi - lo < nbins.max(MAX_UNIT_BINS) as i128 {
                integer_histogram(samples, lo, hi)?
            } else {
                log::debug!("integer range {lo}..={hi} is too wide for unit bins, using {nbins} bins");
                float_histogram(samples, nbins, source)?
            }
        }
        PixelKind::Float => float_histogram(samples, nbins, source)?,
    };

    if normalize {
        Ok(hist.normalized())
    } else {
        Ok(hist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_integer_histogram() -> Result<(), ThresholdError> {
        let hist = histogram(&[-2i16, 0, 0, 1], 4, HistogramSource::Image, false)?;
        assert_eq!(hist.counts, vec![1.0, 0.0, 2.0, 1.0]);
        assert_eq!(hist.bin_centers, vec![-2.0, -1.0, 0.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_integer_histogram_dtype() -> Result<(), ThresholdError> {
        let hist = histogram(&[0u8, 255, 255], 2, HistogramSource::Dtype, true)?;
        assert_eq!(hist.len(), 256);
        assert_relative_eq!(hist.counts[0], 1.0 / 3.0);
        assert_relative_eq!(hist.counts[255], 2.0 / 3.0);
        assert_eq!(hist.bin_centers[255], 255.0);
        Ok(())
    }

    #[test]
    fn test_wide_integer_range_uses_equal_width_bins() -> Result<(), ThresholdError> {
        let samples = [0i64, 1, i64::MAX - 1, i64::MAX];
        let hist = histogram(&samples, 4, HistogramSource::Image, false)?;
        assert_eq!(hist.counts, vec![2.0, 0.0, 0.0, 2.0]);
        assert_relative_eq!(hist.bin_centers[0], i64::MAX as f64 / 8.0);

        let full = histogram(&[i32::MIN, 0, i32::MAX], 8, HistogramSource::Dtype, false)?;
        assert_eq!(full.len(), 8);
        assert_eq!(full.total(), 3.0);

        // up to MAX_UNIT_BINS values keep one bin each
        let narrow = histogram(&[0i32, MAX_UNIT_BINS as i32 - 1], 4, HistogramSource::Image, false)?;
        assert_eq!(narrow.len(), MAX_UNIT_BINS);
        Ok(())
    }

    #[test]
    fn test_float_histogram() -> Result<(), ThresholdError> {
        let samples = [0.0f32, 0.1, 0.5, 0.9, 1.0, f32::NAN];
        let hist = histogram(&samples, 2, HistogramSource::Image, false)?;
        // the last bin is closed
        assert_eq!(hist.counts, vec![2.0, 3.0]);
        assert_eq!(hist.bin_centers, vec![0.25, 0.75]);
        Ok(())
    }

    #[test]
    fn test_float_histogram_constant() -> Result<(), ThresholdError> {
        let hist = histogram(&[3.0f64; 5], 4, HistogramSource::Image, false)?;
        assert_eq!(hist.counts, vec![0.0, 0.0, 5.0, 0.0]);
        assert_eq!(hist.bin_centers, vec![2.625, 2.875, 3.125, 3.375]);
        Ok(())
    }

    #[test]
    fn test_histogram_errors() {
        let empty: [f32; 0] = [];
        assert_eq!(
            histogram(&empty, 4, HistogramSource::Image, false),
            Err(ThresholdError::EmptyHistogram)
        );
        assert_eq!(
            histogram(&[f64::NAN], 4, HistogramSource::Image, false),
            Err(ThresholdError::EmptyHistogram)
        );
        assert_eq!(
            histogram(&[1.0f64], 0, HistogramSource::Image, false),
            Err(ThresholdError::InvalidHistogramBins(0))
        );
    }

    #[test]
    fn test_trimmed() {
        let hist = Histogram::from_counts(vec![0.0, 0.0, 3.0, 0.0, 1.0, 0.0]);
        let trimmed = hist.trimmed();
        assert_eq!(trimmed.counts, vec![3.0, 0.0, 1.0]);
        assert_eq!(trimmed.bin_centers, vec![2.0, 3.0, 4.0]);
        assert!(Histogram::from_counts(vec![0.0; 3]).trimmed().is_empty());
    }

    #[test]
    fn test_unit_bin_edges() {
        let edges = unit_bin_edges(0, 3);
        assert_eq!(edges, vec![-0.5, 0.5, 1.5, 2.5, 3.5]);
        assert_eq!(unit_bin_edges(0, 255).len(), 257);
        assert!(unit_bin_edges(2, 1).is_empty());
    }

    #[test]
    fn test_bin_index() {
        let edges = linspace_edges(0.0, 1.0, 10);
        assert_eq!(bin_index(0.0, &edges), Some(0));
        assert_eq!(bin_index(0.35, &edges), Some(3));
        assert_eq!(bin_index(1.0, &edges), Some(9));
        assert_eq!(bin_index(1.5, &edges), None);
    }
}
