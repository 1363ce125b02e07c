use limen_tensor::TensorError;

use crate::parallel::ParallelError;

/// An error type for the thresholding and filtering operations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ThresholdError {
    /// A window or block size has an even or zero extent.
    #[error("Window size must only contain positive odd integers, got {0:?}")]
    InvalidWindowSize(Vec<usize>),

    /// The window sizes have neither one value nor one value per axis.
    #[error("Window {window:?} must have 1 or {ndim} elements")]
    WindowDimensionMismatch {
        /// The offending window sizes.
        window: Vec<usize>,
        /// The rank of the image.
        ndim: usize,
    },

    /// The initial guess for the Li threshold lies outside the image range.
    #[error(
        "The initial guess must be within the range of the image. Got {guess} for image min {min} and max {max}"
    )]
    InitialGuessOutOfRange {
        /// The requested initial guess.
        guess: f64,
        /// The image minimum.
        min: f64,
        /// The image maximum.
        max: f64,
    },

    /// A method name could not be parsed.
    #[error("Invalid method {0:?}. Please use `generic`, `gaussian`, `mean`, or `median`")]
    InvalidMethod(String),

    /// The number of histogram bins is invalid.
    #[error("Invalid number of histogram bins: {0}")]
    InvalidHistogramBins(usize),

    /// The number of classes for multi-Otsu is invalid.
    #[error("The number of classes must be at least 2, got {0}")]
    InvalidClasses(usize),

    /// Two tensors that must agree in shape do not.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// The expected shape.
        expected: Vec<usize>,
        /// The actual shape.
        actual: Vec<usize>,
    },

    /// The requested configuration is declared but not implemented.
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),

    /// An iterative method reached its iteration budget.
    #[error("Failed to converge after {iterations} iterations")]
    NotConverged {
        /// The number of iterations performed.
        iterations: usize,
    },

    /// The histogram never became bimodal.
    #[error("Unable to find two maxima in histogram")]
    MaximaNotFound,

    /// No threshold satisfies the selection criterion.
    #[error("No threshold satisfies the selection criterion")]
    NoThresholdFound,

    /// The image has fewer distinct levels than requested classes.
    #[error("The input image has only {levels} different values. It cannot be thresholded in {classes} classes")]
    TooFewLevels {
        /// The number of non-empty histogram bins.
        levels: usize,
        /// The requested number of classes.
        classes: usize,
    },

    /// A histogram was requested from an empty sample set.
    #[error("Cannot compute a histogram of an empty sample set")]
    EmptyHistogram,

    /// The axis is out of range for the tensor rank.
    #[error("Axis {axis} is out of range for a tensor of rank {ndim}")]
    InvalidAxis {
        /// The requested axis.
        axis: usize,
        /// The rank of the tensor.
        ndim: usize,
    },

    /// The connectivity is out of range for the tensor rank.
    #[error("Connectivity must be in 1..={ndim}, got {connectivity}")]
    InvalidConnectivity {
        /// The requested connectivity.
        connectivity: usize,
        /// The rank of the tensor.
        ndim: usize,
    },

    /// Error from the tensor layer.
    #[error(transparent)]
    Tensor(#[from] TensorError),

    /// Error from the parallel execution layer.
    #[error(transparent)]
    Parallel(#[from] ParallelError),
}

impl ThresholdError {
    pub(crate) fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }
}
