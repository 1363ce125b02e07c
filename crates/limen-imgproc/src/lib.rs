#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// error types for the image processing operations.
pub mod error;
pub use error::ThresholdError;

/// image filtering module.
pub mod filter;

/// compute image histogram module.
pub mod histogram;

/// integral images and sparse correlation.
pub mod integral;

/// connected-component labeling.
pub mod label;

/// border handling and padding.
pub mod padding;

/// module containing parallization utilities.
pub mod parallel;

/// operations to threshold images.
pub mod threshold;
