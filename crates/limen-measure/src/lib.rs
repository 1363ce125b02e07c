#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// error types for the moment computations.
pub mod error;
pub use error::MomentsError;

/// raw, central, normalized and Hu moments, centroid and inertia tensor.
pub mod moments;

mod linalg;
