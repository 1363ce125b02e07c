//! Filter operations
//!
//! N-dimensional separable and rank filters with configurable border handling.

/// Filter kernels
pub mod kernels;

/// Separable filter operations
mod separable;
pub use separable::*;

/// Rank filter operations
mod rank;
pub use rank::*;
