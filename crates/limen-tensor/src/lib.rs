#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `limen-tensor` provides the dense, row-major N-dimensional array used by every
//! image-analysis routine in the workspace. The rank of a tensor is a const generic
//! so the same algorithm can be written once for 1-D signals, 2-D images and 3-D
//! volumes.
//!
//! # Quick Start
//!
//! ```rust
//! use limen_tensor::Tensor;
//!
//! // Create a 2x3 tensor from a vector
//! let data = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let tensor = Tensor::<f32, 2>::from_shape_vec([2, 3], data).unwrap();
//!
//! assert_eq!(tensor.get([0, 0]), Some(&1.0));
//! assert_eq!(tensor.get([1, 2]), Some(&6.0));
//!
//! // Generate data with a function
//! let identity = Tensor::<f32, 2>::from_shape_fn([3, 3], |[i, j]| {
//!     if i == j { 1.0 } else { 0.0 }
//! });
//! assert_eq!(identity.get([1, 1]), Some(&1.0));
//! ```
//!
//! # Type Aliases
//!
//! - [`Tensor1`]: One-dimensional tensor (signal)
//! - [`Tensor2`]: Two-dimensional tensor (image)
//! - [`Tensor3`]: Three-dimensional tensor (volume)

/// Pixel element traits describing integer and floating point intensities.
pub mod pixel;

/// Tensor module containing the main tensor implementation and error types.
pub mod tensor;

pub use crate::pixel::{FloatPixel, Pixel, PixelKind};
pub use crate::tensor::{get_strides_from_shape, Tensor, TensorError};

/// Type alias for a 1-dimensional tensor.
pub type Tensor1<T> = Tensor<T, 1>;

/// Type alias for a 2-dimensional tensor.
pub type Tensor2<T> = Tensor<T, 2>;

/// Type alias for a 3-dimensional tensor.
pub type Tensor3<T> = Tensor<T, 3>;
