#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Re-exports the workspace crates under one roof.
//!
//! ```rust
//! use limen::imgproc::threshold::{threshold_otsu, ThresholdInput};
//! use limen::measure::moments::centroid;
//! use limen::tensor::Tensor;
//!
//! let image = Tensor::<u8, 2>::from_shape_fn([8, 8], |[i, j]| if i < 4 && j < 4 { 200 } else { 10 });
//! let t = threshold_otsu(ThresholdInput::Image(&image), 256).unwrap();
//! let mask = image.map(|&v| v as f64 > t);
//! assert_eq!(mask.iter().filter(|&&m| m).count(), 16);
//!
//! let c = centroid(&mask.map(|&m| m as u8)).unwrap();
//! assert_eq!(c, [1.5, 1.5]);
//! ```

#[doc(inline)]
pub use limen_tensor as tensor;

#[doc(inline)]
pub use limen_imgproc as imgproc;

#[doc(inline)]
pub use limen_measure as measure;
