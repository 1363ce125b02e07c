use limen_tensor::TensorError;

/// An error type for the moment computations.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum MomentsError {
    /// The moment tensor does not hold the requested order along every axis.
    #[error("Shape of image moments must be > order {order} along every axis, got {shape:?}")]
    OrderTooHigh {
        /// The shape of the moment tensor.
        shape: Vec<usize>,
        /// The requested order.
        order: usize,
    },

    /// Error from the underlying tensor operations.
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
