use thiserror::Error;

/// An error type for tensor operations.
#[derive(Error, Debug, PartialEq)]
pub enum TensorError {
    /// Type casting operation failed.
    ///
    /// This occurs when a value cannot be represented in the target element type,
    /// e.g. a negative or non-finite value cast to an unsigned integer.
    #[error("Type cast failed: source data cannot be safely converted to target type. Check value ranges.")]
    CastError,

    /// Tensor shape does not match the provided data.
    ///
    /// The product of the shape dimensions must match the number of elements exactly.
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Index exceeds tensor bounds.
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index that was attempted
        index: usize,
        /// The size of the dimension being indexed
        size: usize,
    },

    /// Tensor dimensions incompatible for the requested operation.
    ///
    /// # Examples
    /// - Element-wise operations on different-shaped tensors
    /// - Correlating with a kernel larger than the source
    #[error("Dimension mismatch: {message}. Expected shape: {expected}, got: {actual}")]
    DimensionMismatch {
        /// Human-readable description of the mismatch
        message: String,
        /// Expected shape description
        expected: String,
        /// Actual shape description
        actual: String,
    },
}

impl TensorError {
    /// Creates an InvalidShape error with clear context.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates an IndexOutOfBounds error with clear context.
    pub fn index_out_of_bounds(index: usize, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    /// Creates a DimensionMismatch error with formatted shapes.
    pub fn dimension_mismatch(
        message: impl Into<String>,
        expected: &[usize],
        actual: &[usize],
    ) -> Self {
        Self::DimensionMismatch {
            message: message.into(),
            expected: format!("{:?}", expected),
            actual: format!("{:?}", actual),
        }
    }
}

/// Computes the strides for a row-major (C-contiguous) tensor layout.
///
/// Strides define how many elements to skip in memory to move along each dimension.
/// For row-major layout, the rightmost dimension has stride 1, and each dimension's
/// stride is the product of all dimensions to its right.
///
/// # Examples
///
/// ```rust
/// use limen_tensor::get_strides_from_shape;
///
/// let strides = get_strides_from_shape([2, 3]);
/// assert_eq!(strides, [3, 1]);
///
/// let strides = get_strides_from_shape([2, 3, 4]);
/// assert_eq!(strides, [12, 4, 1]);
/// ```
pub fn get_strides_from_shape<const N: usize>(shape: [usize; N]) -> [usize; N] {
    let mut strides: [usize; N] = [0; N];
    let mut stride = 1;
    for i in (0..shape.len()).rev() {
        strides[i] = stride;
        stride *= shape[i];
    }
    strides
}

/// A dense, row-major N-dimensional array.
///
/// The rank `N` is fixed at compile time; the extent of every axis is stored in
/// `shape`. Elements are owned by the tensor and laid out contiguously.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T, const N: usize> {
    /// The shape of the tensor.
    pub shape: [usize; N],
    /// The strides of the tensor data in memory.
    pub strides: [usize; N],
    storage: Vec<T>,
}

impl<T, const N: usize> Tensor<T, N> {
    /// Get the data of the tensor as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.storage
    }

    /// Get the data of the tensor as a mutable slice.
    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.storage
    }

    /// Returns an iterator over the elements in memory order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.storage.iter()
    }

    /// Creates a new tensor with the given shape and data.
    ///
    /// # Errors
    ///
    /// If the number of elements in the data does not match the shape of the tensor,
    /// an error is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use limen_tensor::Tensor;
    ///
    /// let data: Vec<u8> = vec![1, 2, 3, 4];
    /// let t = Tensor::<u8, 2>::from_shape_vec([2, 2], data).unwrap();
    /// assert_eq!(t.shape, [2, 2]);
    /// ```
    pub fn from_shape_vec(shape: [usize; N], data: Vec<T>) -> Result<Self, TensorError> {
        let numel = shape.iter().product::<usize>();
        if numel != data.len() {
            return Err(TensorError::invalid_shape(numel, data.len()));
        }
        let strides = get_strides_from_shape(shape);
        Ok(Self {
            shape,
            strides,
            storage: data,
        })
    }

    /// Creates a new tensor with the given shape and a default value.
    ///
    /// # Example
    ///
    /// ```
    /// use limen_tensor::Tensor;
    ///
    /// let t = Tensor::<u8, 1>::from_shape_val([4], 0);
    /// assert_eq!(t.as_slice(), vec![0, 0, 0, 0]);
    /// ```
    pub fn from_shape_val(shape: [usize; N], value: T) -> Self
    where
        T: Clone,
    {
        let numel = shape.iter().product::<usize>();
        Self {
            shape,
            strides: get_strides_from_shape(shape),
            storage: vec![value; numel],
        }
    }

    /// Create a new tensor with the given shape and a function to generate the data.
    ///
    /// The function receives the multi-index of every element in memory order.
    pub fn from_shape_fn<F>(shape: [usize; N], f: F) -> Self
    where
        F: Fn([usize; N]) -> T,
    {
        let numel = shape.iter().product::<usize>();
        let storage: Vec<T> = (0..numel)
            .map(|i| {
                let mut index = [0; N];
                let mut j = i;
                for k in (0..N).rev() {
                    index[k] = j % shape[k];
                    j /= shape[k];
                }
                f(index)
            })
            .collect();
        Self {
            shape,
            strides: get_strides_from_shape(shape),
            storage,
        }
    }

    /// Creates a new tensor filled with zeros.
    pub fn zeros(shape: [usize; N]) -> Self
    where
        T: Clone + num_traits::Zero,
    {
        Self::from_shape_val(shape, T::zero())
    }

    /// Returns the number of elements in the tensor.
    #[inline]
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Returns true if the tensor holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Get the offset of the element at the given index, checking the bounds.
    pub fn get_iter_offset(&self, index: [usize; N]) -> Option<usize> {
        let mut offset = 0;
        for ((&idx, dim_size), stride) in index.iter().zip(self.shape).zip(self.strides) {
            if idx >= dim_size {
                return None;
            }
            offset += idx * stride;
        }
        Some(offset)
    }

    /// Get the offset of the element at the given index without checking the bounds.
    #[inline]
    pub fn get_iter_offset_unchecked(&self, index: [usize; N]) -> usize {
        index
            .iter()
            .zip(self.strides)
            .map(|(&idx, stride)| idx * stride)
            .sum()
    }

    /// Get the multi-index of the element at the given memory offset.
    #[inline]
    pub fn get_index_unchecked(&self, offset: usize) -> [usize; N] {
        let mut idx = [0; N];
        let mut rem = offset;
        for (dim_i, &s) in self.strides.iter().enumerate() {
            idx[dim_i] = rem / s;
            rem %= s;
        }
        idx
    }

    /// Get the multi-index of the element at the given memory offset.
    ///
    /// # Errors
    ///
    /// If the offset is past the end of the tensor, an error is returned.
    pub fn get_index(&self, offset: usize) -> Result<[usize; N], TensorError> {
        let numel = self.numel();
        if offset >= numel {
            return Err(TensorError::index_out_of_bounds(offset, numel));
        }
        Ok(self.get_index_unchecked(offset))
    }

    /// Get the element at the given index without checking if the index is out of bounds.
    ///
    /// # Panics
    ///
    /// Panics if the computed offset is past the end of the storage.
    #[inline]
    pub fn get_unchecked(&self, index: [usize; N]) -> &T {
        &self.storage[self.get_iter_offset_unchecked(index)]
    }

    /// Get the element at the given index, checking if the index is out of bounds.
    ///
    /// # Example
    ///
    /// ```
    /// use limen_tensor::Tensor;
    ///
    /// let t = Tensor::<u8, 2>::from_shape_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
    /// assert_eq!(t.get([1, 0]), Some(&3));
    /// assert!(t.get([2, 0]).is_none());
    /// ```
    pub fn get(&self, index: [usize; N]) -> Option<&T> {
        self.get_iter_offset(index)
            .and_then(|i| self.storage.get(i))
    }

    /// Get a mutable reference to the element at the given index.
    pub fn get_mut(&mut self, index: [usize; N]) -> Option<&mut T> {
        self.get_iter_offset(index)
            .and_then(move |i| self.storage.get_mut(i))
    }

    /// Apply a function to each element of the tensor.
    ///
    /// # Example
    ///
    /// ```
    /// use limen_tensor::Tensor;
    ///
    /// let t = Tensor::<u8, 1>::from_shape_vec([4], vec![1, 2, 3, 4]).unwrap();
    /// let t2 = t.map(|x| *x as f32 * 0.5);
    /// assert_eq!(t2.as_slice(), vec![0.5, 1.0, 1.5, 2.0]);
    /// ```
    pub fn map<U, F>(&self, f: F) -> Tensor<U, N>
    where
        F: Fn(&T) -> U,
    {
        Tensor {
            shape: self.shape,
            strides: self.strides,
            storage: self.storage.iter().map(f).collect(),
        }
    }
}
