use rayon::prelude::*;
use thiserror::Error;

/// Below this many elements work runs on the calling thread.
pub const PARALLEL_MIN_ELEMENTS: usize = 1 << 15;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The chunk length must be valid.
    #[error("chunk length must be > 0 and divide the buffer length, got {0}")]
    InvalidChunkSize(usize),
}

/// Whether a workload of `len` elements is worth spreading over the Rayon pool.
#[inline]
pub fn use_parallel(len: usize) -> bool {
    len >= PARALLEL_MIN_ELEMENTS
}

/// Fill every element of `dst` from its flat offset.
///
/// # Arguments
///
/// * `dst` - The destination slice.
/// * `op` - Called with the offset of each element and a mutable reference to it.
pub fn execute_indexed<U, F>(dst: &mut [U], op: F)
where
    U: Send,
    F: Fn(usize, &mut U) + Sync + Send,
{
    if use_parallel(dst.len()) {
        dst.par_iter_mut().enumerate().for_each(|(i, d)| op(i, d));
    } else {
        dst.iter_mut().enumerate().for_each(|(i, d)| op(i, d));
    }
}

/// Process `dst` in independent chunks of `chunk_len` elements.
///
/// # Errors
///
/// Returns [`ParallelError::InvalidChunkSize`] if `chunk_len` is zero or does not
/// divide the length of `dst`.
pub fn execute_chunks<U, F>(dst: &mut [U], chunk_len: usize, op: F) -> Result<(), ParallelError>
where
    U: Send,
    F: Fn(usize, &mut [U]) + Sync + Send,
{
    if chunk_len == 0 || dst.len() % chunk_len != 0 {
        return Err(ParallelError::InvalidChunkSize(chunk_len));
    }

    if use_parallel(dst.len()) {
        dst.par_chunks_exact_mut(chunk_len)
            .enumerate()
            .for_each(|(i, chunk)| op(i, chunk));
    } else {
        dst.chunks_exact_mut(chunk_len)
            .enumerate()
            .for_each(|(i, chunk)| op(i, chunk));
    }
    Ok(())
}

/// Fold `src` into an accumulator, combining partial results with `reduce`.
///
/// `identity` must produce the neutral element of `reduce`.
pub fn map_reduce<T, A, I, M, R>(src: &[T], identity: I, fold: M, reduce: R) -> A
where
    T: Sync,
    A: Send,
    I: Fn() -> A + Sync + Send,
    M: Fn(A, &T) -> A + Sync + Send,
    R: Fn(A, A) -> A + Sync + Send,
{
    if use_parallel(src.len()) {
        src.par_iter()
            .fold(&identity, &fold)
            .reduce(&identity, &reduce)
    } else {
        src.iter().fold(identity(), &fold)
    }
}
