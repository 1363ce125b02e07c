/// Create a normalized box kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
///
/// # Returns
///
/// A vector of `kernel_size` equal weights summing up to one.
pub fn box_kernel_1d(kernel_size: usize) -> Vec<f64> {
    vec![1.0 / kernel_size as f64; kernel_size]
}

/// The radius of a gaussian kernel truncated at `truncate` standard deviations.
#[inline]
pub fn gaussian_radius(sigma: f64, truncate: f64) -> usize {
    (truncate * sigma + 0.5).max(0.0) as usize
}

/// Create a normalized gaussian kernel.
///
/// # Arguments
///
/// * `sigma` - The standard deviation of the gaussian.
/// * `truncate` - Truncate the kernel at this many standard deviations.
///
/// # Returns
///
/// A vector of `2 * radius + 1` weights summing up to one, with
/// `radius = round(truncate * sigma)`.
pub fn gaussian_kernel_1d(sigma: f64, truncate: f64) -> Vec<f64> {
    let radius = gaussian_radius(sigma, truncate) as isize;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| {
            let x = x as f64;
            (-0.5 * x * x / sigma_sq).exp()
        })
        .collect();

    // normalize the kernel
    let norm = kernel.iter().sum::<f64>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}
