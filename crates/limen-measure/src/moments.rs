use limen_tensor::{Pixel, Tensor};

use crate::error::MomentsError;
use crate::linalg::symmetric_eigenvalues;

/// Powers `(x - center)^p` for every position `x` along an axis, indexed `[x][p]`.
fn power_table(len: usize, center: f64, order: usize) -> Vec<Vec<f64>> {
    (0..len)
        .map(|x| {
            let delta = x as f64 - center;
            (0..=order).map(|p| delta.powi(p as i32)).collect()
        })
        .collect()
}

/// Replace one axis of `src` by its weighted sums against the power table.
fn contract_axis<const N: usize>(
    src: &Tensor<f64, N>,
    axis: usize,
    powers: &[Vec<f64>],
    order: usize,
) -> Tensor<f64, N> {
    let mut shape = src.shape;
    shape[axis] = order + 1;
    Tensor::from_shape_fn(shape, |idx| {
        let p = idx[axis];
        let mut src_idx = idx;
        powers
            .iter()
            .enumerate()
            .map(|(x, row)| {
                src_idx[axis] = x;
                src.get_unchecked(src_idx) * row[p]
            })
            .sum()
    })
}

fn check_order<const N: usize>(mu: &Tensor<f64, N>, order: usize) -> Result<(), MomentsError> {
    if mu.shape.iter().any(|&s| s <= order) {
        return Err(MomentsError::OrderTooHigh {
            shape: mu.shape.to_vec(),
            order,
        });
    }
    Ok(())
}

/// The index with `value` along `axis` and zero elsewhere.
fn axis_index<const N: usize>(axis: usize, value: usize) -> [usize; N] {
    let mut idx = [0; N];
    idx[axis] = value;
    idx
}

/// Calculate all raw image moments up to a certain order.
///
/// The raw moment of powers `p` is `M[p] = sum_x image[x] * prod_i x_i^p_i`.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `order` - Maximum order along each axis.
///
/// # Returns
///
/// The moments, a tensor of shape `[order + 1; N]`.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_measure::moments::moments;
///
/// let image = Tensor::<u8, 2>::from_shape_fn([4, 4], |[i, j]| (i == 1 && j == 2) as u8);
/// let m = moments(&image, 1).unwrap();
/// assert_eq!(m.as_slice(), &[1.0, 2.0, 1.0, 2.0]);
/// ```
pub fn moments<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    order: usize,
) -> Result<Tensor<f64, N>, MomentsError> {
    moments_central(image, Some([0.0; N]), order)
}

/// Calculate all central image moments up to a certain order.
///
/// The central moment of powers `p` is
/// `mu[p] = sum_x image[x] * prod_i (x_i - c_i)^p_i`.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `center` - The center `c`, the [`centroid`] of the image if `None`.
/// * `order` - Maximum order along each axis.
///
/// # Returns
///
/// The central moments, a tensor of shape `[order + 1; N]`.
pub fn moments_central<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    center: Option<[f64; N]>,
    order: usize,
) -> Result<Tensor<f64, N>, MomentsError> {
    let center = match center {
        Some(center) => center,
        None => centroid(image)?,
    };

    let mut calc = image.map(|x| x.as_f64());
    for (axis, &c) in center.iter().enumerate() {
        let powers = power_table(image.shape[axis], c, order);
        calc = contract_axis(&calc, axis, &powers, order);
    }
    Ok(calc)
}

/// Calculate all raw moments of a point set up to a certain order.
///
/// Each point counts with unit weight, so the moments of the coordinates of
/// the non-zero pixels of a binary image equal the moments of that image.
///
/// # Example
///
/// ```
/// use limen_measure::moments::moments_coords;
///
/// let m = moments_coords(&[[1.0, 2.0], [3.0, 2.0]], 1);
/// assert_eq!(m.as_slice(), &[2.0, 4.0, 4.0, 8.0]);
/// ```
pub fn moments_coords<const N: usize>(coords: &[[f64; N]], order: usize) -> Tensor<f64, N> {
    moments_coords_central(coords, Some([0.0; N]), order)
}

/// Calculate all central moments of a point set up to a certain order.
///
/// # Arguments
///
/// * `coords` - The points.
/// * `center` - The center, the mean of the points if `None`.
/// * `order` - Maximum order along each axis.
pub fn moments_coords_central<const N: usize>(
    coords: &[[f64; N]],
    center: Option<[f64; N]>,
    order: usize,
) -> Tensor<f64, N> {
    let center = center.unwrap_or_else(|| {
        let n = coords.len() as f64;
        std::array::from_fn(|axis| coords.iter().map(|pt| pt[axis]).sum::<f64>() / n)
    });

    // per point and axis powers, indexed [point][axis][p]
    let powers: Vec<[Vec<f64>; N]> = coords
        .iter()
        .map(|pt| {
            std::array::from_fn(|axis| {
                let delta = pt[axis] - center[axis];
                (0..=order).map(|p| delta.powi(p as i32)).collect()
            })
        })
        .collect();

    Tensor::from_shape_fn([order + 1; N], |p| {
        powers
            .iter()
            .map(|pt| (0..N).map(|axis| pt[axis][p[axis]]).product::<f64>())
            .sum()
    })
}

/// Calculate all normalized central image moments up to a certain order.
///
/// `nu[p] = mu[p] / mu0^(|p| / N + 1)` for `|p| >= 2`, NaN for lower orders.
/// Entries beyond `order` are zero.
///
/// # Errors
///
/// Returns [`MomentsError::OrderTooHigh`] if `mu` does not extend past `order`
/// along every axis.
pub fn moments_normalized<const N: usize>(
    mu: &Tensor<f64, N>,
    order: usize,
) -> Result<Tensor<f64, N>, MomentsError> {
    check_order(mu, order)?;
    let mu0 = mu.as_slice().first().copied().unwrap_or(f64::NAN);

    Ok(Tensor::from_shape_fn(mu.shape, |p| {
        if p.iter().any(|&pi| pi > order) {
            return 0.0;
        }
        let total: usize = p.iter().sum();
        if total < 2 {
            f64::NAN
        } else {
            mu.get_unchecked(p) / mu0.powf(total as f64 / N as f64 + 1.0)
        }
    }))
}

/// Calculate the seven Hu moment invariants of a 2-D image.
///
/// The invariants are built from the normalized central moments and do not
/// change under translation, scale and rotation.
///
/// # Errors
///
/// Returns [`MomentsError::OrderTooHigh`] if `nu` has fewer than 4 entries
/// along an axis.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_measure::moments::{moments_central, moments_hu, moments_normalized};
///
/// let image = Tensor::<f64, 2>::from_shape_fn([20, 20], |[i, j]| {
///     if (13..17).contains(&i) && (13..17).contains(&j) { 1.0 } else { 0.0 }
/// });
/// let mu = moments_central(&image, None, 3).unwrap();
/// let nu = moments_normalized(&mu, 3).unwrap();
/// let hu = moments_hu(&nu).unwrap();
/// assert!((hu[0] - 0.15625).abs() < 1e-12);
/// ```
pub fn moments_hu(nu: &Tensor<f64, 2>) -> Result<[f64; 7], MomentsError> {
    check_order(nu, 3)?;
    let at = |i: usize, j: usize| *nu.get_unchecked([i, j]);
    let (nu11, nu20, nu02) = (at(1, 1), at(2, 0), at(0, 2));
    let (nu30, nu03, nu21, nu12) = (at(3, 0), at(0, 3), at(2, 1), at(1, 2));

    let mut t0 = nu30 + nu12;
    let mut t1 = nu21 + nu03;
    let mut q0 = t0 * t0;
    let mut q1 = t1 * t1;
    let n4 = 4.0 * nu11;
    let s = nu20 + nu02;
    let d = nu20 - nu02;

    let mut hu = [0.0; 7];
    hu[0] = s;
    hu[1] = d * d + n4 * nu11;
    hu[3] = q0 + q1;
    hu[5] = d * (q0 - q1) + n4 * t0 * t1;

    t0 *= q0 - 3.0 * q1;
    t1 *= 3.0 * q0 - q1;
    q0 = nu30 - 3.0 * nu12;
    q1 = 3.0 * nu21 - nu03;

    hu[2] = q0 * q0 + q1 * q1;
    hu[4] = q0 * t0 + q1 * t1;
    hu[6] = q1 * t0 - q0 * t1;

    Ok(hu)
}

/// Return the intensity weighted centroid of an image.
///
/// # Example
///
/// ```
/// use limen_tensor::Tensor;
/// use limen_measure::moments::centroid;
///
/// let image = Tensor::<f64, 2>::from_shape_fn([20, 20], |[i, j]| {
///     if (13..17).contains(&i) && (13..17).contains(&j) { 0.5 } else if (10..12).contains(&i) && (10..12).contains(&j) { 1.0 } else { 0.0 }
/// });
/// let c = centroid(&image).unwrap();
/// assert!((c[0] - 13.1666666).abs() < 1e-6 && (c[1] - 13.1666666).abs() < 1e-6);
/// ```
pub fn centroid<T: Pixel, const N: usize>(image: &Tensor<T, N>) -> Result<[f64; N], MomentsError> {
    let m = moments_central(image, Some([0.0; N]), 1)?;
    let mass = *m.get_unchecked([0; N]);
    Ok(std::array::from_fn(|axis| {
        m.get_unchecked(axis_index(axis, 1)) / mass
    }))
}

/// Compute the inertia tensor of an image.
///
/// Entry `(i, j)` is the covariance of the image intensity along axes `i` and
/// `j`, with the sign convention of a mechanical inertia tensor.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `mu` - Precomputed central moments of at least order 2.
///
/// # Errors
///
/// Returns [`MomentsError::OrderTooHigh`] if `mu` is of order lower than 2.
pub fn inertia_tensor<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    mu: Option<&Tensor<f64, N>>,
) -> Result<[[f64; N]; N], MomentsError> {
    let computed;
    let mu = match mu {
        Some(mu) => mu,
        None => {
            computed = moments_central(image, None, 2)?;
            &computed
        }
    };
    check_order(mu, 2)?;

    let mu0 = *mu.get_unchecked([0; N]);
    let second: [f64; N] = std::array::from_fn(|axis| *mu.get_unchecked(axis_index(axis, 2)));
    let total: f64 = second.iter().sum();

    let mut result = [[0.0; N]; N];
    for i in 0..N {
        result[i][i] = (total - second[i]) / mu0;
        for j in i + 1..N {
            let mut idx = [0; N];
            idx[i] = 1;
            idx[j] = 1;
            let v = -mu.get_unchecked(idx) / mu0;
            result[i][j] = v;
            result[j][i] = v;
        }
    }
    Ok(result)
}

/// Compute the eigenvalues of the inertia tensor of an image.
///
/// The relative magnitude of the eigenvalues measures the elongation of a
/// bright object.
///
/// # Arguments
///
/// * `image` - The input image of arbitrary rank.
/// * `mu` - Precomputed central moments, used when `t` is not given.
/// * `t` - A precomputed inertia tensor.
///
/// # Returns
///
/// The eigenvalues in decreasing order, negative rounding errors clipped to 0.
pub fn inertia_tensor_eigvals<T: Pixel, const N: usize>(
    image: &Tensor<T, N>,
    mu: Option<&Tensor<f64, N>>,
    t: Option<[[f64; N]; N]>,
) -> Result<[f64; N], MomentsError> {
    let t = match t {
        Some(t) => t,
        None => inertia_tensor(image, mu)?,
    };

    let mut eigvals = symmetric_eigenvalues(t).map(|v| if v < 0.0 { 0.0 } else { v });
    eigvals.sort_by(|a, b| b.total_cmp(a));
    Ok(eigvals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use limen_tensor::{Tensor2, Tensor3};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Ones on `rows x cols`, zeros elsewhere.
    fn rect(shape: [usize; 2], rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Tensor2<f64> {
        Tensor2::from_shape_fn(shape, |[i, j]| {
            if rows.contains(&i) && cols.contains(&j) {
                1.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_moments_central_square() -> Result<(), MomentsError> {
        let image = rect([20, 20], 13..17, 13..17);
        let m = moments(&image, 3)?;
        let c = [m.get_unchecked([1, 0]) / m.get_unchecked([0, 0]), m.get_unchecked([0, 1]) / m.get_unchecked([0, 0])];
        assert_eq!(c, [14.5, 14.5]);

        let mu = moments_central(&image, Some(c), 3)?;
        #[rustfmt::skip]
        let expected = [
            16.0, 0.0, 20.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
            20.0, 0.0, 25.0, 0.0,
            0.0, 0.0, 0.0, 0.0,
        ];
        for (a, b) in mu.iter().zip(expected.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }

        // the centroid is the default center
        assert_eq!(moments_central(&image, None, 3)?, mu);
        Ok(())
    }

    #[test]
    fn test_moments_normalized_square() -> Result<(), MomentsError> {
        let image = rect([20, 20], 13..17, 13..17);
        let mu = moments_central(&image, None, 3)?;
        let nu = moments_normalized(&mu, 3)?;

        assert!(nu.get_unchecked([0, 0]).is_nan());
        assert!(nu.get_unchecked([1, 0]).is_nan());
        assert!(nu.get_unchecked([0, 1]).is_nan());
        assert_relative_eq!(*nu.get_unchecked([2, 0]), 0.078125, epsilon = 1e-12);
        assert_relative_eq!(*nu.get_unchecked([0, 2]), 0.078125, epsilon = 1e-12);
        assert_relative_eq!(*nu.get_unchecked([2, 2]), 25.0 / 4096.0, epsilon = 1e-12);
        assert_relative_eq!(*nu.get_unchecked([1, 1]), 0.0, epsilon = 1e-12);

        // order 2 leaves the third order entries at zero
        let nu2 = moments_normalized(&mu, 2)?;
        assert_eq!(nu2.shape, [4, 4]);
        assert_eq!(*nu2.get_unchecked([3, 0]), 0.0);

        assert_eq!(
            moments_normalized(&mu, 4),
            Err(MomentsError::OrderTooHigh {
                shape: vec![4, 4],
                order: 4
            })
        );
        Ok(())
    }

    #[test]
    fn test_moments_hu_square() -> Result<(), MomentsError> {
        let image = rect([20, 20], 13..17, 13..17);
        let nu = moments_normalized(&moments_central(&image, None, 3)?, 3)?;
        let hu = moments_hu(&nu)?;
        assert_relative_eq!(hu[0], 0.15625, epsilon = 1e-12);
        for v in &hu[1..] {
            assert_relative_eq!(*v, 0.0, epsilon = 1e-12);
        }

        let low_order = moments_normalized(&moments_central(&image, None, 2)?, 2)?;
        assert!(moments_hu(&low_order).is_err());
        Ok(())
    }

    #[test]
    fn test_moments_hu_invariance() -> Result<(), MomentsError> {
        // an L shaped object, its transpose and a shifted copy
        let shape = Tensor2::<f64>::from_shape_fn([16, 16], |[i, j]| {
            ((2..10).contains(&i) && (3..5).contains(&j) || (8..10).contains(&i) && (3..9).contains(&j)) as u8 as f64
        });
        let transposed = Tensor2::<f64>::from_shape_fn([16, 16], |[i, j]| *shape.get_unchecked([j, i]));
        let shifted = Tensor2::<f64>::from_shape_fn([16, 16], |[i, j]| {
            if i >= 3 && j >= 2 {
                *shape.get_unchecked([i - 3, j - 2])
            } else {
                0.0
            }
        });

        let hu_of = |image: &Tensor2<f64>| -> Result<[f64; 7], MomentsError> {
            moments_hu(&moments_normalized(&moments_central(image, None, 3)?, 3)?)
        };
        let reference = hu_of(&shape)?;
        for other in [hu_of(&transposed)?, hu_of(&shifted)?] {
            for (a, b) in reference.iter().zip(other.iter()) {
                assert_relative_eq!(a.abs(), b.abs(), epsilon = 1e-12, max_relative = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_moments_coords_match_binary_image() -> Result<(), MomentsError> {
        let image = rect([12, 12], 2..5, 4..10);
        let coords: Vec<[f64; 2]> = (0..image.numel())
            .filter(|&o| image.as_slice()[o] > 0.0)
            .map(|o| image.get_index_unchecked(o).map(|v| v as f64))
            .collect();

        let from_image = moments(&image, 3)?;
        let from_coords = moments_coords(&coords, 3);
        for (a, b) in from_image.iter().zip(from_coords.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }

        let central_image = moments_central(&image, None, 3)?;
        let central_coords = moments_coords_central(&coords, None, 3);
        for (a, b) in central_image.iter().zip(central_coords.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_centroid() -> Result<(), MomentsError> {
        let image = rect([20, 20], 13..17, 10..20);
        assert_eq!(centroid(&image)?, [14.5, 14.5]);

        let mut rng = StdRng::seed_from_u64(42);
        let data: Vec<u8> = (0..5 * 6 * 7).map(|_| rng.random_range(1..=255)).collect();
        let volume = Tensor3::from_shape_vec([5, 6, 7], data)?;
        let c = centroid(&volume)?;
        let mu = moments_central(&volume, Some(c), 1)?;
        for axis in 0..3 {
            assert_relative_eq!(*mu.get_unchecked(axis_index(axis, 1)), 0.0, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_inertia_tensor_square() -> Result<(), MomentsError> {
        let image = rect([20, 20], 13..17, 13..17);
        let t = inertia_tensor(&image, None)?;
        assert_relative_eq!(t[0][0], 1.25, epsilon = 1e-12);
        assert_relative_eq!(t[1][1], 1.25, epsilon = 1e-12);
        assert_relative_eq!(t[0][1], 0.0, epsilon = 1e-12);

        let eig = inertia_tensor_eigvals(&image, None, None)?;
        assert_relative_eq!(eig[0], 1.25, epsilon = 1e-12);
        assert_relative_eq!(eig[1], 1.25, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_inertia_tensor_eigvals_elongated() -> Result<(), MomentsError> {
        let image = rect([20, 20], 13..17, 10..20);
        let mu = moments_central(&image, None, 2)?;
        let t = inertia_tensor(&image, Some(&mu))?;
        assert_relative_eq!(t[0][0], 8.25, epsilon = 1e-12);
        assert_relative_eq!(t[1][1], 1.25, epsilon = 1e-12);

        let eig = inertia_tensor_eigvals(&image, Some(&mu), None)?;
        assert_relative_eq!(eig[0], 8.25, epsilon = 1e-12);
        assert_relative_eq!(eig[1], 1.25, epsilon = 1e-12);

        // a tilted tensor keeps its eigenvalues, negative ones are clipped
        let eig = inertia_tensor_eigvals(&image, None, Some([[2.0, 1.0], [1.0, 2.0]]))?;
        assert_relative_eq!(eig[0], 3.0, epsilon = 1e-12);
        assert_relative_eq!(eig[1], 1.0, epsilon = 1e-12);
        let eig = inertia_tensor_eigvals(&image, None, Some([[0.0, 1.0], [1.0, 0.0]]))?;
        assert_eq!(eig[1], 0.0);
        Ok(())
    }

    #[test]
    fn test_inertia_tensor_low_order_moments() -> Result<(), MomentsError> {
        let image = rect([8, 8], 2..4, 2..4);
        let mu = moments_central(&image, None, 1)?;
        assert!(matches!(
            inertia_tensor(&image, Some(&mu)),
            Err(MomentsError::OrderTooHigh { .. })
        ));
        Ok(())
    }
}
