/// Maximum number of cyclic Jacobi sweeps.
const JACOBI_SWEEPS: usize = 64;

/// Sum of the squared strictly upper triangular entries.
fn off_diagonal<const N: usize>(a: &[[f64; N]; N]) -> f64 {
    let mut off = 0.0;
    for p in 0..N {
        for q in p + 1..N {
            off += a[p][q] * a[p][q];
        }
    }
    off
}

/// Eigenvalues of a symmetric matrix by cyclic Jacobi rotations.
///
/// The returned values are in diagonal order, not sorted.
pub(crate) fn symmetric_eigenvalues<const N: usize>(mut a: [[f64; N]; N]) -> [f64; N] {
    let scale: f64 = a.iter().flatten().map(|v| v * v).sum::<f64>();
    let tolerance = f64::EPSILON * f64::EPSILON * scale;

    let mut converged = false;
    for _ in 0..JACOBI_SWEEPS {
        if off_diagonal(&a) <= tolerance {
            converged = true;
            break;
        }
        for p in 0..N {
            for q in p + 1..N {
                if a[p][q] == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for row in a.iter_mut() {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..N {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
            }
        }
    }

    if !converged && off_diagonal(&a) > tolerance {
        log::warn!("jacobi eigenvalue iteration did not converge in {JACOBI_SWEEPS} sweeps");
    }

    std::array::from_fn(|i| a[i][i])
}
