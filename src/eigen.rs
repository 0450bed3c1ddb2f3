//! Symmetric eigendecomposition via cyclic Jacobi rotations.
//!
//! The covariance matrices this crate feeds in are small and dense, which is
//! exactly the regime where the Jacobi method shines: it is numerically
//! stable, needs no factorization machinery, and the accumulated rotations
//! give orthonormal eigenvectors directly.

use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView2};

use crate::error::PcaError;

/// Relative slack for the positive semi-definiteness check. Eigenvalues in
/// `[-slack, 0)` are treated as round-off and clamped to zero; anything more
/// negative fails.
const PSD_SLACK: f64 = 1e-8;

/// One eigenvalue paired with its unit-norm eigenvector.
#[derive(Clone, Debug)]
pub struct EigenPair {
    pub eigenvalue: f64,
    /// Length-D unit vector. Sign convention: the largest-magnitude
    /// component is positive.
    pub eigenvector: Array1<f64>,
}

/// Decomposes a real symmetric positive semi-definite D x D matrix into
/// exactly D [`EigenPair`]s with mutually orthonormal eigenvectors.
///
/// Cyclic Jacobi: full sweeps over all off-diagonal entries, rotating each
/// pair to zero, until the off-diagonal sum of squares drops below
/// `tolerance` times the squared Frobenius norm of the input. Pairs are
/// returned in diagonal order (unsorted); the caller sorts.
///
/// Eigenvector signs are fixed so the largest-magnitude component of each
/// vector is positive, making the output deterministic and testable.
///
/// # Errors
/// - [`PcaError::Convergence`] if `max_sweeps` full sweeps do not reach the
///   threshold. For well-conditioned covariance input this is reachable
///   only pathologically: Jacobi converges quadratically once the
///   off-diagonal mass is small.
/// - [`PcaError::InvalidCovariance`] if an eigenvalue is negative beyond
///   the PSD slack, which indicates a defective input rather than round-off.
pub fn symmetric_eigen(
    matrix: &ArrayView2<f64>,
    max_sweeps: usize,
    tolerance: f64,
) -> Result<Vec<EigenPair>, PcaError> {
    let dim = matrix.nrows();
    debug_assert_eq!(dim, matrix.ncols(), "eigensolver input must be square");

    let mut a = matrix.to_owned();
    let mut basis = Array2::<f64>::eye(dim);

    let frobenius_sq: f64 = a.iter().map(|x| x * x).sum();
    let threshold = tolerance * frobenius_sq;

    let mut off = off_diagonal_sq(&a);
    if dim > 1 && off > threshold {
        let mut converged = false;
        for sweep in 1..=max_sweeps {
            for p in 0..dim - 1 {
                for q in (p + 1)..dim {
                    rotate(&mut a, &mut basis, p, q);
                }
            }
            off = off_diagonal_sq(&a);
            trace!(
                "jacobi sweep {}: off-diagonal sum of squares {:.3e}",
                sweep,
                off
            );
            if off <= threshold {
                debug!("jacobi converged after {} sweeps", sweep);
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(PcaError::Convergence {
                sweeps: max_sweeps,
                off_diagonal: off,
            });
        }
    }

    let scale = (0..dim).map(|i| a[[i, i]].abs()).fold(0.0_f64, f64::max);
    let psd_slack = PSD_SLACK * scale;

    let mut pairs = Vec::with_capacity(dim);
    for i in 0..dim {
        let raw = a[[i, i]];
        if raw < -psd_slack {
            return Err(PcaError::InvalidCovariance { eigenvalue: raw });
        }
        let mut eigenvector = basis.column(i).to_owned();
        fix_sign(&mut eigenvector);
        pairs.push(EigenPair {
            eigenvalue: raw.max(0.0),
            eigenvector,
        });
    }
    Ok(pairs)
}

fn off_diagonal_sq(a: &Array2<f64>) -> f64 {
    let dim = a.nrows();
    let mut sum = 0.0;
    for p in 0..dim {
        for q in 0..dim {
            if p != q {
                sum += a[[p, q]] * a[[p, q]];
            }
        }
    }
    sum
}

/// One Jacobi rotation zeroing `a[[p, q]]`, applied symmetrically to `a` and
/// accumulated into the columns of `basis`.
fn rotate(a: &mut Array2<f64>, basis: &mut Array2<f64>, p: usize, q: usize) {
    let apq = a[[p, q]];
    if apq == 0.0 {
        return;
    }
    let app = a[[p, p]];
    let aqq = a[[q, q]];

    // tan of the rotation angle, chosen as the smaller root for stability.
    let theta = (aqq - app) / (2.0 * apq);
    let t = if theta >= 0.0 {
        1.0 / (theta + (1.0 + theta * theta).sqrt())
    } else {
        1.0 / (theta - (1.0 + theta * theta).sqrt())
    };
    let c = 1.0 / (1.0 + t * t).sqrt();
    let s = t * c;

    let dim = a.nrows();
    for k in 0..dim {
        if k != p && k != q {
            let akp = a[[k, p]];
            let akq = a[[k, q]];
            a[[k, p]] = c * akp - s * akq;
            a[[p, k]] = a[[k, p]];
            a[[k, q]] = s * akp + c * akq;
            a[[q, k]] = a[[k, q]];
        }
    }
    a[[p, p]] = app - t * apq;
    a[[q, q]] = aqq + t * apq;
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for k in 0..dim {
        let vkp = basis[[k, p]];
        let vkq = basis[[k, q]];
        basis[[k, p]] = c * vkp - s * vkq;
        basis[[k, q]] = s * vkp + c * vkq;
    }
}

/// Negates the vector if its largest-magnitude component (first such index
/// on ties) is negative.
fn fix_sign(vector: &mut Array1<f64>) {
    let mut max_index = 0;
    let mut max_abs = 0.0;
    for (i, &value) in vector.iter().enumerate() {
        if value.abs() > max_abs {
            max_abs = value.abs();
            max_index = i;
        }
    }
    if vector[max_index] < 0.0 {
        vector.mapv_inplace(|x| -x);
    }
}
