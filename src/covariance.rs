//! Unbiased sample covariance of a standardized matrix.

use ndarray::{Array2, ArrayView2};

use crate::error::PcaError;

/// Computes the D x D sample covariance matrix of an N x D zero-mean matrix
/// using the unbiased estimator (divide by N-1).
///
/// The product `X^T X` is symmetric in exact arithmetic but floating-point
/// summation order can leave the two triangles a few ulps apart, which the
/// eigensolver would then chase. The result is symmetrized as `(C + C^T)/2`
/// before it is returned.
///
/// # Errors
/// [`PcaError::InsufficientSamples`] if the matrix has fewer than 2 rows.
pub fn covariance(standardized: &ArrayView2<f64>) -> Result<Array2<f64>, PcaError> {
    let n_samples = standardized.nrows();
    if n_samples < 2 {
        return Err(PcaError::InsufficientSamples { n_samples });
    }

    let mut cov = standardized.t().dot(standardized);
    cov /= (n_samples - 1) as f64;

    let symmetrized = (&cov + &cov.t()) * 0.5;
    Ok(symmetrized)
}
