//! Per-feature centering and variance scaling.

use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};

use crate::error::PcaError;

/// Standard deviations below this are treated as zero variance.
pub(crate) const ZERO_VARIANCE_THRESHOLD: f64 = 1e-12;

/// What to do with a zero-variance feature column when scaling is requested.
///
/// Scaling a constant column would divide by zero, so the choice must be
/// explicit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZeroVariancePolicy {
    /// Fail with [`PcaError::DegenerateFeature`].
    #[default]
    Reject,
    /// Leave the column unscaled (treat its scale as 1.0). The column still
    /// gets centered, so it contributes a zero row/column to the covariance
    /// matrix.
    UnitScale,
}

/// Per-column mean and standard deviation of a specific input matrix.
///
/// Computed once per input, immutable afterward. The standard deviation is
/// the population estimate (ddof = 0) and is kept raw here; sanitization for
/// zero-variance columns happens in [`standardize`] according to the chosen
/// [`ZeroVariancePolicy`].
#[derive(Clone, Debug)]
pub struct FeatureStatistics {
    /// Per-column mean, length D.
    pub mean: Array1<f64>,
    /// Per-column population standard deviation, length D.
    pub std_dev: Array1<f64>,
}

/// A standardized matrix together with the scale vector actually applied.
#[derive(Clone, Debug)]
pub struct Standardized {
    /// Same shape as the input; each column centered (and scaled, if
    /// requested).
    pub matrix: Array2<f64>,
    /// The effective per-column divisor. All ones when scaling is disabled;
    /// otherwise the sanitized standard deviations.
    pub scale: Array1<f64>,
}

/// Validates the input matrix and computes its per-column statistics.
///
/// # Errors
/// - [`PcaError::EmptyInput`] if the matrix has zero rows or columns.
/// - [`PcaError::InsufficientSamples`] if it has fewer than 2 rows.
/// - [`PcaError::NonFiniteValue`] if any entry is NaN or infinite.
pub fn fit_statistics(data: &ArrayView2<f64>) -> Result<FeatureStatistics, PcaError> {
    let n_samples = data.nrows();
    let n_features = data.ncols();

    if n_samples == 0 || n_features == 0 {
        return Err(PcaError::EmptyInput);
    }
    if n_samples < 2 {
        return Err(PcaError::InsufficientSamples { n_samples });
    }
    for ((row, column), &value) in data.indexed_iter() {
        if !value.is_finite() {
            return Err(PcaError::NonFiniteValue { row, column });
        }
    }

    let mean = data.mean_axis(Axis(0)).ok_or(PcaError::EmptyInput)?;
    let std_dev = data.map_axis(Axis(0), |column| column.std(0.0));

    Ok(FeatureStatistics { mean, std_dev })
}

/// Centers (and optionally scales) each column of `data` using `statistics`.
///
/// With `scale` disabled every column is only centered and the returned
/// scale vector is all ones. With `scale` enabled each column is divided by
/// its standard deviation; columns whose standard deviation is below the
/// zero-variance threshold are handled per `policy`.
///
/// Pure function of its inputs.
///
/// # Errors
/// [`PcaError::DegenerateFeature`] for a zero-variance column under scaling
/// with [`ZeroVariancePolicy::Reject`].
pub fn standardize(
    mut data: Array2<f64>,
    statistics: &FeatureStatistics,
    scale: bool,
    policy: ZeroVariancePolicy,
) -> Result<Standardized, PcaError> {
    let n_features = data.ncols();

    let effective_scale = if scale {
        let mut sanitized = statistics.std_dev.clone();
        for (column, value) in sanitized.iter_mut().enumerate() {
            if value.abs() < ZERO_VARIANCE_THRESHOLD {
                match policy {
                    ZeroVariancePolicy::Reject => {
                        return Err(PcaError::DegenerateFeature { column });
                    }
                    ZeroVariancePolicy::UnitScale => {
                        debug!(
                            "feature column {} has zero variance; leaving it unscaled",
                            column
                        );
                        *value = 1.0;
                    }
                }
            }
        }
        sanitized
    } else {
        Array1::ones(n_features)
    };

    data -= &statistics.mean;
    data /= &effective_scale;

    Ok(Standardized {
        matrix: data,
        scale: effective_scale,
    })
}
