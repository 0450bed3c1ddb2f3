//! The fitted PCA model: pipeline driver, projection, and persistence.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use log::{debug, info};
use ndarray::{Array1, Array2, Axis, Zip};
use serde::{Deserialize, Serialize};

use crate::covariance::covariance;
use crate::eigen::symmetric_eigen;
use crate::error::PcaError;
use crate::standardize::{fit_statistics, standardize, ZeroVariancePolicy};

/// Configuration for a PCA fit. All options are explicit; there are no
/// hidden defaults beyond this struct's `Default` impl.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PcaConfig {
    /// Divide each centered column by its standard deviation. Disable to
    /// run PCA on the covariance of merely centered data.
    pub scale: bool,
    /// Number of principal components to retain (K). Must lie in
    /// [1, n_features].
    pub components: usize,
    /// Cap on full Jacobi sweeps in the eigensolver.
    pub max_iterations: usize,
    /// Convergence threshold for the eigensolver: the off-diagonal sum of
    /// squares must fall below this fraction of the squared Frobenius norm.
    pub tolerance: f64,
    /// What to do with a zero-variance column when `scale` is enabled.
    pub zero_variance: ZeroVariancePolicy,
}

impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            scale: true,
            components: 2,
            max_iterations: 1000,
            tolerance: 1e-10,
            zero_variance: ZeroVariancePolicy::Reject,
        }
    }
}

/// Principal component analysis (PCA) model.
///
/// Holds the results of a fit (mean, scale, rotation matrix, retained
/// eigenvalues, and explained-variance ratios) and can project new data into
/// the principal component space or back out of it. Models can also be
/// constructed from pre-computed components and saved to/loaded from files.
#[derive(Serialize, Deserialize, Debug)]
pub struct PCA {
    /// The rotation matrix (principal components as columns).
    /// Shape: (n_features, k_components)
    rotation: Option<Array2<f64>>,
    /// Mean vector of the original training data.
    /// Shape: (n_features)
    mean: Option<Array1<f64>>,
    /// Effective scale vector the training data was divided by. All ones
    /// when fitted without scaling; always positive.
    /// Shape: (n_features)
    scale: Option<Array1<f64>>,
    /// Eigenvalues of the covariance matrix for the retained components,
    /// descending. Shape: (k_components)
    explained_variance: Option<Array1<f64>>,
    /// Fraction of total variance captured by each retained component.
    /// Shape: (k_components)
    explained_variance_ratio: Option<Array1<f64>>,
}

impl Default for PCA {
    fn default() -> Self {
        Self::new()
    }
}

impl PCA {
    /// Creates a new, empty PCA model.
    ///
    /// The model is not fitted and needs to be computed with [`PCA::fit`],
    /// or loaded via [`PCA::load_model`] or [`PCA::with_model`].
    ///
    /// # Examples
    ///
    /// ```
    /// use classical_pca::PCA;
    /// let pca = PCA::new();
    /// assert!(pca.rotation().is_none());
    /// ```
    pub fn new() -> Self {
        Self {
            rotation: None,
            mean: None,
            scale: None,
            explained_variance: None,
            explained_variance_ratio: None,
        }
    }

    /// Creates a PCA model from pre-computed components.
    ///
    /// Useful for loading a model whose rotation matrix, mean, and original
    /// standard deviations were computed elsewhere. Standard deviations that
    /// are not strictly positive are sanitized to `1.0` so the stored scale
    /// is always a valid divisor; if the original fit did not scale, pass a
    /// vector of ones.
    ///
    /// Explained variances are not known to this constructor and the
    /// corresponding accessors return `None`.
    ///
    /// # Errors
    /// [`PcaError::InvalidModel`] if feature dimensions are inconsistent or
    /// `raw_standard_deviations` contains non-finite values.
    pub fn with_model(
        rotation: Array2<f64>,
        mean: Array1<f64>,
        raw_standard_deviations: Array1<f64>,
    ) -> Result<Self, PcaError> {
        let n_features = rotation.nrows();
        if mean.len() != n_features || raw_standard_deviations.len() != n_features {
            return Err(PcaError::InvalidModel(format!(
                "feature dimensions of rotation ({}), mean ({}), and raw_standard_deviations ({}) must match",
                n_features,
                mean.len(),
                raw_standard_deviations.len()
            )));
        }
        if raw_standard_deviations.iter().any(|v| !v.is_finite()) {
            return Err(PcaError::InvalidModel(
                "raw_standard_deviations contains non-finite values".to_string(),
            ));
        }

        let sanitized_scale = raw_standard_deviations.mapv(|v| {
            if v > crate::standardize::ZERO_VARIANCE_THRESHOLD {
                v
            } else {
                1.0
            }
        });

        Ok(Self {
            rotation: Some(rotation),
            mean: Some(mean),
            scale: Some(sanitized_scale),
            explained_variance: None,
            explained_variance_ratio: None,
        })
    }

    /// Returns the mean vector of the training data, if fitted.
    pub fn mean(&self) -> Option<&Array1<f64>> {
        self.mean.as_ref()
    }

    /// Returns the effective scale vector (always positive), if fitted.
    pub fn scale(&self) -> Option<&Array1<f64>> {
        self.scale.as_ref()
    }

    /// Returns the rotation matrix (principal components as columns), if
    /// fitted. Shape: (n_features, k_components).
    pub fn rotation(&self) -> Option<&Array2<f64>> {
        self.rotation.as_ref()
    }

    /// Returns the eigenvalues of the retained components, descending.
    pub fn explained_variance(&self) -> Option<&Array1<f64>> {
        self.explained_variance.as_ref()
    }

    /// Returns the fraction of total variance captured by each retained
    /// component. Over all D components these sum to approximately 1; over
    /// the retained K they sum to at most 1.
    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.explained_variance_ratio.as_ref()
    }

    /// Returns the number of retained components, if fitted.
    pub fn n_components(&self) -> Option<usize> {
        self.rotation.as_ref().map(|r| r.ncols())
    }

    /// Fits the model: standardize, estimate covariance, eigendecompose,
    /// and retain the top-K basis.
    ///
    /// The input is consumed; standardization happens in place.
    ///
    /// # Errors
    /// Any [`PcaError`] raised by a pipeline stage: empty or non-finite
    /// input, fewer than 2 samples, a degenerate column under scaling with
    /// the `Reject` policy, a component count outside [1, n_features],
    /// eigensolver non-convergence, or a non-PSD covariance matrix.
    pub fn fit(&mut self, data_matrix: Array2<f64>, config: &PcaConfig) -> Result<(), PcaError> {
        self.fit_impl(data_matrix, config)?;
        Ok(())
    }

    /// Fits the model and returns the principal component scores of the
    /// training data, shape (n_samples, k_components).
    ///
    /// # Errors
    /// Same as [`PCA::fit`].
    pub fn fit_transform(
        &mut self,
        data_matrix: Array2<f64>,
        config: &PcaConfig,
    ) -> Result<Array2<f64>, PcaError> {
        self.fit_impl(data_matrix, config)
    }

    fn fit_impl(
        &mut self,
        data_matrix: Array2<f64>,
        config: &PcaConfig,
    ) -> Result<Array2<f64>, PcaError> {
        let n_samples = data_matrix.nrows();
        let n_features = data_matrix.ncols();

        let statistics = fit_statistics(&data_matrix.view())?;
        if config.components < 1 || config.components > n_features {
            return Err(PcaError::InvalidComponentCount {
                requested: config.components,
                n_features,
            });
        }

        info!(
            "fitting PCA: {} samples, {} features, {} components, scaling {}",
            n_samples,
            n_features,
            config.components,
            if config.scale { "on" } else { "off" }
        );

        let standardized = standardize(
            data_matrix,
            &statistics,
            config.scale,
            config.zero_variance,
        )?;

        let cov = covariance(&standardized.matrix.view())?;
        let pairs = symmetric_eigen(&cov.view(), config.max_iterations, config.tolerance)?;

        // Stable descending sort on eigenvalue, ties broken by original
        // diagonal index, so the retained basis is deterministic.
        let mut order: Vec<usize> = (0..pairs.len()).collect();
        order.sort_by(|&i, &j| {
            pairs[j]
                .eigenvalue
                .partial_cmp(&pairs[i].eigenvalue)
                .unwrap_or(Ordering::Equal)
                .then(i.cmp(&j))
        });

        let total_variance: f64 = pairs.iter().map(|p| p.eigenvalue).sum();

        let k = config.components;
        let mut rotation = Array2::<f64>::zeros((n_features, k));
        let mut eigenvalues = Array1::<f64>::zeros(k);
        for (slot, &original_index) in order.iter().take(k).enumerate() {
            rotation
                .column_mut(slot)
                .assign(&pairs[original_index].eigenvector);
            eigenvalues[slot] = pairs[original_index].eigenvalue;
        }

        // A zero covariance matrix (constant columns under centering only)
        // has no variance to apportion; report zero ratios rather than NaN.
        let ratios = if total_variance > 0.0 {
            &eigenvalues / total_variance
        } else {
            Array1::zeros(k)
        };

        debug!(
            "retained {} of {} components, explained variance ratio sum {:.6}",
            k,
            n_features,
            ratios.sum()
        );

        let scores = standardized.matrix.dot(&rotation);

        self.mean = Some(statistics.mean);
        self.scale = Some(standardized.scale);
        self.rotation = Some(rotation);
        self.explained_variance = Some(eigenvalues);
        self.explained_variance_ratio = Some(ratios);

        Ok(scores)
    }

    /// Projects data into the principal component space of a fitted model.
    ///
    /// Each row is centered and scaled with the stored statistics, then
    /// projected onto the retained basis. The input is modified in place
    /// before projection.
    ///
    /// # Errors
    /// - [`PcaError::ModelNotFitted`] if the model has no components.
    /// - [`PcaError::DimensionMismatch`] if the feature count differs from
    ///   the model's.
    /// - [`PcaError::NonFiniteValue`] if the input contains NaN or infinity.
    pub fn transform(&self, mut x: Array2<f64>) -> Result<Array2<f64>, PcaError> {
        let rotation = self.rotation.as_ref().ok_or(PcaError::ModelNotFitted)?;
        let mean = self.mean.as_ref().ok_or(PcaError::ModelNotFitted)?;
        let scale = self.scale.as_ref().ok_or(PcaError::ModelNotFitted)?;

        if x.ncols() != mean.len() {
            return Err(PcaError::DimensionMismatch {
                expected: mean.len(),
                actual: x.ncols(),
            });
        }
        for ((row, column), &value) in x.indexed_iter() {
            if !value.is_finite() {
                return Err(PcaError::NonFiniteValue { row, column });
            }
        }
        if x.nrows() == 0 {
            return Ok(Array2::zeros((0, rotation.ncols())));
        }

        // Fused centering and scaling in a single pass over each row.
        for mut row in x.axis_iter_mut(Axis(0)) {
            Zip::from(row.view_mut())
                .and(mean.view())
                .and(scale.view())
                .for_each(|value, &m, &s| {
                    *value = (*value - m) / s;
                });
        }

        Ok(x.dot(rotation))
    }

    /// Maps principal component scores back to the original feature space.
    ///
    /// The reconstruction is exact when all D components were retained and
    /// a least-squares approximation otherwise.
    ///
    /// # Errors
    /// - [`PcaError::ModelNotFitted`] if the model has no components.
    /// - [`PcaError::DimensionMismatch`] if the score dimension differs from
    ///   the model's component count.
    pub fn inverse_transform(&self, scores: Array2<f64>) -> Result<Array2<f64>, PcaError> {
        let rotation = self.rotation.as_ref().ok_or(PcaError::ModelNotFitted)?;
        let mean = self.mean.as_ref().ok_or(PcaError::ModelNotFitted)?;
        let scale = self.scale.as_ref().ok_or(PcaError::ModelNotFitted)?;

        if scores.ncols() != rotation.ncols() {
            return Err(PcaError::DimensionMismatch {
                expected: rotation.ncols(),
                actual: scores.ncols(),
            });
        }

        let mut reconstructed = scores.dot(&rotation.t());
        reconstructed *= scale;
        reconstructed += mean;
        Ok(reconstructed)
    }

    /// Saves the model to a file with bincode.
    ///
    /// # Errors
    /// [`PcaError::ModelNotFitted`] if essential components are missing, or
    /// [`PcaError::ModelPersistence`] on I/O or serialization failure.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<(), PcaError> {
        if self.rotation.is_none() || self.mean.is_none() || self.scale.is_none() {
            return Err(PcaError::ModelNotFitted);
        }
        let file = File::create(path.as_ref()).map_err(|e| {
            PcaError::ModelPersistence(format!(
                "failed to create file at {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        let mut writer = BufWriter::new(file);
        bincode::serde::encode_into_std_write(self, &mut writer, bincode::config::standard())
            .map_err(|e| PcaError::ModelPersistence(format!("failed to serialize model: {}", e)))?;
        Ok(())
    }

    /// Loads a model previously saved with [`PCA::save_model`], validating
    /// its internal consistency.
    ///
    /// # Errors
    /// [`PcaError::ModelPersistence`] on I/O or deserialization failure, or
    /// [`PcaError::InvalidModel`] if the loaded components are incomplete or
    /// inconsistent.
    pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Self, PcaError> {
        let file = File::open(path.as_ref()).map_err(|e| {
            PcaError::ModelPersistence(format!(
                "failed to open file at {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;
        let mut reader = BufReader::new(file);
        let model: PCA =
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard())
                .map_err(|e| {
                    PcaError::ModelPersistence(format!("failed to deserialize model: {}", e))
                })?;

        let rotation = model
            .rotation
            .as_ref()
            .ok_or_else(|| PcaError::InvalidModel("missing rotation matrix".to_string()))?;
        let mean = model
            .mean
            .as_ref()
            .ok_or_else(|| PcaError::InvalidModel("missing mean vector".to_string()))?;
        let scale = model
            .scale
            .as_ref()
            .ok_or_else(|| PcaError::InvalidModel("missing scale vector".to_string()))?;

        let n_features = rotation.nrows();
        if mean.len() != n_features || scale.len() != n_features {
            return Err(PcaError::InvalidModel(format!(
                "inconsistent feature dimensions: rotation {}, mean {}, scale {}",
                n_features,
                mean.len(),
                scale.len()
            )));
        }
        if scale.iter().any(|&v| !v.is_finite() || v <= 0.0) {
            return Err(PcaError::InvalidModel(
                "scale vector must contain positive finite values".to_string(),
            ));
        }
        if let Some(ev) = model.explained_variance.as_ref() {
            if ev.len() != rotation.ncols() {
                return Err(PcaError::InvalidModel(format!(
                    "explained_variance length ({}) does not match component count ({})",
                    ev.len(),
                    rotation.ncols()
                )));
            }
            if ev.iter().any(|&v| !v.is_finite() || v < 0.0) {
                return Err(PcaError::InvalidModel(
                    "explained_variance must contain non-negative finite values".to_string(),
                ));
            }
        }

        Ok(model)
    }
}
