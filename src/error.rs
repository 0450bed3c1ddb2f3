use thiserror::Error;

/// Errors produced by the PCA pipeline.
///
/// Every failure is synchronous and typed; a stage either produces a fully
/// valid output or fails with one of these variants. Nothing is retried
/// internally: the computation is deterministic, so retrying with the same
/// input and configuration cannot succeed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PcaError {
    /// A feature column has zero variance while scaling was requested with
    /// [`ZeroVariancePolicy::Reject`](crate::ZeroVariancePolicy::Reject).
    #[error("feature column {column} has zero variance and cannot be scaled")]
    DegenerateFeature { column: usize },

    /// Fewer than two samples were supplied; the unbiased covariance
    /// estimator divides by N-1.
    #[error("at least 2 samples are required, got {n_samples}")]
    InsufficientSamples { n_samples: usize },

    /// The symmetric matrix handed to the eigensolver produced an eigenvalue
    /// more negative than the numerical tolerance allows. Covariance
    /// matrices are positive semi-definite, so this indicates a defective
    /// input rather than round-off.
    #[error("matrix is not positive semi-definite: eigenvalue {eigenvalue} is negative beyond tolerance")]
    InvalidCovariance { eigenvalue: f64 },

    /// The Jacobi eigensolver exhausted its sweep cap before the
    /// off-diagonal mass fell below the convergence threshold.
    #[error("eigensolver did not converge after {sweeps} sweeps (off-diagonal sum of squares {off_diagonal:.3e})")]
    Convergence { sweeps: usize, off_diagonal: f64 },

    /// The requested component count is outside [1, n_features].
    #[error("requested {requested} components but valid range is [1, {n_features}]")]
    InvalidComponentCount { requested: usize, n_features: usize },

    /// The input matrix has zero rows or zero columns.
    #[error("input matrix has zero samples or zero features")]
    EmptyInput,

    /// The input matrix contains a NaN or infinite entry. The algorithm
    /// does not define behavior for missing values, so they are rejected at
    /// the boundary.
    #[error("non-finite value at row {row}, column {column}")]
    NonFiniteValue { row: usize, column: usize },

    /// Data handed to a fitted model does not match the model's feature
    /// dimension.
    #[error("expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// `transform`, `inverse_transform`, or `save_model` was called on a
    /// model with no fitted (or loaded) components.
    #[error("PCA model is not fitted; call fit or load a model first")]
    ModelNotFitted,

    /// Externally supplied or loaded model components are inconsistent
    /// (mismatched dimensions, non-finite scales, negative variances).
    #[error("invalid model components: {0}")]
    InvalidModel(String),

    /// Saving or loading a model failed (file I/O or codec).
    #[error("model persistence failed: {0}")]
    ModelPersistence(String),
}
