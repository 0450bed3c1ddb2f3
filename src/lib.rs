// Classical principal component analysis (PCA)

#![doc = include_str!("../README.md")]

pub mod covariance;
pub mod eigen;
pub mod error;
pub mod pca;
pub mod standardize;

pub use crate::eigen::{symmetric_eigen, EigenPair};
pub use crate::error::PcaError;
pub use crate::pca::{PcaConfig, PCA};
pub use crate::standardize::{
    fit_statistics, standardize, FeatureStatistics, Standardized, ZeroVariancePolicy,
};
