//! End-to-end tests on the classic 150x4 flower measurement dataset
//! (sepal length, sepal width, petal length, petal width; three labeled
//! groups of 50 samples each).

use approx::assert_abs_diff_eq;
use classical_pca::{PcaConfig, PcaError, PCA};
use ndarray::{Array2, Axis};

const N_SAMPLES: usize = 150;
const N_FEATURES: usize = 4;
const GROUP_SIZE: usize = 50;

#[rustfmt::skip]
const FLOWER_ROWS: [[f64; N_FEATURES]; N_SAMPLES] = [
    // Group 1
    [5.1, 3.5, 1.4, 0.2], [4.9, 3.0, 1.4, 0.2], [4.7, 3.2, 1.3, 0.2],
    [4.6, 3.1, 1.5, 0.2], [5.0, 3.6, 1.4, 0.2], [5.4, 3.9, 1.7, 0.4],
    [4.6, 3.4, 1.4, 0.3], [5.0, 3.4, 1.5, 0.2], [4.4, 2.9, 1.4, 0.2],
    [4.9, 3.1, 1.5, 0.1], [5.4, 3.7, 1.5, 0.2], [4.8, 3.4, 1.6, 0.2],
    [4.8, 3.0, 1.4, 0.1], [4.3, 3.0, 1.1, 0.1], [5.8, 4.0, 1.2, 0.2],
    [5.7, 4.4, 1.5, 0.4], [5.4, 3.9, 1.3, 0.4], [5.1, 3.5, 1.4, 0.3],
    [5.7, 3.8, 1.7, 0.3], [5.1, 3.8, 1.5, 0.3], [5.4, 3.4, 1.7, 0.2],
    [5.1, 3.7, 1.5, 0.4], [4.6, 3.6, 1.0, 0.2], [5.1, 3.3, 1.7, 0.5],
    [4.8, 3.4, 1.9, 0.2], [5.0, 3.0, 1.6, 0.2], [5.0, 3.4, 1.6, 0.4],
    [5.2, 3.5, 1.5, 0.2], [5.2, 3.4, 1.4, 0.2], [4.7, 3.2, 1.6, 0.2],
    [4.8, 3.1, 1.6, 0.2], [5.4, 3.4, 1.5, 0.4], [5.2, 4.1, 1.5, 0.1],
    [5.5, 4.2, 1.4, 0.2], [4.9, 3.1, 1.5, 0.2], [5.0, 3.2, 1.2, 0.2],
    [5.5, 3.5, 1.3, 0.2], [4.9, 3.6, 1.4, 0.1], [4.4, 3.0, 1.3, 0.2],
    [5.1, 3.4, 1.5, 0.2], [5.0, 3.5, 1.3, 0.3], [4.5, 2.3, 1.3, 0.3],
    [4.4, 3.2, 1.3, 0.2], [5.0, 3.5, 1.6, 0.6], [5.1, 3.8, 1.9, 0.4],
    [4.8, 3.0, 1.4, 0.3], [5.1, 3.8, 1.6, 0.2], [4.6, 3.2, 1.4, 0.2],
    [5.3, 3.7, 1.5, 0.2], [5.0, 3.3, 1.4, 0.2],
    // Group 2
    [7.0, 3.2, 4.7, 1.4], [6.4, 3.2, 4.5, 1.5], [6.9, 3.1, 4.9, 1.5],
    [5.5, 2.3, 4.0, 1.3], [6.5, 2.8, 4.6, 1.5], [5.7, 2.8, 4.5, 1.3],
    [6.3, 3.3, 4.7, 1.6], [4.9, 2.4, 3.3, 1.0], [6.6, 2.9, 4.6, 1.3],
    [5.2, 2.7, 3.9, 1.4], [5.0, 2.0, 3.5, 1.0], [5.9, 3.0, 4.2, 1.5],
    [6.0, 2.2, 4.0, 1.0], [6.1, 2.9, 4.7, 1.4], [5.6, 2.9, 3.6, 1.3],
    [6.7, 3.1, 4.4, 1.4], [5.6, 3.0, 4.5, 1.5], [5.8, 2.7, 4.1, 1.0],
    [6.2, 2.2, 4.5, 1.5], [5.6, 2.5, 3.9, 1.1], [5.9, 3.2, 4.8, 1.8],
    [6.1, 2.8, 4.0, 1.3], [6.3, 2.5, 4.9, 1.5], [6.1, 2.8, 4.7, 1.2],
    [6.4, 2.9, 4.3, 1.3], [6.6, 3.0, 4.4, 1.4], [6.8, 2.8, 4.8, 1.4],
    [6.7, 3.0, 5.0, 1.7], [6.0, 2.9, 4.5, 1.5], [5.7, 2.6, 3.5, 1.0],
    [5.5, 2.4, 3.8, 1.1], [5.5, 2.4, 3.7, 1.0], [5.8, 2.7, 3.9, 1.2],
    [6.0, 2.7, 5.1, 1.6], [5.4, 3.0, 4.5, 1.5], [6.0, 3.4, 4.5, 1.6],
    [6.7, 3.1, 4.7, 1.5], [6.3, 2.3, 4.4, 1.3], [5.6, 3.0, 4.1, 1.3],
    [5.5, 2.5, 4.0, 1.3], [5.5, 2.6, 4.4, 1.2], [6.1, 3.0, 4.6, 1.4],
    [5.8, 2.6, 4.0, 1.2], [5.0, 2.3, 3.3, 1.0], [5.6, 2.7, 4.2, 1.3],
    [5.7, 3.0, 4.2, 1.2], [5.7, 2.9, 4.2, 1.3], [6.2, 2.9, 4.3, 1.3],
    [5.1, 2.5, 3.0, 1.1], [5.7, 2.8, 4.1, 1.3],
    // Group 3
    [6.3, 3.3, 6.0, 2.5], [5.8, 2.7, 5.1, 1.9], [7.1, 3.0, 5.9, 2.1],
    [6.3, 2.9, 5.6, 1.8], [6.5, 3.0, 5.8, 2.2], [7.6, 3.0, 6.6, 2.1],
    [4.9, 2.5, 4.5, 1.7], [7.3, 2.9, 6.3, 1.8], [6.7, 2.5, 5.8, 1.8],
    [7.2, 3.6, 6.1, 2.5], [6.5, 3.2, 5.1, 2.0], [6.4, 2.7, 5.3, 1.9],
    [6.8, 3.0, 5.5, 2.1], [5.7, 2.5, 5.0, 2.0], [5.8, 2.8, 5.1, 2.4],
    [6.4, 3.2, 5.3, 2.3], [6.5, 3.0, 5.5, 1.8], [7.7, 3.8, 6.7, 2.2],
    [7.7, 2.6, 6.9, 2.3], [6.0, 2.2, 5.0, 1.5], [6.9, 3.2, 5.7, 2.3],
    [5.6, 2.8, 4.9, 2.0], [7.7, 2.8, 6.7, 2.0], [6.3, 2.7, 4.9, 1.8],
    [6.7, 3.3, 5.7, 2.1], [7.2, 3.2, 6.0, 1.8], [6.2, 2.8, 4.8, 1.8],
    [6.1, 3.0, 4.9, 1.8], [6.4, 2.8, 5.6, 2.1], [7.2, 3.0, 5.8, 1.6],
    [7.4, 2.8, 6.1, 1.9], [7.9, 3.8, 6.4, 2.0], [6.4, 2.8, 5.6, 2.2],
    [6.3, 2.8, 5.1, 1.5], [6.1, 2.6, 5.6, 1.4], [7.7, 3.0, 6.1, 2.3],
    [6.3, 3.4, 5.6, 2.4], [6.4, 3.1, 5.5, 1.8], [6.0, 3.0, 4.8, 1.8],
    [6.9, 3.1, 5.4, 2.1], [6.7, 3.1, 5.6, 2.4], [6.9, 3.1, 5.1, 2.3],
    [5.8, 2.7, 5.1, 1.9], [6.8, 3.2, 5.9, 2.3], [6.7, 3.3, 5.7, 2.5],
    [6.7, 3.0, 5.2, 2.3], [6.3, 2.5, 5.0, 1.9], [6.5, 3.0, 5.2, 2.0],
    [6.2, 3.4, 5.4, 2.3], [5.9, 3.0, 5.1, 1.8],
];

fn flower_data() -> Array2<f64> {
    Array2::from_shape_fn((N_SAMPLES, N_FEATURES), |(i, j)| FLOWER_ROWS[i][j])
}

fn config_with_components(components: usize) -> PcaConfig {
    PcaConfig {
        components,
        ..PcaConfig::default()
    }
}

/// Fraction of an axis's total sum of squares explained by group membership.
fn between_group_ratio(scores: &Array2<f64>, axis: usize) -> f64 {
    let column = scores.column(axis);
    let overall_mean = column.mean().unwrap();
    let total: f64 = column.iter().map(|v| (v - overall_mean).powi(2)).sum();

    let mut between = 0.0;
    for group in 0..N_SAMPLES / GROUP_SIZE {
        let start = group * GROUP_SIZE;
        let group_mean = column
            .slice(ndarray::s![start..start + GROUP_SIZE])
            .mean()
            .unwrap();
        between += GROUP_SIZE as f64 * (group_mean - overall_mean).powi(2);
    }
    between / total
}

#[test]
fn two_component_projection_captures_the_top_eigenvalues() {
    let mut pca = PCA::new();
    let scores = pca
        .fit_transform(flower_data(), &config_with_components(2))
        .unwrap();
    assert_eq!(scores.dim(), (N_SAMPLES, 2));

    let eigenvalues = pca.explained_variance().unwrap();
    for (column, &eigenvalue) in scores.columns().into_iter().zip(eigenvalues.iter()) {
        assert_abs_diff_eq!(column.std(1.0).powi(2), eigenvalue, epsilon = 1e-8);
    }

    // The first component famously dominates this dataset.
    let ratios = pca.explained_variance_ratio().unwrap();
    assert!(
        ratios[0] > 0.70 && ratios[0] < 0.76,
        "unexpected first-component ratio {}",
        ratios[0]
    );
    assert!(ratios[0] > ratios[1]);
}

#[test]
fn groups_separate_along_the_first_axis_more_than_the_last() {
    let mut pca = PCA::new();
    let scores = pca
        .fit_transform(flower_data(), &config_with_components(4))
        .unwrap();

    let first_axis = between_group_ratio(&scores, 0);
    let last_axis = between_group_ratio(&scores, 3);
    assert!(
        first_axis > last_axis,
        "group separation should dominate the top axis ({} vs {})",
        first_axis,
        last_axis
    );
    // PC1 is essentially a group-membership axis in this dataset.
    assert!(first_axis > 0.8, "first-axis separation {}", first_axis);
}

#[test]
fn full_projection_is_an_orthogonal_rotation() {
    let data = flower_data();
    let mut pca = PCA::new();
    let scores = pca
        .fit_transform(data.clone(), &config_with_components(4))
        .unwrap();

    let mean = pca.mean().unwrap();
    let scale = pca.scale().unwrap();
    let standardized = (&data - mean) / scale;

    for (before, after) in standardized
        .axis_iter(Axis(0))
        .zip(scores.axis_iter(Axis(0)))
    {
        let norm_before = before.dot(&before).sqrt();
        let norm_after = after.dot(&after).sqrt();
        assert_abs_diff_eq!(norm_before, norm_after, epsilon = 1e-9);
    }
}

#[test]
fn eigenvalue_sum_matches_the_covariance_trace() {
    let mut pca = PCA::new();
    pca.fit(flower_data(), &config_with_components(4)).unwrap();

    // Standardization uses the population std dev, so each standardized
    // column has unbiased variance N/(N-1) and the trace is exactly
    // D * N/(N-1).
    let expected_trace = N_FEATURES as f64 * N_SAMPLES as f64 / (N_SAMPLES as f64 - 1.0);
    let eigenvalue_sum = pca.explained_variance().unwrap().sum();
    assert_abs_diff_eq!(eigenvalue_sum, expected_trace, epsilon = 1e-9);

    let ratio_sum = pca.explained_variance_ratio().unwrap().sum();
    assert_abs_diff_eq!(ratio_sum, 1.0, epsilon = 1e-12);
}

#[test]
fn constant_column_with_scaling_is_degenerate() {
    let mut data = flower_data();
    data.column_mut(2).fill(4.2);
    let mut pca = PCA::new();
    let err = pca
        .fit(data, &config_with_components(2))
        .unwrap_err();
    assert_eq!(err, PcaError::DegenerateFeature { column: 2 });
}

#[test]
fn single_row_is_rejected() {
    let data = flower_data().slice_move(ndarray::s![0..1, ..]);
    let mut pca = PCA::new();
    let err = pca.fit(data, &config_with_components(1)).unwrap_err();
    assert_eq!(err, PcaError::InsufficientSamples { n_samples: 1 });
}

#[test]
fn requesting_five_components_of_four_features_fails() {
    let mut pca = PCA::new();
    let err = pca
        .fit(flower_data(), &config_with_components(5))
        .unwrap_err();
    assert_eq!(
        err,
        PcaError::InvalidComponentCount {
            requested: 5,
            n_features: 4
        }
    );
}

#[test]
fn held_out_rows_project_consistently() {
    let data = flower_data();
    let train = data.slice(ndarray::s![..120, ..]).to_owned();
    let held_out = data.slice(ndarray::s![120.., ..]).to_owned();

    let mut pca = PCA::new();
    pca.fit(train, &config_with_components(2)).unwrap();
    let projected = pca.transform(held_out).unwrap();
    assert_eq!(projected.dim(), (30, 2));
    assert!(projected.iter().all(|v| v.is_finite()));
}
