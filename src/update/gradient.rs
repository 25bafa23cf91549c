//! Gradient estimators for the center and the log-transform
//!
//! For a search distribution `N(x, exp(L))` the log-density gradient with
//! respect to `L` at `L = 0` is `½·s sᵀ − ½·I`. [`finite_difference_gradient`]
//! recomputes it numerically from [`log_density`].

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

/// Factor applied to the whole log-transform gradient
pub const EMPIRICAL_GRADIENT_SCALE: f64 = 2.0;

/// Fraction of the (scaled) diagonal removed from the log-transform gradient
pub const EMPIRICAL_DIAGONAL_DISCOUNT: f64 = 0.5;

/// Weighted sum of samples, `Σ w·s`
pub fn center_gradient(samples: &[DVector<f64>], weights: &[f64]) -> DVector<f64> {
    let n = samples.first().map_or(0, |s| s.len());
    samples
        .iter()
        .zip(weights)
        .fold(DVector::zeros(n), |acc, (s, &w)| acc + s * w)
}

/// Natural gradient for the log-transform, `Σ w·(½·s sᵀ − ½·I)`
pub fn covariance_gradient(samples: &[DVector<f64>], weights: &[f64]) -> DMatrix<f64> {
    let n = samples.first().map_or(0, |s| s.len());
    let identity = DMatrix::<f64>::identity(n, n);
    let mut gradient = DMatrix::zeros(n, n);

    for (s, &w) in samples.iter().zip(weights) {
        let outer = s * s.transpose();
        gradient += (outer * 0.5 - &identity * 0.5) * w;
    }

    gradient
}

/// Scale the gradient and discount its diagonal
///
/// `g ← 2·g; g ← g − ½·diag(g)`. Empirically tuned for the symmetric
/// exponential parametrization; off-diagonal and diagonal entries end up
/// weighted differently.
pub fn apply_empirical_correction(gradient: &DMatrix<f64>) -> DMatrix<f64> {
    let mut corrected = gradient * EMPIRICAL_GRADIENT_SCALE;
    for i in 0..corrected.nrows().min(corrected.ncols()) {
        corrected[(i, i)] -= EMPIRICAL_DIAGONAL_DISCOUNT * corrected[(i, i)];
    }
    corrected
}

/// Log-density of `sample` under `N(mean, exp(l))`
pub fn log_density(l: &DMatrix<f64>, mean: &DVector<f64>, sample: &DVector<f64>) -> f64 {
    let n = mean.len() as f64;
    let covariance = l.clone().exp();
    let precision = (-l).exp();
    let d = sample - mean;

    -0.5 * covariance.determinant().ln() - 0.5 * n * (2.0 * PI).ln()
        - 0.5 * d.dot(&(precision * &d))
}

/// Central finite-difference estimate of the log-transform gradient at `L = 0`
///
/// Each entry of `L` is perturbed by `±epsilon` independently; the result is
/// `Σ w · ∂ log p(s) / ∂L`.
pub fn finite_difference_gradient(
    samples: &[DVector<f64>],
    weights: &[f64],
    epsilon: f64,
) -> DMatrix<f64> {
    let n = samples.first().map_or(0, |s| s.len());
    let mean = DVector::zeros(n);
    let mut gradient = DMatrix::zeros(n, n);
    let mut l = DMatrix::zeros(n, n);

    for (s, &w) in samples.iter().zip(weights) {
        for i in 0..n {
            for j in 0..n {
                l[(i, j)] = -epsilon;
                let below = log_density(&l, &mean, s);
                l[(i, j)] = epsilon;
                let above = log_density(&l, &mean, s);
                l[(i, j)] = 0.0;

                gradient[(i, j)] += w * (above - below) / (2.0 * epsilon);
            }
        }
    }

    gradient
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn batch() -> (Vec<DVector<f64>>, Vec<f64>) {
        let samples = vec![
            DVector::from_vec(vec![0.7, -1.3, 0.2]),
            DVector::from_vec(vec![-0.4, 0.9, 1.6]),
            DVector::from_vec(vec![1.1, 0.05, -0.8]),
        ];
        (samples, vec![0.5, 0.3, 0.2])
    }

    #[test]
    fn test_zero_sample_gradient_is_minus_half_identity() {
        let g = covariance_gradient(&[DVector::zeros(3)], &[1.0]);
        assert_eq!(g, DMatrix::from_diagonal_element(3, 3, -0.5));
    }

    #[test]
    fn test_center_gradient_is_weighted_sum() {
        let (samples, weights) = batch();
        let g = center_gradient(&samples, &weights);
        assert_relative_eq!(g[0], 0.35 - 0.12 + 0.22, epsilon = 1e-12);
        assert_relative_eq!(g[1], -0.65 + 0.27 + 0.01, epsilon = 1e-12);
        assert_relative_eq!(g[2], 0.1 + 0.48 - 0.16, epsilon = 1e-12);
    }

    #[test]
    fn test_covariance_gradient_is_symmetric() {
        let (samples, weights) = batch();
        let g = covariance_gradient(&samples, &weights);
        assert_relative_eq!(g.clone(), g.transpose(), epsilon = 1e-15);
    }

    #[test]
    fn test_analytic_gradient_matches_finite_differences() {
        let (samples, weights) = batch();
        let analytic = covariance_gradient(&samples, &weights);
        let numeric = finite_difference_gradient(&samples, &weights, 1e-5);
        assert_relative_eq!(analytic, numeric, epsilon = 1e-6);
    }

    #[test]
    fn test_empirical_correction() {
        let g = DMatrix::from_row_slice(2, 2, &[1.0, 0.25, 0.25, -2.0]);
        let corrected = apply_empirical_correction(&g);
        // off-diagonal doubled, diagonal doubled then halved
        assert_relative_eq!(
            corrected,
            DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, -2.0])
        );
    }

    #[test]
    fn test_log_density_at_identity() {
        let l = DMatrix::zeros(2, 2);
        let mean = DVector::zeros(2);
        let s = DVector::from_vec(vec![1.0, 0.0]);
        let expected = -(2.0 * PI).ln() - 0.5;
        assert_relative_eq!(log_density(&l, &mean, &s), expected, epsilon = 1e-12);
    }
}
