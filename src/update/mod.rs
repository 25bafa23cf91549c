//! Natural-gradient update of the search distribution
//!
//! The covariance factor is parametrized through the matrix exponential,
//! `transformer = exp(L) · transformer_0`. Each generation estimates the
//! natural gradient of the expected utility with respect to the mean and to
//! `L` at `L = 0`, then composes the step onto the previous transform.
//!
//! Samples enter the update expressed in the previous generation's local
//! frame. The returned [`FrameShift`] maps them into the new frame so that
//! density comparisons in the next generation stay consistent.

mod gradient;

pub use gradient::{
    apply_empirical_correction, center_gradient, covariance_gradient,
    finite_difference_gradient, log_density, EMPIRICAL_DIAGONAL_DISCOUNT,
    EMPIRICAL_GRADIENT_SCALE,
};

use nalgebra::{DMatrix, DVector};

use crate::error::{NesError, NesResult};
use crate::state::SearchState;

/// Change of local frame produced by one update
///
/// A sample `s` in the previous frame becomes `delta⁻¹ · (s − center_delta)`
/// in the new one.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameShift {
    center_delta: DVector<f64>,
    delta: DMatrix<f64>,
    delta_inverse: DMatrix<f64>,
}

impl FrameShift {
    /// Create a frame shift, failing if `delta` is not invertible
    pub fn new(center_delta: DVector<f64>, delta: DMatrix<f64>) -> NesResult<Self> {
        if delta.nrows() != delta.ncols() {
            return Err(NesError::DimensionMismatch {
                expected: delta.nrows(),
                actual: delta.ncols(),
            });
        }
        if center_delta.len() != delta.nrows() {
            return Err(NesError::DimensionMismatch {
                expected: delta.nrows(),
                actual: center_delta.len(),
            });
        }

        let delta_inverse = delta
            .clone()
            .try_inverse()
            .ok_or_else(|| NesError::Numerical("Transform delta is singular".to_string()))?;

        Ok(Self {
            center_delta,
            delta,
            delta_inverse,
        })
    }

    /// Step of the center in the previous local frame
    pub fn center_delta(&self) -> &DVector<f64> {
        &self.center_delta
    }

    /// Left factor applied to the previous transformer
    pub fn delta(&self) -> &DMatrix<f64> {
        &self.delta
    }

    /// Inverse of [`FrameShift::delta`]
    pub fn delta_inverse(&self) -> &DMatrix<f64> {
        &self.delta_inverse
    }

    /// Express a previous-frame sample in the new frame
    pub fn re_express(&self, sample: &DVector<f64>) -> DVector<f64> {
        &self.delta_inverse * (sample - &self.center_delta)
    }

    /// Map a new-frame sample back into the previous frame
    pub fn restore(&self, sample: &DVector<f64>) -> DVector<f64> {
        &self.delta * sample + &self.center_delta
    }
}

/// Result of one natural-gradient update
#[derive(Clone, Debug)]
pub struct UpdateStep {
    /// The next search state
    pub state: SearchState,
    /// Frame shift to apply to the retained history window
    pub shift: FrameShift,
    /// Weighted mean of the samples (before the learning rate)
    pub center_gradient: DVector<f64>,
    /// Covariance-direction gradient after the empirical correction
    pub covariance_gradient: DMatrix<f64>,
}

/// Computes the next search state from a weighted batch
#[derive(Clone, Debug)]
pub struct NaturalGradientUpdater {
    learning_rate: f64,
}

impl NaturalGradientUpdater {
    /// Create an updater with the given learning rate
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    /// Learning rate applied to both center and transform steps
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Compute the next state
    ///
    /// `samples` are raw samples in the local frame of `state`; `weights` are
    /// normalized utilities (non-negative, summing to one).
    pub fn update(
        &self,
        state: &SearchState,
        samples: &[DVector<f64>],
        weights: &[f64],
    ) -> NesResult<UpdateStep> {
        let n = state.dimension();
        if samples.is_empty() {
            return Err(NesError::EmptyBatch);
        }
        if samples.len() != weights.len() {
            return Err(NesError::DimensionMismatch {
                expected: samples.len(),
                actual: weights.len(),
            });
        }
        if let Some(bad) = samples.iter().find(|s| s.len() != n) {
            return Err(NesError::DimensionMismatch {
                expected: n,
                actual: bad.len(),
            });
        }

        let last_center = state.center.clone();
        let last_transformer = state.transformer.clone();

        let center_grad = center_gradient(samples, weights);
        let center_delta = &center_grad * self.learning_rate;

        let corrected = apply_empirical_correction(&covariance_gradient(samples, weights));
        let d_l = &corrected * self.learning_rate;
        if d_l.iter().any(|x| !x.is_finite()) {
            return Err(NesError::Numerical(
                "Covariance gradient is not finite".to_string(),
            ));
        }
        let delta = (d_l * 0.5).exp();
        if delta.iter().any(|x| !x.is_finite()) {
            return Err(NesError::Numerical(
                "Matrix exponential of the transform step is not finite".to_string(),
            ));
        }

        let center = &last_center + last_transformer.tr_mul(&center_delta);
        let transformer = &delta * &last_transformer;
        if center.iter().any(|x| !x.is_finite()) {
            return Err(NesError::Numerical("Updated center is not finite".to_string()));
        }

        let det_new = transformer.determinant().abs();
        if det_new == 0.0 || !det_new.is_finite() {
            return Err(NesError::Numerical(format!(
                "Updated transformer is singular (|det| = {})",
                det_new
            )));
        }
        let det_diff_transformers = last_transformer.determinant().abs() / det_new;

        let shift = FrameShift::new(center_delta, delta)?;

        let next = SearchState {
            center,
            transformer,
            last_center: Some(last_center),
            last_transformer: Some(last_transformer),
            det_diff_transformers,
            last_shift: Some(shift.clone()),
            generation: state.generation + 1,
        };

        Ok(UpdateStep {
            state: next,
            shift,
            center_gradient: center_grad,
            covariance_gradient: corrected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vec2(a: f64, b: f64) -> DVector<f64> {
        DVector::from_vec(vec![a, b])
    }

    #[test]
    fn test_single_zero_sample_shrinks_isotropically() {
        let state = SearchState::new(vec2(1.0, -1.0)).unwrap();
        let updater = NaturalGradientUpdater::new(1.0);

        let step = updater.update(&state, &[DVector::zeros(2)], &[1.0]).unwrap();

        // Center does not move
        assert_relative_eq!(step.state.center, vec2(1.0, -1.0));
        // Corrected gradient keeps -0.5 I on the diagonal
        assert_relative_eq!(
            step.covariance_gradient,
            DMatrix::from_diagonal_element(2, 2, -0.5),
            epsilon = 1e-15
        );
        // delta = exp(-0.25) I
        let factor = (-0.25f64).exp();
        assert_relative_eq!(
            step.state.transformer,
            DMatrix::from_diagonal_element(2, 2, factor),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            step.state.det_diff_transformers,
            1.0 / (factor * factor),
            epsilon = 1e-12
        );
        assert_eq!(step.state.generation, 1);
        assert_eq!(step.state.last_center, Some(vec2(1.0, -1.0)));
        assert_eq!(step.state.last_transformer, Some(DMatrix::identity(2, 2)));
    }

    #[test]
    fn test_center_moves_along_weighted_samples() {
        let mut state = SearchState::new(vec2(0.0, 0.0)).unwrap();
        state.transformer = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 1.0, 1.0]);
        let updater = NaturalGradientUpdater::new(0.5);

        let samples = vec![vec2(1.0, 0.0), vec2(-1.0, 0.0), vec2(0.0, 3.0)];
        let weights = vec![0.75, 0.0, 0.25];
        let step = updater.update(&state, &samples, &weights).unwrap();

        assert_relative_eq!(step.center_gradient, vec2(0.75, 0.75));
        // center = A^T · (0.5 · g) = [[2, 1], [0, 1]] · (0.375, 0.375)
        assert_relative_eq!(step.state.center, vec2(1.125, 0.375), epsilon = 1e-12);
        assert_relative_eq!(step.shift.center_delta().clone(), vec2(0.375, 0.375));
    }

    #[test]
    fn test_transformer_is_left_composed() {
        let mut state = SearchState::new(vec2(0.0, 0.0)).unwrap();
        let previous = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.0, 2.0]);
        state.transformer = previous.clone();
        let updater = NaturalGradientUpdater::new(1.0);

        let samples = vec![vec2(1.5, 0.2), vec2(-0.3, 0.9)];
        let step = updater.update(&state, &samples, &[0.6, 0.4]).unwrap();

        assert_relative_eq!(
            step.state.transformer,
            step.shift.delta() * &previous,
            epsilon = 1e-12
        );
        // delta is symmetric because the gradient is
        assert_relative_eq!(
            step.shift.delta().clone(),
            step.shift.delta().transpose(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_re_expression_preserves_search_points() {
        let mut state = SearchState::new(vec2(0.5, 0.5)).unwrap();
        state.transformer = DMatrix::from_row_slice(2, 2, &[1.2, 0.3, -0.1, 0.8]);
        let updater = NaturalGradientUpdater::new(1.0);

        let samples = vec![vec2(1.0, 0.5), vec2(-0.4, 1.1), vec2(0.2, -0.7)];
        let weights = vec![0.5, 0.3, 0.2];
        let step = updater.update(&state, &samples, &weights).unwrap();

        for s in &samples {
            let before = state.transform(s);
            let after = step.state.transform(&step.shift.re_express(s));
            assert_relative_eq!(before, after, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_frame_shift_roundtrip() {
        let delta = DMatrix::from_row_slice(2, 2, &[1.3, 0.2, 0.2, 0.7]);
        let shift = FrameShift::new(vec2(0.4, -0.9), delta).unwrap();

        let s = vec2(2.5, -1.25);
        let back = shift.restore(&shift.re_express(&s));
        assert_relative_eq!(back, s, max_relative = 1e-9);
    }

    #[test]
    fn test_frame_shift_rejects_singular_delta() {
        let delta = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(
            FrameShift::new(vec2(0.0, 0.0), delta),
            Err(NesError::Numerical(_))
        ));
        assert!(matches!(
            FrameShift::new(DVector::zeros(3), DMatrix::identity(2, 2)),
            Err(NesError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_update_validates_batch() {
        let state = SearchState::new(vec2(0.0, 0.0)).unwrap();
        let updater = NaturalGradientUpdater::new(1.0);

        assert_eq!(
            updater.update(&state, &[], &[]).unwrap_err(),
            NesError::EmptyBatch
        );
        assert!(matches!(
            updater.update(&state, &[vec2(1.0, 0.0)], &[0.5, 0.5]),
            Err(NesError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            updater.update(&state, &[DVector::zeros(3)], &[1.0]),
            Err(NesError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_update_rejects_overflowing_step() {
        let state = SearchState::new(vec2(0.0, 0.0)).unwrap();
        let updater = NaturalGradientUpdater::new(1.0);

        let huge = vec2(1e160, 1e160);
        assert!(matches!(
            updater.update(&state, &[huge], &[1.0]),
            Err(NesError::Numerical(_))
        ));
    }
}
