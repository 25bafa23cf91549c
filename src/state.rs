//! Search state and sample history
//!
//! [`SearchState`] is a plain value: the updater reads one state and returns
//! the next. [`SampleHistory`] keeps every evaluated sample of a run; only the
//! trailing window of one batch is ever read or rewritten.

use nalgebra::{DMatrix, DVector};

use crate::distribution::transform::coord_transform;
use crate::error::{NesError, NesResult};
use crate::update::FrameShift;

/// Parameters of the search distribution for one generation
#[derive(Clone, Debug, PartialEq)]
pub struct SearchState {
    /// Mean of the search distribution
    pub center: DVector<f64>,
    /// Square-root-like covariance factor (N×N, invertible)
    pub transformer: DMatrix<f64>,
    /// Center before the most recent update
    pub last_center: Option<DVector<f64>>,
    /// Transformer before the most recent update
    pub last_transformer: Option<DMatrix<f64>>,
    /// `|det last_transformer| / |det transformer|`, 1 before any update
    pub det_diff_transformers: f64,
    /// Frame shift applied by the most recent update
    pub last_shift: Option<FrameShift>,
    /// Number of updates applied so far
    pub generation: usize,
}

impl SearchState {
    /// Create the initial state around `center` with an identity transform
    pub fn new(center: DVector<f64>) -> NesResult<Self> {
        if center.is_empty() {
            return Err(NesError::Configuration(
                "Initial center must not be empty".to_string(),
            ));
        }
        if center.iter().any(|x| !x.is_finite()) {
            return Err(NesError::Configuration(
                "Initial center must be finite".to_string(),
            ));
        }

        let n = center.len();
        Ok(Self {
            center,
            transformer: DMatrix::identity(n, n),
            last_center: None,
            last_transformer: None,
            det_diff_transformers: 1.0,
            last_shift: None,
            generation: 0,
        })
    }

    /// Problem dimension
    pub fn dimension(&self) -> usize {
        self.center.len()
    }

    /// Map a raw sample into search space under this state
    pub fn transform(&self, raw: &DVector<f64>) -> DVector<f64> {
        coord_transform(&self.center, &self.transformer, raw)
    }

    /// `|det transformer|^(1/N)`, the geometric-mean scale of the transform
    pub fn transformer_scale(&self) -> f64 {
        self.transformer
            .determinant()
            .abs()
            .powf(1.0 / self.dimension() as f64)
    }

    /// Mean absolute entry of the transformer
    pub fn transformer_mean_abs(&self) -> f64 {
        self.transformer.iter().map(|x| x.abs()).sum::<f64>() / self.transformer.len() as f64
    }
}

/// A sample together with its search-space point and fitness
#[derive(Clone, Debug, PartialEq)]
pub struct EvaluatedSample {
    /// Raw sample, kept in the current local frame
    pub raw: DVector<f64>,
    /// Search-space point at which it was evaluated
    pub point: DVector<f64>,
    /// Fitness (higher is better)
    pub fitness: f64,
}

impl EvaluatedSample {
    /// Create a new evaluated sample
    pub fn new(raw: DVector<f64>, point: DVector<f64>, fitness: f64) -> Self {
        Self {
            raw,
            point,
            fitness,
        }
    }
}

/// Every sample drawn in a run, oldest first
#[derive(Clone, Debug, Default)]
pub struct SampleHistory {
    samples: Vec<EvaluatedSample>,
}

impl SampleHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample
    pub fn push(&mut self, sample: EvaluatedSample) {
        self.samples.push(sample);
    }

    /// Total number of samples recorded
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples, oldest first
    pub fn samples(&self) -> &[EvaluatedSample] {
        &self.samples
    }

    /// The trailing `size` samples (fewer if the history is shorter)
    pub fn window(&self, size: usize) -> &[EvaluatedSample] {
        let start = self.samples.len().saturating_sub(size);
        &self.samples[start..]
    }

    /// Mutable access to the trailing `size` samples
    pub fn window_mut(&mut self, size: usize) -> &mut [EvaluatedSample] {
        let start = self.samples.len().saturating_sub(size);
        &mut self.samples[start..]
    }

    /// Raw samples of the trailing window
    pub fn window_raw(&self, size: usize) -> Vec<DVector<f64>> {
        self.window(size).iter().map(|s| s.raw.clone()).collect()
    }

    /// Fitnesses of the trailing window
    pub fn window_fitnesses(&self, size: usize) -> Vec<f64> {
        self.window(size).iter().map(|s| s.fitness).collect()
    }

    /// Rewrite the trailing window into the frame after `shift`
    pub fn re_express(&mut self, size: usize, shift: &FrameShift) {
        for sample in self.window_mut(size) {
            sample.raw = shift.re_express(&sample.raw);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(value: f64) -> EvaluatedSample {
        let raw = DVector::from_vec(vec![value, -value]);
        EvaluatedSample::new(raw.clone(), raw, value)
    }

    #[test]
    fn test_initial_state() {
        let state = SearchState::new(DVector::from_vec(vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(state.dimension(), 3);
        assert_eq!(state.transformer, DMatrix::identity(3, 3));
        assert_eq!(state.det_diff_transformers, 1.0);
        assert!(state.last_center.is_none());
        assert!(state.last_transformer.is_none());
        assert!(state.last_shift.is_none());
        assert_eq!(state.generation, 0);
        assert_relative_eq!(state.transformer_scale(), 1.0);
        assert_relative_eq!(state.transformer_mean_abs(), 1.0 / 3.0);
    }

    #[test]
    fn test_initial_state_rejects_bad_center() {
        assert!(SearchState::new(DVector::zeros(0)).is_err());
        assert!(SearchState::new(DVector::from_vec(vec![0.0, f64::NAN])).is_err());
    }

    #[test]
    fn test_state_transform() {
        let mut state = SearchState::new(DVector::from_vec(vec![1.0, 1.0])).unwrap();
        state.transformer = DMatrix::from_diagonal_element(2, 2, 2.0);
        let point = state.transform(&DVector::from_vec(vec![0.5, -0.5]));
        assert_relative_eq!(point, DVector::from_vec(vec![2.0, 0.0]));
    }

    #[test]
    fn test_history_window() {
        let mut history = SampleHistory::new();
        assert!(history.is_empty());
        assert!(history.window(3).is_empty());

        for i in 0..5 {
            history.push(sample(i as f64));
        }
        assert_eq!(history.len(), 5);
        assert_eq!(history.window_fitnesses(3), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.window(10).len(), 5);
        assert_eq!(history.window_raw(1)[0], DVector::from_vec(vec![4.0, -4.0]));
    }

    #[test]
    fn test_history_re_express_only_touches_window() {
        let mut history = SampleHistory::new();
        for i in 0..4 {
            history.push(sample(i as f64 + 1.0));
        }

        let shift = FrameShift::new(
            DVector::from_vec(vec![1.0, 0.0]),
            DMatrix::from_diagonal_element(2, 2, 2.0),
        )
        .unwrap();
        history.re_express(2, &shift);

        // untouched
        assert_eq!(history.samples()[0].raw, DVector::from_vec(vec![1.0, -1.0]));
        assert_eq!(history.samples()[1].raw, DVector::from_vec(vec![2.0, -2.0]));
        // (s - c) / 2
        assert_relative_eq!(history.samples()[2].raw, DVector::from_vec(vec![1.0, -1.5]));
        assert_relative_eq!(history.samples()[3].raw, DVector::from_vec(vec![1.5, -2.0]));
        // points and fitnesses are preserved
        assert_eq!(history.samples()[3].point, DVector::from_vec(vec![4.0, -4.0]));
        assert_eq!(history.samples()[3].fitness, 4.0);
    }
}
