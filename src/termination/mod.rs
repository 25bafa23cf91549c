//! Termination criteria
//!
//! This module provides termination criteria for NES runs.

use nalgebra::DVector;

/// Run progress for termination checking
#[derive(Clone, Debug)]
pub struct NesProgress<'a> {
    /// Number of completed generations
    pub generation: usize,
    /// Total fitness evaluations so far
    pub evaluations: usize,
    /// Best fitness found so far
    pub best_fitness: f64,
    /// Current center of the search distribution
    pub center: &'a DVector<f64>,
    /// `|det transformer|^(1/N)` of the current search distribution
    pub transformer_scale: f64,
    /// History of best fitness values per generation
    pub fitness_history: &'a [f64],
}

/// Termination criterion trait
pub trait TerminationCriterion: Send + Sync {
    /// Check if the run should terminate
    fn should_terminate(&self, progress: &NesProgress) -> bool;

    /// Get a description of why termination occurred
    fn reason(&self) -> &'static str;
}

/// Terminate after a maximum number of generations
#[derive(Clone, Debug)]
pub struct MaxGenerations(pub usize);

impl MaxGenerations {
    /// Create a new max generations criterion
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl TerminationCriterion for MaxGenerations {
    fn should_terminate(&self, progress: &NesProgress) -> bool {
        progress.generation >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum generations reached"
    }
}

/// Terminate after a maximum number of fitness evaluations
#[derive(Clone, Debug)]
pub struct MaxEvaluations(pub usize);

impl MaxEvaluations {
    /// Create a new max evaluations criterion
    pub fn new(max: usize) -> Self {
        Self(max)
    }
}

impl TerminationCriterion for MaxEvaluations {
    fn should_terminate(&self, progress: &NesProgress) -> bool {
        progress.evaluations >= self.0
    }

    fn reason(&self) -> &'static str {
        "Maximum evaluations reached"
    }
}

/// Terminate when fitness improvement stagnates
#[derive(Clone, Debug)]
pub struct FitnessStagnation {
    /// Number of generations to look back
    pub window: usize,
    /// Minimum improvement threshold
    pub epsilon: f64,
}

impl FitnessStagnation {
    /// Create a new fitness stagnation criterion
    pub fn new(window: usize, epsilon: f64) -> Self {
        Self { window, epsilon }
    }
}

impl TerminationCriterion for FitnessStagnation {
    fn should_terminate(&self, progress: &NesProgress) -> bool {
        if self.window == 0 || progress.fitness_history.len() < self.window {
            return false;
        }

        let start_idx = progress.fitness_history.len() - self.window;
        let window = &progress.fitness_history[start_idx..];

        let first = window[0];
        let last = window[window.len() - 1];
        (last - first).abs() < self.epsilon
    }

    fn reason(&self) -> &'static str {
        "Fitness stagnation detected"
    }
}

/// Terminate when target fitness is reached
#[derive(Clone, Debug)]
pub struct TargetFitness {
    /// Target fitness value
    pub target: f64,
    /// Tolerance for reaching target
    pub tolerance: f64,
}

impl TargetFitness {
    /// Create a new target fitness criterion
    pub fn new(target: f64) -> Self {
        Self {
            target,
            tolerance: 0.0,
        }
    }

    /// Create with a tolerance
    pub fn with_tolerance(target: f64, tolerance: f64) -> Self {
        Self { target, tolerance }
    }
}

impl TerminationCriterion for TargetFitness {
    fn should_terminate(&self, progress: &NesProgress) -> bool {
        progress.best_fitness >= self.target - self.tolerance
    }

    fn reason(&self) -> &'static str {
        "Target fitness reached"
    }
}

/// Terminate when the search distribution has collapsed
#[derive(Clone, Debug)]
pub struct TransformerScaleThreshold {
    /// Minimum `|det transformer|^(1/N)`
    pub min_scale: f64,
}

impl TransformerScaleThreshold {
    /// Create a new scale threshold criterion
    pub fn new(min_scale: f64) -> Self {
        Self { min_scale }
    }
}

impl TerminationCriterion for TransformerScaleThreshold {
    fn should_terminate(&self, progress: &NesProgress) -> bool {
        progress.transformer_scale < self.min_scale
    }

    fn reason(&self) -> &'static str {
        "Search distribution collapsed"
    }
}

/// Combine criteria with OR logic (any one triggers termination)
pub struct AnyOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AnyOf {
    /// Create a new AnyOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }
}

impl TerminationCriterion for AnyOf {
    fn should_terminate(&self, progress: &NesProgress) -> bool {
        self.criteria.iter().any(|c| c.should_terminate(progress))
    }

    fn reason(&self) -> &'static str {
        "One of multiple criteria met"
    }
}

/// Combine criteria with AND logic (all must trigger for termination)
pub struct AllOf {
    criteria: Vec<Box<dyn TerminationCriterion>>,
}

impl AllOf {
    /// Create a new AllOf combinator
    pub fn new(criteria: Vec<Box<dyn TerminationCriterion>>) -> Self {
        Self { criteria }
    }
}

impl TerminationCriterion for AllOf {
    fn should_terminate(&self, progress: &NesProgress) -> bool {
        !self.criteria.is_empty() && self.criteria.iter().all(|c| c.should_terminate(progress))
    }

    fn reason(&self) -> &'static str {
        "All criteria met"
    }
}

pub mod prelude {
    pub use super::{
        AllOf, AnyOf, FitnessStagnation, MaxEvaluations, MaxGenerations, NesProgress,
        TargetFitness, TerminationCriterion, TransformerScaleThreshold,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress<'a>(
        generation: usize,
        evaluations: usize,
        best_fitness: f64,
        center: &'a DVector<f64>,
        fitness_history: &'a [f64],
    ) -> NesProgress<'a> {
        NesProgress {
            generation,
            evaluations,
            best_fitness,
            center,
            transformer_scale: 1.0,
            fitness_history,
        }
    }

    #[test]
    fn test_max_generations() {
        let center = DVector::zeros(2);
        let criterion = MaxGenerations::new(100);

        assert!(!criterion.should_terminate(&progress(50, 0, 10.0, &center, &[])));
        assert!(criterion.should_terminate(&progress(100, 0, 10.0, &center, &[])));
        assert!(criterion.should_terminate(&progress(150, 0, 10.0, &center, &[])));
    }

    #[test]
    fn test_max_evaluations() {
        let center = DVector::zeros(2);
        let criterion = MaxEvaluations::new(1000);

        assert!(!criterion.should_terminate(&progress(0, 500, 10.0, &center, &[])));
        assert!(criterion.should_terminate(&progress(0, 1000, 10.0, &center, &[])));
    }

    #[test]
    fn test_fitness_stagnation() {
        let center = DVector::zeros(2);
        let criterion = FitnessStagnation::new(5, 0.01);

        // Not enough history
        let history = vec![1.0, 2.0, 3.0];
        assert!(!criterion.should_terminate(&progress(0, 0, 3.0, &center, &history)));

        // Still improving
        let history = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(!criterion.should_terminate(&progress(0, 0, 5.0, &center, &history)));

        // Stagnant
        let history = vec![5.0, 5.0, 5.0, 5.0, 5.0];
        assert!(criterion.should_terminate(&progress(0, 0, 5.0, &center, &history)));
    }

    #[test]
    fn test_target_fitness() {
        let center = DVector::zeros(2);
        let criterion = TargetFitness::new(0.0);

        assert!(!criterion.should_terminate(&progress(0, 0, -10.0, &center, &[])));
        assert!(criterion.should_terminate(&progress(0, 0, 0.0, &center, &[])));

        let criterion = TargetFitness::with_tolerance(0.0, 0.1);
        assert!(criterion.should_terminate(&progress(0, 0, -0.05, &center, &[])));
    }

    #[test]
    fn test_transformer_scale_threshold() {
        let center = DVector::zeros(2);
        let criterion = TransformerScaleThreshold::new(1e-8);

        let mut p = progress(0, 0, 0.0, &center, &[]);
        assert!(!criterion.should_terminate(&p));
        p.transformer_scale = 1e-9;
        assert!(criterion.should_terminate(&p));
    }

    #[test]
    fn test_any_of() {
        let center = DVector::zeros(2);
        let criterion = AnyOf::new(vec![
            Box::new(MaxGenerations::new(100)),
            Box::new(TargetFitness::new(0.0)),
        ]);

        assert!(!criterion.should_terminate(&progress(50, 0, -10.0, &center, &[])));
        assert!(criterion.should_terminate(&progress(100, 0, -10.0, &center, &[])));
        assert!(criterion.should_terminate(&progress(50, 0, 0.0, &center, &[])));
    }

    #[test]
    fn test_all_of() {
        let center = DVector::zeros(2);
        let criterion = AllOf::new(vec![
            Box::new(MaxGenerations::new(100)),
            Box::new(TargetFitness::new(0.0)),
        ]);

        assert!(!criterion.should_terminate(&progress(50, 0, -10.0, &center, &[])));
        assert!(!criterion.should_terminate(&progress(100, 0, -10.0, &center, &[])));
        assert!(!criterion.should_terminate(&progress(50, 0, 0.0, &center, &[])));
        assert!(criterion.should_terminate(&progress(100, 0, 0.0, &center, &[])));

        assert!(!AllOf::new(vec![]).should_terminate(&progress(100, 0, 0.0, &center, &[])));
    }
}
