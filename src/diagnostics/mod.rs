//! Diagnostics and statistics
//!
//! This module provides statistics collection and the per-generation
//! observer hook for NES runs.

use std::time::Duration;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Statistics for a single generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number (number of updates applied)
    pub generation: usize,
    /// Total fitness evaluations so far
    pub evaluations: usize,
    /// Samples freshly drawn and evaluated this generation
    pub fresh: usize,
    /// Samples carried over by importance mixing
    pub reused: usize,
    /// Best fitness in this batch
    pub best_fitness: f64,
    /// Mean fitness of this batch
    pub mean_fitness: f64,
    /// Center after the update
    pub center: Vec<f64>,
    /// `|det transformer|^(1/N)` after the update
    pub transformer_scale: f64,
    /// Mean absolute transformer entry after the update
    pub transformer_mean_abs: f64,
    /// Frobenius norm of the corrected covariance gradient
    pub covariance_gradient_norm: f64,
    /// Whether the mixing fill loop hit its draw cap
    pub mixing_capped: bool,
}

impl GenerationStats {
    /// Best and mean of a batch of fitnesses
    ///
    /// An empty batch yields `(-inf, 0)`.
    pub fn batch_summary(fitnesses: &[f64]) -> (f64, f64) {
        if fitnesses.is_empty() {
            return (f64::NEG_INFINITY, 0.0);
        }
        let best = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = fitnesses.iter().sum::<f64>() / fitnesses.len() as f64;
        (best, mean)
    }

    /// Fraction of the batch that was reused
    pub fn reuse_fraction(&self) -> f64 {
        let total = self.fresh + self.reused;
        if total == 0 {
            0.0
        } else {
            self.reused as f64 / total as f64
        }
    }
}

/// Statistics collector for an entire NES run
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Statistics per generation
    pub generations: Vec<GenerationStats>,
    /// Total runtime in milliseconds
    pub total_runtime_ms: f64,
    /// Reason for termination
    pub termination_reason: Option<String>,
}

impl EvolutionStats {
    /// Create a new stats collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation's statistics
    pub fn record(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    /// Get the number of generations recorded
    pub fn num_generations(&self) -> usize {
        self.generations.len()
    }

    /// Get the best fitness across all generations
    pub fn best_fitness(&self) -> Option<f64> {
        self.generations
            .iter()
            .map(|g| g.best_fitness)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Get the final batch's best fitness
    pub fn final_best_fitness(&self) -> Option<f64> {
        self.generations.last().map(|g| g.best_fitness)
    }

    /// Get the history of best fitness values
    pub fn best_fitness_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.best_fitness).collect()
    }

    /// Get the history of mean fitness values
    pub fn mean_fitness_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.mean_fitness).collect()
    }

    /// Get the history of transformer scales
    pub fn transformer_scale_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.transformer_scale).collect()
    }

    /// Get the history of reuse fractions
    pub fn reuse_history(&self) -> Vec<f64> {
        self.generations.iter().map(|g| g.reuse_fraction()).collect()
    }

    /// Total samples carried over by importance mixing
    pub fn total_reused(&self) -> usize {
        self.generations.iter().map(|g| g.reused).sum()
    }

    /// Set the termination reason
    pub fn set_termination_reason(&mut self, reason: &str) {
        self.termination_reason = Some(reason.to_string());
    }

    /// Set the total runtime
    pub fn set_runtime(&mut self, duration: Duration) {
        self.total_runtime_ms = duration.as_secs_f64() * 1000.0;
    }

    /// Get a summary of the run
    pub fn summary(&self) -> String {
        let best = self.best_fitness().unwrap_or(f64::NEG_INFINITY);
        let final_best = self.final_best_fitness().unwrap_or(f64::NEG_INFINITY);
        let evaluations = self.generations.last().map_or(0, |g| g.evaluations);
        let scale = self.generations.last().map_or(1.0, |g| g.transformer_scale);

        format!(
            "NES Summary:\n\
             - Generations: {}\n\
             - Evaluations: {}\n\
             - Reused samples: {}\n\
             - Best fitness: {:.6}\n\
             - Final best: {:.6}\n\
             - Transformer scale: {:.6}\n\
             - Runtime: {:.2}ms\n\
             - Termination: {}",
            self.num_generations(),
            evaluations,
            self.total_reused(),
            best,
            final_best,
            scale,
            self.total_runtime_ms,
            self.termination_reason.as_deref().unwrap_or("unknown")
        )
    }
}

/// Everything an observer sees after one generation
#[derive(Clone, Debug)]
pub struct GenerationReport {
    /// Summary statistics
    pub stats: GenerationStats,
    /// Weighted sample mean used for the center step
    pub center_gradient: DVector<f64>,
    /// Covariance gradient after the empirical correction
    pub covariance_gradient: DMatrix<f64>,
}

/// Hook called once per completed generation
pub trait NesObserver {
    /// Inspect the generation that just finished
    fn on_generation(&mut self, report: &GenerationReport);
}

impl<F> NesObserver for F
where
    F: FnMut(&GenerationReport),
{
    fn on_generation(&mut self, report: &GenerationReport) {
        self(report)
    }
}

/// Observer that ignores every report
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl NesObserver for NoopObserver {
    fn on_generation(&mut self, _report: &GenerationReport) {}
}

pub mod prelude {
    pub use super::{EvolutionStats, GenerationReport, GenerationStats, NesObserver, NoopObserver};
}
