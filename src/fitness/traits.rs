//! Fitness traits
//!
//! This module defines the fitness evaluation trait.

use nalgebra::DVector;

/// Fitness evaluation trait
///
/// Higher is better. Evaluation must be deterministic: reused samples keep
/// the fitness they were first evaluated with.
#[cfg(feature = "parallel")]
pub trait Evaluator: Send + Sync {
    /// Evaluate a point in search space
    fn evaluate(&self, point: &DVector<f64>) -> f64;
}

/// Fitness evaluation trait (non-parallel version)
///
/// Higher is better. Evaluation must be deterministic: reused samples keep
/// the fitness they were first evaluated with.
#[cfg(not(feature = "parallel"))]
pub trait Evaluator {
    /// Evaluate a point in search space
    fn evaluate(&self, point: &DVector<f64>) -> f64;
}

/// Implement Evaluator for any Fn that matches the signature
#[cfg(feature = "parallel")]
impl<F> Evaluator for F
where
    F: Fn(&DVector<f64>) -> f64 + Send + Sync,
{
    fn evaluate(&self, point: &DVector<f64>) -> f64 {
        self(point)
    }
}

/// Implement Evaluator for any Fn that matches the signature
#[cfg(not(feature = "parallel"))]
impl<F> Evaluator for F
where
    F: Fn(&DVector<f64>) -> f64,
{
    fn evaluate(&self, point: &DVector<f64>) -> f64 {
        self(point)
    }
}

/// A wrapper to negate an evaluator (for minimization problems)
pub struct MinimizeFitness<E> {
    inner: E,
}

impl<E> MinimizeFitness<E> {
    /// Create a minimization wrapper around an evaluator
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

impl<E: Evaluator> Evaluator for MinimizeFitness<E> {
    fn evaluate(&self, point: &DVector<f64>) -> f64 {
        -self.inner.evaluate(point)
    }
}
