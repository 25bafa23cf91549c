//! Benchmark fitness functions
//!
//! Standard test functions, defined as costs to minimize and negated when
//! used as an [`Evaluator`].

use nalgebra::DVector;

use crate::fitness::traits::Evaluator;

/// Trait for benchmark functions
pub trait BenchmarkFunction {
    /// Name of the benchmark function
    fn name(&self) -> &'static str;

    /// Dimensionality of the problem
    fn dimension(&self) -> usize;

    /// Optimal (minimum) cost
    fn optimal_fitness(&self) -> f64;

    /// Optimal solution (if known)
    fn optimal_solution(&self) -> Option<Vec<f64>>;

    /// Evaluate the function (returns value to be MINIMIZED)
    fn evaluate_raw(&self, x: &[f64]) -> f64;
}

/// Sphere function: f(x) = Σxᵢ²
///
/// Unimodal, convex, separable. Optimum at origin.
#[derive(Clone, Debug)]
pub struct Sphere {
    dimension: usize,
}

impl Sphere {
    /// Create a new Sphere function
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl BenchmarkFunction for Sphere {
    fn name(&self) -> &'static str {
        "Sphere"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn optimal_fitness(&self) -> f64 {
        0.0
    }

    fn optimal_solution(&self) -> Option<Vec<f64>> {
        Some(vec![0.0; self.dimension])
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.iter().map(|xi| xi * xi).sum()
    }
}

impl Evaluator for Sphere {
    fn evaluate(&self, point: &DVector<f64>) -> f64 {
        -self.evaluate_raw(point.as_slice())
    }
}

/// Shifted sphere: f(x) = ‖x − target‖²
///
/// Optimum at `target`.
#[derive(Clone, Debug)]
pub struct ShiftedSphere {
    target: Vec<f64>,
}

impl ShiftedSphere {
    /// Create a sphere centred on `target`
    pub fn new(target: Vec<f64>) -> Self {
        Self { target }
    }

    /// Location of the optimum
    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

impl BenchmarkFunction for ShiftedSphere {
    fn name(&self) -> &'static str {
        "ShiftedSphere"
    }

    fn dimension(&self) -> usize {
        self.target.len()
    }

    fn optimal_fitness(&self) -> f64 {
        0.0
    }

    fn optimal_solution(&self) -> Option<Vec<f64>> {
        Some(self.target.clone())
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.iter()
            .zip(self.target.iter())
            .map(|(xi, ti)| (xi - ti).powi(2))
            .sum()
    }
}

impl Evaluator for ShiftedSphere {
    fn evaluate(&self, point: &DVector<f64>) -> f64 {
        -self.evaluate_raw(point.as_slice())
    }
}

/// Rosenbrock function: f(x) = Σ[100(xᵢ₊₁-xᵢ²)² + (1-xᵢ)²]
///
/// A curved valley that the search distribution has to rotate along.
/// Optimum at (1,1,...,1).
#[derive(Clone, Debug)]
pub struct Rosenbrock {
    dimension: usize,
}

impl Rosenbrock {
    /// Create a new Rosenbrock function
    pub fn new(dimension: usize) -> Self {
        assert!(dimension >= 2, "Rosenbrock requires at least 2 dimensions");
        Self { dimension }
    }
}

impl BenchmarkFunction for Rosenbrock {
    fn name(&self) -> &'static str {
        "Rosenbrock"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn optimal_fitness(&self) -> f64 {
        0.0
    }

    fn optimal_solution(&self) -> Option<Vec<f64>> {
        Some(vec![1.0; self.dimension])
    }

    fn evaluate_raw(&self, x: &[f64]) -> f64 {
        x.windows(2)
            .map(|w| {
                let xi = w[0];
                let xi1 = w[1];
                100.0 * (xi1 - xi * xi).powi(2) + (1.0 - xi).powi(2)
            })
            .sum()
    }
}

impl Evaluator for Rosenbrock {
    fn evaluate(&self, point: &DVector<f64>) -> f64 {
        -self.evaluate_raw(point.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(values: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(values)
    }

    #[test]
    fn test_sphere_at_optimum() {
        let sphere = Sphere::new(3);
        assert_relative_eq!(sphere.evaluate(&point(&[0.0, 0.0, 0.0])), 0.0);
    }

    #[test]
    fn test_sphere_non_optimum() {
        let sphere = Sphere::new(3);
        // 1 + 4 + 9 = 14, negated = -14
        assert_relative_eq!(sphere.evaluate(&point(&[1.0, 2.0, 3.0])), -14.0);
    }

    #[test]
    fn test_sphere_metadata() {
        let sphere = Sphere::new(5);
        assert_eq!(sphere.name(), "Sphere");
        assert_eq!(sphere.dimension(), 5);
        assert_relative_eq!(sphere.optimal_fitness(), 0.0);
        assert_eq!(sphere.optimal_solution(), Some(vec![0.0; 5]));
    }

    #[test]
    fn test_shifted_sphere() {
        let f = ShiftedSphere::new(vec![3.0, -2.0]);
        assert_eq!(f.dimension(), 2);
        assert_eq!(f.target(), &[3.0, -2.0]);
        assert_relative_eq!(f.evaluate(&point(&[3.0, -2.0])), 0.0);
        assert_relative_eq!(f.evaluate(&point(&[0.0, 0.0])), -13.0);
    }

    #[test]
    fn test_rosenbrock_at_optimum() {
        let rosenbrock = Rosenbrock::new(4);
        assert_relative_eq!(rosenbrock.evaluate(&point(&[1.0; 4])), 0.0);
        assert_relative_eq!(rosenbrock.evaluate_raw(&[0.0, 0.0]), 1.0);
    }

    #[test]
    #[should_panic(expected = "Rosenbrock requires at least 2 dimensions")]
    fn test_rosenbrock_requires_two_dimensions() {
        Rosenbrock::new(1);
    }
}
