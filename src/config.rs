//! Configuration for Natural Evolution Strategies
//!
//! [`NesConfig`] holds the recognized options with their defaults.
//! [`NesConfig::validate`] checks them against the problem dimension and
//! resolves the values that depend on it.

use serde::{Deserialize, Serialize};

use crate::error::{NesError, NesResult};

/// Batch size multiplier applied to the dimension when none is set
pub const DEFAULT_BATCH_FACTOR: usize = 10;

/// Fill-loop draws allowed per batch slot when no cap is set
pub const DEFAULT_MIXING_DRAWS_PER_SLOT: usize = 1000;

/// Base distribution family for sample radii
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistributionType {
    /// Standard normal radius
    #[default]
    Gaussian,
    /// Standard Cauchy radius (heavy tails)
    Cauchy,
    /// Generalized Gaussian radius (declared, no sampler)
    GeneralizedGaussian,
    /// Student-t radius (declared, no sampler)
    StudentT,
}

/// Configuration for the NES optimizer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NesConfig {
    /// Base radius distribution family
    pub distribution_type: DistributionType,
    /// Step scale for both the center and the transform update
    pub learning_rate: f64,
    /// Samples per generation (`None` = 10 × dimension)
    pub batch_size: Option<usize>,
    /// Reserved, currently without effect
    pub elitism: bool,
    /// Isotropic (shared radius) vs per-coordinate sampling
    pub coupled_dimensions: bool,
    /// Antithetic pairs `(x, -x)`; requires an even batch size
    pub symmetric_sampling: bool,
    /// Reuse samples across generations
    pub importance_mixing: bool,
    /// Minimum fraction of each batch that is freshly drawn
    pub forced_refresh: f64,
    /// Cap on fill-loop draws per generation (`None` = 1000 × batch size)
    pub max_mixing_draws: Option<usize>,
    /// Must stay `false`; NES here only maximizes
    pub minimize: bool,
    /// Must stay `true`; the history window is read every generation
    pub store_all_evaluations: bool,
}

impl Default for NesConfig {
    fn default() -> Self {
        Self {
            distribution_type: DistributionType::Gaussian,
            learning_rate: 1.0,
            batch_size: None,
            elitism: false,
            coupled_dimensions: true,
            symmetric_sampling: false,
            importance_mixing: true,
            forced_refresh: 0.01,
            max_mixing_draws: None,
            minimize: false,
            store_all_evaluations: true,
        }
    }
}

impl NesConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base distribution family
    pub fn distribution_type(mut self, distribution: DistributionType) -> Self {
        self.distribution_type = distribution;
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.learning_rate = rate;
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    /// Enable or disable elitism (reserved)
    pub fn elitism(mut self, enabled: bool) -> Self {
        self.elitism = enabled;
        self
    }

    /// Enable or disable coupled (isotropic) sampling
    pub fn coupled_dimensions(mut self, enabled: bool) -> Self {
        self.coupled_dimensions = enabled;
        self
    }

    /// Enable or disable antithetic sampling
    pub fn symmetric_sampling(mut self, enabled: bool) -> Self {
        self.symmetric_sampling = enabled;
        self
    }

    /// Enable or disable importance mixing
    pub fn importance_mixing(mut self, enabled: bool) -> Self {
        self.importance_mixing = enabled;
        self
    }

    /// Set the forced refresh fraction
    pub fn forced_refresh(mut self, fraction: f64) -> Self {
        self.forced_refresh = fraction;
        self
    }

    /// Set the fill-loop draw cap
    pub fn max_mixing_draws(mut self, draws: usize) -> Self {
        self.max_mixing_draws = Some(draws);
        self
    }

    /// Validate the configuration for a problem of the given dimension
    pub fn validate(&self, dimension: usize) -> NesResult<ResolvedConfig> {
        if dimension == 0 {
            return Err(NesError::Configuration(
                "Dimension must be at least 1".to_string(),
            ));
        }
        if self.minimize {
            return Err(NesError::Configuration(
                "NES only supports maximization (minimize must be false)".to_string(),
            ));
        }
        if !self.store_all_evaluations {
            return Err(NesError::Configuration(
                "NES requires full evaluation history (store_all_evaluations must be true)"
                    .to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(NesError::Configuration(format!(
                "Learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.forced_refresh) {
            return Err(NesError::Configuration(format!(
                "Forced refresh must lie in [0, 1], got {}",
                self.forced_refresh
            )));
        }

        let batch_size = match self.batch_size {
            Some(size) => size,
            None => DEFAULT_BATCH_FACTOR.checked_mul(dimension).ok_or_else(|| {
                NesError::Configuration(format!(
                    "Default batch size overflows for dimension {}",
                    dimension
                ))
            })?,
        };
        if batch_size == 0 {
            return Err(NesError::Configuration(
                "Batch size must be at least 1".to_string(),
            ));
        }
        if self.symmetric_sampling && batch_size % 2 == 1 {
            return Err(NesError::Configuration(format!(
                "Symmetric sampling requires an even batch size, got {}",
                batch_size
            )));
        }

        let max_mixing_draws = match self.max_mixing_draws {
            Some(draws) => draws,
            None => DEFAULT_MIXING_DRAWS_PER_SLOT
                .checked_mul(batch_size)
                .ok_or_else(|| {
                    NesError::Configuration(format!(
                        "Default mixing draw cap overflows for batch size {}",
                        batch_size
                    ))
                })?,
        };
        if max_mixing_draws == 0 {
            return Err(NesError::Configuration(
                "Mixing draw cap must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            dimension,
            distribution_type: self.distribution_type,
            learning_rate: self.learning_rate,
            batch_size,
            elitism: self.elitism,
            coupled_dimensions: self.coupled_dimensions,
            symmetric_sampling: self.symmetric_sampling,
            importance_mixing: self.importance_mixing,
            forced_refresh: self.forced_refresh,
            max_mixing_draws,
        })
    }
}

/// A validated configuration with dimension-dependent values resolved
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedConfig {
    /// Problem dimension (N)
    pub dimension: usize,
    /// Base radius distribution family
    pub distribution_type: DistributionType,
    /// Step scale for center and transform
    pub learning_rate: f64,
    /// Samples per generation
    pub batch_size: usize,
    /// Reserved
    pub elitism: bool,
    /// Isotropic sampling
    pub coupled_dimensions: bool,
    /// Antithetic sampling
    pub symmetric_sampling: bool,
    /// Sample reuse across generations
    pub importance_mixing: bool,
    /// Minimum fresh fraction
    pub forced_refresh: f64,
    /// Fill-loop draw cap
    pub max_mixing_draws: usize,
}
