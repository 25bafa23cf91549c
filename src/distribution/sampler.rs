//! Raw sample generation in standard coordinates
//!
//! Samples are drawn from the base distribution before any transform is
//! applied. With coupled dimensions a sample is a uniformly random direction
//! scaled by a single radius; otherwise every coordinate is an independent
//! radius draw.

use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Cauchy, Distribution, StandardNormal};

use crate::config::DistributionType;
use crate::error::{NesError, NesResult};

/// Draws raw samples from the configured base distribution
#[derive(Clone, Debug)]
pub struct SampleGenerator {
    distribution: DistributionType,
    dimension: usize,
    coupled: bool,
}

impl SampleGenerator {
    /// Create a new sample generator
    pub fn new(distribution: DistributionType, dimension: usize, coupled: bool) -> Self {
        Self {
            distribution,
            dimension,
            coupled,
        }
    }

    /// Base distribution family
    pub fn distribution(&self) -> DistributionType {
        self.distribution
    }

    /// Dimension of produced samples
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether samples share a single radius
    pub fn is_coupled(&self) -> bool {
        self.coupled
    }

    /// Draw a scalar from the base distribution
    pub fn produce_radius<R: Rng + ?Sized>(&self, rng: &mut R) -> NesResult<f64> {
        match self.distribution {
            DistributionType::Gaussian => Ok(StandardNormal.sample(rng)),
            DistributionType::Cauchy => {
                let cauchy = Cauchy::new(0.0, 1.0)
                    .map_err(|e| NesError::Numerical(format!("Cauchy(0, 1): {e}")))?;
                Ok(cauchy.sample(rng))
            }
            DistributionType::GeneralizedGaussian | DistributionType::StudentT => {
                Err(NesError::UnsupportedDistribution(self.distribution))
            }
        }
    }

    /// Draw a raw (untransformed) sample
    pub fn produce_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> NesResult<DVector<f64>> {
        let n = self.dimension;

        if self.coupled {
            let direction = random_direction(n, rng);
            let radius = self.produce_radius(rng)?;
            Ok(direction * (radius * (n as f64).sqrt()))
        } else {
            let mut sample = DVector::zeros(n);
            for i in 0..n {
                sample[i] = self.produce_radius(rng)?;
            }
            Ok(sample)
        }
    }
}

/// Uniformly random unit vector in `n` dimensions
fn random_direction<R: Rng + ?Sized>(n: usize, rng: &mut R) -> DVector<f64> {
    loop {
        let v: DVector<f64> = DVector::from_fn(n, |_, _| StandardNormal.sample(rng));
        let norm = v.norm();
        // A zero draw has no direction
        if norm > 0.0 {
            return v / norm;
        }
    }
}
