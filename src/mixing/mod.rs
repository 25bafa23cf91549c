//! Importance mixing
//!
//! Reuses samples from the previous generation when the search distribution
//! has moved only slightly. Each old sample survives with probability
//! proportional to its density ratio under the new and old distributions;
//! the rest of the batch is filled by rejection sampling that favors points
//! more likely under the new distribution than under the old one. A fixed
//! fraction of each batch is always drawn fresh.

use nalgebra::DVector;
use rand::Rng;

use crate::distribution::density::Density;
use crate::error::{NesError, NesResult};

/// Parameters of one importance-mixing pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MixingConfig {
    /// Minimum fraction of the batch that is drawn fresh
    pub forced_refresh: f64,
    /// Fresh samples will be mirrored; keep the reused count even
    pub symmetric: bool,
    /// Maximum number of fill-loop candidates drawn
    pub max_draws: usize,
}

impl MixingConfig {
    /// Create a mixing configuration
    pub fn new(forced_refresh: f64, symmetric: bool, max_draws: usize) -> Self {
        Self {
            forced_refresh,
            symmetric,
            max_draws,
        }
    }
}

/// Partition of a batch into reused and fresh samples
#[derive(Clone, Debug, Default)]
pub struct MixingOutcome {
    /// Old samples that stay in the batch
    pub reused_samples: Vec<DVector<f64>>,
    /// Fitnesses of the reused samples (not re-evaluated)
    pub reused_fitnesses: Vec<f64>,
    /// New samples awaiting evaluation
    pub fresh_samples: Vec<DVector<f64>>,
    /// Fill-loop candidates drawn
    pub draws: usize,
    /// Whether the draw cap forced unconditional acceptance
    pub capped: bool,
}

impl MixingOutcome {
    /// Fraction of the old batch that was reused
    pub fn reuse_fraction(&self, batch_size: usize) -> f64 {
        if batch_size == 0 {
            return 0.0;
        }
        self.reused_samples.len() as f64 / batch_size as f64
    }
}

/// `numerator / denominator` with defined results for a zero denominator
///
/// A positive numerator over zero is infinitely likely; two zero densities
/// are treated as indistinguishable.
pub fn density_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else if numerator > 0.0 {
        f64::INFINITY
    } else {
        1.0
    }
}

/// Split the previous batch into reused samples and fresh draws
///
/// `fresh` draws one candidate from the new distribution. Under symmetric
/// sampling only half of the open slots are filled, since every fresh sample
/// is later paired with its mirror image.
pub fn importance_mixing<R, O, N, G>(
    old_samples: &[DVector<f64>],
    old_fitnesses: &[f64],
    old_pdf: &O,
    new_pdf: &N,
    mut fresh: G,
    config: &MixingConfig,
    rng: &mut R,
) -> NesResult<MixingOutcome>
where
    R: Rng + ?Sized,
    O: Density + ?Sized,
    N: Density + ?Sized,
    G: FnMut(&mut R) -> NesResult<DVector<f64>>,
{
    if old_samples.len() != old_fitnesses.len() {
        return Err(NesError::DimensionMismatch {
            expected: old_samples.len(),
            actual: old_fitnesses.len(),
        });
    }

    let batch = old_samples.len();
    let forced_refresh = config.forced_refresh;
    let reserve = batch as f64 * forced_refresh;

    let mut outcome = MixingOutcome::default();

    for (sample, &fitness) in old_samples.iter().zip(old_fitnesses) {
        // never use only old samples
        if ((batch - outcome.reused_samples.len()) as f64) <= reserve {
            break;
        }
        let r: f64 = rng.gen();
        let ratio = density_ratio(new_pdf.density(sample), old_pdf.density(sample));
        if r < (1.0 - forced_refresh) * ratio {
            outcome.reused_samples.push(sample.clone());
            outcome.reused_fitnesses.push(fitness);
        }
    }

    if config.symmetric && outcome.reused_samples.len() % 2 == 1 {
        outcome.reused_samples.pop();
        outcome.reused_fitnesses.pop();
    }

    let open = batch - outcome.reused_samples.len();
    let required = if config.symmetric { open / 2 } else { open };

    while outcome.fresh_samples.len() < required {
        let candidate = fresh(rng)?;

        if outcome.draws >= config.max_draws {
            outcome.capped = true;
            outcome.fresh_samples.push(candidate);
            continue;
        }
        outcome.draws += 1;

        let r: f64 = rng.gen();
        if r < forced_refresh {
            outcome.fresh_samples.push(candidate);
        } else {
            let ratio = density_ratio(old_pdf.density(&candidate), new_pdf.density(&candidate));
            if r < 1.0 - ratio {
                outcome.fresh_samples.push(candidate);
            }
        }
    }

    if outcome.capped {
        trace_debug!(
            draws = outcome.draws,
            required = required,
            "importance mixing hit its draw cap"
        );
    }

    Ok(outcome)
}
