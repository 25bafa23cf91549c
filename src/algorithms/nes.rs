//! Natural Evolution Strategies
//!
//! Each generation draws a batch from the current search distribution
//! (optionally reusing part of the previous batch through importance mixing),
//! evaluates the new points, shapes their fitnesses into weights and moves
//! the distribution along the natural gradient.
//!
//! Reference: Sun, Y., Wierstra, D., Schaul, T., & Schmidhuber, J. (2009).
//! Efficient Natural Evolution Strategies. GECCO.

use std::time::Instant;

use nalgebra::DVector;
use rand::Rng;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::{DistributionType, NesConfig, ResolvedConfig};
use crate::diagnostics::{EvolutionStats, GenerationReport, GenerationStats, NesObserver};
use crate::distribution::density::{ShiftedGaussianDensity, StandardGaussianDensity};
use crate::distribution::sampler::SampleGenerator;
use crate::error::{NesError, NesResult};
use crate::fitness::traits::Evaluator;
use crate::mixing::{importance_mixing, MixingConfig};
use crate::shaping::{normalize_utilities, FitnessShaper, TopLinearRanking};
use crate::state::{EvaluatedSample, SampleHistory, SearchState};
use crate::termination::{MaxGenerations, NesProgress, TerminationCriterion};
use crate::update::NaturalGradientUpdater;

/// Result of a NES run
#[derive(Clone, Debug)]
pub struct NesOutcome {
    /// Best point evaluated during the run
    pub best_point: DVector<f64>,
    /// Fitness of the best point
    pub best_fitness: f64,
    /// Search distribution when the run stopped
    pub final_state: SearchState,
    /// Number of generations completed
    pub generations: usize,
    /// Total fitness evaluations
    pub evaluations: usize,
    /// Statistics for the run
    pub stats: EvolutionStats,
}

/// Builder for [`Nes`]
pub struct NesBuilder<E, S> {
    config: NesConfig,
    initial_center: Option<DVector<f64>>,
    evaluator: Option<E>,
    shaper: S,
    termination: Option<Box<dyn TerminationCriterion>>,
    observer: Option<Box<dyn NesObserver>>,
}

impl NesBuilder<(), TopLinearRanking> {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: NesConfig::default(),
            initial_center: None,
            evaluator: None,
            shaper: TopLinearRanking::default(),
            termination: None,
            observer: None,
        }
    }
}

impl Default for NesBuilder<(), TopLinearRanking> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> NesBuilder<E, S> {
    /// Replace the whole configuration
    pub fn config(mut self, config: NesConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the learning rate
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = Some(size);
        self
    }

    /// Set the base distribution family
    pub fn distribution_type(mut self, distribution: DistributionType) -> Self {
        self.config.distribution_type = distribution;
        self
    }

    /// Enable or disable elitism (reserved)
    pub fn elitism(mut self, enabled: bool) -> Self {
        self.config.elitism = enabled;
        self
    }

    /// Enable or disable coupled (isotropic) sampling
    pub fn coupled_dimensions(mut self, enabled: bool) -> Self {
        self.config.coupled_dimensions = enabled;
        self
    }

    /// Enable or disable antithetic sampling
    pub fn symmetric_sampling(mut self, enabled: bool) -> Self {
        self.config.symmetric_sampling = enabled;
        self
    }

    /// Enable or disable importance mixing
    pub fn importance_mixing(mut self, enabled: bool) -> Self {
        self.config.importance_mixing = enabled;
        self
    }

    /// Set the forced refresh fraction
    pub fn forced_refresh(mut self, fraction: f64) -> Self {
        self.config.forced_refresh = fraction;
        self
    }

    /// Set the fill-loop draw cap
    pub fn max_mixing_draws(mut self, draws: usize) -> Self {
        self.config.max_mixing_draws = Some(draws);
        self
    }

    /// Set the initial center of the search distribution
    pub fn initial_center(mut self, center: DVector<f64>) -> Self {
        self.initial_center = Some(center);
        self
    }

    /// Set the termination criterion
    pub fn termination<T>(mut self, termination: T) -> Self
    where
        T: TerminationCriterion + 'static,
    {
        self.termination = Some(Box::new(termination));
        self
    }

    /// Set max generations (convenience method)
    pub fn max_generations(self, max: usize) -> Self {
        self.termination(MaxGenerations::new(max))
    }

    /// Set the per-generation observer
    pub fn observer<O>(mut self, observer: O) -> Self
    where
        O: NesObserver + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Set the fitness function
    pub fn evaluator<NewE>(self, evaluator: NewE) -> NesBuilder<NewE, S>
    where
        NewE: Evaluator,
    {
        NesBuilder {
            config: self.config,
            initial_center: self.initial_center,
            evaluator: Some(evaluator),
            shaper: self.shaper,
            termination: self.termination,
            observer: self.observer,
        }
    }

    /// Set the fitness shaper
    pub fn shaper<NewS>(self, shaper: NewS) -> NesBuilder<E, NewS>
    where
        NewS: FitnessShaper,
    {
        NesBuilder {
            config: self.config,
            initial_center: self.initial_center,
            evaluator: self.evaluator,
            shaper,
            termination: self.termination,
            observer: self.observer,
        }
    }
}

impl<E, S> NesBuilder<E, S>
where
    E: Evaluator,
    S: FitnessShaper,
{
    /// Build the NES instance
    pub fn build(self) -> NesResult<Nes<E, S>> {
        let center = self.initial_center.ok_or_else(|| {
            NesError::Configuration("Initial center must be specified".to_string())
        })?;

        let evaluator = self.evaluator.ok_or_else(|| {
            NesError::Configuration("Evaluator must be specified".to_string())
        })?;

        let termination = self.termination.ok_or_else(|| {
            NesError::Configuration("Termination criterion must be specified".to_string())
        })?;

        let config = self.config.validate(center.len())?;
        let state = SearchState::new(center)?;

        Ok(Nes {
            generator: SampleGenerator::new(
                config.distribution_type,
                config.dimension,
                config.coupled_dimensions,
            ),
            updater: NaturalGradientUpdater::new(config.learning_rate),
            config,
            evaluator,
            shaper: self.shaper,
            termination,
            observer: self.observer,
            state,
            history: SampleHistory::new(),
            evaluations: 0,
            best: None,
            stats: EvolutionStats::new(),
            fitness_history: Vec::new(),
        })
    }
}

/// Natural Evolution Strategies optimizer (maximizes fitness)
pub struct Nes<E, S = TopLinearRanking> {
    config: ResolvedConfig,
    generator: SampleGenerator,
    updater: NaturalGradientUpdater,
    evaluator: E,
    shaper: S,
    termination: Box<dyn TerminationCriterion>,
    observer: Option<Box<dyn NesObserver>>,
    state: SearchState,
    history: SampleHistory,
    evaluations: usize,
    best: Option<(DVector<f64>, f64)>,
    stats: EvolutionStats,
    fitness_history: Vec<f64>,
}

impl Nes<(), TopLinearRanking> {
    /// Create a builder for Nes
    pub fn builder() -> NesBuilder<(), TopLinearRanking> {
        NesBuilder::new()
    }
}

impl<E, S> Nes<E, S>
where
    E: Evaluator,
    S: FitnessShaper,
{
    /// Validated configuration
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Current search distribution
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// Every evaluated sample so far
    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    /// Total fitness evaluations so far
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Best point and fitness seen so far
    pub fn best(&self) -> Option<(&DVector<f64>, f64)> {
        self.best.as_ref().map(|(point, fitness)| (point, *fitness))
    }

    /// Statistics recorded so far
    pub fn stats(&self) -> &EvolutionStats {
        &self.stats
    }

    /// Progress snapshot for termination checks
    pub fn progress(&self) -> NesProgress<'_> {
        NesProgress {
            generation: self.state.generation,
            evaluations: self.evaluations,
            best_fitness: self.best.as_ref().map_or(f64::NEG_INFINITY, |(_, f)| *f),
            center: &self.state.center,
            transformer_scale: self.state.transformer_scale(),
            fitness_history: &self.fitness_history,
        }
    }

    /// Draw `count` fresh raw samples, mirrored under symmetric sampling
    fn draw_fresh<R: Rng + ?Sized>(
        &self,
        count: usize,
        rng: &mut R,
    ) -> NesResult<Vec<DVector<f64>>> {
        let mut samples = Vec::with_capacity(count);
        while samples.len() < count {
            let sample = self.generator.produce_sample(rng)?;
            if self.config.symmetric_sampling {
                samples.push(-&sample);
            }
            samples.push(sample);
        }
        Ok(samples)
    }

    /// Run one generation and return its statistics
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> NesResult<GenerationStats> {
        let batch = self.config.batch_size;

        let mixed = match &self.state.last_shift {
            Some(shift) if self.config.importance_mixing && self.history.len() >= batch => {
                let window = self.history.window(batch);
                let old_samples: Vec<DVector<f64>> = window.iter().map(|s| s.raw.clone()).collect();
                let old_fitnesses: Vec<f64> = window.iter().map(|s| s.fitness).collect();
                let old_pdf =
                    ShiftedGaussianDensity::from_shift(shift, self.state.det_diff_transformers);
                let mixing = MixingConfig::new(
                    self.config.forced_refresh,
                    self.config.symmetric_sampling,
                    self.config.max_mixing_draws,
                );
                let generator = &self.generator;
                Some(importance_mixing(
                    &old_samples,
                    &old_fitnesses,
                    &old_pdf,
                    &StandardGaussianDensity,
                    |r: &mut R| generator.produce_sample(r),
                    &mixing,
                    rng,
                )?)
            }
            _ => None,
        };

        let mut entries: Vec<EvaluatedSample> = Vec::with_capacity(batch);
        let (fresh_raw, reused, mixing_capped) = match mixed {
            Some(outcome) => {
                let reused = outcome.reused_samples.len();
                for (raw, fitness) in outcome
                    .reused_samples
                    .into_iter()
                    .zip(outcome.reused_fitnesses)
                {
                    let point = self.state.transform(&raw);
                    entries.push(EvaluatedSample::new(raw, point, fitness));
                }

                let mut fresh = Vec::with_capacity(batch - reused);
                for sample in outcome.fresh_samples {
                    if self.config.symmetric_sampling {
                        fresh.push(-&sample);
                    }
                    fresh.push(sample);
                }
                (fresh, reused, outcome.capped)
            }
            None => (self.draw_fresh(batch, rng)?, 0, false),
        };

        let points: Vec<DVector<f64>> = fresh_raw.iter().map(|s| self.state.transform(s)).collect();
        let fitnesses = evaluate_points(&self.evaluator, &points);
        if let Some((point, fitness)) = points
            .iter()
            .zip(&fitnesses)
            .find(|(_, f)| !f.is_finite())
        {
            return Err(NesError::FitnessEvaluation(format!(
                "Non-finite fitness {} at {:?}",
                fitness,
                point.as_slice()
            )));
        }

        let mut batch_best: Option<(DVector<f64>, f64)> = None;
        for ((raw, point), fitness) in fresh_raw.into_iter().zip(points).zip(fitnesses) {
            let improved = batch_best.as_ref().map_or(true, |(_, best)| fitness > *best);
            if improved {
                batch_best = Some((point.clone(), fitness));
            }
            entries.push(EvaluatedSample::new(raw, point, fitness));
        }

        let samples: Vec<DVector<f64>> = entries.iter().map(|e| e.raw.clone()).collect();
        let batch_fitnesses: Vec<f64> = entries.iter().map(|e| e.fitness).collect();
        let utilities = self.shaper.shape(&batch_fitnesses);
        if utilities.len() != batch_fitnesses.len() {
            return Err(NesError::DimensionMismatch {
                expected: batch_fitnesses.len(),
                actual: utilities.len(),
            });
        }
        let weights = normalize_utilities(&utilities)?;

        let step = self.updater.update(&self.state, &samples, &weights)?;

        // commit the batch
        for entry in entries {
            self.history.push(entry);
        }
        self.history.re_express(batch, &step.shift);
        self.evaluations += batch - reused;
        if let Some((point, fitness)) = batch_best {
            let improved = self.best.as_ref().map_or(true, |(_, best)| fitness > *best);
            if improved {
                self.best = Some((point, fitness));
            }
        }
        self.state = step.state;

        let (best_fitness, mean_fitness) = GenerationStats::batch_summary(&batch_fitnesses);
        let stats = GenerationStats {
            generation: self.state.generation,
            evaluations: self.evaluations,
            fresh: batch - reused,
            reused,
            best_fitness,
            mean_fitness,
            center: self.state.center.iter().copied().collect(),
            transformer_scale: self.state.transformer_scale(),
            transformer_mean_abs: self.state.transformer_mean_abs(),
            covariance_gradient_norm: step.covariance_gradient.norm(),
            mixing_capped,
        };

        trace_debug!(
            generation = stats.generation,
            evaluations = stats.evaluations,
            reused = stats.reused,
            best_fitness = stats.best_fitness,
            transformer_scale = stats.transformer_scale,
            "generation complete"
        );

        if let Some(observer) = self.observer.as_mut() {
            observer.on_generation(&GenerationReport {
                stats: stats.clone(),
                center_gradient: step.center_gradient,
                covariance_gradient: step.covariance_gradient,
            });
        }

        self.fitness_history
            .push(self.best.as_ref().map_or(best_fitness, |(_, f)| *f));
        self.stats.record(stats.clone());
        Ok(stats)
    }

    /// Step until the termination criterion fires
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R) -> NesResult<NesOutcome> {
        let start_time = Instant::now();

        trace_info!(
            dimension = self.config.dimension,
            batch_size = self.config.batch_size,
            importance_mixing = self.config.importance_mixing,
            symmetric_sampling = self.config.symmetric_sampling,
            "starting NES run"
        );

        loop {
            let done = {
                let progress = self.progress();
                self.termination.should_terminate(&progress)
            };
            if done {
                self.stats.set_termination_reason(self.termination.reason());
                break;
            }
            self.step(rng)?;
        }

        self.stats.set_runtime(start_time.elapsed());

        let (best_point, best_fitness) = self
            .best
            .clone()
            .unwrap_or_else(|| (self.state.center.clone(), f64::NEG_INFINITY));

        trace_info!(
            generations = self.state.generation,
            evaluations = self.evaluations,
            best_fitness = best_fitness,
            reason = self.termination.reason(),
            "NES run finished"
        );

        Ok(NesOutcome {
            best_point,
            best_fitness,
            final_state: self.state.clone(),
            generations: self.state.generation,
            evaluations: self.evaluations,
            stats: self.stats.clone(),
        })
    }
}

/// Evaluate points in parallel, keeping their order
#[cfg(feature = "parallel")]
fn evaluate_points<E: Evaluator>(evaluator: &E, points: &[DVector<f64>]) -> Vec<f64> {
    points.par_iter().map(|p| evaluator.evaluate(p)).collect()
}

/// Evaluate points sequentially
#[cfg(not(feature = "parallel"))]
fn evaluate_points<E: Evaluator>(evaluator: &E, points: &[DVector<f64>]) -> Vec<f64> {
    points.iter().map(|p| evaluator.evaluate(p)).collect()
}
