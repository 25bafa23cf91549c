//! Fitness shaping
//!
//! Shapers turn raw fitnesses into utilities. Utilities must be
//! non-negative; [`normalize_utilities`] scales them into weights that sum
//! to one before they reach the gradient estimate.

use std::cmp::Ordering;

use crate::error::{NesError, NesResult};

/// Maps batch fitnesses to utilities of the same length
pub trait FitnessShaper {
    /// Shape the fitnesses of one batch (higher fitness is better)
    fn shape(&self, fitnesses: &[f64]) -> Vec<f64>;
}

impl<F> FitnessShaper for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn shape(&self, fitnesses: &[f64]) -> Vec<f64> {
        self(fitnesses)
    }
}

/// Indices of `fitnesses` sorted from worst to best; ties keep index order
fn ascending_order(fitnesses: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..fitnesses.len()).collect();
    indices.sort_by(|&a, &b| {
        fitnesses[a]
            .partial_cmp(&fitnesses[b])
            .unwrap_or(Ordering::Equal)
    });
    indices
}

/// Linear ranking over the top fraction of the batch
///
/// The best `k = max(1, ⌊n · top_fraction⌋)` samples get utilities
/// `k, k-1, …, 1`; everyone else gets zero.
#[derive(Clone, Debug)]
pub struct TopLinearRanking {
    /// Fraction of the batch that receives a positive utility, in (0, 1]
    pub top_fraction: f64,
}

impl TopLinearRanking {
    /// Create a new top-linear ranking
    pub fn new(top_fraction: f64) -> Self {
        assert!(
            top_fraction > 0.0 && top_fraction <= 1.0,
            "Top fraction must be in (0, 1]"
        );
        Self { top_fraction }
    }
}

impl Default for TopLinearRanking {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl FitnessShaper for TopLinearRanking {
    fn shape(&self, fitnesses: &[f64]) -> Vec<f64> {
        let n = fitnesses.len();
        let mut utilities = vec![0.0; n];
        if n == 0 {
            return utilities;
        }

        let top = ((n as f64 * self.top_fraction).floor() as usize).clamp(1, n);
        let order = ascending_order(fitnesses);
        for (rank, &index) in order.iter().enumerate() {
            // rank n-1 is the best sample
            let from_cutoff = rank as i64 - (n - top) as i64 + 1;
            if from_cutoff > 0 {
                utilities[index] = from_cutoff as f64;
            }
        }
        utilities
    }
}

/// Plain linear ranking: utility = rank, worst sample gets zero
#[derive(Clone, Debug, Default)]
pub struct RankShaping;

impl FitnessShaper for RankShaping {
    fn shape(&self, fitnesses: &[f64]) -> Vec<f64> {
        let mut utilities = vec![0.0; fitnesses.len()];
        for (rank, &index) in ascending_order(fitnesses).iter().enumerate() {
            utilities[index] = rank as f64;
        }
        utilities
    }
}

/// Raw fitness shifted so that the worst sample has utility zero
#[derive(Clone, Debug, Default)]
pub struct IdentityShaping;

impl FitnessShaper for IdentityShaping {
    fn shape(&self, fitnesses: &[f64]) -> Vec<f64> {
        let worst = fitnesses.iter().cloned().fold(f64::INFINITY, f64::min);
        fitnesses.iter().map(|f| f - worst).collect()
    }
}

/// Scale utilities into weights that sum to one
pub fn normalize_utilities(utilities: &[f64]) -> NesResult<Vec<f64>> {
    if utilities.is_empty() {
        return Err(NesError::EmptyBatch);
    }
    if let Some(bad) = utilities.iter().find(|u| !u.is_finite() || **u < 0.0) {
        return Err(NesError::Numerical(format!(
            "Utilities must be finite and non-negative, got {}",
            bad
        )));
    }

    let total: f64 = utilities.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(NesError::Numerical(format!(
            "Utilities must have a positive finite sum, got {}",
            total
        )));
    }

    Ok(utilities.iter().map(|u| u / total).collect())
}
