//! Error types for nes-evo
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

use crate::config::DistributionType;

/// Top-level error type for NES operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NesError {
    /// Invalid configuration, rejected at construction
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The base distribution family is declared but has no sampler
    #[error("Unsupported distribution: {0:?} is not implemented")]
    UnsupportedDistribution(DistributionType),

    /// Dimension mismatch between a vector and the search space
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An update was requested on a batch without samples
    #[error("Empty batch")]
    EmptyBatch,

    /// Numerical instability (singular transform, non-finite values)
    #[error("Numerical instability: {0}")]
    Numerical(String),

    /// Fitness evaluation failed
    #[error("Fitness evaluation failed: {0}")]
    FitnessEvaluation(String),
}

/// Result type alias for NES operations
pub type NesResult<T> = Result<T, NesError>;
