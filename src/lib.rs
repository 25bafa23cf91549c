//! # nes-evo
//!
//! Natural Evolution Strategies for black-box continuous optimization.
//!
//! The search distribution is a multivariate Gaussian whose covariance
//! factor is updated through the matrix exponential. Each generation moves
//! the distribution along the natural gradient of the expected utility, and
//! importance mixing reuses samples from the previous generation when the
//! distribution has moved only slightly.
//!
//! ## Core Concepts
//!
//! - **Search state**: center plus transformer, returned as a new value by every update
//! - **Fitness shaping**: raw fitnesses become rank-based utilities before weighting
//! - **Importance mixing**: old samples survive with probability tied to their density ratio
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use nes_evo::prelude::*;
//! use nalgebra::DVector;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//!
//! let outcome = Nes::builder()
//!     .initial_center(DVector::zeros(2))
//!     .evaluator(ShiftedSphere::new(vec![3.0, -2.0]))
//!     .batch_size(20)
//!     .max_generations(100)
//!     .build()?
//!     .run(&mut rng)?;
//! ```

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod algorithms;
pub mod config;
pub mod diagnostics;
pub mod distribution;
pub mod error;
pub mod fitness;
pub mod mixing;
pub mod shaping;
pub mod state;
pub mod termination;
pub mod update;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::algorithms::prelude::*;
    pub use crate::config::{DistributionType, NesConfig, ResolvedConfig};
    pub use crate::diagnostics::prelude::*;
    pub use crate::distribution::prelude::*;
    pub use crate::error::*;
    pub use crate::fitness::prelude::*;
    pub use crate::mixing::{importance_mixing, MixingConfig, MixingOutcome};
    pub use crate::shaping::{
        normalize_utilities, FitnessShaper, IdentityShaping, RankShaping, TopLinearRanking,
    };
    pub use crate::state::{EvaluatedSample, SampleHistory, SearchState};
    pub use crate::termination::prelude::*;
    pub use crate::update::{FrameShift, NaturalGradientUpdater, UpdateStep};
}
