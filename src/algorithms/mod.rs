//! Optimization algorithms
//!
//! This module provides the NES optimizer and its builder.

pub mod nes;

pub mod prelude {
    pub use super::nes::*;
}
