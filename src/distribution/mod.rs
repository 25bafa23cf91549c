//! Search distribution: raw sampling, coordinate transform and densities

pub mod density;
pub mod sampler;
pub mod transform;

pub mod prelude {
    pub use super::density::{Density, ShiftedGaussianDensity, StandardGaussianDensity};
    pub use super::sampler::SampleGenerator;
    pub use super::transform::coord_transform;
}
