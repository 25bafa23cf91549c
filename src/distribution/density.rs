//! Search distribution densities in the current standard frame
//!
//! Both densities are unnormalized by the same constant, so only their ratio
//! is meaningful. The current distribution is a standard Gaussian in its own
//! frame; the previous one is reached by undoing the last frame shift.

use nalgebra::{DMatrix, DVector};

use crate::update::FrameShift;

/// A probability density over raw samples in the current standard frame
pub trait Density {
    /// Density (up to a shared constant) at `sample`
    fn density(&self, sample: &DVector<f64>) -> f64;
}

impl<F> Density for F
where
    F: Fn(&DVector<f64>) -> f64,
{
    fn density(&self, sample: &DVector<f64>) -> f64 {
        self(sample)
    }
}

/// The current search distribution: `exp(-½·|s|²)`
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardGaussianDensity;

impl Density for StandardGaussianDensity {
    fn density(&self, sample: &DVector<f64>) -> f64 {
        (-0.5 * sample.norm_squared()).exp()
    }
}

/// The previous search distribution seen from the current frame
///
/// A sample `s` in the current frame corresponds to `delta · s + center_delta`
/// in the previous one. The determinant ratio accounts for the volume change
/// between the two transforms.
#[derive(Clone, Debug)]
pub struct ShiftedGaussianDensity {
    delta: DMatrix<f64>,
    center_delta: DVector<f64>,
    det_diff_transformers: f64,
}

impl ShiftedGaussianDensity {
    /// Create from explicit parameters
    pub fn new(delta: DMatrix<f64>, center_delta: DVector<f64>, det_diff_transformers: f64) -> Self {
        Self {
            delta,
            center_delta,
            det_diff_transformers,
        }
    }

    /// Previous distribution for the given frame shift
    pub fn from_shift(shift: &FrameShift, det_diff_transformers: f64) -> Self {
        Self::new(
            shift.delta().clone(),
            shift.center_delta().clone(),
            det_diff_transformers,
        )
    }
}

impl Density for ShiftedGaussianDensity {
    fn density(&self, sample: &DVector<f64>) -> f64 {
        let previous = &self.delta * sample + &self.center_delta;
        (-0.5 * previous.norm_squared()).exp() / self.det_diff_transformers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_standard_density_peaks_at_origin() {
        let pdf = StandardGaussianDensity;
        assert_relative_eq!(pdf.density(&DVector::zeros(3)), 1.0);
        let s = DVector::from_vec(vec![1.0, 1.0]);
        assert_relative_eq!(pdf.density(&s), (-1.0f64).exp());
    }

    #[test]
    fn test_identity_shift_matches_current_density() {
        let old = ShiftedGaussianDensity::new(DMatrix::identity(2, 2), DVector::zeros(2), 1.0);
        let new = StandardGaussianDensity;
        let s = DVector::from_vec(vec![0.3, -1.2]);
        assert_relative_eq!(old.density(&s), new.density(&s), epsilon = 1e-15);
    }

    #[test]
    fn test_shifted_density_peaks_at_undone_center() {
        let center_delta = DVector::from_vec(vec![1.0, 0.0]);
        let old = ShiftedGaussianDensity::new(DMatrix::identity(2, 2), center_delta, 1.0);

        // delta · s + c = 0  =>  s = -c
        let peak = DVector::from_vec(vec![-1.0, 0.0]);
        assert_relative_eq!(old.density(&peak), 1.0);
        assert!(old.density(&DVector::zeros(2)) < 1.0);
    }

    #[test]
    fn test_determinant_ratio_scales_density() {
        let old = ShiftedGaussianDensity::new(DMatrix::identity(1, 1), DVector::zeros(1), 0.5);
        assert_relative_eq!(old.density(&DVector::zeros(1)), 2.0);
    }

    #[test]
    fn test_closure_density() {
        let flat = |_: &DVector<f64>| 0.25;
        assert_eq!(flat.density(&DVector::zeros(2)), 0.25);
    }
}
