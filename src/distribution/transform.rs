//! Affine map from standard coordinates into search space

use nalgebra::{DMatrix, DVector};

/// Map a raw sample into search space: `transformer^T · raw + center`
pub fn coord_transform(
    center: &DVector<f64>,
    transformer: &DMatrix<f64>,
    raw: &DVector<f64>,
) -> DVector<f64> {
    transformer.tr_mul(raw) + center
}
