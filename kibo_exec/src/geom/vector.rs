//! Vector implementation of the control value operations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector3;

use super::ControlValue;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

/// Vectors form a standard vector space: the norm is the magnitude, gain is scalar
/// multiplication, absolute is addition and relative is subtraction.
impl ControlValue for Vector3<f64> {
    fn identity() -> Self {
        Vector3::zeros()
    }

    fn magnitude(&self) -> f64 {
        self.norm()
    }

    fn gain(&self, rate: f64) -> Self {
        self * rate
    }

    fn absolute(&self, target: &Self) -> Self {
        self + target
    }

    fn relative(&self, origin: &Self) -> Self {
        self - origin
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Normalise the vector, returning the zero vector if it has zero length.
pub fn normalize_or_zero(v: &Vector3<f64>) -> Vector3<f64> {
    let length = v.norm();

    if length == 0.0 {
        Vector3::zeros()
    } else {
        v / length
    }
}

/// Single line representation of a vector for logging.
pub fn fmt_vector(v: &Vector3<f64>) -> String {
    format!("Vector[x={:.3}, y={:.3}, z={:.3}]", v[0], v[1], v[2])
}
