//! # Geometry module
//!
//! Provides the value types used to describe where the robot is and where it should go:
//!
//! - Positions and displacements are `nalgebra::Vector3<f64>`.
//! - Orientations (and unnormalised rotation deltas) are [`Quaternion`]s.
//! - A [`Frame`] pairs the two into a pose which can be composed with other poses.
//!
//! Both vectors and quaternions implement [`ControlValue`], which is the small set of group
//! operations needed by the generic [`crate::pid::PidController`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod frame;
mod quaternion;
mod vector;

// ---------------------------------------------------------------------------
// EXPORTS
// ---------------------------------------------------------------------------

pub use frame::Frame;
pub use quaternion::Quaternion;
pub use vector::{fmt_vector, normalize_or_zero};

pub use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A value which behaves like a point in a continuous transformation group.
///
/// In Lie algebra terms `absolute` is `self + target`, `relative` is `self - origin` and `gain`
/// is `self * rate`.
pub trait ControlValue: Sized + Clone + std::fmt::Debug {
    /// The identity element (origin) of the group.
    fn identity() -> Self;

    /// Scalar size of the value, used to limit the integral term of a controller.
    fn magnitude(&self) -> f64;

    /// Scale the value by `rate`.
    fn gain(&self, rate: f64) -> Self;

    /// Compose this value with `target`.
    fn absolute(&self, target: &Self) -> Self;

    /// The value of `self` relative to `origin`.
    fn relative(&self, origin: &Self) -> Self;
}

// ---------------------------------------------------------------------------
// TEST UTILITIES
// ---------------------------------------------------------------------------

/// Deterministic spread of frames used by the property tests of this crate.
#[cfg(test)]
pub(crate) fn sample_frames(num: usize) -> Vec<Frame> {
    (0..num)
        .map(|i| {
            let t = i as f64;
            let position = Vector3::new(
                5.0 * (1.3 * t).sin(),
                -3.0 * (0.7 * t + 0.2).cos(),
                2.0 * (0.31 * t).sin() + 4.0,
            );
            let axis = Vector3::new((0.9 * t).cos(), (1.7 * t).sin(), 0.5 + (0.4 * t).cos());
            let angle = 0.1 + (0.37 * t) % 3.0;

            Frame::new(position, Quaternion::from_axis_angle(&axis, angle))
        })
        .collect()
}
